//! Messages, tool calls, and trace items exchanged during a run
//!
//! This module defines the core data structures for agent communication,
//! including the tagged [`TurnAction`] the coordinator derives from each
//! model response.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Role in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A message in the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            tool_call_id: None,
            tool_calls: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            tool_call_id: None,
            tool_calls: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_call_id: None,
            tool_calls: None,
        }
    }

    pub fn assistant_with_tool_calls(
        content: impl Into<String>,
        tool_calls: Vec<ToolCall>,
    ) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_call_id: None,
            tool_calls: Some(tool_calls),
        }
    }

    pub fn tool(content: impl Into<String>, tool_call_id: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_call_id: Some(tool_call_id.into()),
            tool_calls: None,
        }
    }
}

/// A tool call made by the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

/// Response from the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelResponse {
    pub id: String,
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub finish_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ModelResponse {
    pub fn new_message(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content: Some(content.into()),
            tool_calls: vec![],
            finish_reason: Some("stop".to_string()),
            created_at: Utc::now(),
        }
    }

    pub fn new_tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content: None,
            tool_calls,
            finish_reason: Some("tool_calls".to_string()),
            created_at: Utc::now(),
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    pub fn has_content(&self) -> bool {
        self.content.as_deref().is_some_and(|c| !c.is_empty())
    }
}

/// What the coordinator should do with a model response.
///
/// Every response is classified into exactly one of these before the loop
/// acts on it, so the dispatch is a single `match` instead of scattered
/// inspection of the raw response.
#[derive(Debug, Clone)]
pub enum TurnAction {
    /// Plain text answer; the run terminates with it.
    Final(String),
    /// One or more tool invocations to execute before asking the model again.
    ToolCalls(Vec<ToolCall>),
    /// Delegation to another agent, triggered by a transfer tool call.
    Handoff { target: String, call: ToolCall },
}

/// A single step in the ordered trace of a run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RunItem {
    Message(MessageItem),
    ToolCall(ToolCallItem),
    ToolOutput(ToolOutputItem),
    Handoff(HandoffItem),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageItem {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallItem {
    pub id: String,
    pub tool_name: String,
    pub arguments: Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutputItem {
    pub id: String,
    pub tool_call_id: String,
    pub output: Value,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandoffItem {
    pub id: String,
    pub from_agent: String,
    pub to_agent: String,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl MessageItem {
    pub fn now(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

impl ToolOutputItem {
    pub fn success(tool_call_id: impl Into<String>, output: Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            tool_call_id: tool_call_id.into(),
            output,
            error: None,
            created_at: Utc::now(),
        }
    }

    pub fn failure(tool_call_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            tool_call_id: tool_call_id.into(),
            output: Value::Null,
            error: Some(error.into()),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_message_creation() {
        let sys_msg = Message::system("You are a helpful assistant");
        assert_eq!(sys_msg.role, Role::System);
        assert_eq!(sys_msg.content, "You are a helpful assistant");
        assert!(sys_msg.tool_call_id.is_none());

        let user_msg = Message::user("Hola, ¿cómo estás?");
        assert_eq!(user_msg.role, Role::User);

        let tool_msg = Message::tool("Result", "call_123");
        assert_eq!(tool_msg.role, Role::Tool);
        assert_eq!(tool_msg.tool_call_id, Some("call_123".to_string()));
    }

    #[test]
    fn test_model_response() {
        let response = ModelResponse::new_message("Hello, how can I help?");
        assert!(response.has_content());
        assert!(!response.has_tool_calls());

        let tool_call = ToolCall {
            id: "call_1".to_string(),
            name: "get_weather".to_string(),
            arguments: serde_json::json!({"city": "Tokyo"}),
        };

        let tool_response = ModelResponse::new_tool_calls(vec![tool_call]);
        assert!(!tool_response.has_content());
        assert!(tool_response.has_tool_calls());
        assert_eq!(tool_response.tool_calls.len(), 1);
    }

    #[test]
    fn test_empty_content_is_not_content() {
        let mut response = ModelResponse::new_message("");
        assert!(!response.has_content());
        response.content = None;
        assert!(!response.has_content());
    }

    #[test]
    fn test_run_item_serialization() {
        let msg_item = RunItem::Message(MessageItem::now(Role::User, "Hello"));
        let serialized = serde_json::to_string(&msg_item).unwrap();
        assert!(serialized.contains("\"type\":\"Message\""));

        let handoff = RunItem::Handoff(HandoffItem {
            id: "handoff_1".to_string(),
            from_agent: "Triage".to_string(),
            to_agent: "Spanish".to_string(),
            reason: Some("Spanish-language request".to_string()),
            created_at: Utc::now(),
        });
        let serialized = serde_json::to_string(&handoff).unwrap();
        assert!(serialized.contains("\"type\":\"Handoff\""));
        assert!(serialized.contains("\"from_agent\":\"Triage\""));
    }

    #[test]
    fn test_tool_output_constructors() {
        let ok = ToolOutputItem::success("call_1", serde_json::json!("sunny"));
        assert!(ok.error.is_none());
        assert_eq!(ok.tool_call_id, "call_1");

        let bad = ToolOutputItem::failure("call_2", "boom");
        assert!(bad.output.is_null());
        assert_eq!(bad.error, Some("boom".to_string()));
    }

    #[test]
    fn test_role_serialization() {
        let serialized = serde_json::to_string(&Role::Assistant).unwrap();
        assert_eq!(serialized, "\"assistant\"");

        let deserialized: Role = serde_json::from_str("\"system\"").unwrap();
        assert_eq!(deserialized, Role::System);
    }
}
