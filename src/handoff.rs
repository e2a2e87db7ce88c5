//! Delegation of a run from one agent to another
//!
//! A handoff is advertised to the model as an ordinary tool named
//! `transfer_to_<agent>`; the run coordinator intercepts calls to these tools
//! and switches the active agent instead of executing anything.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::agent::Agent;
use crate::error::Result;
use crate::tool::{Tool, ToolResult};

/// Prefix of every handoff tool name
pub const HANDOFF_TOOL_PREFIX: &str = "transfer_to_";

/// Derives the tool name under which a handoff target is advertised.
pub fn handoff_tool_name(agent_name: &str) -> String {
    let mut slug = String::with_capacity(agent_name.len());
    for ch in agent_name.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else {
            slug.push('_');
        }
    }
    format!("{}{}", HANDOFF_TOOL_PREFIX, slug)
}

/// A potential handoff target: another agent the current one may delegate to.
#[derive(Clone)]
pub struct Handoff {
    /// Name of the target agent
    pub name: String,

    /// Description of the target's capabilities, advertised to the model
    pub description: String,

    /// The agent to hand off to
    pub agent: Arc<Agent>,
}

impl Handoff {
    /// Creates a handoff whose name is taken from the target agent.
    pub fn new(agent: Agent, description: impl Into<String>) -> Self {
        let name = agent.name().to_string();
        Self {
            name,
            description: description.into(),
            agent: Arc::new(agent),
        }
    }

    /// Creates a handoff with a name different from the target agent's.
    pub fn with_name(
        agent: Agent,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            agent: Arc::new(agent),
        }
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    /// The tool name under which this handoff is advertised.
    pub fn tool_name(&self) -> String {
        handoff_tool_name(&self.name)
    }

    /// Whether a transfer tool call targets this handoff.
    pub fn matches_tool(&self, tool_name: &str, case_insensitive: bool) -> bool {
        let own = self.tool_name();
        if case_insensitive {
            own.eq_ignore_ascii_case(tool_name)
        } else {
            own == tool_name
        }
    }
}

impl std::fmt::Debug for Handoff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handoff")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish()
    }
}

/// Adapter that exposes a handoff to the model provider as a tool.
#[derive(Clone, Debug)]
pub struct HandoffTool {
    tool_name: String,
    description: String,
}

impl From<&Handoff> for HandoffTool {
    fn from(h: &Handoff) -> Self {
        Self {
            tool_name: h.tool_name(),
            description: format!("Hand off the conversation to {}: {}", h.name, h.description),
        }
    }
}

#[async_trait]
impl Tool for HandoffTool {
    fn name(&self) -> &str {
        &self.tool_name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "reason": {"type": "string", "description": "Reason for the handoff"}
            }
        })
    }

    async fn execute(&self, _arguments: Value) -> Result<ToolResult> {
        // Never executed directly; the run coordinator intercepts these calls.
        Ok(ToolResult::success(serde_json::json!({"handoff": true})))
    }
}

/// Context passed along when a handoff occurs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandoffData {
    /// Agent initiating the handoff
    pub from_agent: String,

    /// Agent taking over
    pub to_agent: String,

    /// Optional explanation supplied by the model
    pub reason: Option<String>,
}

impl HandoffData {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from_agent: from.into(),
            to_agent: to.into(),
            reason: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}
