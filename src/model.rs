//! Model capability abstraction
//!
//! Wraps the async-openai client behind the [`ModelProvider`] trait so the
//! run coordinator depends on a completion contract rather than a vendor
//! request shape. Tests swap in a scripted provider.

use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestToolMessageArgs,
        ChatCompletionRequestUserMessageArgs, ChatCompletionTool, ChatCompletionToolArgs,
        ChatCompletionToolType, CreateChatCompletionRequestArgs, FunctionObjectArgs,
    },
    Client,
};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::agent::ModelBinding;
use crate::error::{AgentError, Result};
use crate::items::{Message, ModelResponse, Role, ToolCall};
use crate::tool::Tool;
use crate::usage::Usage;

/// The completion capability a run depends on.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Asks the model for the next response given the conversation so far
    /// and the advertised tools.
    async fn complete(
        &self,
        messages: Vec<Message>,
        tools: Vec<Arc<dyn Tool>>,
        temperature: Option<f32>,
        max_tokens: Option<u32>,
    ) -> Result<(ModelResponse, Usage)>;

    /// Model name this provider is bound to
    fn model_name(&self) -> &str;
}

/// OpenAI-backed provider using async-openai
pub struct OpenAIProvider {
    client: Arc<Client<OpenAIConfig>>,
    model: String,
}

impl OpenAIProvider {
    pub fn new(client: Arc<Client<OpenAIConfig>>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    /// Resolves an agent's model binding against a default client.
    pub fn for_binding(binding: &ModelBinding, default_client: &Arc<Client<OpenAIConfig>>) -> Self {
        match binding {
            ModelBinding::Named(model) => Self::new(default_client.clone(), model.clone()),
            ModelBinding::Client { client, model } => Self::new(client.clone(), model.clone()),
        }
    }

    fn convert_message(&self, msg: &Message) -> ChatCompletionRequestMessage {
        match msg.role {
            Role::System => ChatCompletionRequestSystemMessageArgs::default()
                .content(msg.content.clone())
                .build()
                .unwrap()
                .into(),
            Role::User => ChatCompletionRequestUserMessageArgs::default()
                .content(msg.content.clone())
                .build()
                .unwrap()
                .into(),
            Role::Assistant => {
                let mut builder = ChatCompletionRequestAssistantMessageArgs::default();
                builder.content(msg.content.clone());

                if let Some(tool_calls) = &msg.tool_calls {
                    let openai_tool_calls: Vec<_> = tool_calls
                        .iter()
                        .map(|tc| async_openai::types::ChatCompletionMessageToolCall {
                            id: tc.id.clone(),
                            r#type: ChatCompletionToolType::Function,
                            function: async_openai::types::FunctionCall {
                                name: tc.name.clone(),
                                arguments: tc.arguments.to_string(),
                            },
                        })
                        .collect();
                    builder.tool_calls(openai_tool_calls);
                }

                builder.build().unwrap().into()
            }
            Role::Tool => ChatCompletionRequestToolMessageArgs::default()
                .content(msg.content.clone())
                .tool_call_id(msg.tool_call_id.clone().unwrap_or_default())
                .build()
                .unwrap()
                .into(),
        }
    }

    fn convert_tools(&self, tools: &[Arc<dyn Tool>]) -> Vec<ChatCompletionTool> {
        tools
            .iter()
            .map(|tool| {
                ChatCompletionToolArgs::default()
                    .r#type(ChatCompletionToolType::Function)
                    .function(
                        FunctionObjectArgs::default()
                            .name(tool.name())
                            .description(tool.description())
                            .parameters(tool.parameters_schema())
                            .build()
                            .unwrap(),
                    )
                    .build()
                    .unwrap()
            })
            .collect()
    }
}

#[async_trait]
impl ModelProvider for OpenAIProvider {
    async fn complete(
        &self,
        messages: Vec<Message>,
        tools: Vec<Arc<dyn Tool>>,
        temperature: Option<f32>,
        max_tokens: Option<u32>,
    ) -> Result<(ModelResponse, Usage)> {
        let openai_messages: Vec<ChatCompletionRequestMessage> = messages
            .iter()
            .map(|msg| self.convert_message(msg))
            .collect();

        let mut request = CreateChatCompletionRequestArgs::default();
        request.model(&self.model).messages(openai_messages);

        if !tools.is_empty() {
            request.tools(self.convert_tools(&tools));
        }

        if let Some(temp) = temperature {
            request.temperature(temp);
        }

        if let Some(max) = max_tokens {
            request.max_tokens(max);
        }

        let response = self.client.chat().create(request.build()?).await?;

        let choice = response
            .choices
            .first()
            .ok_or_else(|| AgentError::ModelBehavior {
                message: "no choices in response".to_string(),
            })?;

        let tool_calls = if let Some(tool_calls) = &choice.message.tool_calls {
            tool_calls
                .iter()
                .map(|tc| ToolCall {
                    id: tc.id.clone(),
                    name: tc.function.name.clone(),
                    arguments: serde_json::from_str(&tc.function.arguments).unwrap_or(Value::Null),
                })
                .collect()
        } else {
            vec![]
        };

        let model_response = ModelResponse {
            id: response.id.clone(),
            content: choice.message.content.clone(),
            tool_calls,
            finish_reason: choice.finish_reason.as_ref().map(|r| format!("{:?}", r)),
            created_at: chrono::Utc::now(),
        };

        let usage = if let Some(usage) = response.usage {
            Usage::new(
                usage.prompt_tokens as usize,
                usage.completion_tokens as usize,
            )
        } else {
            Usage::empty()
        };

        Ok((model_response, usage))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Scripted provider for unit tests: plays back queued responses in order.
#[cfg(test)]
pub struct MockProvider {
    model: String,
    responses: std::sync::Mutex<Vec<ModelResponse>>,
}

#[cfg(test)]
impl MockProvider {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            responses: std::sync::Mutex::new(vec![]),
        }
    }

    pub fn with_response(self, response: ModelResponse) -> Self {
        self.responses.lock().unwrap().push(response);
        self
    }

    pub fn with_message(self, content: impl Into<String>) -> Self {
        self.with_response(ModelResponse::new_message(content))
    }

    pub fn with_tool_call(self, tool_name: impl Into<String>, args: Value) -> Self {
        let tool_call = ToolCall {
            id: uuid::Uuid::new_v4().to_string(),
            name: tool_name.into(),
            arguments: args,
        };
        self.with_response(ModelResponse::new_tool_calls(vec![tool_call]))
    }
}

#[cfg(test)]
#[async_trait]
impl ModelProvider for MockProvider {
    async fn complete(
        &self,
        _messages: Vec<Message>,
        _tools: Vec<Arc<dyn Tool>>,
        _temperature: Option<f32>,
        _max_tokens: Option<u32>,
    ) -> Result<(ModelResponse, Usage)> {
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            return Ok((
                ModelResponse::new_message("Default response"),
                Usage::new(10, 5),
            ));
        }

        let response = responses.remove(0);
        Ok((response, Usage::new(10, 5)))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
