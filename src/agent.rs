//! Agent definitions
//!
//! An [`Agent`] pairs a name and instructions with a model binding, an
//! ordered set of tools, and the handoff targets it may delegate to. Agents
//! are built once, then shared read-only across runs.

use std::sync::Arc;

use async_openai::{config::OpenAIConfig, Client};

use crate::handoff::Handoff;
use crate::items::Message;
use crate::tool::Tool;

/// How an agent reaches its model.
///
/// Either a model name resolved against the run's default client, or an
/// explicit client paired with a model name for agents that need their own
/// endpoint or credentials.
#[derive(Clone)]
pub enum ModelBinding {
    /// Model name, resolved by the run's default client
    Named(String),
    /// Explicit client and model name
    Client {
        client: Arc<Client<OpenAIConfig>>,
        model: String,
    },
}

impl ModelBinding {
    pub fn named(model: impl Into<String>) -> Self {
        Self::Named(model.into())
    }

    pub fn with_client(client: Arc<Client<OpenAIConfig>>, model: impl Into<String>) -> Self {
        Self::Client {
            client,
            model: model.into(),
        }
    }

    pub fn model_name(&self) -> &str {
        match self {
            Self::Named(model) => model,
            Self::Client { model, .. } => model,
        }
    }
}

impl std::fmt::Debug for ModelBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Named(model) => f.debug_tuple("Named").field(model).finish(),
            Self::Client { model, .. } => f
                .debug_struct("Client")
                .field("model", model)
                .finish_non_exhaustive(),
        }
    }
}

/// Complete configuration for an [`Agent`].
#[derive(Clone)]
pub struct AgentConfig {
    /// Name, used for identification, handoff targeting, and logs
    pub name: String,

    /// System instructions that set the agent's behavior
    pub instructions: String,

    /// Description used when this agent is a handoff target of another agent
    pub handoff_description: Option<String>,

    /// Tools the agent can call, in declaration order
    pub tools: Vec<Arc<dyn Tool>>,

    /// Agents this one may hand the conversation off to
    pub handoffs: Vec<Handoff>,

    /// Model binding used for this agent's turns
    pub model: ModelBinding,

    /// Sampling temperature for the model
    pub temperature: Option<f32>,

    /// Cap on generated tokens per response
    pub max_tokens: Option<u32>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: "Assistant".to_string(),
            instructions: "You are a helpful assistant.".to_string(),
            handoff_description: None,
            tools: vec![],
            handoffs: vec![],
            model: ModelBinding::Named("gpt-4o".to_string()),
            temperature: Some(1.0),
            max_tokens: None,
        }
    }
}

/// A named participant in a run: instructions, model binding, tools, and
/// handoff targets.
///
/// Agents are designed to be cloned and shared; all configuration happens
/// before a run starts and is read-only afterwards.
///
/// ## Example
///
/// ```rust
/// use agent_relay::{Agent, tool::FunctionTool};
/// use std::sync::Arc;
///
/// let weather_tool = Arc::new(FunctionTool::simple(
///     "get_weather",
///     "Gets the current weather for a city.",
///     |city: String| format!("The weather in {} is 75 degrees and sunny.", city),
/// ));
///
/// let agent = Agent::simple("Weather agent", "You only respond in haikus.")
///     .with_model("gpt-3.5-turbo")
///     .with_tool(weather_tool);
///
/// assert_eq!(agent.config.model.model_name(), "gpt-3.5-turbo");
/// assert_eq!(agent.tools().len(), 1);
/// ```
#[derive(Clone)]
pub struct Agent {
    pub config: AgentConfig,
}

impl Agent {
    pub fn new(config: AgentConfig) -> Self {
        Self { config }
    }

    /// Creates an agent from just a name and instructions; everything else
    /// takes its default.
    pub fn simple(name: impl Into<String>, instructions: impl Into<String>) -> Self {
        Self::new(AgentConfig {
            name: name.into(),
            instructions: instructions.into(),
            ..Default::default()
        })
    }

    /// Binds the agent to a named model, resolved by the run's default client.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.config.model = ModelBinding::Named(model.into());
        self
    }

    /// Binds the agent to an explicit client and model.
    pub fn with_client_model(
        mut self,
        client: Arc<Client<OpenAIConfig>>,
        model: impl Into<String>,
    ) -> Self {
        self.config.model = ModelBinding::with_client(client, model);
        self
    }

    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.config.tools.push(tool);
        self
    }

    pub fn with_tools(mut self, tools: Vec<Arc<dyn Tool>>) -> Self {
        self.config.tools.extend(tools);
        self
    }

    pub fn with_handoff(mut self, handoff: Handoff) -> Self {
        self.config.handoffs.push(handoff);
        self
    }

    pub fn with_handoffs(mut self, handoffs: Vec<Handoff>) -> Self {
        self.config.handoffs.extend(handoffs);
        self
    }

    pub fn with_handoff_description(mut self, description: impl Into<String>) -> Self {
        self.config.handoff_description = Some(description.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.config.max_tokens = Some(max_tokens);
        self
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn instructions(&self) -> &str {
        &self.config.instructions
    }

    pub fn tools(&self) -> &[Arc<dyn Tool>] {
        &self.config.tools
    }

    pub fn handoffs(&self) -> &[Handoff] {
        &self.config.handoffs
    }

    pub fn has_tools(&self) -> bool {
        !self.config.tools.is_empty()
    }

    pub fn has_handoffs(&self) -> bool {
        !self.config.handoffs.is_empty()
    }

    /// Builds the system message for this agent.
    ///
    /// Includes the instructions plus short listings of the available tools
    /// and handoff targets so the model knows what it can call.
    pub fn build_system_message(&self) -> Message {
        let mut content = self.config.instructions.clone();

        if !self.config.tools.is_empty() {
            content.push_str("\n\nYou have access to the following tools:\n");
            for tool in &self.config.tools {
                content.push_str(&format!("- {}: {}\n", tool.name(), tool.description()));
            }
        }

        if !self.config.handoffs.is_empty() {
            content.push_str("\n\nYou can hand off to the following agents:\n");
            for handoff in &self.config.handoffs {
                content.push_str(&format!(
                    "- {} (call {}): {}\n",
                    handoff.name,
                    handoff.tool_name(),
                    handoff.description
                ));
            }
        }

        Message::system(content)
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.config.name)
            .field("model", &self.config.model.model_name())
            .field("tools_count", &self.config.tools.len())
            .field("handoffs_count", &self.config.handoffs.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handoff::Handoff;
    use crate::tool::FunctionTool;

    #[test]
    fn test_agent_creation() {
        let agent = Agent::simple("TestAgent", "You are a test agent");
        assert_eq!(agent.name(), "TestAgent");
        assert_eq!(agent.instructions(), "You are a test agent");
        assert_eq!(agent.config.model.model_name(), "gpt-4o");
    }

    #[test]
    fn test_agent_builder() {
        let tool = Arc::new(FunctionTool::simple(
            "test_tool",
            "A test tool",
            |s: String| s.to_uppercase(),
        ));

        let agent = Agent::simple("Builder", "Test instructions")
            .with_model("gpt-3.5-turbo")
            .with_temperature(0.5)
            .with_max_tokens(1000)
            .with_tool(tool);

        assert_eq!(agent.config.model.model_name(), "gpt-3.5-turbo");
        assert_eq!(agent.config.temperature, Some(0.5));
        assert_eq!(agent.config.max_tokens, Some(1000));
        assert!(agent.has_tools());
    }

    #[test]
    fn test_explicit_client_binding() {
        let client = Arc::new(Client::<OpenAIConfig>::new());
        let agent =
            Agent::simple("English agent", "You only speak English").with_client_model(client, "gpt-4o");

        assert!(matches!(agent.config.model, ModelBinding::Client { .. }));
        assert_eq!(agent.config.model.model_name(), "gpt-4o");
    }

    #[test]
    fn test_agent_with_handoffs() {
        let spanish = Agent::simple("Spanish", "Speaks Spanish");
        let english = Agent::simple("English", "Speaks English");

        let triage = Agent::simple("Triage", "Routes requests").with_handoffs(vec![
            Handoff::new(spanish, "Handles Spanish requests"),
            Handoff::new(english, "Handles English requests"),
        ]);

        assert_eq!(triage.handoffs().len(), 2);
        assert!(triage.has_handoffs());
    }

    #[test]
    fn test_system_message_generation() {
        let tool = Arc::new(FunctionTool::simple(
            "get_weather",
            "Get weather information",
            |s: String| format!("Weather for {}", s),
        ));

        let helper = Agent::simple("Helper", "I help with tasks");
        let agent = Agent::simple("Main", "I am the main agent")
            .with_tool(tool)
            .with_handoff(Handoff::new(helper, "Handles complex tasks"));

        let sys_msg = agent.build_system_message();
        assert_eq!(sys_msg.role, crate::items::Role::System);
        assert!(sys_msg.content.contains("I am the main agent"));
        assert!(sys_msg.content.contains("get_weather"));
        assert!(sys_msg.content.contains("transfer_to_helper"));
    }

    #[test]
    fn test_agent_clone_and_debug() {
        let agent = Agent::simple("Original", "Original instructions");
        let cloned = agent.clone();
        assert_eq!(cloned.name(), "Original");

        let debug_str = format!("{:?}", agent);
        assert!(debug_str.contains("Original"));
        assert!(debug_str.contains("tools_count"));
    }
}
