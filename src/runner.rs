//! Run coordination
//!
//! The [`Runner`] drives an agent run: it asks the bound model for a
//! completion, executes requested tool calls, resolves handoffs to other
//! agents, and terminates when the model produces a final answer. One run is
//! strictly sequential; concurrency only exists across independent runs,
//! which share agents and tools read-only.

use std::sync::{Arc, Mutex};

use async_openai::{config::OpenAIConfig, Client};
use tracing::{debug, info};

use crate::agent::Agent;
use crate::config::ClientConfig;
use crate::error::{AgentError, Result};
use crate::handoff::HANDOFF_TOOL_PREFIX;
use crate::items::{
    HandoffItem, Message, MessageItem, Role, RunItem, ToolCallItem, ToolOutputItem, TurnAction,
};
use crate::model::{ModelProvider, OpenAIProvider};
use crate::result::RunResult;
use crate::tool::ToolInvoker;
use crate::tracing::{AgentSpan, GenerationSpan, ToolSpan, TracingContext};
use crate::usage::UsageStats;

fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() > max {
        let mut out: String = s.chars().take(max).collect();
        out.push('…');
        out
    } else {
        s.to_string()
    }
}

fn format_messages_for_log(messages: &[Message]) -> String {
    messages
        .iter()
        .enumerate()
        .map(|(idx, m)| {
            let role = match m.role {
                Role::User => "USER",
                Role::System => "SYSTEM",
                Role::Assistant => "ASSIST",
                Role::Tool => "TOOL",
            };
            let calls = m
                .tool_calls
                .as_ref()
                .map(|tcs| {
                    let names: Vec<&str> = tcs.iter().map(|tc| tc.name.as_str()).collect();
                    format!(" tool_calls=[{}]", names.join(", "))
                })
                .unwrap_or_default();
            format!(
                "{:02} {:7}|{} {}",
                idx,
                role,
                calls,
                truncate_for_log(&m.content, 120)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Configuration for one run.
///
/// All knobs have documented defaults:
///
/// - `max_steps`: **10** model calls before the run fails with the step-limit
///   error.
/// - `strict_tools`: **true** — tool arguments that violate the declared
///   schema abort the run; when false the mismatch is surfaced to the model
///   as a tool-error string instead.
/// - `case_insensitive_handoffs`: **false** — handoff target names match
///   exactly.
/// - `trace_enabled`: **true** — collect spans for the run.
#[derive(Clone)]
pub struct RunConfig {
    /// Maximum number of model calls per run
    pub max_steps: usize,

    /// Abort on schema-violating tool arguments instead of telling the model
    pub strict_tools: bool,

    /// Match handoff target names ignoring ASCII case
    pub case_insensitive_handoffs: bool,

    /// Collect trace spans for this run
    pub trace_enabled: bool,

    /// Default client for agents bound to a named model. Built from the
    /// environment at run start when absent and needed.
    pub client: Option<Arc<Client<OpenAIConfig>>>,

    /// Overrides every agent's model binding; used by tests and custom
    /// transports.
    pub model_provider: Option<Arc<dyn ModelProvider>>,
}

impl std::fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunConfig")
            .field("max_steps", &self.max_steps)
            .field("strict_tools", &self.strict_tools)
            .field("case_insensitive_handoffs", &self.case_insensitive_handoffs)
            .field("trace_enabled", &self.trace_enabled)
            .field("client", &self.client.is_some())
            .field("model_provider", &self.model_provider.is_some())
            .finish()
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_steps: 10,
            strict_tools: true,
            case_insensitive_handoffs: false,
            trace_enabled: true,
            client: None,
            model_provider: None,
        }
    }
}

impl RunConfig {
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps.max(1);
        self
    }

    pub fn with_strict_tools(mut self, strict: bool) -> Self {
        self.strict_tools = strict;
        self
    }

    pub fn with_case_insensitive_handoffs(mut self, enabled: bool) -> Self {
        self.case_insensitive_handoffs = enabled;
        self
    }

    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.trace_enabled = enabled;
        self
    }

    pub fn with_client(mut self, client: Arc<Client<OpenAIConfig>>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn with_model_provider(mut self, provider: Arc<dyn ModelProvider>) -> Self {
        self.model_provider = Some(provider);
        self
    }
}

/// Executes agents.
///
/// - [`run`](Self::run) is the async entry point; it suspends only while
///   awaiting the model or a tool, so dropping the returned future at one of
///   those points cancels the run and discards its partial history.
/// - [`run_sync`](Self::run_sync) blocks the calling thread on a private
///   runtime.
///
/// The runner itself is stateless; any number of runs may execute
/// concurrently against the same agents.
pub struct Runner;

impl Runner {
    /// Runs `agent` on `input` until the model produces a final answer.
    pub async fn run(agent: Agent, input: impl Into<String>, config: RunConfig) -> Result<RunResult> {
        let input = input.into();
        info!(agent = %agent.name(), "Starting agent run");

        let context = Arc::new(Mutex::new(if config.trace_enabled {
            TracingContext::new()
        } else {
            TracingContext::disabled()
        }));

        // The system message is rebuilt per step from the current agent, so
        // the history itself starts with the user input alone.
        let messages = vec![Message::user(input)];

        Self::run_loop(agent, messages, config, context).await
    }

    /// Blocking variant of [`run`](Self::run); builds its own runtime.
    pub fn run_sync(agent: Agent, input: impl Into<String>, config: RunConfig) -> Result<RunResult> {
        let runtime = tokio::runtime::Runtime::new()?;
        runtime.block_on(Self::run(agent, input, config))
    }

    /// Resolves the provider for the current agent's turn.
    fn provider_for(
        agent: &Agent,
        config: &RunConfig,
        default_client: &Option<Arc<Client<OpenAIConfig>>>,
    ) -> Result<Arc<dyn ModelProvider>> {
        if let Some(provider) = &config.model_provider {
            return Ok(provider.clone());
        }

        match &agent.config.model {
            crate::agent::ModelBinding::Named(_) => {
                let client = default_client.as_ref().ok_or_else(|| {
                    AgentError::Configuration(
                        "no default client available for a named model binding".to_string(),
                    )
                })?;
                Ok(Arc::new(OpenAIProvider::for_binding(
                    &agent.config.model,
                    client,
                )))
            }
            crate::agent::ModelBinding::Client { client, model } => {
                Ok(Arc::new(OpenAIProvider::new(client.clone(), model.clone())))
            }
        }
    }

    /// Whether any agent reachable from `agent` resolves against the default
    /// client.
    fn needs_default_client(agent: &Agent) -> bool {
        if matches!(agent.config.model, crate::agent::ModelBinding::Named(_)) {
            return true;
        }
        agent
            .handoffs()
            .iter()
            .any(|h| Self::needs_default_client(h.agent()))
    }

    /// Classifies a model response into the single action the loop takes.
    fn classify(agent: &Agent, response: &crate::items::ModelResponse, config: &RunConfig) -> Result<TurnAction> {
        if let Some(call) = response
            .tool_calls
            .iter()
            .find(|tc| tc.name.starts_with(HANDOFF_TOOL_PREFIX))
        {
            if let Some(handoff) = agent
                .handoffs()
                .iter()
                .find(|h| h.matches_tool(&call.name, config.case_insensitive_handoffs))
            {
                return Ok(TurnAction::Handoff {
                    target: handoff.name.clone(),
                    call: call.clone(),
                });
            }
            return Err(AgentError::InvalidHandoff {
                from: agent.name().to_string(),
                target: call
                    .name
                    .trim_start_matches(HANDOFF_TOOL_PREFIX)
                    .to_string(),
            });
        }

        if response.has_tool_calls() {
            return Ok(TurnAction::ToolCalls(response.tool_calls.clone()));
        }

        Ok(TurnAction::Final(
            response.content.clone().unwrap_or_default(),
        ))
    }

    async fn run_loop(
        mut agent: Agent,
        mut messages: Vec<Message>,
        config: RunConfig,
        context: Arc<Mutex<TracingContext>>,
    ) -> Result<RunResult> {
        let mut items: Vec<RunItem> = Vec::new();
        let mut usage_stats = UsageStats::new();
        let mut step_count = 0usize;

        // Fail fast on a missing credential before the first model call.
        let default_client = match &config.client {
            Some(client) => Some(client.clone()),
            None if config.model_provider.is_none() && Self::needs_default_client(&agent) => {
                Some(ClientConfig::from_env()?.build_client()?)
            }
            None => None,
        };

        let invoker = if config.strict_tools {
            ToolInvoker::strict()
        } else {
            ToolInvoker::lenient()
        };

        loop {
            step_count += 1;
            if step_count > config.max_steps {
                return Err(AgentError::StepLimitExceeded {
                    max_steps: config.max_steps,
                });
            }

            debug!(step = step_count, agent = %agent.name(), "Starting step");

            let agent_span = AgentSpan::new(
                context.clone(),
                agent.name().to_string(),
                agent.instructions().to_string(),
            );

            // Advertise regular tools plus handoffs disguised as tools.
            let mut advertised: Vec<Arc<dyn crate::tool::Tool>> = agent.config.tools.clone();
            for handoff in agent.handoffs() {
                advertised.push(Arc::new(crate::handoff::HandoffTool::from(handoff)));
            }

            // History plus the current agent's instructions; after a handoff
            // the new agent's system message takes over.
            let mut turn_messages = Vec::with_capacity(messages.len() + 1);
            turn_messages.push(agent.build_system_message());
            turn_messages.extend(messages.iter().cloned());

            debug!(
                target: "runner::messages",
                "\n=== Sending to provider (model: {}) ===\n{}\n=== end ===",
                agent.config.model.model_name(),
                format_messages_for_log(&turn_messages)
            );

            let provider = Self::provider_for(&agent, &config, &default_client)?;
            let gen_span =
                GenerationSpan::new(context.clone(), agent.config.model.model_name().to_string());

            let (response, usage) = match provider
                .complete(
                    turn_messages,
                    advertised,
                    agent.config.temperature,
                    agent.config.max_tokens,
                )
                .await
            {
                Ok(ok) => ok,
                Err(e) => {
                    gen_span.error(e.to_string());
                    return Err(e);
                }
            };

            gen_span.complete_with_usage(usage.clone());
            usage_stats.record(agent.config.model.model_name(), agent.name(), usage);

            match Self::classify(&agent, &response, &config)? {
                TurnAction::Final(text) => {
                    messages.push(Message::assistant(&text));
                    items.push(RunItem::Message(MessageItem::now(Role::Assistant, &text)));

                    agent_span.complete();
                    let trace_id = context.lock().unwrap().trace_id().to_string();
                    return Ok(RunResult::new(
                        text,
                        items,
                        agent.name().to_string(),
                        usage_stats,
                        trace_id,
                    ));
                }

                TurnAction::Handoff { target, call } => {
                    let reason = call
                        .arguments
                        .get("reason")
                        .and_then(|r| r.as_str())
                        .map(str::to_string);

                    messages.push(Message::assistant_with_tool_calls(
                        response.content.clone().unwrap_or_default(),
                        vec![call.clone()],
                    ));
                    items.push(RunItem::ToolCall(ToolCallItem {
                        id: call.id.clone(),
                        tool_name: call.name.clone(),
                        arguments: call.arguments.clone(),
                        created_at: chrono::Utc::now(),
                    }));

                    let handoff = agent
                        .handoffs()
                        .iter()
                        .find(|h| h.name == target)
                        .cloned()
                        .ok_or_else(|| AgentError::InvalidHandoff {
                            from: agent.name().to_string(),
                            target: target.clone(),
                        })?;

                    info!(from = %agent.name(), to = %handoff.name, "Handoff");
                    context.lock().unwrap().record_handoff(
                        agent.name(),
                        &handoff.name,
                        reason.clone(),
                    );

                    items.push(RunItem::Handoff(HandoffItem {
                        id: uuid::Uuid::new_v4().to_string(),
                        from_agent: agent.name().to_string(),
                        to_agent: handoff.name.clone(),
                        reason,
                        created_at: chrono::Utc::now(),
                    }));

                    // Acknowledge the transfer call so the conversation stays
                    // well-formed for the next agent.
                    let ack = serde_json::json!({ "handoff": handoff.name, "ack": true });
                    messages.push(Message::tool(ack.to_string(), &call.id));
                    items.push(RunItem::ToolOutput(ToolOutputItem::success(
                        &call.id, ack,
                    )));

                    agent_span.complete();
                    agent = handoff.agent().clone();
                }

                TurnAction::ToolCalls(calls) => {
                    messages.push(Message::assistant_with_tool_calls(
                        response.content.clone().unwrap_or_default(),
                        calls.clone(),
                    ));
                    if response.has_content() {
                        items.push(RunItem::Message(MessageItem::now(
                            Role::Assistant,
                            response.content.clone().unwrap_or_default(),
                        )));
                    }

                    // Strictly sequential: each call completes before the next
                    // one starts.
                    for call in &calls {
                        items.push(RunItem::ToolCall(ToolCallItem {
                            id: call.id.clone(),
                            tool_name: call.name.clone(),
                            arguments: call.arguments.clone(),
                            created_at: chrono::Utc::now(),
                        }));

                        let Some(tool) = agent
                            .tools()
                            .iter()
                            .find(|t| t.name() == call.name)
                            .cloned()
                        else {
                            messages.push(Message::tool(
                                format!("Error: unknown tool '{}'", call.name),
                                &call.id,
                            ));
                            items.push(RunItem::ToolOutput(ToolOutputItem::failure(
                                &call.id,
                                format!("unknown tool '{}'", call.name),
                            )));
                            continue;
                        };

                        let span = ToolSpan::new(
                            context.clone(),
                            call.name.clone(),
                            call.arguments.clone(),
                        );

                        let result = match invoker.invoke(&tool, call.arguments.clone()).await {
                            Ok(result) => result,
                            Err(e) => {
                                span.error(e.to_string());
                                return Err(e);
                            }
                        };

                        if let Some(error) = &result.error {
                            span.error(error.clone());
                            messages.push(Message::tool(format!("Error: {}", error), &call.id));
                            items.push(RunItem::ToolOutput(ToolOutputItem::failure(
                                &call.id,
                                error.clone(),
                            )));
                        } else {
                            span.success();
                            let content = serde_json::to_string(&result.output)
                                .unwrap_or_else(|_| "null".to_string());
                            messages.push(Message::tool(content, &call.id));
                            items.push(RunItem::ToolOutput(ToolOutputItem::success(
                                &call.id,
                                result.output.clone(),
                            )));
                        }
                    }

                    debug!(
                        target: "runner::messages",
                        "\n↳ Appended tool replies\n{}\n---",
                        format_messages_for_log(&messages)
                    );

                    agent_span.complete();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handoff::Handoff;
    use crate::items::{ModelResponse, ToolCall};
    use crate::model::MockProvider;
    use crate::tool::FunctionTool;

    fn provider_config(provider: MockProvider) -> RunConfig {
        RunConfig::default().with_model_provider(Arc::new(provider))
    }

    #[tokio::test]
    async fn test_simple_run_terminates_after_one_call() {
        let agent = Agent::simple("TestAgent", "You are a test agent");
        let provider = MockProvider::new("test-model").with_message("Hello! How can I help you?");

        let result = Runner::run(agent, "Hi", provider_config(provider))
            .await
            .unwrap();

        assert_eq!(result.final_output, "Hello! How can I help you?");
        assert_eq!(result.final_agent, "TestAgent");
        // one model call recorded
        assert_eq!(result.usage.total.request_count, 1);
    }

    #[test]
    fn test_run_sync() {
        let agent = Agent::simple("SyncAgent", "Sync test agent");
        let provider = MockProvider::new("test-model").with_message("Sync response");

        let result = Runner::run_sync(agent, "Test", provider_config(provider)).unwrap();
        assert_eq!(result.final_output, "Sync response");
    }

    #[tokio::test]
    async fn test_run_with_tool_call() {
        let tool = Arc::new(FunctionTool::simple(
            "uppercase",
            "Converts to uppercase",
            |s: String| s.to_uppercase(),
        ));
        let agent = Agent::simple("ToolAgent", "Use tools when needed").with_tool(tool);

        let provider = MockProvider::new("test-model")
            .with_tool_call("uppercase", serde_json::json!({"input": "hello"}))
            .with_message("The result is: HELLO");

        let result = Runner::run(agent, "Make 'hello' uppercase", provider_config(provider))
            .await
            .unwrap();

        assert_eq!(result.final_output, "The result is: HELLO");
        assert_eq!(result.tool_outputs().len(), 1);
        assert_eq!(
            result.tool_outputs()[0].output,
            serde_json::json!("HELLO")
        );
    }

    #[tokio::test]
    async fn test_step_limit_exceeded() {
        let tool = Arc::new(FunctionTool::simple("noop", "Does nothing", |s| s));
        let agent = Agent::simple("Loopy", "Calls tools forever").with_tool(tool);

        // Every step requests another tool call; the limit must fire.
        let mut provider = MockProvider::new("test-model");
        for _ in 0..5 {
            provider = provider.with_tool_call("noop", serde_json::json!({"input": "x"}));
        }

        let config = provider_config(provider).with_max_steps(3);
        let err = Runner::run(agent, "Go", config).await.unwrap_err();

        assert!(matches!(err, AgentError::StepLimitExceeded { max_steps: 3 }));
    }

    #[tokio::test]
    async fn test_handoff_switches_agent() {
        let spanish = Agent::simple("Spanish agent", "You only speak Spanish.");
        let triage = Agent::simple("Triage agent", "Route by language")
            .with_handoff(Handoff::new(spanish, "Spanish-language requests"));

        let transfer = ToolCall {
            id: "call_1".to_string(),
            name: "transfer_to_spanish_agent".to_string(),
            arguments: serde_json::json!({"reason": "Spanish input"}),
        };
        let provider = MockProvider::new("test-model")
            .with_response(ModelResponse::new_tool_calls(vec![transfer]))
            .with_message("¡Estoy bien, gracias!");

        let result = Runner::run(triage, "Hola, ¿cómo estás?", provider_config(provider))
            .await
            .unwrap();

        assert_eq!(result.final_output, "¡Estoy bien, gracias!");
        assert_eq!(result.final_agent, "Spanish agent");
        assert_eq!(result.handoffs().len(), 1);
        assert_eq!(result.handoffs()[0].from_agent, "Triage agent");
        assert_eq!(
            result.handoffs()[0].reason.as_deref(),
            Some("Spanish input")
        );
    }

    #[tokio::test]
    async fn test_invalid_handoff_fails() {
        let triage = Agent::simple("Triage agent", "Route by language");

        let transfer = ToolCall {
            id: "call_1".to_string(),
            name: "transfer_to_french_agent".to_string(),
            arguments: serde_json::json!({}),
        };
        let provider = MockProvider::new("test-model")
            .with_response(ModelResponse::new_tool_calls(vec![transfer]));

        let err = Runner::run(triage, "Bonjour", provider_config(provider))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AgentError::InvalidHandoff { ref from, ref target }
                if from == "Triage agent" && target == "french_agent"
        ));
    }

    #[tokio::test]
    async fn test_case_insensitive_handoff_matching() {
        let support = Agent::simple("Support", "Helps users");
        let triage = Agent::simple("Triage", "Routes")
            .with_handoff(Handoff::new(support, "Support requests"));

        let transfer = ToolCall {
            id: "call_1".to_string(),
            name: "transfer_to_Support".to_string(),
            arguments: serde_json::json!({}),
        };
        let provider = MockProvider::new("test-model")
            .with_response(ModelResponse::new_tool_calls(vec![transfer]))
            .with_message("Happy to help");

        let config = provider_config(provider).with_case_insensitive_handoffs(true);
        let result = Runner::run(triage, "help", config).await.unwrap();

        assert_eq!(result.final_agent, "Support");
    }

    #[tokio::test]
    async fn test_unknown_tool_surfaces_error_to_model() {
        let agent = Agent::simple("Agent", "Use tools");

        let call = ToolCall {
            id: "call_1".to_string(),
            name: "nonexistent".to_string(),
            arguments: serde_json::json!({}),
        };
        let provider = MockProvider::new("test-model")
            .with_response(ModelResponse::new_tool_calls(vec![call]))
            .with_message("ok");

        let result = Runner::run(agent, "Run", provider_config(provider))
            .await
            .unwrap();

        let outputs = result.tool_outputs();
        assert_eq!(outputs.len(), 1);
        assert!(outputs[0].error.as_deref().unwrap().contains("unknown tool"));
        assert_eq!(result.final_output, "ok");
    }

    #[tokio::test]
    async fn test_strict_validation_aborts_run() {
        let tool = Arc::new(FunctionTool::simple("echo", "Echoes", |s| s));
        let agent = Agent::simple("Agent", "Use tools").with_tool(tool);

        let provider = MockProvider::new("test-model")
            .with_tool_call("echo", serde_json::json!({"wrong_field": 1}));

        let err = Runner::run(agent, "Run", provider_config(provider))
            .await
            .unwrap_err();

        assert!(matches!(err, AgentError::Validation { ref tool, .. } if tool == "echo"));
    }

    #[tokio::test]
    async fn test_lenient_validation_continues_run() {
        let tool = Arc::new(FunctionTool::simple("echo", "Echoes", |s| s));
        let agent = Agent::simple("Agent", "Use tools").with_tool(tool);

        let provider = MockProvider::new("test-model")
            .with_tool_call("echo", serde_json::json!({"wrong_field": 1}))
            .with_message("recovered");

        let config = provider_config(provider).with_strict_tools(false);
        let result = Runner::run(agent, "Run", config).await.unwrap();

        assert_eq!(result.final_output, "recovered");
        assert!(result.tool_outputs()[0].error.is_some());
    }

    #[tokio::test]
    async fn test_handler_error_does_not_abort_run() {
        let tool = Arc::new(FunctionTool::new(
            "failing".to_string(),
            "Always fails".to_string(),
            serde_json::json!({"type": "object"}),
            |_args| Err(AgentError::Other("boom".to_string())),
        ));
        let agent = Agent::simple("Agent", "Use tools").with_tool(tool);

        let provider = MockProvider::new("test-model")
            .with_tool_call("failing", serde_json::json!({}))
            .with_message("handled the failure");

        let result = Runner::run(agent, "Run", provider_config(provider))
            .await
            .unwrap();

        assert_eq!(result.final_output, "handled the failure");
        assert!(result.tool_outputs()[0]
            .error
            .as_deref()
            .unwrap()
            .contains("boom"));
    }

    #[tokio::test]
    async fn test_sequential_tool_calls_preserve_order() {
        let tool = Arc::new(FunctionTool::simple(
            "uppercase",
            "Converts to uppercase",
            |s: String| s.to_uppercase(),
        ));
        let agent = Agent::simple("Order", "Use tools").with_tool(tool);

        let tc1 = ToolCall {
            id: "call_a".to_string(),
            name: "uppercase".to_string(),
            arguments: serde_json::json!({"input": "a"}),
        };
        let tc2 = ToolCall {
            id: "call_b".to_string(),
            name: "uppercase".to_string(),
            arguments: serde_json::json!({"input": "b"}),
        };
        let provider = MockProvider::new("test-model")
            .with_response(ModelResponse::new_tool_calls(vec![tc1, tc2]))
            .with_message("ok");

        let result = Runner::run(agent, "Run", provider_config(provider))
            .await
            .unwrap();

        let outputs = result.tool_outputs();
        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs[0].output, serde_json::json!("A"));
        assert_eq!(outputs[1].output, serde_json::json!("B"));
    }

    #[tokio::test]
    async fn test_tracing_disabled_run_still_succeeds() {
        let agent = Agent::simple("Quiet", "No spans");
        let provider = MockProvider::new("test-model").with_message("done");

        let config = provider_config(provider).with_tracing(false);
        let result = Runner::run(agent, "Run", config).await.unwrap();

        assert_eq!(result.final_output, "done");
        assert!(!result.trace_id.is_empty());
    }
}
