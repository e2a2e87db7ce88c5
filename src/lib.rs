//! # agent-relay
//!
//! A lightweight multi-agent runtime for OpenAI chat models. An [`Agent`]
//! pairs instructions with a model binding, tools, and handoff targets; the
//! [`Runner`] drives the model-call / tool-call / handoff loop until a final
//! answer is produced.
//!
//! ## Core concepts
//!
//! - **Agent**: a named configuration of instructions, model binding, tools,
//!   and handoff targets, built once and shared read-only across runs.
//! - **Tool**: a callable capability with a declared JSON argument schema;
//!   arguments are validated before the handler runs, and handler failures
//!   are surfaced to the model instead of aborting the run.
//! - **Handoff**: a delegation of the run to another agent, triggered by the
//!   model calling a `transfer_to_<agent>` tool.
//! - **Registry**: name-keyed lookup of agent definitions with immutable
//!   snapshots for concurrent runs.
//!
//! ## Getting started
//!
//! Set `OPENAI_API_KEY` in the environment (or pass a [`ClientConfig`]
//! explicitly), then:
//!
//! ```rust,no_run
//! use agent_relay::{Agent, Handoff, Runner, RunConfig};
//!
//! # async fn example() -> agent_relay::Result<()> {
//! let spanish = Agent::simple("Spanish agent", "You only speak Spanish.")
//!     .with_model("o3-mini");
//!
//! let triage = Agent::simple(
//!     "Triage agent",
//!     "Handoff to the appropriate agent based on the language of the request.",
//! )
//! .with_model("gpt-3.5-turbo")
//! .with_handoff(Handoff::new(spanish, "Handles Spanish-language requests"));
//!
//! let result = Runner::run(triage, "Hola, ¿cómo estás?", RunConfig::default()).await?;
//! println!("{}", result.final_output);
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod config;
pub mod error;
pub mod handoff;
pub mod items;
pub mod model;
pub mod registry;
pub mod result;
pub mod runner;
pub mod tool;
pub mod tracing;
pub mod usage;

pub use agent::{Agent, AgentConfig, ModelBinding};
pub use config::ClientConfig;
pub use error::{AgentError, Result};
pub use handoff::{Handoff, HandoffData};
pub use items::{Message, ModelResponse, Role, RunItem, ToolCall, TurnAction};
pub use model::{ModelProvider, OpenAIProvider};
pub use registry::{AgentRegistry, RegistrySnapshot};
pub use result::RunResult;
pub use runner::{RunConfig, Runner};
pub use tool::{FunctionTool, Tool, ToolInvoker, ToolResult};
pub use usage::{Usage, UsageStats};

// Re-export the vendor client types users need for explicit bindings
pub use async_openai::{config::OpenAIConfig, Client};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_exports_compile() {
        let _ = std::mem::size_of::<AgentError>();
        let _ = std::mem::size_of::<RunConfig>();
    }
}
