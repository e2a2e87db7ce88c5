//! Error types for the agent runtime

use thiserror::Error;

/// Result type alias for the agent runtime
pub type Result<T> = std::result::Result<T, AgentError>;

/// Main error type for the agent runtime
///
/// Tool handler failures are deliberately absent: they are converted into
/// tool-error strings visible to the model and never abort a run. Everything
/// here is unrecoverable for the current run and propagates to the caller.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Missing or unusable client configuration (e.g. no API key)
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Lookup of an agent name that was never registered
    #[error("unknown agent: {0}")]
    AgentNotFound(String),

    /// An agent name registered twice with a different definition
    #[error("duplicate agent name: {0}")]
    DuplicateAgent(String),

    /// An agent declaring two tools with the same name
    #[error("agent '{agent}' declares duplicate tool '{tool}'")]
    DuplicateTool { agent: String, tool: String },

    /// Tool arguments that do not match the tool's declared schema
    #[error("invalid arguments for tool '{tool}': {reason}")]
    Validation { tool: String, reason: String },

    /// Handoff requested to an agent the current agent never declared
    #[error("invalid handoff from '{from}' to undeclared agent '{target}'")]
    InvalidHandoff { from: String, target: String },

    /// Step limit reached before the model produced a final answer
    #[error("step limit exceeded: {max_steps}")]
    StepLimitExceeded { max_steps: usize },

    /// Transport or API failure from the model client
    #[error("model call failed: {0}")]
    ExternalCall(#[from] async_openai::error::OpenAIError),

    /// Model response that the runtime cannot interpret
    #[error("model behavior error: {message}")]
    ModelBehavior { message: String },

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("{0}")]
    Other(String),
}
