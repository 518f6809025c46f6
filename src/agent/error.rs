//! Error types for the reservation agent

use thiserror::Error;

/// Errors that can occur while running the agent loop
#[derive(Debug, Error)]
pub enum AgentError {
    /// The model requested an action that is not in the registry.
    /// Recoverable: fed back into the conversation so the model can correct itself.
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    /// The model (or a direct caller) supplied malformed arguments.
    /// Recoverable: fed back into the conversation so the model can correct itself.
    #[error("Invalid arguments for {action}: {message}")]
    InvalidArguments { action: &'static str, message: String },

    /// A backend collaborator failed while executing an action.
    /// Terminates the current loop; surfaced in the action-call list.
    #[error("Action {action} failed: {cause}")]
    ActionExecution { action: &'static str, cause: String },

    /// The decision provider itself is unreachable or returned garbage.
    /// Fatal for the request; never retried internally.
    #[error("Decision provider error: {0}")]
    DecisionProvider(#[from] LlmError),
}

impl AgentError {
    /// Validation-class errors are appended to the transcript as an error
    /// tool-result instead of aborting the loop.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AgentError::UnknownAction(_) | AgentError::InvalidArguments { .. }
        )
    }
}

/// Errors specific to LLM provider operations
#[derive(Debug, Error)]
pub enum LlmError {
    /// API error
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Authentication error
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Network error
    #[error("Network error: {0}")]
    Network(String),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Timeout
    #[error("Request timed out")]
    Timeout,
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout
        } else if err.is_connect() {
            LlmError::Network(format!("Connection error: {}", err))
        } else {
            LlmError::Network(err.to_string())
        }
    }
}

/// Result type alias for agent operations
pub type AgentResult<T> = Result<T, AgentError>;

/// Result type alias for LLM operations
pub type LlmResult<T> = Result<T, LlmError>;
