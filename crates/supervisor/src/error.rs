//! Supervisor error types

use thiserror::Error;

/// Supervisor-specific errors
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// Sink creation error
    #[error("failed to create sink '{name}': {message}")]
    SinkCreation { name: String, message: String },

    /// `subscribe` was called outside a Tokio runtime
    #[error("no async runtime available: {0}")]
    NoRuntime(String),

    /// The session task panicked or was aborted
    #[error("session task failed: {0}")]
    Join(String),

    /// Sink write error (from contract)
    #[error("sink error: {0}")]
    Contract(#[from] contracts::ContractError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl SupervisorError {
    /// Create a sink creation error
    pub fn sink_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkCreation {
            name: name.into(),
            message: message.into(),
        }
    }
}
