//! Error types for tool instances

use crate::config::ConfigError;

/// Fatal faults raised while starting or stopping a tool
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to spawn process for {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to start health check for {tool}: {source}")]
    HealthCheck {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Tool {tool} has been stopped")]
    Stopped { tool: String },

    #[error("Failed to stop {tool}: {message}")]
    Shutdown { tool: String, message: String },
}

pub type ToolResult<T> = Result<T, ToolError>;

/// Outcome of an internal health probe
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HealthError {
    #[error("Process exited with {status}")]
    ProcessExited { status: String },

    #[error("Tool not started")]
    NotStarted,

    #[error("Health probe failed: {0}")]
    Probe(String),
}

pub type HealthResult<T> = Result<T, HealthError>;

/// Faults raised by an in-process tool function
///
/// Never reaches the agent: the invocable turns it into `{"error": message}`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvocationError {
    #[error("{0}")]
    Failed(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Function panicked: {0}")]
    Panicked(String),
}

impl InvocationError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

pub type InvocationResult<T> = Result<T, InvocationError>;
