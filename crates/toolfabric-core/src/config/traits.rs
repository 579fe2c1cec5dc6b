//! Configuration provider trait

use super::spec::ToolSpec;

/// Source of tool specifications
///
/// Implementations:
/// - `MemoryConfigProvider`: In-memory for testing
/// - `FileConfigProvider`: Reads from a YAML file (~/.config/toolfabric/config.yaml)
/// - Host adapters: whatever declarative source the embedding agent owns
pub trait ConfigProvider: Send + Sync {
    /// Get all configured tool specifications, in declaration order
    fn tool_specs(&self) -> ConfigResult<Vec<ToolSpec>>;
}

/// Errors raised while reading or validating tool configuration
///
/// These are the only faults allowed to cross `Fabric::setup`.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Tool config missing 'name'")]
    MissingName,

    #[error("Unknown tool type for {tool}: expected 'command' or 'module' + 'function'")]
    MissingBackend { tool: String },

    #[error("Tool {tool} has an empty 'command'")]
    EmptyCommand { tool: String },

    #[error("Failed to load module/function {module}.{function} for {tool}")]
    UnresolvedFunction {
        tool: String,
        module: String,
        function: String,
    },

    #[error("Unsupported protocol '{protocol}' for connection {connection}")]
    UnsupportedTransport { connection: String, protocol: String },

    #[error("Tool already registered: {0}")]
    DuplicateTool(String),

    #[error("Invalid health check for {tool}: {message}")]
    InvalidHealthCheck { tool: String, message: String },

    #[error("Invalid shutdown_timeout for {tool}: {message}")]
    InvalidShutdownTimeout { tool: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(String),

    #[error("Configuration error: {0}")]
    Other(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
