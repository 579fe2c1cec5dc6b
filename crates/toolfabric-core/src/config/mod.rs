//! Tool configuration
//!
//! Supports multiple configuration sources:
//! - `MemoryConfigProvider`: In-memory for testing and embedding
//! - `FileConfigProvider`: YAML file-based (user/workspace level)

mod traits;
mod spec;
mod memory;
mod file;

pub use traits::{ConfigProvider, ConfigError, ConfigResult};
pub use spec::{
    Backend, ConnectionSpec, HealthCheckSpec, ProbeKind, ToolSpec,
    DEFAULT_HEALTH_INTERVAL_SECS, DEFAULT_PROTOCOL, DEFAULT_SHUTDOWN_TIMEOUT_SECS,
};
pub use memory::MemoryConfigProvider;
pub use file::{FileConfigProvider, ConfigFile, ConfigLevel};
