//! ToolFabric Core
//!
//! Lifecycle supervision for agent tools. A tool is backed either by an
//! external process or by an in-process function, and may keep protocol
//! connections to auxiliary services. Each connection is health-probed on
//! its own thread and reconnected automatically; shutdown joins every
//! thread and terminates every process.
//!
//! ## Overview
//!
//! - [`config`]: tool specifications and where they come from (memory, YAML)
//! - [`transport`]: protocol handlers (`stdio`, `sse`) and their registry
//! - [`connection`]: the connection state machine, probe loops, retry policies
//! - [`tools`]: process and function backends, tool instances, the factory
//! - [`fabric`]: the supervisor that owns all instances
//!
//! ```rust,ignore
//! use toolfabric_core::{ConsoleLogger, Fabric};
//!
//! let fabric = Fabric::from_yaml_file("tools.yaml", Arc::new(ConsoleLogger::new()));
//! let tools = fabric.setup()?;
//! let reply = tools["browser"].call_action("goto", json!({"url": "https://example.com"}));
//!
//! fabric.stop_all();
//! assert_eq!(fabric.active_loops(), 0);
//! ```

pub mod logging;
pub mod types;
pub mod config;
pub mod transport;
pub mod connection;
pub mod context;
pub mod tools;
pub mod fabric;

// Re-export commonly used types
pub use types::{CancellationToken, Invocable, ToolArgs, ToolKind};

pub use logging::{ConsoleLogger, Logger, MemoryLogger, NoOpLogger, SharedLogger};

pub use config::{
    ConfigError, ConfigProvider, ConnectionSpec, FileConfigProvider, MemoryConfigProvider,
    ProbeKind, ToolSpec,
};

pub use transport::{ProtocolHandler, TransportError, register_protocol_handler};

pub use connection::{Connection, ConnectionState, ConnectionStats, RetryPolicy};

pub use context::FabricContext;

pub use tools::{
    FunctionRegistry, InvocationError, ToolError, ToolInstance, create_tool, register_function,
};

pub use fabric::{Agent, AttachError, AttachReport, Fabric, FabricError, FabricStatus};
