//! Logging abstractions shared by every lifecycle component
//!
//! Connections, tool instances and the fabric all receive a [`SharedLogger`]
//! and never print on their own. Wire-level tracing from the transports goes
//! to the global file debug log instead (see [`file_logger`]).

mod traits;
mod console;
mod memory;
pub mod file_logger;

pub use traits::{Logger, NoOpLogger, SharedLogger};
pub use console::ConsoleLogger;
pub use memory::{MemoryLogger, LogEntry};

pub use file_logger::{is_enabled as debug_log_enabled, log_file_path, LogLevel};
