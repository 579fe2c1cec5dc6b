//! The logger every lifecycle component writes to

use std::sync::Arc;

/// Sink for lifecycle messages
///
/// Components tag their own messages (`[Connection:tool/link]`,
/// `[Tool:name]`, `[Fabric]`), so implementations only decide where a line
/// goes. Provided here: `NoOpLogger`, `ConsoleLogger` and `MemoryLogger`.
/// An embedding agent usually adapts its own log sink instead.
///
/// Probe loops log from their own threads, hence `Send + Sync`.
pub trait Logger: Send + Sync {
    fn debug(&self, message: &str);

    fn info(&self, message: &str);

    fn warn(&self, message: &str);

    fn error(&self, message: &str);
}

/// The form in which loggers are handed around
pub type SharedLogger = Arc<dyn Logger>;

/// Discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpLogger;

impl NoOpLogger {
    pub fn new() -> Self {
        Self
    }

    pub fn shared() -> SharedLogger {
        Arc::new(Self)
    }
}

impl Logger for NoOpLogger {
    fn debug(&self, _: &str) {}
    fn info(&self, _: &str) {}
    fn warn(&self, _: &str) {}
    fn error(&self, _: &str) {}
}

/// `log_debug!(logger, "fmt", args..)`: format and log at debug level
///
/// Works on anything that derefs to a [`Logger`], without the trait in scope.
#[macro_export]
macro_rules! log_debug {
    ($logger:expr, $($arg:tt)*) => {
        $crate::logging::Logger::debug(&*$logger, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_info {
    ($logger:expr, $($arg:tt)*) => {
        $crate::logging::Logger::info(&*$logger, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_warn {
    ($logger:expr, $($arg:tt)*) => {
        $crate::logging::Logger::warn(&*$logger, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_error {
    ($logger:expr, $($arg:tt)*) => {
        $crate::logging::Logger::error(&*$logger, &format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::NoOpLogger;
    use crate::logging::{LogLevel, MemoryLogger, SharedLogger};
    use std::sync::Arc;

    #[test]
    fn test_macros_format_through_shared_logger() {
        let memory = Arc::new(MemoryLogger::new());
        let shared: SharedLogger = memory.clone();

        crate::log_debug!(shared, "{} {}", "probe", 1);
        crate::log_info!(shared, "connected to {}", "localhost:9000");
        crate::log_warn!(memory, "reconnecting {}", "aux");
        crate::log_error!(memory, "failed: {}", 42);

        assert!(memory.contains(LogLevel::Debug, "probe 1"));
        assert!(memory.contains(LogLevel::Info, "localhost:9000"));
        assert!(memory.contains(LogLevel::Warn, "reconnecting aux"));
        assert!(memory.contains(LogLevel::Error, "failed: 42"));
    }

    #[test]
    fn test_noop_logger_accepts_macros() {
        let logger = NoOpLogger::shared();
        crate::log_info!(logger, "dropped {}", 1);
        crate::log_error!(logger, "dropped {}", 2);
    }
}
