//! Logger that writes to stderr

use super::file_logger::LogLevel;
use super::traits::Logger;

/// Writes one line per message to stderr
///
/// Lines below `min_level` are dropped. Messages logged from a named thread
/// other than `main` (probe loops, output drains) carry the thread name, so
/// interleaved probe output stays attributable.
#[derive(Debug, Clone)]
pub struct ConsoleLogger {
    prefix: String,
    min_level: LogLevel,
}

impl Default for ConsoleLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleLogger {
    /// `[ToolFabric]` prefix, info and above
    pub fn new() -> Self {
        Self {
            prefix: "[ToolFabric]".to_string(),
            min_level: LogLevel::Info,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_level(mut self, min_level: LogLevel) -> Self {
        self.min_level = min_level;
        self
    }

    /// Include debug lines (probe ticks, connection attempts)
    pub fn verbose(self) -> Self {
        self.with_level(LogLevel::Debug)
    }

    fn format_line(&self, level: LogLevel, thread: Option<&str>, message: &str) -> Option<String> {
        if level < self.min_level {
            return None;
        }
        Some(match thread {
            Some(name) if name != "main" => format!("{} {} ({}) {}", self.prefix, level, name, message),
            _ => format!("{} {} {}", self.prefix, level, message),
        })
    }

    fn write(&self, level: LogLevel, message: &str) {
        let current = std::thread::current();
        if let Some(line) = self.format_line(level, current.name(), message) {
            eprintln!("{}", line);
        }
    }
}

impl Logger for ConsoleLogger {
    fn debug(&self, message: &str) {
        self.write(LogLevel::Debug, message);
    }

    fn info(&self, message: &str) {
        self.write(LogLevel::Info, message);
    }

    fn warn(&self, message: &str) {
        self.write(LogLevel::Warn, message);
    }

    fn error(&self, message: &str) {
        self.write(LogLevel::Error, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_filter() {
        let logger = ConsoleLogger::new();
        assert!(logger.format_line(LogLevel::Debug, None, "tick").is_none());
        assert_eq!(
            logger.format_line(LogLevel::Warn, None, "reconnecting").as_deref(),
            Some("[ToolFabric] WARN  reconnecting")
        );

        let verbose = ConsoleLogger::new().verbose();
        assert!(verbose.format_line(LogLevel::Debug, None, "tick").is_some());
    }

    #[test]
    fn test_probe_thread_name_is_tagged() {
        let logger = ConsoleLogger::new().with_prefix("[Agent]");
        assert_eq!(
            logger.format_line(LogLevel::Info, Some("probe:Connection:browser/pw"), "Connected").as_deref(),
            Some("[Agent] INFO  (probe:Connection:browser/pw) Connected")
        );
        assert_eq!(
            logger.format_line(LogLevel::Error, Some("main"), "boom").as_deref(),
            Some("[Agent] ERROR boom")
        );
    }
}
