//! Tool and connection specification types

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::traits::{ConfigError, ConfigResult};

/// Default probe interval in seconds
pub const DEFAULT_HEALTH_INTERVAL_SECS: f64 = 10.0;

/// Default transport for a connection
pub const DEFAULT_PROTOCOL: &str = "stdio";

/// Default grace period before a process-backed tool is killed
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: f64 = 5.0;

/// Declarative description of one tool
///
/// The backend is not stored as a tag; it is derived once, by the factory,
/// through [`ToolSpec::backend`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Unique tool name (registry key)
    #[serde(default)]
    pub name: String,
    /// Command line for a process-backed tool
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<Vec<String>>,
    /// Module reference for a function-backed tool
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    /// Function name inside `module`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
    /// Auxiliary protocol connections, in declaration order
    #[serde(default, rename = "mcp_clients")]
    pub connections: Vec<ConnectionSpec>,
    /// Liveness probing settings
    #[serde(default)]
    pub health_check: HealthCheckSpec,
    /// Seconds to wait after SIGTERM before killing a process-backed tool
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shutdown_timeout: Option<f64>,
}

/// Backend kind, chosen once from a [`ToolSpec`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    /// External process launched from a command line
    Process { command: Vec<String> },
    /// In-process callable resolved from the function registry
    Function { module: String, function: String },
}

impl ToolSpec {
    fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: None,
            module: None,
            function: None,
            connections: Vec::new(),
            health_check: HealthCheckSpec::default(),
            shutdown_timeout: None,
        }
    }

    /// Create a process-backed tool spec
    pub fn process<I, S>(name: impl Into<String>, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            command: Some(command.into_iter().map(Into::into).collect()),
            ..Self::empty(name)
        }
    }

    /// Create a function-backed tool spec
    pub fn function(
        name: impl Into<String>,
        module: impl Into<String>,
        function: impl Into<String>,
    ) -> Self {
        Self {
            module: Some(module.into()),
            function: Some(function.into()),
            ..Self::empty(name)
        }
    }

    /// Add a connection
    pub fn with_connection(mut self, connection: ConnectionSpec) -> Self {
        self.connections.push(connection);
        self
    }

    /// Set the health check settings
    pub fn with_health_check(mut self, interval: Duration, kind: ProbeKind) -> Self {
        self.health_check = HealthCheckSpec {
            interval: interval.as_secs_f64(),
            kind,
        };
        self
    }

    /// Set the process shutdown grace period
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = Some(timeout.as_secs_f64());
        self
    }

    /// Grace period between SIGTERM and a forced kill
    ///
    /// Falls back to the default for values `validate` would reject.
    pub fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
            .unwrap_or_else(|| Duration::from_secs_f64(DEFAULT_SHUTDOWN_TIMEOUT_SECS))
    }

    /// Connections that will actually be materialized
    pub fn enabled_connections(&self) -> impl Iterator<Item = &ConnectionSpec> {
        self.connections.iter().filter(|c| c.enabled)
    }

    /// True when both a command and a module/function reference are present
    pub fn is_ambiguous(&self) -> bool {
        self.command.is_some() && (self.module.is_some() || self.function.is_some())
    }

    /// Derive the backend kind; first matching discriminator wins
    pub fn backend(&self) -> ConfigResult<Backend> {
        if let Some(command) = &self.command {
            if command.is_empty() {
                return Err(ConfigError::EmptyCommand {
                    tool: self.name.clone(),
                });
            }
            return Ok(Backend::Process {
                command: command.clone(),
            });
        }

        match (&self.module, &self.function) {
            (Some(module), Some(function)) => Ok(Backend::Function {
                module: module.clone(),
                function: function.clone(),
            }),
            _ => Err(ConfigError::MissingBackend {
                tool: self.name.clone(),
            }),
        }
    }

    /// Validate the fields every backend relies on
    pub fn validate(&self) -> ConfigResult<()> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::MissingName);
        }
        if let Some(secs) = self.shutdown_timeout {
            if Duration::try_from_secs_f64(secs).is_err() {
                return Err(ConfigError::InvalidShutdownTimeout {
                    tool: self.name.clone(),
                    message: format!("expected a non-negative number of seconds, got {}", secs),
                });
            }
        }
        self.health_check.validate(&self.name)
    }
}

/// Kind of liveness probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeKind {
    /// Ping every connection through its protocol handler
    #[default]
    Ping,
    /// Self-test the backend (only used when the tool has no connections)
    Internal,
}

impl ProbeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeKind::Ping => "ping",
            ProbeKind::Internal => "internal",
        }
    }
}

/// Probe cadence and kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthCheckSpec {
    /// Seconds between probes
    #[serde(default = "default_interval")]
    pub interval: f64,
    #[serde(default, rename = "type")]
    pub kind: ProbeKind,
}

fn default_interval() -> f64 {
    DEFAULT_HEALTH_INTERVAL_SECS
}

impl Default for HealthCheckSpec {
    fn default() -> Self {
        Self {
            interval: DEFAULT_HEALTH_INTERVAL_SECS,
            kind: ProbeKind::Ping,
        }
    }
}

impl HealthCheckSpec {
    /// Probe interval as a duration
    ///
    /// Falls back to the default for values `validate` would reject.
    pub fn interval(&self) -> Duration {
        self.checked_interval()
            .unwrap_or_else(|| Duration::from_secs_f64(DEFAULT_HEALTH_INTERVAL_SECS))
    }

    fn checked_interval(&self) -> Option<Duration> {
        Duration::try_from_secs_f64(self.interval)
            .ok()
            .filter(|interval| !interval.is_zero())
    }

    fn validate(&self, tool: &str) -> ConfigResult<()> {
        if self.checked_interval().is_none() {
            return Err(ConfigError::InvalidHealthCheck {
                tool: tool.to_string(),
                message: format!("interval must be a positive number of seconds, got {}", self.interval),
            });
        }
        Ok(())
    }
}

/// One auxiliary protocol connection of a tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionSpec {
    pub name: String,
    pub host: String,
    pub port: u16,
    /// Transport name, resolved through the transport registry
    #[serde(default = "default_protocol")]
    pub protocol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    /// Disabled connections are never materialized
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_protocol() -> String {
    DEFAULT_PROTOCOL.to_string()
}

fn default_enabled() -> bool {
    true
}

impl ConnectionSpec {
    /// Create an enabled stdio connection spec
    pub fn new(name: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port,
            protocol: default_protocol(),
            auth_token: None,
            enabled: true,
        }
    }

    /// Set the transport name
    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = protocol.into();
        self
    }

    /// Set the auth token
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Mark this connection disabled
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// `host:port`
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
