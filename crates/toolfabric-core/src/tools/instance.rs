//! Tool instance lifecycle

use std::sync::Arc;

use serde::Serialize;

use super::error::{HealthResult, ToolError, ToolResult};
use super::function::FunctionBackend;
use super::process::ProcessBackend;
use crate::config::{ProbeKind, ToolSpec};
use crate::connection::{Connection, ConnectionState, ConnectionStats, ProbeLoop, ProbeOutcome};
use crate::context::FabricContext;
use crate::types::{Invocable, ToolKind};
use crate::{log_debug, log_error, log_info, log_warn};

/// Backend of a tool, fixed when the instance is built
#[derive(Debug, Clone)]
pub enum ToolBackend {
    Process(Arc<ProcessBackend>),
    Function(Arc<FunctionBackend>),
}

impl ToolBackend {
    pub fn kind(&self) -> ToolKind {
        match self {
            ToolBackend::Process(_) => ToolKind::Process,
            ToolBackend::Function(_) => ToolKind::Function,
        }
    }

    fn health_check(&self) -> HealthResult<()> {
        match self {
            ToolBackend::Process(process) => process.health_check(),
            ToolBackend::Function(function) => function.health_check(),
        }
    }
}

/// Snapshot of one connection
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionStatus {
    pub name: String,
    pub protocol: String,
    pub state: ConnectionState,
    pub probing: bool,
    pub stats: ConnectionStats,
}

/// Snapshot of one tool
#[derive(Debug, Clone, Serialize)]
pub struct ToolStatus {
    pub name: String,
    pub kind: ToolKind,
    pub running: bool,
    /// Last internal health check error, if the check failed
    pub health_error: Option<String>,
    pub connections: Vec<ConnectionStatus>,
}

/// One running tool: a backend plus its connections and probe loops
///
/// `start` runs validation, backend startup, connection attach and health
/// checking in that order. `stop` undoes whatever `start` got through, so it
/// is safe after a partial start, and it is idempotent. Dropping an instance
/// stops it.
pub struct ToolInstance {
    spec: ToolSpec,
    backend: ToolBackend,
    ctx: FabricContext,
    connections: Vec<Arc<Connection>>,
    internal_probe: Option<ProbeLoop>,
    started: bool,
    stopped: bool,
    label: String,
}

impl ToolInstance {
    pub fn new(spec: ToolSpec, backend: ToolBackend, ctx: FabricContext) -> Self {
        let label = format!("[Tool:{}]", spec.name);
        Self {
            spec,
            backend,
            ctx,
            connections: Vec::new(),
            internal_probe: None,
            started: false,
            stopped: false,
            label,
        }
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    pub fn kind(&self) -> ToolKind {
        self.backend.kind()
    }

    pub fn backend(&self) -> &ToolBackend {
        &self.backend
    }

    pub fn connections(&self) -> &[Arc<Connection>] {
        &self.connections
    }

    pub fn is_running(&self) -> bool {
        self.started && !self.stopped
    }

    /// Bring the tool up
    pub fn start(&mut self) -> ToolResult<()> {
        if self.stopped {
            return Err(ToolError::Stopped {
                tool: self.spec.name.clone(),
            });
        }
        if self.started {
            return Ok(());
        }

        self.spec.validate()?;

        match &self.backend {
            ToolBackend::Process(process) => process.start()?,
            ToolBackend::Function(function) => {
                function.start(&self.ctx.functions)?;
                log_info!(self.ctx.logger, "{} Loaded function {}", self.label, function.target());
            }
        }

        self.attach_connections()?;
        self.start_health_checks()?;

        self.started = true;
        log_info!(
            self.ctx.logger,
            "{} Started ({}, {} connection(s))",
            self.label,
            self.kind(),
            self.connections.len()
        );
        Ok(())
    }

    fn attach_connections(&mut self) -> ToolResult<()> {
        let specs: Vec<_> = self.spec.enabled_connections().cloned().collect();
        for spec in specs {
            let conn = Connection::new(spec, &self.spec.name, &self.ctx)?;
            // A failed first connect is retried by the probe loop
            conn.connect();
            self.connections.push(Arc::new(conn));
        }
        Ok(())
    }

    fn start_health_checks(&mut self) -> ToolResult<()> {
        let interval = self.spec.health_check.interval();
        let kind = self.spec.health_check.kind;

        if !self.connections.is_empty() {
            for conn in &self.connections {
                conn.start_health_check(interval, kind)
                    .map_err(|source| ToolError::HealthCheck {
                        tool: self.spec.name.clone(),
                        source,
                    })?;
            }
            return Ok(());
        }

        if kind != ProbeKind::Internal {
            return Ok(());
        }

        let backend = self.backend.clone();
        let logger = self.ctx.logger.clone();
        let label = self.label.clone();
        let probe = ProbeLoop::spawn(
            format!("probe:{}", self.spec.name),
            interval,
            (self.ctx.retry)(),
            &self.ctx.loops,
            move || match backend.health_check() {
                Ok(()) => ProbeOutcome::Healthy,
                Err(e) => {
                    log_warn!(logger, "{} Internal health check failed: {}", label, e);
                    ProbeOutcome::Unhealthy
                }
            },
        )
        .map_err(|source| ToolError::HealthCheck {
            tool: self.spec.name.clone(),
            source,
        })?;

        log_debug!(self.ctx.logger, "{} Internal health check every {:?}", self.label, interval);
        self.internal_probe = Some(probe);
        Ok(())
    }

    /// Tear the tool down; the second call is a no-op
    pub fn stop(&mut self) -> ToolResult<()> {
        if self.stopped {
            return Ok(());
        }
        self.stopped = true;

        if let Some(mut probe) = self.internal_probe.take() {
            if !probe.stop_default() {
                log_warn!(self.ctx.logger, "{} Internal probe loop did not exit in time", self.label);
            }
        }

        for conn in self.connections.drain(..) {
            conn.disconnect();
        }

        let result = match &self.backend {
            ToolBackend::Process(process) => process.stop(),
            ToolBackend::Function(_) => Ok(()),
        };

        match &result {
            Ok(()) => log_info!(self.ctx.logger, "{} Stopped", self.label),
            Err(e) => log_error!(self.ctx.logger, "{} Stopped with error: {}", self.label, e),
        }
        result
    }

    /// The callable handed to agents
    pub fn to_invocable(&self) -> Invocable {
        let connections = self.connections.clone();
        let logger = self.ctx.logger.clone();
        match &self.backend {
            ToolBackend::Process(process) => process.invocable(connections, logger),
            ToolBackend::Function(function) => function.invocable(connections, logger),
        }
    }

    /// Backend self-test: process alive, or function callable with the probe argument
    pub fn health_check_internal(&self) -> HealthResult<()> {
        self.backend.health_check()
    }

    pub fn status(&self) -> ToolStatus {
        ToolStatus {
            name: self.spec.name.clone(),
            kind: self.kind(),
            running: self.is_running(),
            health_error: self.health_check_internal().err().map(|e| e.to_string()),
            connections: self
                .connections
                .iter()
                .map(|conn| ConnectionStatus {
                    name: conn.name().to_string(),
                    protocol: conn.spec().protocol.clone(),
                    state: conn.state(),
                    probing: conn.is_probing(),
                    stats: conn.stats(),
                })
                .collect(),
        }
    }
}

impl Drop for ToolInstance {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

impl std::fmt::Debug for ToolInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolInstance")
            .field("name", &self.spec.name)
            .field("kind", &self.kind())
            .field("connections", &self.connections.len())
            .field("running", &self.is_running())
            .finish()
    }
}
