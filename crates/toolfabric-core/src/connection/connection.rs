//! Connection state machine

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;

use super::probe::{join_timeout, LoopCounter, ProbeLoop};
use super::retry::{ProbeOutcome, RetryPolicyFactory};
use crate::config::{ConfigError, ConfigResult, ConnectionSpec, ProbeKind};
use crate::context::FabricContext;
use crate::logging::SharedLogger;
use crate::transport::{create_protocol_handler, ProtocolHandler};
use crate::{log_debug, log_error, log_info, log_warn};

/// Link state of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Disconnected,
    /// Only observable while a handler `connect` is in flight
    Connecting,
    Connected,
}

/// Counters for one connection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConnectionStats {
    pub connect_attempts: u64,
    pub successful_connects: u64,
    pub probes: u64,
    pub probe_failures: u64,
    pub send_failures: u64,
    /// Transitions from `Connected` to `Disconnected`
    pub disconnects: u64,
}

/// Everything the connection guard protects
struct Guarded {
    state: ConnectionState,
    handler: Option<Box<dyn ProtocolHandler>>,
    stats: ConnectionStats,
    /// Set once by `disconnect`; no connect succeeds afterwards
    closed: bool,
}

struct ConnectionInner {
    spec: ConnectionSpec,
    label: String,
    guarded: Mutex<Guarded>,
    logger: SharedLogger,
}

/// A managed link from a tool to an auxiliary service
///
/// State reads and writes go through one guard, shared by direct callers
/// and the connection's own probe loop. Reconnection is driven only by the
/// probe loop.
pub struct Connection {
    inner: Arc<ConnectionInner>,
    probe: Mutex<Option<ProbeLoop>>,
    loops: LoopCounter,
    retry: RetryPolicyFactory,
}

impl Connection {
    /// Create a connection using the transport registered for `spec.protocol`
    pub fn new(spec: ConnectionSpec, tool: &str, ctx: &FabricContext) -> ConfigResult<Self> {
        let handler = create_protocol_handler(&spec.protocol).ok_or_else(|| {
            ConfigError::UnsupportedTransport {
                connection: spec.name.clone(),
                protocol: spec.protocol.clone(),
            }
        })?;
        Ok(Self::with_handler(spec, tool, handler, ctx))
    }

    /// Create a connection around an explicit handler
    pub fn with_handler(
        spec: ConnectionSpec,
        tool: &str,
        handler: Box<dyn ProtocolHandler>,
        ctx: &FabricContext,
    ) -> Self {
        let label = format!("[Connection:{}/{}]", tool, spec.name);
        Self {
            inner: Arc::new(ConnectionInner {
                spec,
                label,
                guarded: Mutex::new(Guarded {
                    state: ConnectionState::Disconnected,
                    handler: Some(handler),
                    stats: ConnectionStats::default(),
                    closed: false,
                }),
                logger: ctx.logger.clone(),
            }),
            probe: Mutex::new(None),
            loops: ctx.loops.clone(),
            retry: ctx.retry.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.spec.name
    }

    pub fn spec(&self) -> &ConnectionSpec {
        &self.inner.spec
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.guarded.lock().state
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    pub fn stats(&self) -> ConnectionStats {
        self.inner.guarded.lock().stats
    }

    /// Whether a probe loop is currently running
    pub fn is_probing(&self) -> bool {
        self.probe.lock().as_ref().map(ProbeLoop::is_running).unwrap_or(false)
    }

    /// Attempt to connect; safe to call repeatedly
    pub fn connect(&self) -> bool {
        let mut guarded = self.inner.guarded.lock();
        self.inner.connect_locked(&mut guarded)
    }

    /// Send a payload, or return `None` without touching the transport when
    /// not connected. A transport failure marks the link disconnected so the
    /// next probe reconnects.
    pub fn send(&self, payload: &Value) -> Option<Value> {
        self.inner.send(payload)
    }

    /// Start (or restart) the probe loop
    ///
    /// Any previous loop is stopped and joined first, so at most one loop
    /// probes this connection at a time. Fails once the connection has been
    /// disconnected.
    pub fn start_health_check(&self, interval: Duration, kind: ProbeKind) -> std::io::Result<()> {
        let mut slot = self.probe.lock();
        // `disconnect` marks the connection closed before it takes the slot
        if self.inner.guarded.lock().closed {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                format!("{} is disconnected", self.inner.label),
            ));
        }
        if let Some(mut previous) = slot.take() {
            if !previous.stop_default() {
                log_warn!(self.inner.logger, "{} Previous probe loop did not exit in time", self.inner.label);
            }
        }

        let inner = self.inner.clone();
        let probe = ProbeLoop::spawn(
            format!("probe:{}", self.inner.label.trim_matches(|c| c == '[' || c == ']')),
            interval,
            (self.retry)(),
            &self.loops,
            move || inner.health_tick(kind),
        )?;
        log_debug!(
            self.inner.logger,
            "{} Health check started ({}, every {:?})",
            self.inner.label,
            kind.as_str(),
            interval
        );
        *slot = Some(probe);
        Ok(())
    }

    /// Tear the connection down permanently
    ///
    /// Marks it disconnected, stops and joins the probe loop (bounded), then
    /// closes and releases the handler. Returns `false` if it was already
    /// torn down.
    pub fn disconnect(&self) -> bool {
        {
            let mut guarded = self.inner.guarded.lock();
            if guarded.closed {
                return false;
            }
            guarded.closed = true;
            self.inner.mark_disconnected(&mut guarded);
        }

        // The guard must not be held here: the loop may be waiting on it
        if let Some(mut probe) = self.probe.lock().take() {
            let timeout = join_timeout(probe.interval());
            if !probe.stop(timeout) {
                log_warn!(
                    self.inner.logger,
                    "{} Probe loop did not exit within {:?}, abandoning it",
                    self.inner.label,
                    timeout
                );
            }
        }

        let handler = self.inner.guarded.lock().handler.take();
        if let Some(mut handler) = handler {
            handler.close();
        }

        log_info!(self.inner.logger, "{} Disconnected", self.inner.label);
        true
    }
}

impl ConnectionInner {
    fn mark_disconnected(&self, guarded: &mut Guarded) {
        if guarded.state == ConnectionState::Connected {
            guarded.stats.disconnects += 1;
        }
        guarded.state = ConnectionState::Disconnected;
    }

    fn connect_locked(&self, guarded: &mut Guarded) -> bool {
        guarded.stats.connect_attempts += 1;
        if guarded.closed {
            log_error!(self.logger, "{} Connect refused: connection closed", self.label);
            return false;
        }
        guarded.state = ConnectionState::Connecting;

        let Some(handler) = guarded.handler.as_mut() else {
            log_error!(self.logger, "{} Connect failed: handler released", self.label);
            guarded.state = ConnectionState::Disconnected;
            return false;
        };

        let connected = match handler.connect(&self.spec) {
            Ok(true) => {
                log_info!(
                    self.logger,
                    "{} Connected via {} to {}",
                    self.label,
                    self.spec.protocol,
                    self.spec.address()
                );
                true
            }
            Ok(false) => {
                log_error!(self.logger, "{} Connect failed", self.label);
                false
            }
            Err(e) => {
                log_error!(self.logger, "{} ERROR connecting: {}", self.label, e);
                false
            }
        };

        if connected {
            guarded.stats.successful_connects += 1;
            guarded.state = ConnectionState::Connected;
        } else {
            guarded.state = ConnectionState::Disconnected;
        }
        connected
    }

    fn send(&self, payload: &Value) -> Option<Value> {
        let mut guarded = self.guarded.lock();
        if guarded.state != ConnectionState::Connected {
            log_warn!(self.logger, "{} WARNING: not connected", self.label);
            return None;
        }

        let result = match guarded.handler.as_mut() {
            Some(handler) => handler.send(payload),
            None => return None,
        };

        match result {
            Ok(reply) => {
                log_debug!(self.logger, "{} SEND → {}", self.label, payload);
                Some(reply)
            }
            Err(e) => {
                log_error!(self.logger, "{} Send error: {}", self.label, e);
                guarded.stats.send_failures += 1;
                self.mark_disconnected(&mut guarded);
                None
            }
        }
    }

    /// One probe iteration
    fn health_tick(&self, kind: ProbeKind) -> ProbeOutcome {
        let mut guarded = self.guarded.lock();
        if guarded.closed {
            return ProbeOutcome::Unhealthy;
        }

        if guarded.state != ConnectionState::Connected {
            log_warn!(self.logger, "{} Health check failed, reconnecting...", self.label);
            return outcome(self.connect_locked(&mut guarded));
        }

        if kind != ProbeKind::Ping {
            return ProbeOutcome::Healthy;
        }

        guarded.stats.probes += 1;
        let alive = match guarded.handler.as_mut().map(|h| h.probe()) {
            Some(Ok(alive)) => alive,
            Some(Err(e)) => {
                log_error!(self.logger, "{} Health error: {}", self.label, e);
                false
            }
            None => false,
        };

        if alive {
            return ProbeOutcome::Healthy;
        }

        guarded.stats.probe_failures += 1;
        log_warn!(self.logger, "{} Ping failed, reconnecting...", self.label);
        self.mark_disconnected(&mut guarded);
        outcome(self.connect_locked(&mut guarded))
    }
}

fn outcome(connected: bool) -> ProbeOutcome {
    if connected {
        ProbeOutcome::Healthy
    } else {
        ProbeOutcome::Unhealthy
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("name", &self.inner.spec.name)
            .field("protocol", &self.inner.spec.protocol)
            .field("state", &self.state())
            .finish()
    }
}
