//! Scripted protocol handler for exercising the connection state machine

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{json, Value};

use super::traits::{ProtocolHandler, TransportError, TransportResult};
use crate::config::ConnectionSpec;

/// Call counters shared between a handler and the test that made it
#[derive(Debug, Default)]
pub(crate) struct HandlerCalls {
    pub connects: AtomicUsize,
    pub sends: AtomicUsize,
    pub probes: AtomicUsize,
    pub closes: AtomicUsize,
    pub sent: Mutex<Vec<Value>>,
}

impl HandlerCalls {
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn sends(&self) -> usize {
        self.sends.load(Ordering::SeqCst)
    }

    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

/// Handler whose outcomes are scripted up front
///
/// Scripted results are consumed in order; once a script runs out the
/// handler falls back to the configured default.
pub(crate) struct ScriptedHandler {
    calls: Arc<HandlerCalls>,
    connect_script: VecDeque<bool>,
    connect_default: bool,
    probe_script: VecDeque<bool>,
    probe_default: bool,
    fail_sends: bool,
}

impl ScriptedHandler {
    /// A handler that always connects, probes healthy and accepts sends
    pub fn new() -> (Self, Arc<HandlerCalls>) {
        let calls = Arc::new(HandlerCalls::default());
        (
            Self {
                calls: calls.clone(),
                connect_script: VecDeque::new(),
                connect_default: true,
                probe_script: VecDeque::new(),
                probe_default: true,
                fail_sends: false,
            },
            calls,
        )
    }

    pub fn connect_always(mut self, result: bool) -> Self {
        self.connect_default = result;
        self
    }

    pub fn connects(mut self, script: impl IntoIterator<Item = bool>, default: bool) -> Self {
        self.connect_script = script.into_iter().collect();
        self.connect_default = default;
        self
    }

    pub fn probes(mut self, script: impl IntoIterator<Item = bool>, default: bool) -> Self {
        self.probe_script = script.into_iter().collect();
        self.probe_default = default;
        self
    }

    pub fn failing_sends(mut self) -> Self {
        self.fail_sends = true;
        self
    }
}

impl ProtocolHandler for ScriptedHandler {
    fn protocol(&self) -> &str {
        "scripted"
    }

    fn connect(&mut self, _target: &ConnectionSpec) -> TransportResult<bool> {
        self.calls.connects.fetch_add(1, Ordering::SeqCst);
        Ok(self.connect_script.pop_front().unwrap_or(self.connect_default))
    }

    fn send(&mut self, payload: &Value) -> TransportResult<Value> {
        self.calls.sends.fetch_add(1, Ordering::SeqCst);
        if self.fail_sends {
            return Err(TransportError::Closed);
        }
        self.calls.sent.lock().push(payload.clone());
        Ok(json!({"status": "sent"}))
    }

    fn probe(&mut self) -> TransportResult<bool> {
        self.calls.probes.fetch_add(1, Ordering::SeqCst);
        Ok(self.probe_script.pop_front().unwrap_or(self.probe_default))
    }

    fn close(&mut self) {
        self.calls.closes.fetch_add(1, Ordering::SeqCst);
    }
}
