//! Protocol handler contract

use serde_json::Value;
use thiserror::Error;

use crate::config::ConnectionSpec;

/// Errors raised by a transport
///
/// These never leave a `Connection`; they are turned into state changes.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Not connected")]
    NotConnected,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Connection closed by peer")]
    Closed,
}

pub type TransportResult<T> = Result<T, TransportError>;

/// Uniform capability set of one transport
///
/// Each `Connection` owns exactly one handler, so implementations can keep
/// their stream state in `&mut self` without extra locking.
pub trait ProtocolHandler: Send {
    /// Registry name of this transport (e.g. "stdio")
    fn protocol(&self) -> &str;

    /// Establish the link described by `target`
    ///
    /// `Ok(false)` and `Err(_)` both mean "not connected".
    fn connect(&mut self, target: &ConnectionSpec) -> TransportResult<bool>;

    /// Deliver one message and return the peer's reply
    fn send(&mut self, payload: &Value) -> TransportResult<Value>;

    /// Lightweight liveness check on an established link
    fn probe(&mut self) -> TransportResult<bool>;

    /// Release the underlying stream
    fn close(&mut self) {}
}
