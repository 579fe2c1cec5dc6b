//! Managed protocol connections and their health probing
//!
//! A [`Connection`] owns one protocol handler and at most one probe loop.
//! The probe loop is the only thing that reconnects; callers of `send`
//! just get `None` while the link is down.

mod retry;
mod probe;
mod connection;

pub use retry::{
    CircuitBreaker, ExponentialBackoff, FixedInterval, ProbeOutcome, RetryPolicy,
    RetryPolicyFactory, fixed_interval,
};
pub use probe::{LoopCounter, ProbeLoop, join_timeout};
pub use connection::{Connection, ConnectionState, ConnectionStats};
