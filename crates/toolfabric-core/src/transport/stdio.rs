//! Standard-stream transport
//!
//! Speaks Content-Length framed JSON to a stdio server that has been bridged
//! onto `host:port`. Every message gets exactly one framed reply.

use std::io::BufReader;
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use serde_json::{json, Value};

use super::framing::{read_message, write_message};
use super::traits::{ProtocolHandler, TransportError, TransportResult};
use crate::config::ConnectionSpec;
use crate::{debug_log, warn_log};

/// Default timeout for connect, read and write
const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(5);

struct StdioStream {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
}

/// Content-Length framed JSON over a byte stream
pub struct StdioHandler {
    stream: Option<StdioStream>,
    auth_token: Option<String>,
    timeout: Duration,
}

impl Default for StdioHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl StdioHandler {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_IO_TIMEOUT)
    }

    /// Use a custom IO timeout
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            stream: None,
            auth_token: None,
            timeout,
        }
    }

    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Attach the auth token to object payloads
    fn authorize(&self, payload: &Value) -> Value {
        match (&self.auth_token, payload) {
            (Some(token), Value::Object(map)) => {
                let mut map = map.clone();
                map.insert("auth".to_string(), json!(token));
                Value::Object(map)
            }
            _ => payload.clone(),
        }
    }

    fn exchange(&mut self, message: &Value) -> TransportResult<Value> {
        let stream = self.stream.as_mut().ok_or(TransportError::NotConnected)?;

        write_message(&mut stream.writer, message)?;
        match read_message(&mut stream.reader) {
            Ok(reply) => Ok(reply),
            Err(e) => {
                // A half-read frame leaves the stream unusable
                warn_log!("Dropping stdio stream after read failure: {}", e);
                self.close();
                Err(e)
            }
        }
    }
}

impl ProtocolHandler for StdioHandler {
    fn protocol(&self) -> &str {
        "stdio"
    }

    fn connect(&mut self, target: &ConnectionSpec) -> TransportResult<bool> {
        self.close();

        let address = target.address();
        debug_log!("Connecting stdio bridge at {}", address);

        let addr = address
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| TransportError::ConnectionFailed(format!("Cannot resolve {}", address)))?;

        let stream = TcpStream::connect_timeout(&addr, self.timeout)
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;
        stream.set_read_timeout(Some(self.timeout))?;
        stream.set_write_timeout(Some(self.timeout))?;
        stream.set_nodelay(true)?;

        let writer = stream.try_clone()?;
        self.stream = Some(StdioStream {
            reader: BufReader::new(stream),
            writer,
        });
        self.auth_token = target.auth_token.clone();

        debug_log!("Connected stdio bridge at {}", address);
        Ok(true)
    }

    fn send(&mut self, payload: &Value) -> TransportResult<Value> {
        let message = self.authorize(payload);
        debug_log!("Stdio send: {}", payload);
        self.exchange(&message)
    }

    fn probe(&mut self) -> TransportResult<bool> {
        let reply = self.send(&json!({"type": "ping"}))?;
        Ok(reply.get("pong").and_then(Value::as_bool).unwrap_or(false))
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.writer.shutdown(Shutdown::Both);
        }
    }
}

impl Drop for StdioHandler {
    fn drop(&mut self) {
        self.close();
    }
}
