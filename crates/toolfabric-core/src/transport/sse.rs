//! Event-stream (SSE) transport
//!
//! Subscribes to `GET /mcp/sse/<client>` and delivers messages as JSON
//! `POST /mcp/action` requests. The subscription response is held open for
//! the lifetime of the link; dropping it ends the subscription.

use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde_json::{json, Value};

use super::traits::{ProtocolHandler, TransportError, TransportResult};
use crate::config::ConnectionSpec;
use crate::{debug_log, warn_log};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

struct SseLink {
    client: Client,
    base_url: String,
    client_id: String,
    auth_token: Option<String>,
    _events: Response,
}

/// HTTP event-stream transport
pub struct SseHandler {
    link: Option<SseLink>,
    timeout: Duration,
}

impl Default for SseHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl SseHandler {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { link: None, timeout }
    }

    pub fn is_open(&self) -> bool {
        self.link.is_some()
    }

    /// Base URL for a connection target
    pub fn base_url(target: &ConnectionSpec) -> String {
        format!("http://{}:{}", target.host, target.port)
    }

    fn with_auth(builder: RequestBuilder, token: Option<&str>) -> RequestBuilder {
        match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// `POST /mcp/action` with the payload tagged by client id
    fn post_action(&self, payload: &Value) -> TransportResult<Response> {
        let link = self.link.as_ref().ok_or(TransportError::NotConnected)?;

        let mut body = match payload {
            Value::Object(map) => map.clone(),
            other => {
                let mut map = serde_json::Map::new();
                map.insert("data".to_string(), other.clone());
                map
            }
        };
        body.insert("client_id".to_string(), json!(link.client_id));

        let url = format!("{}/mcp/action", link.base_url);
        debug_log!("SSE send to {}: {}", url, payload);

        let request = Self::with_auth(
            link.client.post(&url).timeout(self.timeout).json(&body),
            link.auth_token.as_deref(),
        );
        Ok(request.send()?)
    }
}

impl ProtocolHandler for SseHandler {
    fn protocol(&self) -> &str {
        "sse"
    }

    fn connect(&mut self, target: &ConnectionSpec) -> TransportResult<bool> {
        self.close();

        let client = Client::builder()
            .connect_timeout(self.timeout)
            .build()?;
        let base_url = Self::base_url(target);
        let client_id = target.name.clone();
        let url = format!("{}/mcp/sse/{}", base_url, client_id);

        debug_log!("Opening event stream {}", url);
        let request = Self::with_auth(
            client.get(&url).header(ACCEPT, "text/event-stream"),
            target.auth_token.as_deref(),
        );
        let events = request
            .send()
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

        if !events.status().is_success() {
            warn_log!("Event stream {} refused: {}", url, events.status());
            return Ok(false);
        }

        let is_event_stream = events
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.starts_with("text/event-stream"))
            .unwrap_or(false);
        if !is_event_stream {
            warn_log!("Endpoint {} is not an event stream", url);
            return Ok(false);
        }

        self.link = Some(SseLink {
            client,
            base_url,
            client_id,
            auth_token: target.auth_token.clone(),
            _events: events,
        });
        Ok(true)
    }

    fn send(&mut self, payload: &Value) -> TransportResult<Value> {
        let reply = self.post_action(payload)?.error_for_status()?.text()?;
        if reply.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&reply)?)
    }

    fn probe(&mut self) -> TransportResult<bool> {
        let status = self.post_action(&json!({"type": "ping"}))?.status();
        if !status.is_success() {
            debug_log!("SSE probe answered {}", status);
        }
        Ok(status.is_success())
    }

    fn close(&mut self) {
        if self.link.take().is_some() {
            debug_log!("Closed event stream");
        }
    }
}
