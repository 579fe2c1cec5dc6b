//! Transport registry for creating protocol handlers by name

use std::collections::HashMap;

use once_cell::sync::Lazy;
use parking_lot::RwLock;

use super::sse::SseHandler;
use super::stdio::StdioHandler;
use super::traits::ProtocolHandler;

/// Factory function type for creating protocol handlers
pub type HandlerFactory = Box<dyn Fn() -> Box<dyn ProtocolHandler> + Send + Sync>;

/// Definition of a registered transport
struct HandlerDefinition {
    description: String,
    factory: HandlerFactory,
}

/// Global registry of transports
static REGISTRY: Lazy<RwLock<HashMap<String, HandlerDefinition>>> = Lazy::new(|| {
    let mut map = HashMap::new();

    map.insert(
        "stdio".to_string(),
        HandlerDefinition {
            description: "Content-Length framed JSON over a standard-stream bridge".to_string(),
            factory: Box::new(|| Box::new(StdioHandler::new())),
        },
    );

    map.insert(
        "sse".to_string(),
        HandlerDefinition {
            description: "Server-sent event stream with JSON POST actions".to_string(),
            factory: Box::new(|| Box::new(SseHandler::new())),
        },
    );

    RwLock::new(map)
});

/// Register a transport, replacing any existing one with the same name
///
/// # Example
///
/// ```
/// use toolfabric_core::transport::{register_protocol_handler, StdioHandler};
///
/// register_protocol_handler(
///     "stdio-slow",
///     "stdio bridge with a long timeout",
///     Box::new(|| Box::new(StdioHandler::with_timeout(std::time::Duration::from_secs(60)))),
/// );
/// ```
pub fn register_protocol_handler(name: &str, description: &str, factory: HandlerFactory) {
    REGISTRY.write().insert(
        name.to_string(),
        HandlerDefinition {
            description: description.to_string(),
            factory,
        },
    );
}

/// Create a handler for a transport name, or None if it is not registered
pub fn create_protocol_handler(name: &str) -> Option<Box<dyn ProtocolHandler>> {
    REGISTRY.read().get(name).map(|def| (def.factory)())
}

/// Check if a transport is registered
pub fn has_protocol_handler(name: &str) -> bool {
    REGISTRY.read().contains_key(name)
}

/// List registered transports as (name, description) pairs, sorted by name
pub fn list_protocol_handlers() -> Vec<(String, String)> {
    let mut list: Vec<_> = REGISTRY
        .read()
        .iter()
        .map(|(name, def)| (name.clone(), def.description.clone()))
        .collect();
    list.sort();
    list
}

/// Unregister a transport (mainly for testing)
pub fn unregister_protocol_handler(name: &str) -> bool {
    REGISTRY.write().remove(name).is_some()
}
