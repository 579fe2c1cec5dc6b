//! Protocol transports
//!
//! A [`ProtocolHandler`] is the only thing a `Connection` knows about the
//! wire. Handlers are created by name through the transport registry, so a
//! new transport is added by registering a factory; nothing in the
//! connection or tool layers changes.
//!
//! Built-in transports:
//! - `stdio`: Content-Length framed JSON over a byte stream (stdio bridge)
//! - `sse`: event-stream subscription plus JSON `POST` actions over HTTP

mod traits;
mod framing;
mod stdio;
mod sse;
mod registry;

#[cfg(test)]
pub(crate) mod testing;

pub use traits::{ProtocolHandler, TransportError, TransportResult};
pub use framing::{read_message, write_message, MAX_MESSAGE_SIZE};
pub use stdio::StdioHandler;
pub use sse::SseHandler;
pub use registry::{
    HandlerFactory, create_protocol_handler, has_protocol_handler, list_protocol_handlers,
    register_protocol_handler, unregister_protocol_handler,
};
