//! Core types shared by the lifecycle components

mod cancellation;
mod args;
mod invocable;

pub use cancellation::CancellationToken;
pub use args::{ToolArgs, HEALTH_PROBE_KWARG};
pub use invocable::{Invocable, InvokeFn, ToolKind};
