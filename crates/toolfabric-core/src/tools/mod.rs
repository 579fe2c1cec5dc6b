//! Tool instances and the factory that builds them
//!
//! A [`ToolInstance`] pairs one backend (an external process or an
//! in-process function) with its connections and probe loops.
//! [`create_tool`] picks the backend from a [`ToolSpec`](crate::config::ToolSpec)
//! exactly once; nothing downstream looks at spec fields to decide it again.

mod error;
mod function;
mod process;
mod instance;
mod factory;

pub use error::{
    HealthError, HealthResult, InvocationError, InvocationResult, ToolError, ToolResult,
};
pub use function::{
    FunctionBackend, FunctionRegistry, ToolFn, global_functions, register_function,
};
pub use process::ProcessBackend;
pub use instance::{ConnectionStatus, ToolBackend, ToolInstance, ToolStatus};
pub use factory::create_tool;
