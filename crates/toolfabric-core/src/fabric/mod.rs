//! Tool supervision
//!
//! The [`Fabric`] owns every tool instance. It builds and starts them from
//! configuration, hands their invocables to agents and tears everything
//! down in one call.

mod agent;
mod supervisor;

pub use agent::{Agent, AttachError, AttachReport};
pub use supervisor::{Fabric, FabricError, FabricResult, FabricStatus, StopReport};
