//! Agent attachment contract

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::types::Invocable;

/// Rejection from an agent
#[derive(Debug, thiserror::Error)]
pub enum AttachError {
    #[error("Agent rejected {tool}: {message}")]
    Rejected { tool: String, message: String },
}

/// Anything that can receive named invocables
///
/// The fabric only ever writes into an agent. Plain name-keyed maps are
/// agents too.
pub trait Agent {
    fn attach_tool(&mut self, name: &str, tool: Invocable) -> Result<(), AttachError>;
}

impl Agent for HashMap<String, Invocable> {
    fn attach_tool(&mut self, name: &str, tool: Invocable) -> Result<(), AttachError> {
        self.insert(name.to_string(), tool);
        Ok(())
    }
}

impl Agent for BTreeMap<String, Invocable> {
    fn attach_tool(&mut self, name: &str, tool: Invocable) -> Result<(), AttachError> {
        self.insert(name.to_string(), tool);
        Ok(())
    }
}

/// Outcome of attaching every tool to an agent
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AttachReport {
    pub attached: Vec<String>,
    /// `(tool, error message)` for each rejected tool
    pub failed: Vec<(String, String)>,
}

impl AttachReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}
