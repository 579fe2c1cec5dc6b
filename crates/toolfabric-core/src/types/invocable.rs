//! The uniform callable a tool exposes to an agent

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::args::ToolArgs;

/// Backend kind of a tool, as seen by the agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    Process,
    Function,
}

impl ToolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolKind::Process => "process",
            ToolKind::Function => "function",
        }
    }
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Signature of the closure behind an [`Invocable`]
pub type InvokeFn = dyn Fn(&ToolArgs) -> Value + Send + Sync;

/// Callable surface of one tool
///
/// Never fails: backend faults come back as values. Process-backed tools
/// return an acknowledgement string, function-backed tools return the
/// function result or `{"error": message}`.
#[derive(Clone)]
pub struct Invocable {
    name: String,
    kind: ToolKind,
    func: Arc<InvokeFn>,
}

impl Invocable {
    pub fn new<F>(name: impl Into<String>, kind: ToolKind, func: F) -> Self
    where
        F: Fn(&ToolArgs) -> Value + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            kind,
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ToolKind {
        self.kind
    }

    /// Invoke the tool
    pub fn call(&self, args: &ToolArgs) -> Value {
        (self.func)(args)
    }

    /// Invoke with positional arguments
    pub fn call_with<I, V>(&self, args: I) -> Value
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.call(&ToolArgs::positional(args))
    }

    /// Invoke with the `(action, payload)` shape
    pub fn call_action(&self, action: &str, payload: Value) -> Value {
        self.call(&ToolArgs::action(action, payload))
    }
}

impl std::fmt::Debug for Invocable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Invocable")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish()
    }
}
