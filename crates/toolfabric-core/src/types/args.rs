//! Arguments passed to an invocable

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::tools::InvocationError;

/// Keyword argument that marks an internal health probe call
pub const HEALTH_PROBE_KWARG: &str = "health";

/// Positional and keyword arguments for one tool call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolArgs {
    #[serde(default)]
    pub args: Vec<Value>,
    #[serde(default)]
    pub kwargs: Map<String, Value>,
}

impl ToolArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Positional arguments only
    pub fn positional<I, V>(args: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            kwargs: Map::new(),
        }
    }

    /// `(action, payload)` call shape used by process-backed tools
    pub fn action(action: impl Into<String>, payload: Value) -> Self {
        Self::new()
            .with_kwarg("action", Value::String(action.into()))
            .with_kwarg("payload", payload)
    }

    /// The designated argument set for internal health probes
    pub fn health_probe() -> Self {
        Self::new().with_kwarg(HEALTH_PROBE_KWARG, Value::Bool(true))
    }

    /// Append a positional argument
    pub fn with_arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    /// Set a keyword argument
    pub fn with_kwarg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.kwargs.insert(key.into(), value.into());
        self
    }

    pub fn arg(&self, index: usize) -> Option<&Value> {
        self.args.get(index)
    }

    pub fn kwarg(&self, key: &str) -> Option<&Value> {
        self.kwargs.get(key)
    }

    /// Whether this call is an internal health probe
    pub fn is_health_probe(&self) -> bool {
        matches!(self.kwargs.get(HEALTH_PROBE_KWARG), Some(Value::Bool(true)))
    }

    /// Positional argument as an integer
    pub fn int_arg(&self, index: usize) -> Result<i64, InvocationError> {
        self.arg(index)
            .and_then(Value::as_i64)
            .ok_or_else(|| InvocationError::InvalidArgument(format!("argument {} must be an integer", index)))
    }

    /// Positional argument as a string
    pub fn str_arg(&self, index: usize) -> Result<&str, InvocationError> {
        self.arg(index)
            .and_then(Value::as_str)
            .ok_or_else(|| InvocationError::InvalidArgument(format!("argument {} must be a string", index)))
    }

    /// Split into `(action, payload)`
    ///
    /// Keywords take precedence over positions; a missing payload is `{}`.
    pub fn action_parts(&self) -> (String, Value) {
        let action = self
            .kwarg("action")
            .or_else(|| self.arg(0))
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .unwrap_or_default();
        let payload = self
            .kwarg("payload")
            .or_else(|| self.arg(1))
            .filter(|v| !v.is_null())
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()));
        (action, payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_positional() {
        let args = ToolArgs::positional([21]);
        assert_eq!(args.int_arg(0).unwrap(), 21);
        assert!(args.int_arg(1).is_err());
        assert!(args.str_arg(0).is_err());
    }

    #[test]
    fn test_health_probe() {
        assert!(ToolArgs::health_probe().is_health_probe());
        assert!(!ToolArgs::positional([true]).is_health_probe());
        assert!(!ToolArgs::new().with_kwarg("health", "yes").is_health_probe());
    }

    #[test]
    fn test_action_parts_keywords() {
        let args = ToolArgs::action("goto", json!({"url": "https://example.com"}));
        let (action, payload) = args.action_parts();
        assert_eq!(action, "goto");
        assert_eq!(payload, json!({"url": "https://example.com"}));
    }

    #[test]
    fn test_action_parts_positional_default_payload() {
        let (action, payload) = ToolArgs::positional(["click"]).action_parts();
        assert_eq!(action, "click");
        assert_eq!(payload, json!({}));

        let (_, payload) = ToolArgs::positional([json!("click"), Value::Null]).action_parts();
        assert_eq!(payload, json!({}));
    }
}
