//! Function-backed tools and the registry they resolve against
//!
//! A function-backed tool names a `module` and a `function`. Both are keys
//! into a [`FunctionRegistry`]; the embedding program registers its callables
//! before the fabric starts, and resolution happens at tool start.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use once_cell::sync::{Lazy, OnceCell};
use parking_lot::RwLock;
use serde_json::{json, Value};

use super::error::{HealthError, HealthResult, InvocationError, InvocationResult};
use crate::config::ConfigError;
use crate::connection::Connection;
use crate::logging::SharedLogger;
use crate::types::{Invocable, ToolArgs, ToolKind};
use crate::{log_debug, log_error};

/// An in-process tool function
pub type ToolFn = Arc<dyn Fn(&ToolArgs) -> InvocationResult<Value> + Send + Sync>;

/// Callables keyed by module, then function name
#[derive(Default)]
pub struct FunctionRegistry {
    modules: RwLock<HashMap<String, HashMap<String, ToolFn>>>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callable, replacing any existing one under the same key
    pub fn register<F>(&self, module: &str, function: &str, func: F)
    where
        F: Fn(&ToolArgs) -> InvocationResult<Value> + Send + Sync + 'static,
    {
        self.modules
            .write()
            .entry(module.to_string())
            .or_default()
            .insert(function.to_string(), Arc::new(func));
    }

    pub fn resolve(&self, module: &str, function: &str) -> Option<ToolFn> {
        self.modules.read().get(module)?.get(function).cloned()
    }

    pub fn has(&self, module: &str, function: &str) -> bool {
        self.resolve(module, function).is_some()
    }

    pub fn unregister(&self, module: &str, function: &str) -> bool {
        let mut modules = self.modules.write();
        let Some(functions) = modules.get_mut(module) else {
            return false;
        };
        let removed = functions.remove(function).is_some();
        if functions.is_empty() {
            modules.remove(module);
        }
        removed
    }

    /// All registered `(module, function)` pairs, sorted
    pub fn list(&self) -> Vec<(String, String)> {
        let mut list: Vec<_> = self
            .modules
            .read()
            .iter()
            .flat_map(|(module, functions)| {
                functions.keys().map(move |f| (module.clone(), f.clone()))
            })
            .collect();
        list.sort();
        list
    }
}

impl std::fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.list())
            .finish()
    }
}

/// Process-wide registry used unless a fabric is given its own
static GLOBAL_FUNCTIONS: Lazy<Arc<FunctionRegistry>> = Lazy::new(|| Arc::new(FunctionRegistry::new()));

/// Handle to the process-wide function registry
pub fn global_functions() -> Arc<FunctionRegistry> {
    GLOBAL_FUNCTIONS.clone()
}

/// Register a callable in the process-wide registry
///
/// # Example
///
/// ```
/// use toolfabric_core::tools::{register_function, InvocationError};
///
/// register_function("demo.math", "double", |args| {
///     let x = args.int_arg(0)?;
///     x.checked_mul(2)
///         .map(Into::into)
///         .ok_or_else(|| InvocationError::failed("overflow"))
/// });
/// ```
pub fn register_function<F>(module: &str, function: &str, func: F)
where
    F: Fn(&ToolArgs) -> InvocationResult<Value> + Send + Sync + 'static,
{
    GLOBAL_FUNCTIONS.register(module, function, func);
}

/// Backend of a function-backed tool
pub struct FunctionBackend {
    tool: String,
    module: String,
    function: String,
    resolved: OnceCell<ToolFn>,
}

impl FunctionBackend {
    pub fn new(tool: impl Into<String>, module: impl Into<String>, function: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            module: module.into(),
            function: function.into(),
            resolved: OnceCell::new(),
        }
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn function(&self) -> &str {
        &self.function
    }

    /// `module.function`, for logs
    pub fn target(&self) -> String {
        format!("{}.{}", self.module, self.function)
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved.get().is_some()
    }

    /// Resolve the callable; an unknown reference is a configuration error
    pub fn start(&self, registry: &FunctionRegistry) -> Result<(), ConfigError> {
        if self.is_resolved() {
            return Ok(());
        }
        let func = registry
            .resolve(&self.module, &self.function)
            .ok_or_else(|| ConfigError::UnresolvedFunction {
                tool: self.tool.clone(),
                module: self.module.clone(),
                function: self.function.clone(),
            })?;
        let _ = self.resolved.set(func);
        Ok(())
    }

    /// Call the function, turning a panic into an error
    pub fn call(&self, args: &ToolArgs) -> InvocationResult<Value> {
        let func = self
            .resolved
            .get()
            .ok_or_else(|| InvocationError::failed(format!("{} is not started", self.tool)))?;

        match catch_unwind(AssertUnwindSafe(|| func(args))) {
            Ok(result) => result,
            Err(panic) => Err(InvocationError::Panicked(panic_message(&*panic))),
        }
    }

    /// Call the function with the health-probe argument; any error is unhealthy
    pub fn health_check(&self) -> HealthResult<()> {
        if !self.is_resolved() {
            return Err(HealthError::NotStarted);
        }
        self.call(&ToolArgs::health_probe())
            .map(|_| ())
            .map_err(|e| HealthError::Probe(e.to_string()))
    }

    /// Callable that runs the function and forwards its result to `connections`
    pub fn invocable(
        self: &Arc<Self>,
        connections: Vec<Arc<Connection>>,
        logger: SharedLogger,
    ) -> Invocable {
        let backend = self.clone();
        let label = format!("[FunctionTool:{}]", self.tool);

        Invocable::new(self.tool.clone(), ToolKind::Function, move |args| {
            match backend.call(args) {
                Ok(result) => {
                    if !connections.is_empty() {
                        let forward = json!({ "result": result });
                        for conn in &connections {
                            if conn.send(&forward).is_none() {
                                log_debug!(logger, "{} Result not forwarded to {}", label, conn.name());
                            }
                        }
                    }
                    result
                }
                Err(e) => {
                    log_error!(logger, "{} ERROR: {}", label, e);
                    json!({ "error": e.to_string() })
                }
            }
        })
    }
}

impl std::fmt::Debug for FunctionBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionBackend")
            .field("tool", &self.tool)
            .field("target", &self.target())
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NoOpLogger;

    fn registry() -> FunctionRegistry {
        let registry = FunctionRegistry::new();
        registry.register("m", "double", |args| Ok(json!(args.int_arg(0)? * 2)));
        registry.register("m", "fail", |_| Err(InvocationError::failed("boom")));
        registry.register("m", "panic", |_| panic!("kaboom"));
        registry
    }

    #[test]
    fn test_registry_resolve_and_list() {
        let registry = registry();
        assert!(registry.has("m", "double"));
        assert!(!registry.has("m", "missing"));
        assert!(!registry.has("other", "double"));

        let listed = registry.list();
        assert_eq!(listed[0], ("m".to_string(), "double".to_string()));
        assert_eq!(listed.len(), 3);

        assert!(registry.unregister("m", "double"));
        assert!(!registry.unregister("m", "double"));
        assert!(!registry.has("m", "double"));
    }

    #[test]
    fn test_global_registry() {
        register_function("test_function_global", "id", |args| {
            Ok(args.arg(0).cloned().unwrap_or(Value::Null))
        });
        assert!(global_functions().has("test_function_global", "id"));
        assert!(global_functions().unregister("test_function_global", "id"));
    }

    #[test]
    fn test_unresolved_function_is_config_error() {
        let backend = FunctionBackend::new("echo", "m", "missing");
        let err = backend.start(&registry()).unwrap_err();
        assert!(matches!(err, ConfigError::UnresolvedFunction { function, .. } if function == "missing"));
        assert_eq!(backend.health_check(), Err(HealthError::NotStarted));
    }

    #[test]
    fn test_call_before_start_fails() {
        let backend = FunctionBackend::new("echo", "m", "double");
        assert!(backend.call(&ToolArgs::positional([1])).is_err());
    }

    #[test]
    fn test_invocable_returns_result() {
        let backend = Arc::new(FunctionBackend::new("echo", "m", "double"));
        backend.start(&registry()).unwrap();

        let invocable = backend.invocable(Vec::new(), Arc::new(NoOpLogger));
        assert_eq!(invocable.kind(), ToolKind::Function);
        assert_eq!(invocable.call_with([21]), json!(42));
    }

    #[test]
    fn test_invocable_converts_errors() {
        let registry = registry();
        let logger: SharedLogger = Arc::new(NoOpLogger);

        let failing = Arc::new(FunctionBackend::new("f", "m", "fail"));
        failing.start(&registry).unwrap();
        assert_eq!(
            failing.invocable(Vec::new(), logger.clone()).call_with([1]),
            json!({"error": "boom"})
        );

        let bad_args = Arc::new(FunctionBackend::new("d", "m", "double"));
        bad_args.start(&registry).unwrap();
        let reply = bad_args.invocable(Vec::new(), logger.clone()).call_with(["x"]);
        assert!(reply["error"].as_str().unwrap().contains("must be an integer"));

        let panicking = Arc::new(FunctionBackend::new("p", "m", "panic"));
        panicking.start(&registry).unwrap();
        let reply = panicking.invocable(Vec::new(), logger).call_with([1]);
        assert!(reply["error"].as_str().unwrap().contains("kaboom"));
    }

    #[test]
    fn test_health_check_uses_probe_argument() {
        let registry = FunctionRegistry::new();
        registry.register("m", "probe_aware", |args| {
            if args.is_health_probe() {
                Ok(json!("ok"))
            } else {
                Err(InvocationError::failed("not a probe"))
            }
        });
        registry.register("m", "needs_int", |args| Ok(json!(args.int_arg(0)?)));

        let aware = FunctionBackend::new("a", "m", "probe_aware");
        aware.start(&registry).unwrap();
        assert_eq!(aware.health_check(), Ok(()));

        let strict = FunctionBackend::new("s", "m", "needs_int");
        strict.start(&registry).unwrap();
        assert!(matches!(strict.health_check(), Err(HealthError::Probe(_))));
    }
}
