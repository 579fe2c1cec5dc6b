//! The tool supervisor

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use super::agent::{Agent, AttachReport};
use crate::config::{ConfigError, ConfigProvider, FileConfigProvider};
use crate::context::FabricContext;
use crate::logging::SharedLogger;
use crate::tools::{create_tool, ToolError, ToolInstance, ToolStatus};
use crate::types::Invocable;
use crate::{log_debug, log_error, log_info, log_warn};

/// Faults that cross [`Fabric::setup`]
#[derive(Debug, thiserror::Error)]
pub enum FabricError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to start tool {tool}: {source}")]
    Start {
        tool: String,
        #[source]
        source: ToolError,
    },

    #[error("Fabric already has running tools; call stop_all first")]
    AlreadyRunning,
}

pub type FabricResult<T> = Result<T, FabricError>;

/// Outcome of [`Fabric::stop_all`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StopReport {
    pub stopped: Vec<String>,
    /// `(tool, error message)` for tools that did not stop cleanly
    pub failed: Vec<(String, String)>,
}

/// Snapshot of the whole fabric
#[derive(Debug, Clone, Serialize)]
pub struct FabricStatus {
    pub tools: Vec<ToolStatus>,
    pub active_loops: usize,
}

/// Both maps always hold the same keys
#[derive(Default)]
struct Registry {
    instances: HashMap<String, ToolInstance>,
    invocables: HashMap<String, Invocable>,
}

impl Registry {
    fn sorted_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.instances.keys().cloned().collect();
        names.sort();
        names
    }
}

/// Supervisor owning every tool instance
///
/// `setup`, `attach_all_to_agent` and `stop_all` are serialized by one
/// registry guard. Agents only ever receive invocables.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use toolfabric_core::config::{MemoryConfigProvider, ToolSpec};
/// use toolfabric_core::tools::register_function;
/// use toolfabric_core::{Fabric, NoOpLogger};
///
/// register_function("doc.math", "double", |args| Ok((args.int_arg(0)? * 2).into()));
///
/// let config = MemoryConfigProvider::with_tools(vec![ToolSpec::function("double", "doc.math", "double")]);
/// let fabric = Fabric::new(Arc::new(config), Arc::new(NoOpLogger));
///
/// let tools = fabric.setup()?;
/// assert_eq!(tools["double"].call_with([21]), serde_json::json!(42));
///
/// fabric.stop_all();
/// assert_eq!(fabric.active_loops(), 0);
/// # Ok::<(), toolfabric_core::FabricError>(())
/// ```
pub struct Fabric {
    config: Arc<dyn ConfigProvider>,
    ctx: FabricContext,
    registry: Mutex<Registry>,
}

impl Fabric {
    pub fn new(config: Arc<dyn ConfigProvider>, logger: SharedLogger) -> Self {
        Self::with_context(config, FabricContext::new(logger))
    }

    /// Fabric with an explicit context (retry policy, function registry)
    pub fn with_context(config: Arc<dyn ConfigProvider>, ctx: FabricContext) -> Self {
        Self {
            config,
            ctx,
            registry: Mutex::new(Registry::default()),
        }
    }

    /// Fabric reading tool specs from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>, logger: SharedLogger) -> Self {
        let config = FileConfigProvider::from_path(path.as_ref());
        Self::new(Arc::new(config), logger)
    }

    pub fn context(&self) -> &FabricContext {
        &self.ctx
    }

    /// Build and start every configured tool
    ///
    /// A tool is registered only after it started. On the first failure the
    /// failing instance is stopped and the error returned; tools started
    /// before it stay registered until [`stop_all`](Self::stop_all).
    pub fn setup(&self) -> FabricResult<HashMap<String, Invocable>> {
        let mut registry = self.registry.lock();
        if !registry.instances.is_empty() {
            return Err(FabricError::AlreadyRunning);
        }

        let specs = self.config.tool_specs()?;
        log_debug!(self.ctx.logger, "[Fabric] Setting up {} tool(s)", specs.len());

        for spec in specs {
            let name = spec.name.clone();
            if registry.instances.contains_key(&name) {
                log_error!(self.ctx.logger, "[Fabric] Duplicate tool name: {}", name);
                return Err(ConfigError::DuplicateTool(name).into());
            }

            let mut instance = create_tool(spec, &self.ctx)?;
            if let Err(source) = instance.start() {
                log_error!(self.ctx.logger, "[Fabric] Failed to start {}: {}", name, source);
                if let Err(e) = instance.stop() {
                    log_warn!(self.ctx.logger, "[Fabric] Cleanup of {} failed: {}", name, e);
                }
                return Err(match source {
                    ToolError::Config(e) => FabricError::Config(e),
                    source => FabricError::Start { tool: name, source },
                });
            }

            let invocable = instance.to_invocable();
            registry.invocables.insert(name.clone(), invocable);
            registry.instances.insert(name.clone(), instance);
            log_info!(self.ctx.logger, "[Fabric] Loaded tool: {}", name);
        }

        Ok(registry.invocables.clone())
    }

    /// Attach every registered invocable to `agent`
    ///
    /// A rejected tool is logged and reported; the rest are still attached.
    pub fn attach_all_to_agent(&self, agent: &mut dyn Agent) -> AttachReport {
        let tools: Vec<(String, Invocable)> = {
            let registry = self.registry.lock();
            registry
                .sorted_names()
                .into_iter()
                .filter_map(|name| {
                    let invocable = registry.invocables.get(&name)?.clone();
                    Some((name, invocable))
                })
                .collect()
        };

        let mut report = AttachReport::default();
        for (name, invocable) in tools {
            match agent.attach_tool(&name, invocable) {
                Ok(()) => {
                    log_debug!(self.ctx.logger, "[Fabric] Attached {} to agent", name);
                    report.attached.push(name);
                }
                Err(e) => {
                    log_error!(self.ctx.logger, "[Fabric] Failed to attach {}: {}", name, e);
                    report.failed.push((name, e.to_string()));
                }
            }
        }
        report
    }

    /// Stop every tool and clear the registry
    ///
    /// One tool failing to stop does not keep the others running.
    pub fn stop_all(&self) -> StopReport {
        let mut registry = self.registry.lock();
        let mut report = StopReport::default();

        for name in registry.sorted_names() {
            let Some(instance) = registry.instances.get_mut(&name) else {
                continue;
            };
            match instance.stop() {
                Ok(()) => report.stopped.push(name),
                Err(e) => {
                    log_error!(self.ctx.logger, "[Fabric] Error stopping {}: {}", name, e);
                    report.failed.push((name, e.to_string()));
                }
            }
        }

        registry.instances.clear();
        registry.invocables.clear();

        if !report.stopped.is_empty() || !report.failed.is_empty() {
            log_info!(
                self.ctx.logger,
                "[Fabric] Stopped {} tool(s), {} active probe loop(s) left",
                report.stopped.len() + report.failed.len(),
                self.ctx.loops.active()
            );
        }
        report
    }

    pub fn invocable(&self, name: &str) -> Option<Invocable> {
        self.registry.lock().invocables.get(name).cloned()
    }

    pub fn invocables(&self) -> HashMap<String, Invocable> {
        self.registry.lock().invocables.clone()
    }

    /// Registered tool names, sorted
    pub fn tool_names(&self) -> Vec<String> {
        self.registry.lock().sorted_names()
    }

    pub fn is_running(&self) -> bool {
        !self.registry.lock().instances.is_empty()
    }

    /// Number of probe loops alive across all tools
    pub fn active_loops(&self) -> usize {
        self.ctx.loops.active()
    }

    pub fn status(&self) -> FabricStatus {
        let registry = self.registry.lock();
        let tools = registry
            .sorted_names()
            .iter()
            .filter_map(|name| registry.instances.get(name))
            .map(ToolInstance::status)
            .collect();
        FabricStatus {
            tools,
            active_loops: self.ctx.loops.active(),
        }
    }
}

impl Drop for Fabric {
    fn drop(&mut self) {
        self.stop_all();
    }
}

impl std::fmt::Debug for Fabric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fabric")
            .field("tools", &self.tool_names())
            .field("active_loops", &self.active_loops())
            .finish()
    }
}
