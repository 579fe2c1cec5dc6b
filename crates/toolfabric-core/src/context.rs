//! Shared dependencies handed to every lifecycle component

use std::sync::Arc;

use crate::connection::{fixed_interval, LoopCounter, RetryPolicyFactory};
use crate::logging::SharedLogger;
use crate::tools::{global_functions, FunctionRegistry};

/// Logger, loop accounting, retry policy and function registry for one fabric
///
/// Cloning is cheap and shares everything, so all instances created from
/// one context report into the same [`LoopCounter`].
#[derive(Clone)]
pub struct FabricContext {
    pub logger: SharedLogger,
    pub loops: LoopCounter,
    pub retry: RetryPolicyFactory,
    pub functions: Arc<FunctionRegistry>,
}

impl FabricContext {
    /// Context with the global function registry and fixed-interval retries
    pub fn new(logger: SharedLogger) -> Self {
        Self {
            logger,
            loops: LoopCounter::new(),
            retry: fixed_interval(),
            functions: global_functions(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicyFactory) -> Self {
        self.retry = retry;
        self
    }

    /// Resolve function-backed tools against `functions` instead of the global registry
    pub fn with_functions(mut self, functions: Arc<FunctionRegistry>) -> Self {
        self.functions = functions;
        self
    }
}

impl std::fmt::Debug for FabricContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FabricContext")
            .field("active_loops", &self.loops.active())
            .finish()
    }
}
