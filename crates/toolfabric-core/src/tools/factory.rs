//! Builds tool instances from specifications

use std::sync::Arc;

use super::function::FunctionBackend;
use super::instance::{ToolBackend, ToolInstance};
use super::process::ProcessBackend;
use crate::config::{Backend, ConfigResult, ToolSpec};
use crate::context::FabricContext;
use crate::log_warn;

/// Create an unstarted instance for `spec`
///
/// The backend is decided here, once. A spec with a `command` is
/// process-backed, one with `module` and `function` is function-backed, and
/// anything else is a configuration error. When both are present the command
/// wins and the function reference is ignored with a warning.
pub fn create_tool(spec: ToolSpec, ctx: &FabricContext) -> ConfigResult<ToolInstance> {
    if spec.is_ambiguous() {
        log_warn!(
            ctx.logger,
            "[Factory] Tool {} declares both 'command' and 'module'/'function'; using 'command'",
            spec.name
        );
    }

    let backend = match spec.backend()? {
        Backend::Process { command } => ToolBackend::Process(Arc::new(ProcessBackend::new(
            spec.name.clone(),
            command,
            spec.shutdown_timeout(),
            ctx.logger.clone(),
        ))),
        Backend::Function { module, function } => {
            ToolBackend::Function(Arc::new(FunctionBackend::new(spec.name.clone(), module, function)))
        }
    };

    Ok(ToolInstance::new(spec, backend, ctx.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;
    use crate::logging::MemoryLogger;
    use crate::types::ToolKind;

    fn context() -> (FabricContext, Arc<MemoryLogger>) {
        let logger = Arc::new(MemoryLogger::new());
        (FabricContext::new(logger.clone()), logger)
    }

    #[test]
    fn test_missing_backend_is_config_error() {
        let (ctx, _) = context();

        let mut bare = ToolSpec::function("bare", "m", "f");
        bare.module = None;
        bare.function = None;
        assert!(matches!(
            create_tool(bare, &ctx),
            Err(ConfigError::MissingBackend { tool }) if tool == "bare"
        ));

        let mut module_only = ToolSpec::function("half", "m", "f");
        module_only.function = None;
        assert!(matches!(create_tool(module_only, &ctx), Err(ConfigError::MissingBackend { .. })));
    }

    #[test]
    fn test_empty_command_is_config_error() {
        let (ctx, _) = context();
        let spec = ToolSpec::process("empty", Vec::<String>::new());
        assert!(matches!(create_tool(spec, &ctx), Err(ConfigError::EmptyCommand { .. })));
    }

    #[test]
    fn test_selects_backend() {
        let (ctx, _) = context();
        let process = create_tool(ToolSpec::process("p", ["sleep", "1"]), &ctx).unwrap();
        assert_eq!(process.kind(), ToolKind::Process);

        let function = create_tool(ToolSpec::function("f", "m", "f"), &ctx).unwrap();
        assert_eq!(function.kind(), ToolKind::Function);
    }

    #[test]
    fn test_ambiguous_spec_prefers_command() {
        let (ctx, logger) = context();
        let mut spec = ToolSpec::process("both", ["sleep", "1"]);
        spec.module = Some("m".into());
        spec.function = Some("f".into());

        let tool = create_tool(spec, &ctx).unwrap();
        assert_eq!(tool.kind(), ToolKind::Process);
        assert_eq!(logger.count_containing("using 'command'"), 1);
    }
}
