//! In-memory configuration provider

use parking_lot::RwLock;

use super::spec::ToolSpec;
use super::traits::{ConfigProvider, ConfigResult};

/// In-memory configuration provider for testing and embedding
#[derive(Debug, Default)]
pub struct MemoryConfigProvider {
    tools: RwLock<Vec<ToolSpec>>,
}

impl MemoryConfigProvider {
    /// Create a new empty memory config provider
    pub fn new() -> Self {
        Self {
            tools: RwLock::new(Vec::new()),
        }
    }

    /// Create a memory config provider with initial tool specs
    pub fn with_tools(tools: Vec<ToolSpec>) -> Self {
        Self {
            tools: RwLock::new(tools),
        }
    }

    /// Append a tool spec
    pub fn add_tool(&self, spec: ToolSpec) {
        self.tools.write().push(spec);
    }

    /// Remove every spec with this name, returning whether any was removed
    pub fn remove_tool(&self, name: &str) -> bool {
        let mut tools = self.tools.write();
        let before = tools.len();
        tools.retain(|t| t.name != name);
        tools.len() != before
    }

    /// Replace all specs
    pub fn set_tools(&self, tools: Vec<ToolSpec>) {
        *self.tools.write() = tools;
    }

    /// Clear all specs
    pub fn clear(&self) {
        self.tools.write().clear();
    }
}

impl ConfigProvider for MemoryConfigProvider {
    fn tool_specs(&self) -> ConfigResult<Vec<ToolSpec>> {
        Ok(self.tools.read().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_provider() {
        let provider = MemoryConfigProvider::new();
        assert!(provider.tool_specs().unwrap().is_empty());

        provider.add_tool(ToolSpec::function("echo", "m", "f"));
        provider.add_tool(ToolSpec::process("sleeper", ["sleep", "100"]));
        let names: Vec<_> = provider
            .tool_specs()
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["echo", "sleeper"]);

        assert!(provider.remove_tool("echo"));
        assert!(!provider.remove_tool("echo"));
        assert_eq!(provider.tool_specs().unwrap().len(), 1);

        provider.clear();
        assert!(provider.tool_specs().unwrap().is_empty());
    }
}
