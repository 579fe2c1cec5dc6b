//! File-based configuration provider (YAML)
//!
//! Supports user-level (~/.config/toolfabric/config.yaml) and workspace-level
//! (.config/toolfabric/config.yaml) config.

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::spec::ToolSpec;
use super::traits::{ConfigError, ConfigProvider, ConfigResult};

/// Configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConfigFile {
    /// Tool specifications, started in this order
    #[serde(default)]
    pub tools: Vec<ToolSpec>,
}

impl ConfigFile {
    /// Parse a YAML document
    pub fn from_yaml(content: &str) -> ConfigResult<Self> {
        // An empty document is a valid, empty config
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
            .map_err(|e| ConfigError::Yaml(format!("Failed to parse YAML: {}", e)))
    }

    /// Render as YAML
    pub fn to_yaml(&self) -> ConfigResult<String> {
        serde_yaml::to_string(self)
            .map_err(|e| ConfigError::Yaml(format!("Failed to serialize YAML: {}", e)))
    }
}

/// Config level (user or workspace)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLevel {
    /// User-level config (~/.config/toolfabric/config.yaml)
    User,
    /// Workspace-level config (.config/toolfabric/config.yaml in workspace root)
    Workspace,
    /// Explicit path given by the caller
    Custom,
}

impl ConfigLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigLevel::User => "user",
            ConfigLevel::Workspace => "workspace",
            ConfigLevel::Custom => "custom",
        }
    }
}

/// File-based configuration provider
///
/// Reads tool specifications from a YAML file. The parsed file is cached
/// until [`reload`](Self::reload) is called.
///
/// # Example
///
/// ```no_run
/// use toolfabric_core::config::{ConfigProvider, FileConfigProvider};
///
/// let config = FileConfigProvider::workspace("/path/to/workspace");
/// let specs = config.tool_specs()?;
/// # Ok::<(), toolfabric_core::config::ConfigError>(())
/// ```
pub struct FileConfigProvider {
    path: PathBuf,
    level: ConfigLevel,
    cache: RwLock<Option<ConfigFile>>,
}

impl FileConfigProvider {
    /// Create a new file config provider for a specific path
    pub fn new(path: impl Into<PathBuf>, level: ConfigLevel) -> Self {
        Self {
            path: path.into(),
            level,
            cache: RwLock::new(None),
        }
    }

    /// Create a provider for an explicit file
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self::new(path, ConfigLevel::Custom)
    }

    /// Create a user-level config provider (~/.config/toolfabric/config.yaml)
    pub fn user() -> Self {
        // XDG config directory (~/.config on Linux, ~/Library/Application Support on macOS)
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".config"));
        let path = config_dir.join("toolfabric").join("config.yaml");
        Self::new(path, ConfigLevel::User)
    }

    /// Create a workspace-level config provider (.config/toolfabric/config.yaml)
    pub fn workspace(workspace_root: impl AsRef<Path>) -> Self {
        let path = workspace_root.as_ref().join(".config").join("toolfabric").join("config.yaml");
        Self::new(path, ConfigLevel::Workspace)
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the config level
    pub fn level(&self) -> ConfigLevel {
        self.level
    }

    /// Check if the config file exists
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load config from file; a missing file is an empty config
    fn load(&self) -> ConfigResult<ConfigFile> {
        if !self.path.exists() {
            return Ok(ConfigFile::default());
        }

        let content = fs::read_to_string(&self.path)?;
        ConfigFile::from_yaml(&content)
    }

    /// Get cached or load config
    fn get_config(&self) -> ConfigResult<ConfigFile> {
        if let Some(config) = self.cache.read().as_ref() {
            return Ok(config.clone());
        }

        let config = self.load()?;
        *self.cache.write() = Some(config.clone());
        Ok(config)
    }

    /// Reload config from disk (invalidate cache)
    pub fn reload(&self) -> ConfigResult<ConfigFile> {
        let config = self.load()?;
        *self.cache.write() = Some(config.clone());
        Ok(config)
    }

    /// Write a config to this provider's path and refresh the cache
    pub fn save(&self, config: &ConfigFile) -> ConfigResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, config.to_yaml()?)?;
        *self.cache.write() = Some(config.clone());
        Ok(())
    }
}

impl std::fmt::Debug for FileConfigProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileConfigProvider")
            .field("path", &self.path)
            .field("level", &self.level)
            .field("exists", &self.exists())
            .finish()
    }
}

impl ConfigProvider for FileConfigProvider {
    fn tool_specs(&self) -> ConfigResult<Vec<ToolSpec>> {
        Ok(self.get_config()?.tools)
    }
}
