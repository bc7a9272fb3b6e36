//! Runtime configuration for ViennaMesh
//!
//! The configuration controls where plugins are searched for and how the
//! runtime logs. It is stored as TOML.
//!
//! # Config Location
//!
//! When no path is given, the config is read from the platform config dir:
//! - **Linux**: `~/.config/viennamesh/config.toml`
//! - **macOS**: `~/Library/Application Support/viennamesh/config.toml`
//! - **Windows**: `%APPDATA%\viennamesh\config.toml`
//!
//! # Example
//!
//! ```toml
//! [plugins]
//! directories = ["/opt/viennamesh/plugins"]
//! pattern = "libviennamesh_*.so"
//! load_on_startup = true
//!
//! [logging]
//! filter = "info,viennamesh=debug"
//! directory = "/var/log/viennamesh"
//! ```

use crate::error::{Result, ViennaMeshError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Directory name under the platform config dir
pub const APP_DIR: &str = "viennamesh";

/// Config filename
pub const CONFIG_FILE: &str = "config.toml";

/// Extra plugin directories, separated like `PATH`
pub const PLUGIN_PATH_ENV: &str = "VIENNAMESH_PLUGIN_PATH";

/// Default tracing filter
pub const DEFAULT_LOG_FILTER: &str = "info,viennamesh=debug";

// ==================== Plugin Settings ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginSettings {
    /// Directories scanned for plugin libraries, in order
    pub directories: Vec<PathBuf>,

    /// File name wildcard (`*` and `?`)
    pub pattern: String,

    /// Scan `directories` when the Context is created
    pub load_on_startup: bool,
}

impl Default for PluginSettings {
    fn default() -> Self {
        Self {
            directories: Vec::new(),
            pattern: crate::plugin::default_pattern(),
            load_on_startup: true,
        }
    }
}

// ==================== Logging Settings ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directives, used when `RUST_LOG` is unset
    pub filter: String,

    /// Write daily rolling log files here as well as to stderr
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
            directory: None,
        }
    }
}

// ==================== Runtime Config ====================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub plugins: PluginSettings,
    pub logging: LoggingConfig,
}

impl RuntimeConfig {
    /// Platform default config path
    pub fn default_path() -> Option<PathBuf> {
        dirs_next::config_dir().map(|p| p.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Load a config from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ViennaMeshError::Config(format!("Failed to read config {:?}: {}", path, e))
        })?;
        Self::from_toml_str(&content)
            .map_err(|e| e.with_context(format!("Loading config {:?}", path)))
    }

    /// Load the config, falling back to defaults if the file is missing
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| ViennaMeshError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Save the config as TOML, creating parent directories
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| ViennaMeshError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Append the directories listed in `VIENNAMESH_PLUGIN_PATH`
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(value) = std::env::var_os(PLUGIN_PATH_ENV) {
            for dir in std::env::split_paths(&value) {
                if dir.as_os_str().is_empty() || self.plugins.directories.contains(&dir) {
                    continue;
                }
                tracing::debug!("Plugin directory {:?} from {}", dir, PLUGIN_PATH_ENV);
                self.plugins.directories.push(dir);
            }
        }
        self
    }
}
