//! Runspace configuration.
//!
//! Configuration is loaded from `~/.config/objsh/runspace.toml`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

/// Configuration for runspace initialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunspaceConfig {
    /// Name of this runspace (for identification).
    #[serde(default = "default_name")]
    pub name: String,

    /// Separator placed between array elements when rendering text.
    ///
    /// The session variable `OFS` overrides this when set.
    #[serde(default = "default_separator")]
    pub output_field_separator: String,

    /// Capacity of the channel between two pipeline stages.
    #[serde(default = "default_stage_buffer")]
    pub stage_buffer: usize,

    /// Whether the built-in commands are registered at startup.
    #[serde(default = "default_true")]
    pub register_builtins: bool,
}

fn default_name() -> String {
    "default".to_string()
}

fn default_separator() -> String {
    objsh_types::DEFAULT_SEPARATOR.to_string()
}

fn default_stage_buffer() -> usize {
    64
}

fn default_true() -> bool {
    true
}

impl Default for RunspaceConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            output_field_separator: default_separator(),
            stage_buffer: default_stage_buffer(),
            register_builtins: default_true(),
        }
    }
}

impl RunspaceConfig {
    /// Create a transient runspace config (for temporary use).
    pub fn transient() -> Self {
        Self::named("transient")
    }

    /// Create a runspace config with the given name.
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Set the stage channel capacity. Zero is raised to one.
    pub fn with_stage_buffer(mut self, capacity: usize) -> Self {
        self.stage_buffer = capacity.max(1);
        self
    }

    /// Skip registering the built-in commands.
    pub fn without_builtins(mut self) -> Self {
        self.register_builtins = false;
        self
    }

    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, returns default configuration.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;

        let capacity = config.stage_buffer;
        Ok(config.with_stage_buffer(capacity))
    }

    /// Get the default config file path.
    pub fn config_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("", "", "objsh")
            .context("Could not determine config directory")?;

        Ok(dirs.config_dir().join("runspace.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = RunspaceConfig::default();
        assert_eq!(config.name, "default");
        assert_eq!(config.output_field_separator, " ");
        assert_eq!(config.stage_buffer, 64);
        assert!(config.register_builtins);
    }

    #[test]
    fn test_named_constructors() {
        assert_eq!(RunspaceConfig::transient().name, "transient");
        let config = RunspaceConfig::named("batch").with_stage_buffer(0);
        assert_eq!(config.name, "batch");
        assert_eq!(config.stage_buffer, 1);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "name = \"scripts\"\noutput_field_separator = \",\"").unwrap();

        let config = RunspaceConfig::load_from(file.path()).unwrap();
        assert_eq!(config.name, "scripts");
        assert_eq!(config.output_field_separator, ",");
        assert_eq!(config.stage_buffer, 64);
        assert!(config.register_builtins);
    }

    #[test]
    fn test_invalid_file_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "stage_buffer = \"lots\"").unwrap();

        let err = RunspaceConfig::load_from(file.path()).unwrap_err();
        assert!(format!("{err}").contains("Failed to parse config"));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = RunspaceConfig::load_from(&dir.path().join("absent.toml")).unwrap_err();
        assert!(format!("{err}").contains("Failed to read config"));
    }
}
