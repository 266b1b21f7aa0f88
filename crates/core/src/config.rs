//! Sync engine configuration
//!
//! Defaults work with no file present; a TOML file overrides per field.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Which merge strategy the engine should use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyChoice {
    /// Probe the local git installation and pick for it
    #[default]
    Auto,
    ThreeWay,
    Worktree,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Base directory for per-project working copies
    pub base_dir: PathBuf,
    /// Shell commands run against a file before it is pushed; any non-zero
    /// exit aborts the write transaction
    pub validation_hooks: Vec<String>,
    pub strategy: StrategyChoice,
    /// Commit identity; working copies are provisioned with it so commits
    /// never depend on host gitconfig
    pub commit_name: String,
    pub commit_email: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        let base_dir = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".gasket")
            .join("projects");
        Self {
            base_dir,
            validation_hooks: Vec::new(),
            strategy: StrategyChoice::Auto,
            commit_name: "gasket".to_string(),
            commit_email: "gasket@localhost".to_string(),
        }
    }
}

impl SyncConfig {
    /// Load from a TOML file, falling back to defaults if it does not exist
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
        toml::from_str(&raw).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))
    }

    /// Working-copy directory for one project
    pub fn project_dir(&self, project_id: &str) -> PathBuf {
        self.base_dir.join(project_id)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {0}: {1}")]
    Read(PathBuf, #[source] std::io::Error),
    #[error("failed to parse config {0}: {1}")]
    Parse(PathBuf, #[source] toml::de::Error),
}
