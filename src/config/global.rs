//! Global configuration.
//!
//! Loaded from ~/.config/restartr/restartr.yml or .restartr.yml

use std::fs;
use std::path::{Path, PathBuf};

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::BASE_WORKFLOW_KIND;
use crate::setup::StaticPseudoLibrary;

/// Global configuration for Restartr.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct GlobalConfig {
    /// Log filter used when RUST_LOG is unset.
    #[serde(rename = "log-level", skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// Defaults applied to every workflow.
    pub workflow: WorkflowDefaults,

    /// Where workflow checkpoints live.
    pub storage: StorageConfig,

    /// Pseudopotential families and protocol defaults.
    pub pseudos: StaticPseudoLibrary,
}

impl GlobalConfig {
    /// Load configuration with fallback chain.
    ///
    /// Search order:
    /// 1. Explicit path if provided
    /// 2. .restartr.yml in current directory
    /// 3. ~/.config/restartr/restartr.yml
    /// 4. Defaults
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        let project_config = PathBuf::from(".restartr.yml");
        if project_config.exists() {
            match Self::load_from_file(&project_config) {
                Ok(config) => {
                    log::info!("Loaded config from .restartr.yml");
                    return Ok(config);
                }
                Err(e) => log::warn!("Failed to load .restartr.yml: {}", e),
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("restartr").join("restartr.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => {
                        log::info!("Loaded config from {}", user_config.display());
                        return Ok(config);
                    }
                    Err(e) => log::warn!("Failed to load {}: {}", user_config.display(), e),
                }
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.workflow.max_iterations == 0 {
            eyre::bail!("workflow.max-iterations must be > 0");
        }
        if self.workflow.kind.trim().is_empty() {
            eyre::bail!("workflow.kind must not be empty");
        }
        Ok(())
    }
}

/// Defaults for inputs a caller leaves out.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkflowDefaults {
    /// Workflow kind used when a run names none.
    pub kind: String,

    #[serde(rename = "max-iterations")]
    pub max_iterations: u32,

    /// Clean remote resources of every submitted unit on termination.
    #[serde(rename = "clean-workdir")]
    pub clean_workdir: bool,
}

impl Default for WorkflowDefaults {
    fn default() -> Self {
        Self {
            kind: BASE_WORKFLOW_KIND.to_string(),
            max_iterations: 5,
            clean_workdir: false,
        }
    }
}

/// Storage settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    #[serde(rename = "state-dir")]
    pub state_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let state_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("restartr")
            .join("state");
        Self { state_dir }
    }
}
