//! Configuration system for Restartr.
//!
//! A single YAML file supplies workflow defaults, the checkpoint directory,
//! the log level and the pseudopotential library.

mod global;

use std::path::PathBuf;

use eyre::Result;

pub use self::global::{GlobalConfig, StorageConfig, WorkflowDefaults};

/// Load and validate configuration from the standard search paths.
pub fn load_config(explicit_path: Option<&PathBuf>) -> Result<GlobalConfig> {
    let config = GlobalConfig::load(explicit_path)?;
    config.validate()?;
    Ok(config)
}
