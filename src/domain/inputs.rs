//! Caller-facing workflow inputs.
//!
//! [`WorkflowInputs`] is what a caller submits; the setup phase turns it into
//! the first [`crate::domain::InputSnapshot`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::WorkflowDefaults;

fn default_protocol() -> String {
    "standard".to_string()
}

/// Inputs declared by the base workflow contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowInputs {
    /// Atomic structure; opaque apart from its `kinds` list
    pub structure: Value,
    /// Scheduler options for the external program
    pub options: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kpoints: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bandskpoints: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub basis: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Value>,
    /// Explicit kind → pseudopotential mapping
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pseudos: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pseudo_family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_folder: Option<Value>,
    #[serde(default = "default_protocol")]
    pub protocol: String,
    #[serde(default)]
    pub relax: bool,
    #[serde(default)]
    pub autobands: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_iterations: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clean_workdir: Option<bool>,
}

impl WorkflowInputs {
    /// Minimal inputs: a structure and scheduler options.
    pub fn new(structure: Value, options: Value) -> Self {
        Self {
            structure,
            options,
            parameters: None,
            kpoints: None,
            bandskpoints: None,
            basis: None,
            settings: None,
            pseudos: None,
            pseudo_family: None,
            parent_folder: None,
            protocol: default_protocol(),
            relax: false,
            autobands: false,
            max_iterations: None,
            clean_workdir: None,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = Some(max_iterations);
        self
    }

    pub fn with_clean_workdir(mut self, clean_workdir: bool) -> Self {
        self.clean_workdir = Some(clean_workdir);
        self
    }

    pub fn effective_max_iterations(&self, defaults: &WorkflowDefaults) -> u32 {
        self.max_iterations.unwrap_or(defaults.max_iterations)
    }

    pub fn effective_clean_workdir(&self, defaults: &WorkflowDefaults) -> bool {
        self.clean_workdir.unwrap_or(defaults.clean_workdir)
    }
}
