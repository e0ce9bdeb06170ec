//! Input preparation.
//!
//! Turns caller inputs into the first snapshot. Protocol presets and other
//! physics heuristics belong to the collaborators behind this trait; the
//! default preparer only copies explicit slots and resolves pseudopotentials.

use std::sync::Arc;

use log::debug;
use serde_json::{Value, json};
use thiserror::Error;

use super::pseudos::{PseudoError, PseudoFamilyLookup, resolve_pseudos};
use crate::domain::{ExitCode, InputSnapshot, WorkflowContract, WorkflowInputs, slots};

/// Why the inputs were rejected before any submission.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrepareError {
    #[error("input '{slot}' {reason}")]
    InvalidInput { slot: String, reason: String },

    #[error(transparent)]
    Pseudos(#[from] PseudoError),
}

impl PrepareError {
    /// Terminal exit code for this rejection
    pub fn exit_code(&self) -> ExitCode {
        match self {
            PrepareError::InvalidInput { .. } => ExitCode::InvalidInput,
            PrepareError::Pseudos(_) => ExitCode::InvalidInputPseudoPotentials,
        }
    }
}

/// Builds the first input snapshot of a workflow.
pub trait InputPreparer: Send + Sync {
    fn prepare(&self, contract: &WorkflowContract, inputs: &WorkflowInputs) -> Result<InputSnapshot, PrepareError>;
}

/// Copies explicit slots and resolves pseudopotentials.
pub struct DefaultPreparer {
    pseudos: Arc<dyn PseudoFamilyLookup>,
}

impl DefaultPreparer {
    pub fn new(pseudos: Arc<dyn PseudoFamilyLookup>) -> Self {
        Self { pseudos }
    }

    fn check(contract: &WorkflowContract, slot: &str, value: &Value) -> Result<(), PrepareError> {
        if let Some(declared) = contract.input(slot)
            && !declared.kind.accepts(value)
        {
            return Err(PrepareError::InvalidInput {
                slot: slot.to_string(),
                reason: format!("must be of kind {:?}", declared.kind),
            });
        }
        Ok(())
    }
}

impl InputPreparer for DefaultPreparer {
    fn prepare(&self, contract: &WorkflowContract, inputs: &WorkflowInputs) -> Result<InputSnapshot, PrepareError> {
        if inputs.structure.is_null() {
            return Err(PrepareError::InvalidInput {
                slot: slots::STRUCTURE.to_string(),
                reason: "is required".to_string(),
            });
        }

        let optional = [
            (slots::PARAMETERS, &inputs.parameters),
            (slots::KPOINTS, &inputs.kpoints),
            (slots::BANDSKPOINTS, &inputs.bandskpoints),
            (slots::BASIS, &inputs.basis),
            (slots::SETTINGS, &inputs.settings),
        ];

        Self::check(contract, slots::STRUCTURE, &inputs.structure)?;
        Self::check(contract, slots::OPTIONS, &inputs.options)?;

        let mut snapshot = InputSnapshot::new()
            .set(slots::STRUCTURE, inputs.structure.clone())
            .set(slots::OPTIONS, inputs.options.clone())
            .set(slots::PROTOCOL, json!(inputs.protocol))
            .set(slots::RELAX, json!(inputs.relax))
            .set(slots::AUTOBANDS, json!(inputs.autobands));

        for (slot, value) in optional {
            if let Some(value) = value {
                Self::check(contract, slot, value)?;
                snapshot = snapshot.set(slot, value.clone());
            }
        }

        // A caller-supplied parent restarts the first submission from its state
        if let Some(parent) = &inputs.parent_folder {
            Self::check(contract, slots::PARENT_FOLDER, parent)?;
            snapshot = snapshot.set(slots::PARENT_CALC_FOLDER, parent.clone());
        }

        let pseudos = resolve_pseudos(
            &inputs.structure,
            inputs.pseudos.as_ref(),
            inputs.pseudo_family.as_deref(),
            &inputs.protocol,
            self.pseudos.as_ref(),
        )?;
        debug!("Resolved pseudos for kinds: {:?}", pseudos.keys().collect::<Vec<_>>());

        Ok(snapshot.set(slots::PSEUDOS, Value::Object(pseudos)))
    }
}
