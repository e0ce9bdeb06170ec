//! Helpers for workflows that depend on other workflows.

use crate::domain::{ExitCode, UnitOutputs, WorkflowInputs, WorkflowRecord};
use crate::handlers::builtin::outputs;

/// Outputs of a dependency, or `WORKFLOW_FAILED` if it did not finish ok.
pub fn require_finished_ok(record: &WorkflowRecord) -> Result<&UnitOutputs, ExitCode> {
    match &record.result {
        Some(result) if result.is_finished_ok() => Ok(&record.outputs),
        _ => Err(ExitCode::WorkflowFailed),
    }
}

/// Inputs for a follow-up workflow that restarts from `record`.
///
/// The relaxed structure is carried forward when the workflow produced one,
/// and the final remote folder becomes the parent folder.
pub fn restart_inputs(record: &WorkflowRecord) -> WorkflowInputs {
    let mut inputs = record.inputs.clone();
    if let Some(structure) = record.outputs.get(outputs::OUTPUT_STRUCTURE) {
        inputs.structure = structure.clone();
    }
    if let Some(remote) = record.outputs.get(outputs::REMOTE_FOLDER) {
        inputs.parent_folder = Some(remote.clone());
    }
    inputs
}
