//! Output collection.
//!
//! Runs once, after a genuine success, and maps the declared output ports of
//! the workflow contract onto outputs of the last good unit.

use log::warn;
use serde_json::json;

use crate::domain::{SubmissionUnit, UnitOutputs, WorkflowContract, WorkflowRecord, event_types};

/// What collection produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Collected {
    pub outputs: UnitOutputs,
    /// Required ports the unit did not produce
    pub missing: Vec<String>,
}

pub struct ResultCollector<'a> {
    contract: &'a WorkflowContract,
}

impl<'a> ResultCollector<'a> {
    pub fn new(contract: &'a WorkflowContract) -> Self {
        Self { contract }
    }

    /// Attach every declared port found on `unit`.
    ///
    /// Optional ports are skipped silently when absent; required ones are
    /// listed in [`Collected::missing`].
    pub fn collect(&self, unit: &SubmissionUnit) -> Collected {
        let produced = unit.outcome().and_then(|o| o.outputs());
        let mut collected = Collected::default();

        for port in &self.contract.outputs {
            match produced.and_then(|outputs| outputs.get(&port.name)) {
                Some(value) => {
                    collected.outputs.insert(port.name.clone(), value.clone());
                }
                None if port.required => collected.missing.push(port.name.clone()),
                None => {}
            }
        }
        collected
    }

    /// Collect from the record's last good unit into the record.
    ///
    /// Missing required outputs become diagnostics; they never change the
    /// workflow result. Returns false when there is no successful unit.
    pub fn apply(&self, record: &mut WorkflowRecord) -> bool {
        let Some(unit) = record.state.last_good_unit.as_ref().filter(|_| record.state.finished) else {
            return false;
        };
        let handle = unit.handle.clone();
        let Collected { outputs, missing } = self.collect(unit);

        for port in missing {
            let message = format!("required output '{}' missing from calculation {}", port, handle);
            warn!("[{}] {}", record.id, message);
            record.diagnostics.push(message.clone());
            record.report(
                event_types::OUTPUT_MISSING,
                message,
                json!({"port": port, "handle": handle}),
            );
        }
        record.outputs = outputs;
        true
    }
}
