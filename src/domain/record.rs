//! Workflow record.
//!
//! The [`WorkflowRecord`] is everything needed to continue a restart loop
//! after a process restart: loop state, the pending snapshot, the in-flight
//! unit, the unit history, and the report log.

use log::info;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::event::EventRecord;
use super::inputs::WorkflowInputs;
use super::outcome::{LoopOutcome, UnitOutputs};
use super::snapshot::InputSnapshot;
use super::state::LoopState;
use super::unit::SubmissionUnit;
use crate::id::{generate_workflow_id, now_ms};
use crate::storage::HasId;

/// Collection name used for workflow records
pub const WORKFLOW_COLLECTION: &str = "workflows";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRecord {
    //=== Identity ===
    pub id: String,
    /// Workflow kind, keys the handler registry
    pub kind: String,

    //=== Configuration ===
    pub inputs: WorkflowInputs,
    pub clean_workdir: bool,

    //=== Runtime State ===
    pub state: LoopState,
    /// Snapshot the next submission will use
    pub snapshot: InputSnapshot,
    /// Unit submitted but not yet observed terminal
    pub in_flight: Option<SubmissionUnit>,
    /// Units that reached a terminal outcome, in submission order
    pub units: Vec<SubmissionUnit>,

    //=== Results ===
    pub outputs: UnitOutputs,
    /// Soft warnings that did not change the result
    pub diagnostics: Vec<String>,
    pub reports: Vec<EventRecord>,
    pub result: Option<LoopOutcome>,
    /// Termination cleanup already ran
    pub cleaned: bool,

    //=== Timestamps ===
    pub created_at: i64,
    pub updated_at: i64,
}

impl HasId for WorkflowRecord {
    fn id(&self) -> &str {
        &self.id
    }
}

impl WorkflowRecord {
    /// Create a record in the setup phase.
    pub fn new(kind: impl Into<String>, inputs: WorkflowInputs, max_iterations: u32, clean_workdir: bool) -> Self {
        let now = now_ms();
        Self {
            id: generate_workflow_id(),
            kind: kind.into(),
            inputs,
            clean_workdir,
            state: LoopState::new(max_iterations),
            snapshot: InputSnapshot::new(),
            in_flight: None,
            units: Vec::new(),
            outputs: UnitOutputs::new(),
            diagnostics: Vec::new(),
            reports: Vec::new(),
            result: None,
            cleaned: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Append a report line and log it.
    pub fn report(&mut self, event_type: &str, message: impl Into<String>, payload: Value) {
        let message = message.into();
        info!("[{}] {}", self.id, message);
        self.reports.push(EventRecord::new(event_type, message, payload));
        self.touch();
    }

    pub fn touch(&mut self) {
        self.updated_at = now_ms();
    }

    pub fn is_terminal(&self) -> bool {
        self.result.is_some()
    }

    /// Every unit this workflow handed to the engine, in-flight one included.
    pub fn submitted_units(&self) -> impl Iterator<Item = &SubmissionUnit> {
        self.units.iter().chain(self.in_flight.iter())
    }

    /// Reports of a given type
    pub fn reports_of(&self, event_type: &str) -> Vec<&EventRecord> {
        self.reports.iter().filter(|r| r.is(event_type)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::event::event_types;
    use crate::domain::{LoopPhase, UnitHandle};
    use serde_json::json;

    fn inputs() -> WorkflowInputs {
        WorkflowInputs::new(json!({"kinds": ["Si"]}), json!({}))
    }

    #[test]
    fn test_new_record() {
        let record = WorkflowRecord::new("siesta.base", inputs(), 4, true);
        assert!(record.id.starts_with("wf-"));
        assert_eq!(record.state.max_iterations, 4);
        assert_eq!(record.state.phase, LoopPhase::Setup);
        assert!(record.clean_workdir);
        assert!(!record.is_terminal());
    }

    #[test]
    fn test_report_appends_event() {
        let mut record = WorkflowRecord::new("siesta.base", inputs(), 4, false);
        record.report(event_types::ITERATION_LAUNCHED, "launching", json!({"iteration": 1}));
        assert_eq!(record.reports.len(), 1);
        assert_eq!(record.reports_of(event_types::ITERATION_LAUNCHED).len(), 1);
        assert!(record.reports_of(event_types::EXIT_CODE).is_empty());
    }

    #[test]
    fn test_submitted_units_include_in_flight() {
        let mut record = WorkflowRecord::new("siesta.base", inputs(), 4, false);
        record
            .units
            .push(SubmissionUnit::new(UnitHandle::new("a"), 1, InputSnapshot::new()));
        record.in_flight = Some(SubmissionUnit::new(UnitHandle::new("b"), 2, InputSnapshot::new()));
        let handles: Vec<&str> = record.submitted_units().map(|u| u.handle.as_str()).collect();
        assert_eq!(handles, vec!["a", "b"]);
    }

    #[test]
    fn test_record_roundtrip() {
        let record = WorkflowRecord::new("siesta.base", inputs(), 3, false);
        let json = serde_json::to_string(&record).unwrap();
        let parsed: WorkflowRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, record.id);
        assert_eq!(parsed.state, record.state);
        assert_eq!(parsed.inputs, record.inputs);
    }
}
