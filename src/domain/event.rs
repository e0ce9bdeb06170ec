//! Report records.
//!
//! Everything a workflow reports while it runs lands here as an
//! [`EventRecord`], persisted with the workflow so the history survives a
//! restart.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::id::{generate_event_id, now_ms};

/// Event type constants
pub mod event_types {
    pub const WORKFLOW_CREATED: &str = "workflow.created";
    pub const WORKFLOW_RESUMED: &str = "workflow.resumed";
    pub const ITERATION_LAUNCHED: &str = "iteration.launched";
    pub const UNIT_TERMINAL: &str = "unit.terminal";
    pub const SUBMISSION_FAILED: &str = "submission.failed";
    pub const FAILURE_UNHANDLED: &str = "failure.unhandled";
    pub const HANDLER_FIRED: &str = "handler.fired";
    pub const EXIT_CODE: &str = "workflow.exit_code";
    pub const OUTPUT_MISSING: &str = "output.missing";
    pub const WORKFLOW_FINISHED: &str = "workflow.finished";
    pub const WORKFLOW_ABORTED: &str = "workflow.aborted";
    pub const CLEANUP_DONE: &str = "cleanup.done";
    pub const CLEANUP_WARNING: &str = "cleanup.warning";
}

/// One entry in a workflow's report log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventRecord {
    pub id: String,
    /// Event type (e.g., "iteration.launched")
    pub event_type: String,
    /// Human-readable report line
    pub message: String,
    /// Event-specific payload data
    pub payload: Value,
    /// Unix timestamp in milliseconds
    pub created_at: i64,
}

impl EventRecord {
    pub fn new(event_type: &str, message: impl Into<String>, payload: Value) -> Self {
        Self {
            id: generate_event_id(),
            event_type: event_type.to_string(),
            message: message.into(),
            payload,
            created_at: now_ms(),
        }
    }

    pub fn is(&self, event_type: &str) -> bool {
        self.event_type == event_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_event() {
        let event = EventRecord::new(
            event_types::ITERATION_LAUNCHED,
            "launching calc-1 iteration #1",
            json!({"iteration": 1}),
        );
        assert!(event.id.starts_with("evt-"));
        assert!(event.is(event_types::ITERATION_LAUNCHED));
        assert_eq!(event.payload["iteration"], 1);
    }

    #[test]
    fn test_event_roundtrip() {
        let event = EventRecord::new(event_types::OUTPUT_MISSING, "missing bands", Value::Null);
        let json = serde_json::to_string(&event).unwrap();
        let parsed: EventRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }
}
