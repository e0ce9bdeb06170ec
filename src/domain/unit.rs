//! Submission units.
//!
//! A [`SubmissionUnit`] is one attempt at running the external computation.
//! Its snapshot is frozen when it is created; only its outcome is filled in
//! later, once the host engine reports a terminal state.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::outcome::Outcome;
use super::snapshot::InputSnapshot;
use crate::id::now_ms;

/// Opaque handle the host engine hands back for a submitted unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitHandle(String);

impl UnitHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UnitHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One submission of the external computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionUnit {
    /// Engine handle
    pub handle: UnitHandle,
    /// Iteration that created this unit (1-based)
    pub iteration: u32,
    /// SHA-256 of the snapshot, for spotting identical resubmissions
    pub fingerprint: String,
    /// When the unit was handed to the engine (Unix ms)
    pub submitted_at: i64,
    snapshot: InputSnapshot,
    outcome: Option<Outcome>,
}

impl SubmissionUnit {
    /// Create a unit that owns a frozen copy of `snapshot`.
    pub fn new(handle: UnitHandle, iteration: u32, snapshot: InputSnapshot) -> Self {
        Self {
            handle,
            iteration,
            fingerprint: snapshot.fingerprint(),
            submitted_at: now_ms(),
            snapshot,
            outcome: None,
        }
    }

    pub fn snapshot(&self) -> &InputSnapshot {
        &self.snapshot
    }

    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    pub fn is_terminal(&self) -> bool {
        self.outcome.is_some()
    }

    /// Record the terminal outcome. A unit transitions at most once.
    pub(crate) fn record_outcome(&mut self, outcome: Outcome) -> bool {
        if self.outcome.is_some() {
            return false;
        }
        self.outcome = Some(outcome);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_unit_freezes_snapshot() {
        let snapshot = InputSnapshot::new().set("structure", json!("Si2"));
        let unit = SubmissionUnit::new(UnitHandle::new("calc-1"), 1, snapshot.clone());

        assert_eq!(unit.snapshot(), &snapshot);
        assert_eq!(unit.fingerprint, snapshot.fingerprint());
        assert!(!unit.is_terminal());
    }

    #[test]
    fn test_outcome_recorded_once() {
        let mut unit = SubmissionUnit::new(UnitHandle::new("calc-2"), 2, InputSnapshot::new());
        assert!(unit.record_outcome(Outcome::CrashedOrTimedOut));
        assert!(!unit.record_outcome(Outcome::SubmissionFailed));
        assert_eq!(unit.outcome(), Some(&Outcome::CrashedOrTimedOut));
    }

    #[test]
    fn test_handle_display() {
        assert_eq!(UnitHandle::new("calc-9").to_string(), "calc-9");
        assert_eq!(serde_json::to_string(&UnitHandle::new("calc-9")).unwrap(), "\"calc-9\"");
    }
}
