//! Outcome types.
//!
//! [`Outcome`] is the terminal classification of one submission unit as
//! reported by the host engine. [`LoopOutcome`] is the terminal result of a
//! whole restart loop.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::exit_code::ExitCode;

/// Named outputs produced by a finished unit.
pub type UnitOutputs = BTreeMap<String, Value>;

/// Terminal outcome of a submission unit. Exactly one variant per unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Outcome {
    /// The unit finished and the external program reported success
    Success { outputs: UnitOutputs },
    /// The unit finished but declared warning codes describing what went wrong
    FailedCleanly {
        warnings: BTreeSet<i32>,
        outputs: UnitOutputs,
    },
    /// The host engine could not accept the unit
    SubmissionFailed,
    /// The unit died, was killed, or ran out of time without reporting
    CrashedOrTimedOut,
}

impl Outcome {
    /// Short label used in reports
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Success { .. } => "success",
            Outcome::FailedCleanly { .. } => "failed_cleanly",
            Outcome::SubmissionFailed => "submission_failed",
            Outcome::CrashedOrTimedOut => "crashed_or_timed_out",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    /// Outputs of the unit, if it got far enough to produce any.
    pub fn outputs(&self) -> Option<&UnitOutputs> {
        match self {
            Outcome::Success { outputs } | Outcome::FailedCleanly { outputs, .. } => Some(outputs),
            Outcome::SubmissionFailed | Outcome::CrashedOrTimedOut => None,
        }
    }

    /// Declared warning codes. `None` when the unit never finished cleanly
    /// enough to declare any.
    pub fn declared_warnings(&self) -> Option<&BTreeSet<i32>> {
        match self {
            Outcome::FailedCleanly { warnings, .. } => Some(warnings),
            Outcome::Success { .. } => None,
            Outcome::SubmissionFailed | Outcome::CrashedOrTimedOut => None,
        }
    }

    /// True when the unit declared `code` among its warnings.
    pub fn has_warning(&self, code: i32) -> bool {
        self.declared_warnings().is_some_and(|w| w.contains(&code))
    }

    pub fn output(&self, name: &str) -> Option<&Value> {
        self.outputs().and_then(|o| o.get(name))
    }
}

/// Terminal result of a restart loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum LoopOutcome {
    /// A unit succeeded and outputs were collected
    Finished,
    /// The loop stopped with a terminal exit code
    Failed { exit_code: ExitCode },
    /// External cancellation stopped the loop
    Aborted,
}

impl LoopOutcome {
    pub fn is_finished_ok(&self) -> bool {
        matches!(self, LoopOutcome::Finished)
    }

    pub fn exit_code(&self) -> Option<&ExitCode> {
        match self {
            LoopOutcome::Failed { exit_code } => Some(exit_code),
            LoopOutcome::Finished | LoopOutcome::Aborted => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn outputs() -> UnitOutputs {
        let mut outputs = UnitOutputs::new();
        outputs.insert("remote_folder".to_string(), json!("remote-1"));
        outputs
    }

    #[test]
    fn test_declared_warnings_only_on_clean_failure() {
        let clean = Outcome::FailedCleanly {
            warnings: BTreeSet::from([410]),
            outputs: outputs(),
        };
        assert!(clean.has_warning(410));
        assert!(!clean.has_warning(420));
        assert!(Outcome::CrashedOrTimedOut.declared_warnings().is_none());
        assert!(Outcome::SubmissionFailed.declared_warnings().is_none());
        assert!(Outcome::Success { outputs: outputs() }.declared_warnings().is_none());
    }

    #[test]
    fn test_outputs_access() {
        let success = Outcome::Success { outputs: outputs() };
        assert_eq!(success.output("remote_folder"), Some(&json!("remote-1")));
        assert!(success.output("bands").is_none());
        assert!(Outcome::CrashedOrTimedOut.outputs().is_none());
    }

    #[test]
    fn test_outcome_serialization_is_tagged() {
        let json = serde_json::to_value(Outcome::SubmissionFailed).unwrap();
        assert_eq!(json, json!({"state": "submission_failed"}));

        let parsed: Outcome = serde_json::from_value(json!({
            "state": "failed_cleanly",
            "warnings": [420, 410],
            "outputs": {}
        }))
        .unwrap();
        assert!(parsed.has_warning(420));
    }

    #[test]
    fn test_labels() {
        assert_eq!(Outcome::CrashedOrTimedOut.label(), "crashed_or_timed_out");
        assert_eq!(Outcome::SubmissionFailed.label(), "submission_failed");
    }

    #[test]
    fn test_loop_outcome_exit_code() {
        let failed = LoopOutcome::Failed {
            exit_code: ExitCode::MaximumIterationsExceeded,
        };
        assert_eq!(failed.exit_code(), Some(&ExitCode::MaximumIterationsExceeded));
        assert!(!failed.is_finished_ok());
        assert!(LoopOutcome::Finished.is_finished_ok());
        assert!(LoopOutcome::Aborted.exit_code().is_none());
    }
}
