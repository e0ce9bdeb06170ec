//! Loop state.
//!
//! [`LoopState`] holds the typed counters and flags the restart loop carries
//! from one pass to the next. It is owned exclusively by one
//! [`crate::runner::RestartLoop`] and persisted with the workflow record.

use serde::{Deserialize, Serialize};

use super::unit::SubmissionUnit;

/// Phase of the restart loop state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopPhase {
    /// Preparing the first input snapshot
    Setup,
    /// Handing a unit to the host engine
    Submitting,
    /// Suspended until the in-flight unit is terminal
    AwaitingTerminal,
    /// Inspecting the terminal outcome
    Classifying,
    /// Applying the decision of this pass
    Deciding,
    /// A unit succeeded and outputs were collected
    Finished,
    /// Stopped with a terminal exit code
    Failed,
    /// Stopped by external cancellation
    Aborted,
}

impl LoopPhase {
    /// Returns true if the loop will not make further progress
    pub fn is_terminal(&self) -> bool {
        matches!(self, LoopPhase::Finished | LoopPhase::Failed | LoopPhase::Aborted)
    }
}

/// Counters and flags carried across passes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopState {
    /// Number of submissions made so far
    pub iteration: u32,
    /// Cap on submissions
    pub max_iterations: u32,
    /// The previous pass ended in a submission failure
    pub consecutive_submission_failures: bool,
    /// The previous unclassified failure has not been cleared by a success
    pub consecutive_unexpected_failures: bool,
    /// Unit whose outputs are collected at the end
    pub last_good_unit: Option<SubmissionUnit>,
    /// Set only by a genuine success
    pub finished: bool,
    pub phase: LoopPhase,
}

impl LoopState {
    /// Fresh state for a loop allowed `max_iterations` submissions.
    pub fn new(max_iterations: u32) -> Self {
        Self {
            iteration: 0,
            max_iterations,
            consecutive_submission_failures: false,
            consecutive_unexpected_failures: false,
            last_good_unit: None,
            finished: false,
            phase: LoopPhase::Setup,
        }
    }

    /// Whether another submission may be made.
    pub fn should_submit(&self) -> bool {
        !self.finished && !self.iterations_exhausted()
    }

    pub fn iterations_exhausted(&self) -> bool {
        self.iteration >= self.max_iterations
    }

    /// Record a genuine success.
    pub fn mark_success(&mut self, unit: SubmissionUnit) {
        self.last_good_unit = Some(unit);
        self.finished = true;
        self.consecutive_submission_failures = false;
        self.consecutive_unexpected_failures = false;
    }
}
