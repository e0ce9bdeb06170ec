//! Terminal exit codes.
//!
//! Every way a restart loop can stop short of success is one of these values.
//! They are returned, never raised, and always render as a
//! `(status, symbol, message)` triple.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A typed terminal exit code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitCode {
    /// An iteration completed without producing a trackable unit
    IterationReturnedNoCalculation,
    /// Retry budget exhausted without success
    MaximumIterationsExceeded,
    /// A terminal outcome that no guard recognizes
    UnexpectedCalculationState,
    /// Two submission failures in a row
    SecondConsecutiveSubmissionFailure,
    /// Two unclassifiable failures in a row
    SecondConsecutiveUnhandledFailure,
    /// Inputs violate the workflow contract
    InvalidInput,
    /// Pseudopotential inputs could not be resolved
    InvalidInputPseudoPotentials,
    /// A workflow this one depends on failed
    WorkflowFailed,
    /// Code defined by a handler author
    Custom {
        status: u32,
        symbol: String,
        message: String,
    },
}

impl ExitCode {
    /// All built-in codes, in status order.
    pub fn builtins() -> Vec<ExitCode> {
        vec![
            ExitCode::IterationReturnedNoCalculation,
            ExitCode::MaximumIterationsExceeded,
            ExitCode::UnexpectedCalculationState,
            ExitCode::SecondConsecutiveSubmissionFailure,
            ExitCode::SecondConsecutiveUnhandledFailure,
            ExitCode::InvalidInput,
            ExitCode::InvalidInputPseudoPotentials,
            ExitCode::WorkflowFailed,
        ]
    }

    pub fn custom(status: u32, symbol: impl Into<String>, message: impl Into<String>) -> Self {
        ExitCode::Custom {
            status,
            symbol: symbol.into(),
            message: message.into(),
        }
    }

    /// Numeric status
    pub fn status(&self) -> u32 {
        match self {
            ExitCode::IterationReturnedNoCalculation => 100,
            ExitCode::MaximumIterationsExceeded => 101,
            ExitCode::UnexpectedCalculationState => 102,
            ExitCode::SecondConsecutiveSubmissionFailure => 103,
            ExitCode::SecondConsecutiveUnhandledFailure => 104,
            ExitCode::InvalidInput => 300,
            ExitCode::InvalidInputPseudoPotentials => 301,
            ExitCode::WorkflowFailed => 501,
            ExitCode::Custom { status, .. } => *status,
        }
    }

    /// Symbolic name
    pub fn symbol(&self) -> &str {
        match self {
            ExitCode::IterationReturnedNoCalculation => "ERROR_ITERATION_RETURNED_NO_CALCULATION",
            ExitCode::MaximumIterationsExceeded => "ERROR_MAXIMUM_ITERATIONS_EXCEEDED",
            ExitCode::UnexpectedCalculationState => "ERROR_UNEXPECTED_CALCULATION_STATE",
            ExitCode::SecondConsecutiveSubmissionFailure => "ERROR_SECOND_CONSECUTIVE_SUBMISSION_FAILURE",
            ExitCode::SecondConsecutiveUnhandledFailure => "ERROR_SECOND_CONSECUTIVE_UNHANDLED_FAILURE",
            ExitCode::InvalidInput => "ERROR_INVALID_INPUT",
            ExitCode::InvalidInputPseudoPotentials => "ERROR_INVALID_INPUT_PSEUDO_POTENTIALS",
            ExitCode::WorkflowFailed => "ERROR_WORKFLOW_FAILED",
            ExitCode::Custom { symbol, .. } => symbol,
        }
    }

    /// Human-readable message
    pub fn message(&self) -> &str {
        match self {
            ExitCode::IterationReturnedNoCalculation => {
                "the run_calculation step did not successfully add a calculation to the context"
            }
            ExitCode::MaximumIterationsExceeded => "the maximum number of iterations was exceeded",
            ExitCode::UnexpectedCalculationState => "the calculation finished with an unexpected calculation state",
            ExitCode::SecondConsecutiveSubmissionFailure => "the calculation failed to submit, twice in a row",
            ExitCode::SecondConsecutiveUnhandledFailure => {
                "the calculation failed for an unknown reason, twice in a row"
            }
            ExitCode::InvalidInput => "the inputs do not satisfy the workflow contract",
            ExitCode::InvalidInputPseudoPotentials => {
                "the explicitly passed 'pseudos' or 'pseudo_family' could not be used to get the necessary potentials"
            }
            ExitCode::WorkflowFailed => "Workflow did not succeed",
            ExitCode::Custom { message, .. } => message,
        }
    }

    /// The `(status, symbol, message)` triple reported to callers.
    pub fn triple(&self) -> (u32, &str, &str) {
        (self.status(), self.symbol(), self.message())
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.status(), self.symbol(), self.message())
    }
}
