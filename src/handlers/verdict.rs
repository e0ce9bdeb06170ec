//! Handler verdicts.

use serde::{Deserialize, Serialize};

use crate::domain::{ExitCode, InputSnapshot};

/// What one handler concluded about a finished unit.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HandlerVerdict {
    /// The handler recognized the failure
    pub is_handled: bool,
    /// Skip every lower-priority handler in this pass
    pub stop_further_handlers: bool,
    /// Snapshot the next submission should use
    pub mutated_snapshot: Option<InputSnapshot>,
    /// Terminal exit code; ends the loop
    pub exit_code: Option<ExitCode>,
    /// Report line describing what the handler did
    pub message: Option<String>,
}

impl HandlerVerdict {
    /// The handler does not apply to this failure.
    pub fn not_handled() -> Self {
        Self::default()
    }

    /// The handler recognized the failure and repaired the inputs.
    pub fn handled(snapshot: InputSnapshot) -> Self {
        Self {
            is_handled: true,
            mutated_snapshot: Some(snapshot),
            ..Self::default()
        }
    }

    /// The handler recognized the failure as unrecoverable.
    pub fn abort(exit_code: ExitCode) -> Self {
        Self {
            is_handled: true,
            stop_further_handlers: true,
            exit_code: Some(exit_code),
            ..Self::default()
        }
    }

    pub fn stop(mut self) -> Self {
        self.stop_further_handlers = true;
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}
