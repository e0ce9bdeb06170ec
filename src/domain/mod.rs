//! Domain types for Restartr
//!
//! This module contains all core domain types:
//! - InputSnapshot: immutable-per-iteration bundle of named inputs
//! - SubmissionUnit / UnitHandle: one attempt at the external computation
//! - Outcome: terminal classification of a unit; LoopOutcome for the whole loop
//! - ExitCode: typed terminal exit codes
//! - LoopState / LoopPhase: counters and flags of the restart loop
//! - WorkflowContract / WorkflowInputs: what a workflow kind declares and accepts
//! - WorkflowRecord / EventRecord: persisted state and report log

pub mod contract;
pub mod event;
pub mod exit_code;
pub mod inputs;
pub mod outcome;
pub mod record;
pub mod snapshot;
pub mod state;
pub mod unit;

pub use contract::{BASE_WORKFLOW_KIND, InputSlot, OutputPort, ValueKind, WorkflowContract};
pub use event::{EventRecord, event_types};
pub use exit_code::ExitCode;
pub use inputs::WorkflowInputs;
pub use outcome::{LoopOutcome, Outcome, UnitOutputs};
pub use record::{WORKFLOW_COLLECTION, WorkflowRecord};
pub use snapshot::{InputSnapshot, slots};
pub use state::{LoopPhase, LoopState};
pub use unit::{SubmissionUnit, UnitHandle};
