//! Restart loop orchestration.
//!
//! - RestartLoop: submit, await, classify, decide; checkpointed every pass
//! - ResultCollector: maps declared output ports after a genuine success
//! - cleanup: one-shot remote cleanup on termination
//! - chain: helpers for workflows built on top of other workflows

mod chain;
mod cleanup;
mod collector;
mod restart_loop;

pub use chain::{require_finished_ok, restart_inputs};
pub use cleanup::clean_workdir;
pub use collector::{Collected, ResultCollector};
pub use restart_loop::RestartLoop;
