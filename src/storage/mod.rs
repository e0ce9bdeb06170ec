//! Storage layer for Restartr.
//!
//! Workflow records are checkpointed to JSONL files through the [`Storage`]
//! trait; [`WorkflowStore`] adds typed access on top.

mod jsonl;
mod traits;
mod workflows;

pub use jsonl::JsonlStorage;
pub use traits::{Filter, FilterOp, HasId, Storage};
pub use workflows::WorkflowStore;
