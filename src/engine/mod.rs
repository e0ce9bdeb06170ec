//! Host engine seam.
//!
//! The engine that actually runs units lives outside this crate; the restart
//! loop sees it only through [`HostEngine`]. [`ScriptedEngine`] replays canned
//! outcomes for dry runs and tests.

pub mod scripted;
pub mod traits;

pub use scripted::{RecordedSubmission, ScriptedEngine, ScriptedStep};
pub use traits::HostEngine;
