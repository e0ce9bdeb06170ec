//! Host engine interface.
//!
//! The host engine runs submitted units asynchronously. The restart loop
//! only ever talks to it through this trait.

use async_trait::async_trait;

use crate::domain::{InputSnapshot, Outcome, UnitHandle};
use crate::error::Result;

/// Execution engine that runs units of work.
#[async_trait]
pub trait HostEngine: Send + Sync {
    /// Hand a unit of `kind` to the engine.
    ///
    /// An `Err` means no trackable unit exists. A unit the engine accepted
    /// but could not launch is reported later as [`Outcome::SubmissionFailed`].
    async fn submit(&self, kind: &str, snapshot: &InputSnapshot) -> Result<UnitHandle>;

    /// Suspend until the unit is terminal.
    async fn await_terminal(&self, handle: &UnitHandle) -> Result<Outcome>;

    /// Whether the engine itself considers the unit finished successfully.
    async fn is_finished_ok(&self, handle: &UnitHandle) -> Result<bool>;

    /// Propagate cancellation to an in-flight unit.
    async fn cancel(&self, handle: &UnitHandle) -> Result<()>;

    /// Remove the unit's remote working area.
    ///
    /// `ErrorKind::NotFound` and `ErrorKind::PermissionDenied` mean the area is
    /// already gone or unreachable.
    async fn clean_remote_resources(&self, handle: &UnitHandle) -> std::io::Result<()>;

    /// Short engine name for logs
    fn name(&self) -> &str {
        "engine"
    }
}
