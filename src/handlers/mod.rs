//! Diagnostic error handlers.
//!
//! - ErrorHandler / HandlerRegistry: per-kind handler chains, built once at startup
//! - HandlerVerdict: what a handler concluded
//! - dispatch: priority-ordered evaluation of a chain against a finished unit
//! - builtin: reference handlers for the base workflow

pub mod builtin;
pub mod dispatch;
pub mod registry;
pub mod verdict;

pub use builtin::{GeometryNotConvergedHandler, ScfNotConvergedHandler, warning_codes};
pub use dispatch::{DispatchReport, EvaluatedVerdict, dispatch};
pub use registry::{ErrorHandler, FnHandler, HandlerContext, HandlerEntry, HandlerRegistry};
pub use verdict::HandlerVerdict;
