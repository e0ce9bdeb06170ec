//! Restartr - restart-on-failure orchestration for external calculations
//!
//! A bounded loop submits a unit of external work, waits for it to finish,
//! classifies the outcome with a prioritized chain of error handlers, repairs
//! the next submission's inputs and decides whether to go again, stop
//! successfully, or stop with a typed exit code.

pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod id;
pub mod runner;
pub mod setup;
pub mod storage;

pub use error::{RestartrError, Result};
