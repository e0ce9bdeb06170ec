//! CLI module for restartr.
//!
//! Runs workflows against a scripted engine, resumes them from checkpoints,
//! and inspects stored records, exit codes and handler chains.

pub mod commands;

pub use commands::Cli;
