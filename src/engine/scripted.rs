//! Scripted in-memory engine.
//!
//! Replays a fixed list of outcomes, one per submission. Used by the CLI's
//! dry runs and by tests that need a host engine without a real scheduler.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::traits::HostEngine;
use crate::domain::{InputSnapshot, Outcome, UnitHandle};
use crate::error::{RestartrError, Result};

/// What the engine does with the next submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptedStep {
    /// Accept the unit and finish it with this outcome
    Complete(Outcome),
    /// Refuse to create a unit at all
    Reject(String),
    /// Accept the unit and never finish it
    Hang,
    /// Finish with this outcome but answer `is_finished_ok` with the opposite
    Inconsistent(Outcome),
}

/// A submission the engine received.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedSubmission {
    pub handle: Option<UnitHandle>,
    pub kind: String,
    pub snapshot: InputSnapshot,
}

#[derive(Default)]
struct ScriptState {
    steps: VecDeque<ScriptedStep>,
    assigned: HashMap<UnitHandle, ScriptedStep>,
    submissions: Vec<RecordedSubmission>,
    cancelled: Vec<UnitHandle>,
    cleaned: Vec<UnitHandle>,
    cleanup_failures: HashSet<UnitHandle>,
    next_index: u32,
}

/// Engine that replays scripted outcomes.
pub struct ScriptedEngine {
    state: Mutex<ScriptState>,
    prefix: String,
}

impl ScriptedEngine {
    pub fn new(steps: Vec<ScriptedStep>) -> Self {
        let random: u16 = rand::rng().random();
        Self {
            state: Mutex::new(ScriptState {
                steps: steps.into(),
                ..ScriptState::default()
            }),
            prefix: format!("calc-{:04x}", random),
        }
    }

    /// Load steps from a YAML list.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let steps: Vec<ScriptedStep> = serde_yaml::from_str(yaml)?;
        Ok(Self::new(steps))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Issue handles as `{prefix}-1`, `{prefix}-2`, ...
    pub fn with_handle_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Make cleanup of `handle` fail with a permission error.
    pub fn fail_cleanup_for(&self, handle: &UnitHandle) {
        if let Ok(mut state) = self.state.lock() {
            state.cleanup_failures.insert(handle.clone());
        }
    }

    pub fn submissions(&self) -> Vec<RecordedSubmission> {
        self.state.lock().map(|s| s.submissions.clone()).unwrap_or_default()
    }

    /// Number of submissions that produced a handle.
    pub fn accepted_count(&self) -> usize {
        self.submissions().iter().filter(|s| s.handle.is_some()).count()
    }

    pub fn cancelled(&self) -> Vec<UnitHandle> {
        self.state.lock().map(|s| s.cancelled.clone()).unwrap_or_default()
    }

    pub fn cleaned(&self) -> Vec<UnitHandle> {
        self.state.lock().map(|s| s.cleaned.clone()).unwrap_or_default()
    }

    pub fn remaining_steps(&self) -> usize {
        self.state.lock().map(|s| s.steps.len()).unwrap_or(0)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, ScriptState>> {
        self.state.lock().map_err(|e| RestartrError::Engine(e.to_string()))
    }

    /// Step assigned to `handle`. Handles this engine never issued (a unit
    /// submitted before a restart) take the next step in the script.
    fn step_for(&self, handle: &UnitHandle) -> Result<ScriptedStep> {
        let mut state = self.lock()?;
        if let Some(step) = state.assigned.get(handle) {
            return Ok(step.clone());
        }
        let step = state
            .steps
            .pop_front()
            .ok_or_else(|| RestartrError::Engine(format!("no scripted outcome for {}", handle)))?;
        state.assigned.insert(handle.clone(), step.clone());
        Ok(step)
    }
}

#[async_trait]
impl HostEngine for ScriptedEngine {
    async fn submit(&self, kind: &str, snapshot: &InputSnapshot) -> Result<UnitHandle> {
        let mut state = self.lock()?;
        let step = state
            .steps
            .pop_front()
            .ok_or_else(|| RestartrError::Engine("script exhausted".to_string()))?;

        if let ScriptedStep::Reject(reason) = step {
            state.submissions.push(RecordedSubmission {
                handle: None,
                kind: kind.to_string(),
                snapshot: snapshot.clone(),
            });
            return Err(RestartrError::Engine(reason));
        }

        state.next_index += 1;
        let handle = UnitHandle::new(format!("{}-{}", self.prefix, state.next_index));
        debug!("Scripted engine accepted {} as {}", kind, handle);
        state.assigned.insert(handle.clone(), step);
        state.submissions.push(RecordedSubmission {
            handle: Some(handle.clone()),
            kind: kind.to_string(),
            snapshot: snapshot.clone(),
        });
        Ok(handle)
    }

    async fn await_terminal(&self, handle: &UnitHandle) -> Result<Outcome> {
        let step = self.step_for(handle)?;
        tokio::task::yield_now().await;

        match step {
            ScriptedStep::Complete(outcome) | ScriptedStep::Inconsistent(outcome) => Ok(outcome),
            ScriptedStep::Hang => std::future::pending::<Result<Outcome>>().await,
            ScriptedStep::Reject(reason) => Err(RestartrError::Engine(reason)),
        }
    }

    async fn is_finished_ok(&self, handle: &UnitHandle) -> Result<bool> {
        let step = self.step_for(handle)?;
        Ok(match step {
            ScriptedStep::Complete(outcome) => outcome.is_success(),
            ScriptedStep::Inconsistent(outcome) => !outcome.is_success(),
            ScriptedStep::Hang | ScriptedStep::Reject(_) => false,
        })
    }

    async fn cancel(&self, handle: &UnitHandle) -> Result<()> {
        self.lock()?.cancelled.push(handle.clone());
        Ok(())
    }

    async fn clean_remote_resources(&self, handle: &UnitHandle) -> std::io::Result<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|e| std::io::Error::other(e.to_string()))?;
        if state.cleanup_failures.contains(handle) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                format!("remote folder of {} is not accessible", handle),
            ));
        }
        state.cleaned.push(handle.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
