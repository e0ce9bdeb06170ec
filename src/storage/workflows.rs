//! Workflow record storage helpers.

use super::traits::{Filter, Storage};
use crate::domain::{LoopPhase, WORKFLOW_COLLECTION, WorkflowRecord};
use crate::error::{RestartrError, Result};

/// Typed access to persisted workflow records.
pub struct WorkflowStore<S: Storage> {
    storage: S,
}

impl<S: Storage> WorkflowStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Checkpoint a record, inserting or replacing it.
    pub fn save(&self, record: &WorkflowRecord) -> Result<()> {
        self.storage.put(WORKFLOW_COLLECTION, record)
    }

    pub fn get(&self, id: &str) -> Result<Option<WorkflowRecord>> {
        self.storage.get(WORKFLOW_COLLECTION, id)
    }

    /// Load a record, failing if it does not exist.
    pub fn load(&self, id: &str) -> Result<WorkflowRecord> {
        self.get(id)?.ok_or_else(|| RestartrError::WorkflowNotFound(id.to_string()))
    }

    pub fn list(&self) -> Result<Vec<WorkflowRecord>> {
        self.storage.list(WORKFLOW_COLLECTION)
    }

    pub fn find_by_phase(&self, phase: LoopPhase) -> Result<Vec<WorkflowRecord>> {
        self.storage
            .query(WORKFLOW_COLLECTION, &[Filter::eq("state.phase", phase)])
    }

    /// Records without a terminal result; candidates for resume.
    pub fn find_unfinished(&self) -> Result<Vec<WorkflowRecord>> {
        self.storage
            .query(WORKFLOW_COLLECTION, &[Filter::eq("result", serde_json::Value::Null)])
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        if self.storage.delete(WORKFLOW_COLLECTION, id)? {
            Ok(())
        } else {
            Err(RestartrError::WorkflowNotFound(id.to_string()))
        }
    }
}
