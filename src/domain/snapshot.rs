//! Input snapshots.
//!
//! An [`InputSnapshot`] is the bundle of named inputs handed to one submission.
//! Snapshots are never edited in place: every edit produces a new snapshot, so
//! the copy frozen inside a [`crate::domain::SubmissionUnit`] cannot drift.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Well-known input slot names.
pub mod slots {
    pub const STRUCTURE: &str = "structure";
    pub const PARAMETERS: &str = "parameters";
    pub const KPOINTS: &str = "kpoints";
    pub const BANDSKPOINTS: &str = "bandskpoints";
    pub const BASIS: &str = "basis";
    pub const SETTINGS: &str = "settings";
    pub const OPTIONS: &str = "options";
    pub const PSEUDOS: &str = "pseudos";
    pub const PROTOCOL: &str = "protocol";
    pub const RELAX: &str = "relax";
    pub const AUTOBANDS: &str = "autobands";
    /// Reference to a finished unit's persistent output area. Its presence makes
    /// the next submission restart from the previous state.
    pub const PARENT_CALC_FOLDER: &str = "parent_calc_folder";
    /// Input name of a caller-supplied parent folder; prepared into
    /// [`PARENT_CALC_FOLDER`] for the first submission.
    pub const PARENT_FOLDER: &str = "parent_folder";
}

/// Ordered mapping from slot name to an opaque value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InputSnapshot {
    slots: BTreeMap<String, Value>,
}

impl InputSnapshot {
    /// Create an empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a copy of this snapshot with `slot` set to `value`.
    pub fn with(&self, slot: impl Into<String>, value: Value) -> Self {
        let mut slots = self.slots.clone();
        slots.insert(slot.into(), value);
        Self { slots }
    }

    /// Return a copy of this snapshot without `slot`.
    pub fn without(&self, slot: &str) -> Self {
        let mut slots = self.slots.clone();
        slots.remove(slot);
        Self { slots }
    }

    /// Builder-style setter used while assembling the first snapshot.
    pub fn set(mut self, slot: impl Into<String>, value: Value) -> Self {
        self.slots.insert(slot.into(), value);
        self
    }

    pub fn get(&self, slot: &str) -> Option<&Value> {
        self.slots.get(slot)
    }

    pub fn contains(&self, slot: &str) -> bool {
        self.slots.contains_key(slot)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Slot names in order.
    pub fn slot_names(&self) -> Vec<&str> {
        self.slots.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.slots.iter()
    }

    /// SHA-256 over the canonical JSON form, hex encoded.
    ///
    /// Slot order is fixed by the BTreeMap, so equal snapshots always share
    /// a fingerprint.
    pub fn fingerprint(&self) -> String {
        let canonical = serde_json::to_vec(&self.slots).unwrap_or_default();
        let digest = Sha256::digest(&canonical);
        hex::encode(digest)
    }
}

impl FromIterator<(String, Value)> for InputSnapshot {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            slots: iter.into_iter().collect(),
        }
    }
}
