//! JSONL-based storage with an in-memory cache.
//!
//! One file per collection, one JSON record per line. Inserts append; replacing
//! or deleting a record rewrites the file through a temporary sibling that is
//! renamed into place, so a crash mid-checkpoint leaves the previous file intact.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockWriteGuard};

use log::debug;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use super::traits::{Filter, HasId, Storage};
use crate::error::{RestartrError, Result};

type Cache = HashMap<String, Vec<Value>>;

pub struct JsonlStorage {
    base_path: PathBuf,
    cache: RwLock<Cache>,
}

impl JsonlStorage {
    /// Open a store rooted at `base_path`, creating the directory if needed.
    pub fn new(base_path: impl AsRef<Path>) -> Result<Self> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path)?;
        Ok(Self {
            base_path,
            cache: RwLock::new(HashMap::new()),
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn collection_path(&self, collection: &str) -> PathBuf {
        self.base_path.join(format!("{}.jsonl", collection))
    }

    fn read_collection(&self, collection: &str) -> Result<Vec<Value>> {
        let path = self.collection_path(collection);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let reader = BufReader::new(File::open(&path)?);
        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if !line.trim().is_empty() {
                records.push(serde_json::from_str(&line)?);
            }
        }
        debug!("Loaded {} records from {}", records.len(), path.display());
        Ok(records)
    }

    /// Write lock on the cache with `collection` loaded.
    fn loaded(&self, collection: &str) -> Result<RwLockWriteGuard<'_, Cache>> {
        let mut cache = self.cache.write().map_err(|e| RestartrError::Storage(e.to_string()))?;
        if !cache.contains_key(collection) {
            let records = self.read_collection(collection)?;
            cache.insert(collection.to_string(), records);
        }
        Ok(cache)
    }

    fn append(&self, collection: &str, record: &Value) -> Result<()> {
        let path = self.collection_path(collection);
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        writeln!(file, "{}", serde_json::to_string(record)?)?;
        Ok(())
    }

    fn rewrite(&self, collection: &str, records: &[Value]) -> Result<()> {
        let path = self.collection_path(collection);
        let tmp = path.with_extension("jsonl.tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp)?);
            for record in records {
                writeln!(writer, "{}", serde_json::to_string(record)?)?;
            }
            writer.flush()?;
        }
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

fn id_of(record: &Value) -> Option<&str> {
    record.get("id").and_then(Value::as_str)
}

impl Storage for JsonlStorage {
    fn put<T: Serialize + HasId>(&self, collection: &str, record: &T) -> Result<()> {
        let value = serde_json::to_value(record)?;
        let mut cache = self.loaded(collection)?;
        let records = cache
            .get_mut(collection)
            .ok_or_else(|| RestartrError::Storage(format!("Collection not loaded: {}", collection)))?;

        // The file is the source of truth; the cache follows a successful write
        match records.iter().position(|r| id_of(r) == Some(record.id())) {
            Some(index) => {
                let mut updated = records.clone();
                updated[index] = value;
                self.rewrite(collection, &updated)?;
                *records = updated;
                Ok(())
            }
            None => {
                self.append(collection, &value)?;
                records.push(value);
                Ok(())
            }
        }
    }

    fn get<T: DeserializeOwned>(&self, collection: &str, id: &str) -> Result<Option<T>> {
        let cache = self.loaded(collection)?;
        cache
            .get(collection)
            .and_then(|records| records.iter().find(|r| id_of(r) == Some(id)))
            .map(|r| serde_json::from_value(r.clone()))
            .transpose()
            .map_err(RestartrError::from)
    }

    fn delete(&self, collection: &str, id: &str) -> Result<bool> {
        let mut cache = self.loaded(collection)?;
        let records = cache
            .get_mut(collection)
            .ok_or_else(|| RestartrError::Storage(format!("Collection not loaded: {}", collection)))?;

        let kept: Vec<Value> = records.iter().filter(|r| id_of(r) != Some(id)).cloned().collect();
        if kept.len() == records.len() {
            return Ok(false);
        }
        self.rewrite(collection, &kept)?;
        *records = kept;
        Ok(true)
    }

    fn query<T: DeserializeOwned>(&self, collection: &str, filters: &[Filter]) -> Result<Vec<T>> {
        let cache = self.loaded(collection)?;
        let Some(records) = cache.get(collection) else {
            return Ok(Vec::new());
        };
        records
            .iter()
            .filter(|r| filters.iter().all(|f| f.matches(r)))
            .map(|r| serde_json::from_value(r.clone()).map_err(RestartrError::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct Checkpoint {
        id: String,
        iteration: u32,
        phase: String,
    }

    impl HasId for Checkpoint {
        fn id(&self) -> &str {
            &self.id
        }
    }

    fn checkpoint(id: &str, iteration: u32, phase: &str) -> Checkpoint {
        Checkpoint {
            id: id.to_string(),
            iteration,
            phase: phase.to_string(),
        }
    }

    fn create_test_storage() -> (JsonlStorage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let storage = JsonlStorage::new(temp_dir.path()).unwrap();
        (storage, temp_dir)
    }

    #[test]
    fn test_put_and_get() {
        let (storage, _temp) = create_test_storage();
        let record = checkpoint("wf-1", 1, "awaiting_terminal");

        storage.put("workflows", &record).unwrap();
        let loaded: Option<Checkpoint> = storage.get("workflows", "wf-1").unwrap();

        assert_eq!(loaded, Some(record));
    }

    #[test]
    fn test_failed_rewrite_keeps_cache_in_sync() {
        let (storage, temp) = create_test_storage();
        storage.put("workflows", &checkpoint("wf-1", 1, "submitting")).unwrap();

        // A directory in the way of the temp file makes the rewrite fail
        std::fs::create_dir(temp.path().join("workflows.jsonl.tmp")).unwrap();

        assert!(storage.put("workflows", &checkpoint("wf-1", 2, "deciding")).is_err());
        assert!(storage.delete("workflows", "wf-1").is_err());

        let cached: Option<Checkpoint> = storage.get("workflows", "wf-1").unwrap();
        assert_eq!(cached, Some(checkpoint("wf-1", 1, "submitting")));

        let reopened = JsonlStorage::new(temp.path()).unwrap();
        let on_disk: Option<Checkpoint> = reopened.get("workflows", "wf-1").unwrap();
        assert_eq!(on_disk, cached);
    }

    #[test]
    fn test_get_missing() {
        let (storage, _temp) = create_test_storage();
        let loaded: Option<Checkpoint> = storage.get("workflows", "nope").unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_put_replaces_existing() {
        let (storage, temp) = create_test_storage();
        storage.put("workflows", &checkpoint("wf-1", 1, "submitting")).unwrap();
        storage.put("workflows", &checkpoint("wf-1", 2, "deciding")).unwrap();

        let all: Vec<Checkpoint> = storage.list("workflows").unwrap();
        assert_eq!(all, vec![checkpoint("wf-1", 2, "deciding")]);

        let content = fs::read_to_string(temp.path().join("workflows.jsonl")).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert!(!temp.path().join("workflows.jsonl.tmp").exists());
    }

    #[test]
    fn test_delete() {
        let (storage, _temp) = create_test_storage();
        storage.put("workflows", &checkpoint("wf-1", 1, "finished")).unwrap();

        assert!(storage.delete("workflows", "wf-1").unwrap());
        assert!(!storage.delete("workflows", "wf-1").unwrap());
        let loaded: Option<Checkpoint> = storage.get("workflows", "wf-1").unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_query_with_filters() {
        let (storage, _temp) = create_test_storage();
        storage.put("workflows", &checkpoint("wf-1", 1, "finished")).unwrap();
        storage.put("workflows", &checkpoint("wf-2", 3, "failed")).unwrap();
        storage.put("workflows", &checkpoint("wf-3", 2, "finished")).unwrap();

        let finished: Vec<Checkpoint> = storage.query("workflows", &[Filter::eq("phase", "finished")]).unwrap();
        let ids: Vec<&str> = finished.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["wf-1", "wf-3"]);
    }

    #[test]
    fn test_persistence_across_instances() {
        let temp_dir = TempDir::new().unwrap();
        {
            let storage = JsonlStorage::new(temp_dir.path()).unwrap();
            storage.put("workflows", &checkpoint("wf-1", 1, "submitting")).unwrap();
            storage.put("workflows", &checkpoint("wf-1", 1, "awaiting_terminal")).unwrap();
        }

        let storage = JsonlStorage::new(temp_dir.path()).unwrap();
        let loaded: Option<Checkpoint> = storage.get("workflows", "wf-1").unwrap();
        assert_eq!(loaded.map(|c| c.phase), Some("awaiting_terminal".to_string()));
    }

    #[test]
    fn test_collections_are_separate() {
        let (storage, _temp) = create_test_storage();
        storage.put("a", &checkpoint("1", 1, "in_a")).unwrap();
        storage.put("b", &checkpoint("1", 1, "in_b")).unwrap();

        let a: Option<Checkpoint> = storage.get("a", "1").unwrap();
        let b: Option<Checkpoint> = storage.get("b", "1").unwrap();
        assert_eq!(a.unwrap().phase, "in_a");
        assert_eq!(b.unwrap().phase, "in_b");
        assert!(storage.list::<Checkpoint>("empty").unwrap().is_empty());
    }
}
