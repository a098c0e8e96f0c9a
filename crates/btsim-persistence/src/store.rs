//! `SnapshotStore` trait plus an in-memory and a file-backed implementation,
//! each storing one opaque blob keyed by account name.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::PersistenceError;
use crate::snapshot::AccountSnapshot;

/// Save/load/delete a named [`AccountSnapshot`]. Implementations must be
/// `Send + Sync` so one store can be shared across all accounts via `Arc`.
pub trait SnapshotStore: Send + Sync {
    fn save(&self, name: &str, snapshot: &AccountSnapshot) -> Result<(), PersistenceError>;
    fn load(&self, name: &str) -> Result<AccountSnapshot, PersistenceError>;
    fn delete(&self, name: &str) -> Result<(), PersistenceError>;
}

/// In-process reference implementation; snapshots do not survive process
/// restart. Useful for tests and for a daemon run with no durable backend
/// configured.
#[derive(Default)]
pub struct MemoryStore {
    blobs: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemoryStore {
    fn save(&self, name: &str, snapshot: &AccountSnapshot) -> Result<(), PersistenceError> {
        let json = serde_json::to_string(snapshot)
            .map_err(|e| PersistenceError::Backend(e.to_string()))?;
        self.blobs
            .lock()
            .expect("memory store mutex poisoned")
            .insert(name.to_string(), json);
        Ok(())
    }

    fn load(&self, name: &str) -> Result<AccountSnapshot, PersistenceError> {
        let guard = self.blobs.lock().expect("memory store mutex poisoned");
        let json = guard
            .get(name)
            .ok_or_else(|| PersistenceError::NotFound(name.to_string()))?;
        serde_json::from_str(json).map_err(|e| PersistenceError::Corrupt(e.to_string()))
    }

    fn delete(&self, name: &str) -> Result<(), PersistenceError> {
        self.blobs
            .lock()
            .expect("memory store mutex poisoned")
            .remove(name);
        Ok(())
    }
}

/// One JSON file per account name under `root`, created on first save.
/// Matches "format must be stable across versions within a
/// major release" by always round-tripping through `serde_json` without any
/// schema-versioning indirection layered on top.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.json"))
    }

    fn ensure_root(&self) -> Result<(), PersistenceError> {
        fs::create_dir_all(&self.root).map_err(|e| PersistenceError::Backend(e.to_string()))
    }
}

impl SnapshotStore for FileStore {
    fn save(&self, name: &str, snapshot: &AccountSnapshot) -> Result<(), PersistenceError> {
        self.ensure_root()?;
        let json = serde_json::to_string_pretty(snapshot)
            .map_err(|e| PersistenceError::Backend(e.to_string()))?;
        fs::write(self.path_for(name), json).map_err(|e| PersistenceError::Backend(e.to_string()))
    }

    fn load(&self, name: &str) -> Result<AccountSnapshot, PersistenceError> {
        let path = self.path_for(name);
        if !Path::new(&path).exists() {
            return Err(PersistenceError::NotFound(name.to_string()));
        }
        let json = fs::read_to_string(&path).map_err(|e| PersistenceError::Backend(e.to_string()))?;
        serde_json::from_str(&json).map_err(|e| PersistenceError::Corrupt(e.to_string()))
    }

    fn delete(&self, name: &str) -> Result<(), PersistenceError> {
        let path = self.path_for(name);
        if path.exists() {
            fs::remove_file(&path).map_err(|e| PersistenceError::Backend(e.to_string()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use btsim_schemas::micros::MICROS_SCALE;
    use chrono::NaiveDate;

    fn sample(name: &str) -> AccountSnapshot {
        let d = NaiveDate::from_ymd_opt(2022, 3, 1).unwrap();
        AccountSnapshot {
            name: name.to_string(),
            token: "tok-1".to_string(),
            principal_micros: 1_000_000 * MICROS_SCALE,
            cash_micros: 1_000_000 * MICROS_SCALE,
            commission_micros: 100,
            start_date: d,
            end_date: d,
            xdxr_cursor: d,
            description: Some("round trip test".to_string()),
            entrusts: Vec::new(),
            trades: Vec::new(),
            lots: Vec::new(),
            assets: Vec::new(),
        }
    }

    #[test]
    fn memory_store_round_trips() {
        let store = MemoryStore::new();
        let snap = sample("acct-a");
        store.save("acct-a", &snap).unwrap();
        let loaded = store.load("acct-a").unwrap();
        assert_eq!(loaded, snap);
    }

    #[test]
    fn memory_store_missing_name_is_not_found() {
        let store = MemoryStore::new();
        let err = store.load("nope").unwrap_err();
        assert!(matches!(err, PersistenceError::NotFound(_)));
    }

    #[test]
    fn file_store_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let snap = sample("acct-b");
        store.save("acct-b", &snap).unwrap();

        // A fresh store pointed at the same root reads what the first wrote.
        let reopened = FileStore::new(dir.path());
        let loaded = reopened.load("acct-b").unwrap();
        assert_eq!(loaded, snap);
    }

    #[test]
    fn file_store_delete_then_load_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let snap = sample("acct-c");
        store.save("acct-c", &snap).unwrap();
        store.delete("acct-c").unwrap();
        let err = store.load("acct-c").unwrap_err();
        assert!(matches!(err, PersistenceError::NotFound(_)));
    }
}
