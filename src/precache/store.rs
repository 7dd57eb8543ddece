//! Manifest cache store
//!
//! Persists the content id of every precached asset between builds as a
//! single JSON object: `{ "<relative path>": { "hash": "<content id>" } }`.
//! Loading never fails (a missing or corrupt file just means "no prior
//! state") and saving always replaces the whole snapshot.

use crate::error::{PwaError, PwaResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Last known content id for one asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRecord {
    pub hash: String,
}

/// Full path -> record mapping for one build
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoreSnapshot {
    records: BTreeMap<String, AssetRecord>,
}

impl StoreSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the record for a relative asset path
    pub fn get(&self, path: &str) -> Option<&AssetRecord> {
        self.records.get(path)
    }

    /// Record the content id for a relative asset path
    pub fn insert(&mut self, path: impl Into<String>, hash: impl Into<String>) {
        self.records
            .insert(path.into(), AssetRecord { hash: hash.into() });
    }

    pub fn contains(&self, path: &str) -> bool {
        self.records.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate records in path order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AssetRecord)> {
        self.records.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// File-backed store for [`StoreSnapshot`]s
pub struct ManifestCacheStore {
    path: PathBuf,
}

impl ManifestCacheStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store file location
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the previous snapshot, or an empty one if there is none usable
    pub fn load(&self) -> StoreSnapshot {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No manifest cache at {}, treating all assets as new", self.path.display());
                return StoreSnapshot::new();
            }
            Err(e) => {
                warn!("Cannot read manifest cache {}: {}", self.path.display(), e);
                return StoreSnapshot::new();
            }
        };

        match serde_json::from_str::<StoreSnapshot>(&content) {
            Ok(snapshot) => {
                debug!(
                    "Loaded manifest cache with {} records from {}",
                    snapshot.len(),
                    self.path.display()
                );
                snapshot
            }
            Err(e) => {
                warn!(
                    "Ignoring malformed manifest cache {}: {}",
                    self.path.display(),
                    e
                );
                StoreSnapshot::new()
            }
        }
    }

    /// Replace the persisted snapshot
    pub fn save(&self, snapshot: &StoreSnapshot) -> PwaResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| PwaError::StoreWrite {
                    path: self.path.clone(),
                    reason: e.to_string(),
                })?;
            }
        }

        let json = serde_json::to_string_pretty(snapshot)?;
        fs::write(&self.path, json).map_err(|e| PwaError::StoreWrite {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;

        debug!(
            "Saved manifest cache with {} records to {}",
            snapshot.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Delete the persisted snapshot; returns whether a file was removed
    pub fn clear(&self) -> PwaResult<bool> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(PwaError::io(
                format!("removing manifest cache {}", self.path.display()),
                e,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> ManifestCacheStore {
        ManifestCacheStore::new(dir.path().join(".next").join("manifest-cache.json"))
    }

    #[test]
    fn load_missing_is_empty() {
        let dir = TempDir::new().unwrap();
        assert!(store_in(&dir).load().is_empty());
    }

    #[test]
    fn load_corrupt_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), "not valid json {{{").unwrap();

        assert!(store.load().is_empty());
    }

    #[test]
    fn load_wrong_shape_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), r#"{"a.png": "not-a-record"}"#).unwrap();

        assert!(store.load().is_empty());
    }

    #[test]
    fn save_writes_expected_format() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let mut snapshot = StoreSnapshot::new();
        snapshot.insert("icons/a.png", "abc");
        store.save(&snapshot).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(raw["icons/a.png"]["hash"], "abc");
        assert_eq!(store.load(), snapshot);
    }

    #[test]
    fn save_replaces_previous_snapshot() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let mut first = StoreSnapshot::new();
        first.insert("a.png", "1");
        first.insert("b.png", "2");
        store.save(&first).unwrap();

        let mut second = StoreSnapshot::new();
        second.insert("b.png", "3");
        store.save(&second).unwrap();

        let loaded = store.load();
        assert_eq!(loaded.len(), 1);
        assert!(!loaded.contains("a.png"));
        assert_eq!(loaded.get("b.png").unwrap().hash, "3");
    }

    #[test]
    fn save_to_unwritable_location_errors() {
        let dir = TempDir::new().unwrap();
        // A regular file where the parent directory should be
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "").unwrap();
        let store = ManifestCacheStore::new(blocker.join("manifest-cache.json"));

        let err = store.save(&StoreSnapshot::new()).unwrap_err();
        assert!(matches!(err, PwaError::StoreWrite { .. }));
        assert!(err.is_recoverable());
    }

    #[test]
    fn clear_removes_file() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.save(&StoreSnapshot::new()).unwrap();

        assert!(store.clear().unwrap());
        assert!(!store.clear().unwrap());
    }
}
