//! Collection persistence over a key-value byte store.
//!
//! The collection is stored under a single key (`"tabstruct"` by default)
//! as `[[window, [[tab, parent|null], ...]], ...]`. Storing ordered pairs
//! rather than JSON objects keeps window and tab order intact on any
//! backend. Loading never fails: missing, unreadable or malformed data
//! comes back as an empty collection.

use crate::error::StoreError;
use crate::forest::{Collection, Forest, TabId, WindowId};
use parking_lot::Mutex;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

/// Durable byte storage addressed by string keys
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;
    fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Volatile backend, used by tests and the simulated host
#[derive(Debug, Default)]
pub struct MemoryKv {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKv {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.entries.lock().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// One `<key>.json` file per key inside a directory
#[derive(Debug, Clone)]
pub struct FileKv {
    dir: PathBuf,
}

impl FileKv {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileKv {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let path = self.path_for(key);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).map_err(|source| StoreError::Io {
            path: self.dir.clone(),
            source,
        })?;

        // Atomic save: write to temp file then rename to prevent corruption on crash
        let path = self.path_for(key);
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, value).map_err(|source| StoreError::Io {
            path: temp_path.clone(),
            source,
        })?;
        fs::rename(&temp_path, &path).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }
}

/// Per-window payload as found on disk.
///
/// Older data stored each window as an object keyed by tab id.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredForest {
    Pairs(Vec<(TabId, Option<TabId>)>),
    Legacy(BTreeMap<String, Option<TabId>>),
}

impl StoredForest {
    fn into_forest(self) -> Option<Forest> {
        match self {
            StoredForest::Pairs(pairs) => Some(Forest::from_pairs(pairs)),
            StoredForest::Legacy(map) => {
                let mut pairs = Vec::with_capacity(map.len());
                for (key, parent) in map {
                    pairs.push((key.trim().parse::<TabId>().ok()?, parent));
                }
                // Integer keys come back in ascending numeric order
                pairs.sort_by_key(|(tab, _)| *tab);
                Some(Forest::from_pairs(pairs))
            }
        }
    }
}

/// Transcodes the whole collection to and from the key-value store
pub struct PersistenceAdapter {
    backend: Box<dyn KeyValueStore>,
    key: String,
}

impl std::fmt::Debug for PersistenceAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceAdapter")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl PersistenceAdapter {
    pub fn new(backend: Box<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Write the full collection
    pub fn save(&self, collection: &Collection) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(collection)?;
        self.backend.set(&self.key, &bytes)?;
        log::trace!(
            "Saved {} windows under '{}' ({} bytes)",
            collection.len(),
            self.key,
            bytes.len()
        );
        Ok(())
    }

    /// Read the full collection, treating anything unusable as first run
    pub fn load(&self) -> Collection {
        let bytes = match self.backend.get(&self.key) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return Collection::new(),
            Err(e) => {
                log::warn!("Failed to read '{}', starting empty: {}", self.key, e);
                return Collection::new();
            }
        };

        match decode(&bytes) {
            Some(collection) => collection,
            None => {
                log::warn!(
                    "Stored '{}' has an unexpected shape, starting empty",
                    self.key
                );
                Collection::new()
            }
        }
    }

    /// Drop all persisted state
    pub fn clear(&self) -> Result<(), StoreError> {
        self.backend.remove(&self.key)
    }
}

fn decode(bytes: &[u8]) -> Option<Collection> {
    let windows: Vec<(WindowId, StoredForest)> = serde_json::from_slice(bytes).ok()?;
    let mut collection = Collection::new();
    for (window, stored) in windows {
        collection.insert(window, stored.into_forest()?);
    }
    Some(collection)
}
