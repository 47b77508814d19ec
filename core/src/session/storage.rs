//! Key-value stores standing in for browser `localStorage` and
//! `sessionStorage`.
//!
//! `FileStore` persists one file per key and outlives the process, like
//! local storage. `MemoryStore` lives as long as the process, like session
//! storage, and can be given a byte quota.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::PersistenceError;


/// Well-known key for the persisted grid layout in local storage.
pub const LOCAL_LAYOUT_KEY: &str = "paneboard.grid_layout";

/// Well-known key for the persisted grid layout in session storage.
pub const SESSION_LAYOUT_KEY: &str = "paneboard.grid_layout.session";


pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError>;
    fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError>;
    fn remove(&self, key: &str) -> Result<(), PersistenceError>;
}


// ---------------------------------------------------------------------------
// FileStore
// ---------------------------------------------------------------------------

/// One `<key>.json` file per key under a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}


impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> FileStore {
        FileStore { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", file))
    }

    fn storage_error(key: &str, e: std::io::Error) -> PersistenceError {
        PersistenceError::Storage {
            key: key.to_string(),
            reason: e.to_string(),
        }
    }
}


impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Self::storage_error(key, e)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| Self::storage_error(key, e))?;
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value).map_err(|e| Self::storage_error(key, e))?;
        std::fs::rename(&tmp, &path).map_err(|e| Self::storage_error(key, e))
    }

    fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Self::storage_error(key, e)),
        }
    }
}


// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
    quota_bytes: Option<usize>,
}


impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    /// A store that rejects writes once the total stored bytes would exceed `bytes`.
    pub fn with_quota(bytes: usize) -> MemoryStore {
        MemoryStore {
            values: Mutex::new(HashMap::new()),
            quota_bytes: Some(bytes),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.values.lock().unwrap_or_else(PoisonError::into_inner)
    }
}


impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        let mut values = self.lock();
        if let Some(quota) = self.quota_bytes {
            let others: usize = values
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            if others + key.len() + value.len() > quota {
                return Err(PersistenceError::Quota {
                    key: key.to_string(),
                });
            }
        }
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        self.lock().remove(key);
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_store_round_trips_and_removes() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested"));
        assert_eq!(store.get(LOCAL_LAYOUT_KEY).unwrap(), None);
        store.set(LOCAL_LAYOUT_KEY, "{\"lg\":[]}").unwrap();
        assert_eq!(store.get(LOCAL_LAYOUT_KEY).unwrap().as_deref(), Some("{\"lg\":[]}"));
        assert!(dir.path().join("nested/paneboard.grid_layout.json").exists());
        store.remove(LOCAL_LAYOUT_KEY).unwrap();
        store.remove(LOCAL_LAYOUT_KEY).unwrap();
        assert_eq!(store.get(LOCAL_LAYOUT_KEY).unwrap(), None);
    }

    #[test]
    fn file_store_sanitizes_key_characters() {
        let store = FileStore::new("/tmp/x");
        assert_eq!(store.path_for("a/b c"), PathBuf::from("/tmp/x/a_b_c.json"));
    }

    #[test]
    fn memory_store_enforces_quota() {
        let store = MemoryStore::with_quota(16);
        store.set("k", "small").unwrap();
        let err = store.set("k2", "this value is far too large").unwrap_err();
        assert_eq!(err, PersistenceError::Quota { key: "k2".into() });
        // overwriting an existing key only counts the new value
        store.set("k", "0123456789").unwrap();
    }
}
