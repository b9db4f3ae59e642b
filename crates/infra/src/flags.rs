//! Durable flag storage (the "was signed in" marker and the current-user
//! pointer that survive a reload).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError, RwLock};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlagStoreError {
    #[error("flag store io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("flag store is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("flag store lock poisoned")]
    Poisoned,
}

/// Process-wide persisted string key/value surface.
pub trait FlagStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, FlagStoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), FlagStoreError>;
    fn remove(&self, key: &str) -> Result<(), FlagStoreError>;
}

/// In-memory flags for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryFlagStore {
    inner: RwLock<BTreeMap<String, String>>,
}

impl InMemoryFlagStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FlagStore for InMemoryFlagStore {
    fn get(&self, key: &str) -> Result<Option<String>, FlagStoreError> {
        let map = self.inner.read().map_err(|_| FlagStoreError::Poisoned)?;
        Ok(map.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), FlagStoreError> {
        let mut map = self.inner.write().map_err(|_| FlagStoreError::Poisoned)?;
        map.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), FlagStoreError> {
        let mut map = self.inner.write().map_err(|_| FlagStoreError::Poisoned)?;
        map.remove(key);
        Ok(())
    }
}

/// Flags persisted as one JSON object on disk.
///
/// Every write rewrites the whole file through a sibling temp file and a
/// rename, so a crash leaves either the old or the new contents.
#[derive(Debug)]
pub struct JsonFileFlagStore {
    path: PathBuf,
    cache: Mutex<BTreeMap<String, String>>,
}

impl JsonFileFlagStore {
    /// Open (or lazily create) the store at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FlagStoreError> {
        let path = path.as_ref().to_path_buf();
        let cache = match std::fs::read(&path) {
            Ok(bytes) if bytes.is_empty() => BTreeMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            cache: Mutex::new(cache),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, map: &BTreeMap<String, String>) -> Result<(), FlagStoreError> {
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(map)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl FlagStore for JsonFileFlagStore {
    fn get(&self, key: &str) -> Result<Option<String>, FlagStoreError> {
        let map = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(map.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), FlagStoreError> {
        let mut map = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        map.insert(key.to_string(), value.to_string());
        self.persist(&map)
    }

    fn remove(&self, key: &str) -> Result<(), FlagStoreError> {
        let mut map = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if map.remove(key).is_some() {
            self.persist(&map)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_round_trip() {
        let flags = InMemoryFlagStore::new();
        flags.set("isAuthenticated", "true").unwrap();
        assert_eq!(flags.get("isAuthenticated").unwrap().as_deref(), Some("true"));
        flags.remove("isAuthenticated").unwrap();
        assert_eq!(flags.get("isAuthenticated").unwrap(), None);
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flags.json");

        let flags = JsonFileFlagStore::open(&path).unwrap();
        flags.set("currentUserId", "1").unwrap();
        flags.set("isAuthenticated", "true").unwrap();
        flags.remove("isAuthenticated").unwrap();
        drop(flags);

        let reopened = JsonFileFlagStore::open(&path).unwrap();
        assert_eq!(reopened.get("currentUserId").unwrap().as_deref(), Some("1"));
        assert_eq!(reopened.get("isAuthenticated").unwrap(), None);
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flags.json");
        std::fs::write(&path, b"{not json").unwrap();

        let err = JsonFileFlagStore::open(&path).unwrap_err();
        assert!(matches!(err, FlagStoreError::Corrupt(_)));
    }
}
