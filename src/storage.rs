// src/storage.rs
use crate::error::{StoreError, StoreResult};
use log;
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// String-keyed, string-valued persistent storage.
pub trait KeyValueStorage {
    /// Returns `Ok(None)` when nothing has been stored under `key`.
    fn get_item(&self, key: &str) -> StoreResult<Option<String>>;
    /// Replaces whatever was stored under `key`.
    fn set_item(&mut self, key: &str, value: &str) -> StoreResult<()>;
}

/// Keeps each key in its own `<key>.json` file inside a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileStorage { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KeyValueStorage for FileStorage {
    fn get_item(&self, key: &str) -> StoreResult<Option<String>> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(content) => {
                log::debug!("Read {} bytes for key '{}' from {:?}", content.len(), key, path);
                Ok(Some(content))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No stored value for key '{}' at {:?}", key, path);
                Ok(None)
            }
            Err(e) => {
                log::error!("Failed to read {:?}: {}", path, e);
                Err(StoreError::Io(e))
            }
        }
    }

    fn set_item(&mut self, key: &str, value: &str) -> StoreResult<()> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir).map_err(|e| {
                log::error!("Failed to create storage directory {:?}: {}", self.dir, e);
                StoreError::Io(e)
            })?;
            log::info!("Created storage directory: {:?}", self.dir);
        }

        let path = self.path_for(key);
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| {
                log::error!("Failed to open {:?} for writing: {}", path, e);
                StoreError::Io(e)
            })?;
        file.write_all(value.as_bytes()).map_err(|e| {
            log::error!("Failed to write key '{}' to {:?}: {}", key, path, e);
            StoreError::Io(e)
        })?;
        Ok(())
    }
}

/// Volatile storage, used for tests and throwaway sessions.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    items: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        MemoryStorage::default()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.items.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> StoreResult<()> {
        self.items.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_file_storage_missing_key() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path());
        assert_eq!(storage.get_item("accounts_v1").unwrap(), None);
    }

    #[test]
    fn test_file_storage_set_then_get_overwrites() {
        let dir = tempdir().unwrap();
        let mut storage = FileStorage::new(dir.path().join("nested").join("data"));

        storage.set_item("accounts_v1", "[1,2,3]").unwrap();
        assert!(storage.dir().join("accounts_v1.json").exists());
        storage.set_item("accounts_v1", "[]").unwrap();
        assert_eq!(storage.get_item("accounts_v1").unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn test_file_storage_read_error_is_reported() {
        let dir = tempdir().unwrap();
        // A directory where the file should be makes the read fail with something other than NotFound.
        fs::create_dir(dir.path().join("accounts_v1.json")).unwrap();
        let storage = FileStorage::new(dir.path());
        match storage.get_item("accounts_v1") {
            Err(StoreError::Io(_)) => {}
            other => panic!("Expected Io error, got {:?}", other),
        }
    }

    #[test]
    fn test_memory_storage() {
        let mut storage = MemoryStorage::new();
        assert_eq!(storage.get_item("k").unwrap(), None);
        storage.set_item("k", "v1").unwrap();
        storage.set_item("k", "v2").unwrap();
        assert_eq!(storage.get_item("k").unwrap().as_deref(), Some("v2"));
    }
}
