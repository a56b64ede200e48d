//! Key-value persistence for the cart.
//!
//! Browsers give the cart a string key-value store; native clients get a
//! directory with one file per key. Both sit behind [`KeyValueStore`].

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

/// Errors raised by a [`KeyValueStore`].
#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    /// The backing store is not usable (quota, private mode, closed handle).
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// Filesystem error.
    #[error("storage I/O error: {0}")]
    Io(#[from] io::Error),

    /// The value could not be encoded.
    #[error("failed to encode value: {0}")]
    Encode(#[from] serde_json::Error),

    /// The key cannot be mapped onto the backing store.
    #[error("invalid storage key: {0}")]
    InvalidKey(String),
}

/// String key-value persistence.
pub trait KeyValueStore {
    /// Read a value. A missing key is `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a value, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store rejects the write.
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete a value. Deleting a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store rejects the delete.
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

/// In-memory store. Contents are lost when it is dropped.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: HashMap<String, String>,
    failing: bool,
}

impl MemoryStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every operation fails, like storage in a locked-down
    /// browser.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            values: HashMap::new(),
            failing: true,
        }
    }

    /// Raw value for `key`, bypassing the failure mode.
    #[must_use]
    pub fn peek(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    fn ensure_available(&self) -> Result<(), StorageError> {
        if self.failing {
            return Err(StorageError::Unavailable("memory store disabled".to_string()));
        }
        Ok(())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.ensure_available()?;
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.ensure_available()?;
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.ensure_available()?;
        self.values.remove(key);
        Ok(())
    }
}

/// Directory-backed store: key `cart` lives in `<dir>/cart.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (and create if needed) the storage directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// The storage directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match std::fs::read_to_string(self.path_for(key)?) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        match std::fs::remove_file(self.path_for(key)?) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_roundtrip() {
        let mut store = MemoryStore::new();
        assert_eq!(store.get("cart").unwrap(), None);

        store.set("cart", "[]").unwrap();
        assert_eq!(store.get("cart").unwrap().as_deref(), Some("[]"));

        store.remove("cart").unwrap();
        store.remove("cart").unwrap();
        assert_eq!(store.get("cart").unwrap(), None);
    }

    #[test]
    fn test_failing_memory_store() {
        let mut store = MemoryStore::failing();
        assert!(store.get("cart").is_err());
        assert!(store.set("cart", "[]").is_err());
        assert!(store.remove("cart").is_err());
    }

    #[test]
    fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::open(dir.path().join("nested")).unwrap();

        assert_eq!(store.get("pickup-time").unwrap(), None);
        store.set("pickup-time", "ASAP").unwrap();
        assert_eq!(store.get("pickup-time").unwrap().as_deref(), Some("ASAP"));
        assert!(store.dir().join("pickup-time.json").exists());

        store.remove("pickup-time").unwrap();
        store.remove("pickup-time").unwrap();
        assert_eq!(store.get("pickup-time").unwrap(), None);
    }

    #[test]
    fn test_file_store_rejects_path_keys() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::open(dir.path()).unwrap();
        assert!(matches!(
            store.set("../escape", "x"),
            Err(StorageError::InvalidKey(_))
        ));
        assert!(store.get("").is_err());
    }
}
