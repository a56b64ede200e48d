//! Maintenance-mode flag.
//!
//! Read on every request, so the current value lives in an `AtomicBool`.
//! Writes go to disk first and only then flip the cached value.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::{StoreError, write_atomic};

#[derive(Debug, Serialize, Deserialize)]
struct FlagFile {
    enabled: bool,
}

/// Persisted maintenance flag, stored as `{"enabled": bool}`.
#[derive(Debug)]
pub struct MaintenanceFlag {
    path: PathBuf,
    enabled: AtomicBool,
    write_lock: Mutex<()>,
}

impl MaintenanceFlag {
    /// Load the flag from `path`, falling back to `default` when nothing has
    /// been saved yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: impl Into<PathBuf>, default: bool) -> Result<Self, StoreError> {
        let path = path.into();
        let enabled = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice::<FlagFile>(&bytes)?.enabled,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => default,
            Err(e) => return Err(e.into()),
        };
        if enabled {
            warn!("Starting in maintenance mode");
        }

        Ok(Self {
            path,
            enabled: AtomicBool::new(enabled),
            write_lock: Mutex::new(()),
        })
    }

    /// Whether maintenance mode is on.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Persist a new value.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written; the cached value is
    /// left unchanged in that case.
    pub async fn set(&self, enabled: bool) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let json = serde_json::to_vec(&FlagFile { enabled })?;
        write_atomic(&self.path, &json).await?;
        self.enabled.store(enabled, Ordering::Release);
        info!(enabled, "Maintenance mode updated");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("maintenance.json");
        assert!(!MaintenanceFlag::load(&path, false).unwrap().is_enabled());
        assert!(MaintenanceFlag::load(&path, true).unwrap().is_enabled());
    }

    #[tokio::test]
    async fn test_set_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("maintenance.json");

        let flag = MaintenanceFlag::load(&path, false).unwrap();
        flag.set(true).await.unwrap();
        assert!(flag.is_enabled());

        // Saved value wins over the default.
        let reloaded = MaintenanceFlag::load(&path, false).unwrap();
        assert!(reloaded.is_enabled());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("maintenance.json");
        std::fs::write(&path, "nope").unwrap();
        assert!(MaintenanceFlag::load(&path, false).is_err());
    }
}
