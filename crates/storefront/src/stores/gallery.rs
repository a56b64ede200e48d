//! Gallery image list.

use std::path::{Path, PathBuf};

use tokio::sync::Mutex;
use tracing::{info, instrument};

use super::{StoreError, write_atomic};

/// Ordered list of gallery image URLs, stored as a JSON array.
#[derive(Debug)]
pub struct GalleryStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles.
    lock: Mutex<()>,
}

impl GalleryStore {
    /// Open the store at `path`. The file is created on first write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every image URL, oldest first. A missing file is an empty gallery.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a JSON array of
    /// strings.
    pub async fn list(&self) -> Result<Vec<String>, StoreError> {
        let _guard = self.lock.lock().await;
        self.read().await
    }

    /// Append `url` unless it is already present. Returns whether it was added.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or written.
    #[instrument(skip(self))]
    pub async fn add(&self, url: &str) -> Result<bool, StoreError> {
        let _guard = self.lock.lock().await;
        let mut images = self.read().await?;
        if images.iter().any(|existing| existing == url) {
            return Ok(false);
        }
        images.push(url.to_string());
        self.write(&images).await?;
        info!(count = images.len(), "Gallery image added");
        Ok(true)
    }

    /// Remove `url`. Returns whether anything was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or written.
    #[instrument(skip(self))]
    pub async fn remove(&self, url: &str) -> Result<bool, StoreError> {
        let _guard = self.lock.lock().await;
        let mut images = self.read().await?;
        let before = images.len();
        images.retain(|existing| existing != url);
        if images.len() == before {
            return Ok(false);
        }
        self.write(&images).await?;
        info!(count = images.len(), "Gallery image removed");
        Ok(true)
    }

    async fn read(&self) -> Result<Vec<String>, StoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, images: &[String]) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(images)?;
        write_atomic(&self.path, &json).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = GalleryStore::new(dir.path().join("gallery.json"));
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = GalleryStore::new(dir.path().join("nested/gallery.json"));

        assert!(store.add("/gallery/a.jpg").await.unwrap());
        assert!(!store.add("/gallery/a.jpg").await.unwrap());
        assert!(store.add("https://cdn.example.com/b.jpg").await.unwrap());

        assert_eq!(
            store.list().await.unwrap(),
            vec!["/gallery/a.jpg", "https://cdn.example.com/b.jpg"]
        );
    }

    #[tokio::test]
    async fn test_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = GalleryStore::new(dir.path().join("gallery.json"));
        store.add("/gallery/a.jpg").await.unwrap();

        assert!(!store.remove("/gallery/missing.jpg").await.unwrap());
        assert!(store.remove("/gallery/a.jpg").await.unwrap());
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gallery.json");
        std::fs::write(&path, "{").unwrap();

        let store = GalleryStore::new(path);
        assert!(matches!(store.list().await, Err(StoreError::Json(_))));
    }

    #[tokio::test]
    async fn test_concurrent_adds_are_not_lost() {
        let dir = tempfile::tempdir().unwrap();
        let store = std::sync::Arc::new(GalleryStore::new(dir.path().join("gallery.json")));

        let handles: Vec<_> = (0..10)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move { store.add(&format!("/gallery/{i}.jpg")).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.list().await.unwrap().len(), 10);
    }
}
