//! Small file-backed stores for state the payment processor does not hold.
//!
//! - `gallery` - Ordered list of gallery image URLs
//! - `maintenance` - Persisted maintenance-mode flag

pub mod gallery;
pub mod maintenance;

pub use gallery::GalleryStore;
pub use maintenance::MaintenanceFlag;

use thiserror::Error;

/// Errors raised by the file-backed stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file exists but is not the expected JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Write `bytes` to `path` through a sibling temp file so readers never see a
/// half-written file.
async fn write_atomic(path: &std::path::Path, bytes: &[u8]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}
