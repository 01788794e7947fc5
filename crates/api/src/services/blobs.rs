//! Blob storage collaborator.
//!
//! Given bytes and a logical field name, a blob store hands back a stable
//! file name; given a name, it deletes the bytes. Names never contain path
//! separators, so they can be served directly under `/uploads/{name}`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use thiserror::Error;

/// Errors from blob storage operations.
#[derive(Debug, Error)]
pub enum BlobError {
    /// Filesystem failure.
    #[error("blob io error: {0}")]
    Io(#[from] std::io::Error),

    /// The blob name is not one this store handed out.
    #[error("invalid blob name: {0}")]
    InvalidName(String),
}

/// Storage for uploaded catalog asset bytes.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` uploaded for `field`, returning a stable unique name.
    ///
    /// The original file name only contributes its extension.
    async fn put(&self, field: &str, original_name: &str, bytes: Vec<u8>)
    -> Result<String, BlobError>;

    /// Delete a stored blob. Deleting an unknown name is an error the caller
    /// is expected to log and ignore.
    async fn delete(&self, name: &str) -> Result<(), BlobError>;
}

/// Reject names that could escape the upload directory.
fn check_name(name: &str) -> Result<(), BlobError> {
    if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
        return Err(BlobError::InvalidName(name.to_owned()));
    }
    Ok(())
}

/// Extension (with leading dot) of an uploaded file name, if it has one.
fn extension_of(original_name: &str) -> String {
    Path::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default()
}

/// Blob store over a directory on the local filesystem.
///
/// Files are named `{field}-{uuid}{ext}`, the same layout the static file
/// service exposes under `/uploads`.
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Create a store rooted at `root`. The directory must already exist.
    #[must_use]
    pub const fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(
        &self,
        field: &str,
        original_name: &str,
        bytes: Vec<u8>,
    ) -> Result<String, BlobError> {
        let name = format!(
            "{field}-{}{}",
            uuid::Uuid::new_v4(),
            extension_of(original_name)
        );
        tokio::fs::write(self.root.join(&name), &bytes).await?;
        Ok(name)
    }

    async fn delete(&self, name: &str) -> Result<(), BlobError> {
        check_name(name)?;
        tokio::fs::remove_file(self.root.join(name)).await?;
        Ok(())
    }
}

/// In-memory blob store for tests: records names and byte counts only.
#[derive(Clone, Default)]
pub struct MemoryBlobStore {
    files: Arc<Mutex<HashSet<String>>>,
}

impl MemoryBlobStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a blob with this name is stored.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.files.lock().expect("blob lock poisoned").contains(name)
    }

    /// Number of stored blobs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.lock().expect("blob lock poisoned").len()
    }

    /// Whether no blobs are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(
        &self,
        field: &str,
        original_name: &str,
        _bytes: Vec<u8>,
    ) -> Result<String, BlobError> {
        let name = format!(
            "{field}-{}{}",
            uuid::Uuid::new_v4(),
            extension_of(original_name)
        );
        self.files
            .lock()
            .expect("blob lock poisoned")
            .insert(name.clone());
        Ok(name)
    }

    async fn delete(&self, name: &str) -> Result<(), BlobError> {
        check_name(name)?;
        let removed = self
            .files
            .lock()
            .expect("blob lock poisoned")
            .remove(name);
        if removed {
            Ok(())
        } else {
            Err(BlobError::InvalidName(name.to_owned()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_tracks_puts_and_deletes() {
        let store = MemoryBlobStore::new();
        let name = store
            .put("mainImages", "photo.jpg", vec![1, 2, 3])
            .await
            .unwrap();
        assert!(name.starts_with("mainImages-"));
        assert!(name.ends_with(".jpg"));
        assert!(store.contains(&name));

        store.delete(&name).await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn delete_rejects_path_traversal() {
        let store = MemoryBlobStore::new();
        assert!(matches!(
            store.delete("../etc/passwd").await,
            Err(BlobError::InvalidName(_))
        ));
        assert!(matches!(
            store.delete("a/b.jpg").await,
            Err(BlobError::InvalidName(_))
        ));
    }

    #[test]
    fn extension_handling() {
        assert_eq!(extension_of("a.PNG"), ".PNG");
        assert_eq!(extension_of("archive.tar.gz"), ".gz");
        assert_eq!(extension_of("no-extension"), "");
    }
}
