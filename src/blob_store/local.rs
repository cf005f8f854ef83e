use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};

use super::{BlobStore, BlobStoreError, StoredBlob, UploadBlob};

/// Local filesystem blob store for development and testing.
pub struct LocalStore {
    base_path: PathBuf,
}

impl LocalStore {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Result<Self, std::io::Error> {
        let base_path = base_path.as_ref().to_path_buf();
        std::fs::create_dir_all(&base_path)?;
        Ok(Self { base_path })
    }

    /// Blob refs come back from URLs, so anything that could escape the
    /// base directory resolves to nothing.
    fn blob_path(&self, blob_ref: &str) -> Option<PathBuf> {
        let valid = !blob_ref.is_empty()
            && blob_ref
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        valid.then(|| self.base_path.join(blob_ref))
    }
}

#[async_trait]
impl BlobStore for LocalStore {
    async fn store(&self, blob: UploadBlob) -> Result<StoredBlob, BlobStoreError> {
        let blob_ref = uuid::Uuid::new_v4().simple().to_string();
        let path = self.base_path.join(&blob_ref);
        tokio::fs::write(&path, &blob.data).await?;
        Ok(StoredBlob { blob_ref })
    }

    async fn resolve(&self, blob_ref: &str) -> Result<Bytes, BlobStoreError> {
        let path = self
            .blob_path(blob_ref)
            .ok_or_else(|| BlobStoreError::NotFound(blob_ref.to_string()))?;
        if !path.exists() {
            return Err(BlobStoreError::NotFound(blob_ref.to_string()));
        }
        let data = tokio::fs::read(&path).await?;
        Ok(Bytes::from(data))
    }
}
