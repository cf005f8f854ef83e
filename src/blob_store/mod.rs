mod local;
mod telegram;

pub use local::LocalStore;
pub use telegram::{RetryPolicy, TelegramStore, UploadedMedia};

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BlobStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Blob not found: {0}")]
    NotFound(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Which upload verb the remote API gets. Images are sent as documents so
/// the platform does not recompress them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Audio,
    Document,
    Video,
}

impl UploadKind {
    pub fn from_mime(mime_type: &str) -> Self {
        match mime_type.split('/').next().unwrap_or("") {
            "audio" => UploadKind::Audio,
            "video" => UploadKind::Video,
            _ => UploadKind::Document,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UploadBlob {
    pub file_name: String,
    pub mime_type: String,
    pub kind: UploadKind,
    pub data: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    /// Opaque reference handed back by the backend.
    pub blob_ref: String,
}

/// Opaque blob storage. References are meaningless without the metadata
/// database, and blobs are never deleted through this interface.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn store(&self, blob: UploadBlob) -> Result<StoredBlob, BlobStoreError>;
    async fn resolve(&self, blob_ref: &str) -> Result<Bytes, BlobStoreError>;
}
