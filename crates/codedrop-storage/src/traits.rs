//! Storage gateway trait
//!
//! Every backend (S3, local filesystem) implements [`StorageGateway`].

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::StorageBackend;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Presign failed: {0}")]
    PresignFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// A freshly reserved object key together with the URL the client uploads to.
#[derive(Debug, Clone)]
pub struct UploadSlot {
    pub object_key: String,
    /// Time-boxed URL accepting a single HTTP PUT of the file bytes
    pub upload_url: String,
    /// Permanent location of the object, not itself readable without a signed URL
    pub public_url: String,
    pub expires_in: Duration,
}

/// Object-storage gateway
///
/// Issues upload slots and download URLs and removes objects. Implementations must never
/// need file contents.
#[async_trait]
pub trait StorageGateway: Send + Sync {
    /// Reserve a new key under `folder` and presign an upload to it.
    async fn issue_upload_slot(
        &self,
        file_name: &str,
        content_type: &str,
        folder: &str,
    ) -> StorageResult<UploadSlot>;

    /// Presign a GET for `object_key` valid for `ttl`.
    async fn issue_download_url(&self, object_key: &str, ttl: Duration) -> StorageResult<String>;

    /// Remove the object. Removing a missing object is not an error.
    async fn delete_object(&self, object_key: &str) -> StorageResult<()>;

    async fn exists(&self, object_key: &str) -> StorageResult<bool>;

    /// Reachability check used by `/health`
    async fn health_check(&self) -> StorageResult<()>;

    fn backend_type(&self) -> StorageBackend;
}
