use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio::fs;

use crate::keys::{generate_object_key, validate_object_key};
use crate::traits::{StorageError, StorageGateway, StorageResult, UploadSlot};
use crate::StorageBackend;

/// Local filesystem gateway for development.
///
/// There is nothing to sign locally: upload and download URLs are plain `{base_url}/{key}`
/// locations, served by whatever fronts `base_path` (a static file server, a reverse proxy).
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
    upload_ttl: Duration,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for stored objects (e.g., "/var/lib/codedrop/objects")
    /// * `base_url` - Base URL objects are served from (e.g., "http://localhost:4000/objects")
    pub async fn new(
        base_path: impl Into<PathBuf>,
        base_url: String,
        upload_ttl: Duration,
    ) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage {
            base_path,
            base_url: base_url.trim_end_matches('/').to_string(),
            upload_ttl,
        })
    }

    fn key_to_path(&self, object_key: &str) -> StorageResult<PathBuf> {
        validate_object_key(object_key)?;
        Ok(self.base_path.join(object_key))
    }

    fn generate_url(&self, object_key: &str) -> String {
        format!("{}/{}", self.base_url, object_key)
    }
}

#[async_trait]
impl StorageGateway for LocalStorage {
    async fn issue_upload_slot(
        &self,
        file_name: &str,
        _content_type: &str,
        folder: &str,
    ) -> StorageResult<UploadSlot> {
        let object_key = generate_object_key(folder, file_name)?;
        let path = self.key_to_path(&object_key)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let url = self.generate_url(&object_key);
        Ok(UploadSlot {
            object_key,
            upload_url: url.clone(),
            public_url: url,
            expires_in: self.upload_ttl,
        })
    }

    async fn issue_download_url(&self, object_key: &str, _ttl: Duration) -> StorageResult<String> {
        self.key_to_path(object_key)?;
        Ok(self.generate_url(object_key))
    }

    async fn delete_object(&self, object_key: &str) -> StorageResult<()> {
        let path = self.key_to_path(object_key)?;

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(());
        }

        fs::remove_file(&path).await.map_err(|e| {
            StorageError::DeleteFailed(format!("Failed to delete file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            key = %object_key,
            "Local storage delete successful"
        );

        Ok(())
    }

    async fn exists(&self, object_key: &str) -> StorageResult<bool> {
        let path = self.key_to_path(object_key)?;
        Ok(fs::try_exists(&path).await.unwrap_or(false))
    }

    async fn health_check(&self) -> StorageResult<()> {
        let meta = fs::metadata(&self.base_path).await?;
        if meta.is_dir() {
            Ok(())
        } else {
            Err(StorageError::ConfigError(format!(
                "{} is not a directory",
                self.base_path.display()
            )))
        }
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn storage(dir: &TempDir) -> LocalStorage {
        LocalStorage::new(
            dir.path(),
            "http://localhost:4000/objects/".to_string(),
            Duration::from_secs(300),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn upload_slot_points_at_base_url() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir).await;

        let slot = storage
            .issue_upload_slot("notes.txt", "text/plain", "uploads")
            .await
            .unwrap();
        assert!(slot.object_key.starts_with("uploads/"));
        assert!(slot.object_key.ends_with("-notes.txt"));
        assert_eq!(
            slot.upload_url,
            format!("http://localhost:4000/objects/{}", slot.object_key)
        );
        assert_eq!(slot.expires_in, Duration::from_secs(300));
        assert!(dir.path().join("uploads").is_dir());
    }

    #[tokio::test]
    async fn exists_and_delete() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir).await;
        let slot = storage
            .issue_upload_slot("a.bin", "application/octet-stream", "uploads")
            .await
            .unwrap();

        assert!(!storage.exists(&slot.object_key).await.unwrap());
        std::fs::write(dir.path().join(&slot.object_key), b"payload").unwrap();
        assert!(storage.exists(&slot.object_key).await.unwrap());

        storage.delete_object(&slot.object_key).await.unwrap();
        assert!(!storage.exists(&slot.object_key).await.unwrap());
        // Deleting again is a no-op.
        storage.delete_object(&slot.object_key).await.unwrap();
    }

    #[tokio::test]
    async fn traversal_keys_are_rejected() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir).await;

        for key in ["../escape", "/etc/passwd", "a//b"] {
            assert!(matches!(
                storage.exists(key).await,
                Err(StorageError::InvalidKey(_))
            ));
        }
        assert!(storage
            .issue_upload_slot("x", "text/plain", "../up")
            .await
            .is_err());
    }

    #[tokio::test]
    async fn health_check_reports_missing_directory() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir).await;
        storage.health_check().await.unwrap();

        drop(dir);
        assert!(storage.health_check().await.is_err());
    }
}
