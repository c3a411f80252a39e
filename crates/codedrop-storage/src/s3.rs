use std::time::Duration;

use async_trait::async_trait;
use http::Method;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::signer::Signer;
use object_store::Error as ObjectStoreError;
use object_store::{ObjectStoreExt, Result as ObjectResult};

use crate::keys::{generate_object_key, validate_object_key};
use crate::traits::{StorageError, StorageGateway, StorageResult, UploadSlot};
use crate::StorageBackend;

/// S3 gateway. Uploads and downloads go directly between the client and the bucket through
/// presigned URLs.
#[derive(Clone)]
pub struct S3Storage {
    store: AmazonS3,
    bucket: String,
    region: String,
    endpoint_url: Option<String>, // Custom endpoint for S3-compatible providers
    upload_ttl: Duration,
}

impl S3Storage {
    /// Create a new S3Storage instance
    ///
    /// # Arguments
    /// * `bucket` - S3 bucket name
    /// * `region` - AWS region (or region identifier for S3-compatible providers)
    /// * `endpoint_url` - Optional custom endpoint, e.g. "http://localhost:9000" for MinIO
    /// * `upload_ttl` - Lifetime of presigned upload URLs
    pub fn new(
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
        upload_ttl: Duration,
    ) -> StorageResult<Self> {
        // Credentials come from the usual AWS_* environment variables.
        let mut builder = AmazonS3Builder::from_env()
            .with_region(region.clone())
            .with_bucket_name(bucket.clone());

        if let Some(ref endpoint) = endpoint_url {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(S3Storage {
            store,
            bucket,
            region,
            endpoint_url,
            upload_ttl,
        })
    }

    /// Public URL for an object
    ///
    /// AWS: `https://{bucket}.s3.{region}.amazonaws.com/{key}`.
    /// S3-compatible providers use path style: `{endpoint}/{bucket}/{key}`.
    fn generate_url(&self, key: &str) -> String {
        if let Some(ref endpoint) = self.endpoint_url {
            let base_url = endpoint.trim_end_matches('/');
            format!("{}/{}/{}", base_url, self.bucket, key)
        } else {
            format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                self.bucket, self.region, key
            )
        }
    }

    async fn sign(&self, method: Method, key: &str, ttl: Duration) -> StorageResult<String> {
        let location = Path::from(key.to_string());
        let url_result: ObjectResult<_> = self.store.signed_url(method, &location, ttl).await;

        let url = url_result
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    "S3 presign failed"
                );
                StorageError::PresignFailed(e.to_string())
            })?
            .to_string();

        Ok(url)
    }
}

#[async_trait]
impl StorageGateway for S3Storage {
    async fn issue_upload_slot(
        &self,
        file_name: &str,
        _content_type: &str,
        folder: &str,
    ) -> StorageResult<UploadSlot> {
        let object_key = generate_object_key(folder, file_name)?;
        let upload_url = self.sign(Method::PUT, &object_key, self.upload_ttl).await?;

        tracing::debug!(
            bucket = %self.bucket,
            key = %object_key,
            ttl_secs = self.upload_ttl.as_secs(),
            "Issued S3 upload URL"
        );

        Ok(UploadSlot {
            public_url: self.generate_url(&object_key),
            object_key,
            upload_url,
            expires_in: self.upload_ttl,
        })
    }

    async fn issue_download_url(&self, object_key: &str, ttl: Duration) -> StorageResult<String> {
        validate_object_key(object_key)?;
        self.sign(Method::GET, object_key, ttl).await
    }

    async fn delete_object(&self, object_key: &str) -> StorageResult<()> {
        validate_object_key(object_key)?;
        let start = std::time::Instant::now();
        let location = Path::from(object_key.to_string());

        match self.store.delete(&location).await {
            Ok(()) | Err(ObjectStoreError::NotFound { .. }) => {}
            Err(e) => {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %object_key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 delete failed"
                );
                return Err(StorageError::DeleteFailed(e.to_string()));
            }
        }

        tracing::info!(
            bucket = %self.bucket,
            key = %object_key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 delete successful"
        );

        Ok(())
    }

    async fn exists(&self, object_key: &str) -> StorageResult<bool> {
        validate_object_key(object_key)?;
        let location = Path::from(object_key.to_string());
        match self.store.head(&location).await {
            Ok(_) => Ok(true),
            Err(ObjectStoreError::NotFound { .. }) => Ok(false),
            Err(e) => Err(StorageError::BackendError(e.to_string())),
        }
    }

    async fn health_check(&self) -> StorageResult<()> {
        // A HEAD on a key that never exists proves credentials and bucket reachability.
        let probe = Path::from("codedrop-health-probe");
        match self.store.head(&probe).await {
            Ok(_) | Err(ObjectStoreError::NotFound { .. }) => Ok(()),
            Err(e) => Err(StorageError::BackendError(e.to_string())),
        }
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}
