//! Codedrop Storage Library
//!
//! The object-storage gateway: it hands out time-boxed upload and download URLs and deletes
//! objects. File bytes never pass through the service.
//!
//! # Object key format
//!
//! `{folder}/{uuid}-{sanitized file name}`. Keys must not contain `..`, a leading `/` or
//! empty segments. Key generation lives in the `keys` module so every backend agrees.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use codedrop_core::StorageBackend;
pub use factory::create_storage;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{StorageError, StorageGateway, StorageResult, UploadSlot};
