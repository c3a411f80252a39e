//! Codedrop Core Library
//!
//! Domain models, error types, configuration and the access-code generator shared by every
//! codedrop crate.

pub mod access_code;
pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use access_code::{generate_access_code, AccessCode};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CodedropConfig, Config};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use storage_types::{RecordStoreKind, StorageBackend};
