//! Recipient notification
//!
//! Recipients learn about a shared file (and its access code) out of band. Delivery failures
//! are reported to the caller, which logs them; they never undo record creation.

mod email;

pub use email::EmailNotifier;

use async_trait::async_trait;
use codedrop_core::AccessCode;
use thiserror::Error;

/// What a recipient is told about a shared file
#[derive(Debug, Clone)]
pub struct AccessNotice {
    pub recipient: String,
    pub file_name: String,
    pub access_code: AccessCode,
    pub expiry_duration_minutes: i32,
    pub owner_name: String,
    pub owner_email: String,
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Failed to build message: {0}")]
    Build(String),

    #[error("Delivery failed: {0}")]
    Transport(String),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notice: &AccessNotice) -> Result<(), NotifyError>;
}

/// Notifier used when email is disabled. Records the event without the code.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notice: &AccessNotice) -> Result<(), NotifyError> {
        tracing::info!(
            recipient = %notice.recipient,
            file_name = %notice.file_name,
            owner = %notice.owner_email,
            "Email notifications disabled; recipient must receive the access code from the owner"
        );
        Ok(())
    }
}
