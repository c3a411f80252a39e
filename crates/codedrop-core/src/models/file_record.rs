use std::collections::BTreeSet;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::access_code::{is_well_formed, AccessCode};
use crate::config::{MAX_EXPIRY_MINUTES, MIN_EXPIRY_MINUTES};
use crate::error::AppError;

/// Lifecycle status of a shared file.
///
/// Transitions only move forward: `pending -> uploaded -> expired`, and any state may move
/// to `deleted`. `expired` and `deleted` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "file_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Pending,
    Uploaded,
    Expired,
    Deleted,
}

impl FileStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, FileStatus::Expired | FileStatus::Deleted)
    }

    /// Statuses shown in an owner's file listing.
    pub fn is_listed(self) -> bool {
        matches!(self, FileStatus::Pending | FileStatus::Uploaded)
    }
}

impl FromStr for FileStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(FileStatus::Pending),
            "uploaded" => Ok(FileStatus::Uploaded),
            "expired" => Ok(FileStatus::Expired),
            "deleted" => Ok(FileStatus::Deleted),
            _ => Err(anyhow::anyhow!("Invalid file status: {}", s)),
        }
    }
}

impl Display for FileStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            FileStatus::Pending => write!(f, "pending"),
            FileStatus::Uploaded => write!(f, "uploaded"),
            FileStatus::Expired => write!(f, "expired"),
            FileStatus::Deleted => write!(f, "deleted"),
        }
    }
}

/// Durable record tying a stored object to its owner, recipients and access code.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct FileRecord {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub file_name: String,
    pub content_type: String,
    pub folder: String,
    pub object_key: String,
    pub public_url: String,
    /// Normalized (trimmed, lowercased), sorted and de-duplicated.
    pub target_recipients: Vec<String>,
    pub access_code: AccessCode,
    pub status: FileStatus,
    pub expiry_duration_minutes: i32,
    pub first_accessed_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FileRecord {
    pub fn is_recipient(&self, email: &str) -> bool {
        let email = normalize_email(email);
        self.target_recipients.iter().any(|r| *r == email)
    }

    /// True once the first-access window has been opened and has since lapsed.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.status == FileStatus::Expired || self.expires_at.is_some_and(|at| now > at)
    }

    /// Whole minutes left in the access window, rounded up. Never negative.
    pub fn remaining_minutes_at(&self, now: DateTime<Utc>) -> i64 {
        match self.expires_at {
            Some(at) => {
                let secs = (at - now).num_seconds().max(0);
                (secs + 59) / 60
            }
            None => i64::from(self.expiry_duration_minutes),
        }
    }
}

/// Everything needed to persist a new `pending` record.
#[derive(Debug, Clone)]
pub struct NewFileRecord {
    pub owner_id: Uuid,
    pub file_name: String,
    pub content_type: String,
    pub folder: String,
    pub object_key: String,
    pub public_url: String,
    pub target_recipients: Vec<String>,
    pub access_code: AccessCode,
    pub expiry_duration_minutes: i32,
}

impl NewFileRecord {
    /// Materialize the record as it is first stored.
    pub fn into_record(self, id: Uuid, now: DateTime<Utc>) -> FileRecord {
        FileRecord {
            id,
            owner_id: self.owner_id,
            file_name: self.file_name,
            content_type: self.content_type,
            folder: self.folder,
            object_key: self.object_key,
            public_url: self.public_url,
            target_recipients: self.target_recipients,
            access_code: self.access_code,
            status: FileStatus::Pending,
            expiry_duration_minutes: self.expiry_duration_minutes,
            first_accessed_at: None,
            expires_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Trim, lowercase, sort and collapse duplicates. Fails when nothing usable remains.
pub fn normalize_recipients<I, S>(recipients: I) -> Result<Vec<String>, AppError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut set = BTreeSet::new();
    for recipient in recipients {
        let email = normalize_email(recipient.as_ref());
        if email.is_empty() {
            return Err(AppError::InvalidInput(
                "Recipient email must not be empty".to_string(),
            ));
        }
        set.insert(email);
    }
    if set.is_empty() {
        return Err(AppError::InvalidInput(
            "At least one recipient is required".to_string(),
        ));
    }
    Ok(set.into_iter().collect())
}

pub fn validate_expiry_minutes(minutes: i32) -> Result<(), AppError> {
    if (MIN_EXPIRY_MINUTES..=MAX_EXPIRY_MINUTES).contains(&minutes) {
        Ok(())
    } else {
        Err(AppError::InvalidInput(format!(
            "expiry_duration_minutes must be between {} and {}",
            MIN_EXPIRY_MINUTES, MAX_EXPIRY_MINUTES
        )))
    }
}

fn validate_recipient_emails(recipients: &[String]) -> Result<(), ValidationError> {
    use validator::ValidateEmail;

    if recipients.iter().all(|r| r.trim().validate_email()) {
        Ok(())
    } else {
        Err(ValidationError::new("recipient_email")
            .with_message("Every recipient must be a valid email address".into()))
    }
}

fn validate_access_code_format(code: &str) -> Result<(), ValidationError> {
    if is_well_formed(code) {
        Ok(())
    } else {
        Err(ValidationError::new("access_code")
            .with_message("Access code must be exactly 6 digits".into()))
    }
}

/// Request an upload slot for a new shared file
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct UploadSlotRequest {
    /// Original file name
    #[validate(length(
        min = 1,
        max = 255,
        message = "File name must be between 1 and 255 characters"
    ))]
    pub file_name: String,
    /// Content type (MIME type)
    #[validate(length(
        min = 1,
        max = 255,
        message = "Content type must be between 1 and 255 characters"
    ))]
    pub content_type: String,
    /// Key prefix; the server default is used when omitted
    #[serde(default)]
    #[validate(length(min = 1, max = 128, message = "Folder must be between 1 and 128 characters"))]
    pub folder: Option<String>,
    /// Email addresses allowed to download the file
    #[validate(
        length(min = 1, message = "At least one recipient is required"),
        custom(function = "validate_recipient_emails")
    )]
    pub target_recipients: Vec<String>,
    /// Minutes the file stays downloadable after its first access (1-1440)
    #[serde(default)]
    #[validate(range(min = 1, max = 1440, message = "Expiry must be between 1 and 1440 minutes"))]
    pub expiry_duration_minutes: Option<i32>,
}

/// Upload slot issued to the owner. This is the only response carrying the access code.
#[derive(Debug, Serialize, ToSchema)]
pub struct UploadSlotResponse {
    pub id: Uuid,
    /// Presigned URL for a direct PUT upload
    pub upload_url: String,
    pub object_key: String,
    pub public_url: String,
    /// Share this with the recipients
    pub access_code: String,
    pub target_recipients: Vec<String>,
    pub expiry_duration_minutes: i32,
    pub status: FileStatus,
    /// Seconds until `upload_url` stops working
    pub upload_url_expires_in: u64,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct ConfirmUploadRequest {
    #[validate(length(min = 1, max = 1024, message = "Object key is required"))]
    pub object_key: String,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct DownloadRequest {
    #[validate(length(min = 1, max = 1024, message = "Object key is required"))]
    pub object_key: String,
    /// The 6-digit code received from the owner
    #[validate(custom(function = "validate_access_code_format"))]
    pub access_code: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DownloadResponse {
    /// Presigned GET URL
    pub download_url: String,
    pub file_name: String,
    pub content_type: String,
    pub expires_at: DateTime<Utc>,
    /// Whole minutes left in the access window, rounded up
    pub remaining_minutes: i64,
}

/// Owner-facing view of a record. Never includes the access code.
#[derive(Debug, Serialize, ToSchema)]
pub struct FileSummary {
    pub id: Uuid,
    pub object_key: String,
    pub file_name: String,
    pub content_type: String,
    pub folder: String,
    pub public_url: String,
    pub status: FileStatus,
    pub target_recipients: Vec<String>,
    pub expiry_duration_minutes: i32,
    pub first_accessed_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<FileRecord> for FileSummary {
    fn from(record: FileRecord) -> Self {
        FileSummary {
            id: record.id,
            object_key: record.object_key,
            file_name: record.file_name,
            content_type: record.content_type,
            folder: record.folder,
            public_url: record.public_url,
            status: record.status,
            target_recipients: record.target_recipients,
            expiry_duration_minutes: record.expiry_duration_minutes,
            first_accessed_at: record.first_accessed_at,
            expires_at: record.expires_at,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Metadata visible to the owner and to every recipient
#[derive(Debug, Serialize, ToSchema)]
pub struct FileMetaResponse {
    pub object_key: String,
    pub file_name: String,
    pub content_type: String,
    pub status: FileStatus,
    pub target_recipients: Vec<String>,
    pub expiry_duration_minutes: i32,
    pub first_accessed_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_expired: bool,
    pub created_at: DateTime<Utc>,
}

impl FileMetaResponse {
    pub fn from_record(record: FileRecord, now: DateTime<Utc>) -> Self {
        let is_expired = record.is_expired_at(now);
        FileMetaResponse {
            object_key: record.object_key,
            file_name: record.file_name,
            content_type: record.content_type,
            status: record.status,
            target_recipients: record.target_recipients,
            expiry_duration_minutes: record.expiry_duration_minutes,
            first_accessed_at: record.first_accessed_at,
            expires_at: record.expires_at,
            is_expired,
            created_at: record.created_at,
        }
    }
}
