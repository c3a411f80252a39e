use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use codedrop_core::models::{
    normalize_recipients, validate_expiry_minutes, FileRecord, FileStatus, NewFileRecord,
};
use codedrop_core::{generate_access_code, AppError, Clock};
use codedrop_db::FileRecordStore;
use futures::future::join_all;
use uuid::Uuid;

use crate::notification::{AccessNotice, Notifier};

/// The authenticated user creating or managing a file
#[derive(Debug, Clone)]
pub struct Owner {
    pub id: Uuid,
    pub email: String,
    pub name: String,
}

/// Input for [`FileAccessService::create_record`]. The object key and URLs come from the
/// storage gateway's upload slot.
#[derive(Debug, Clone)]
pub struct CreateFileRecord {
    pub owner: Owner,
    pub file_name: String,
    pub content_type: String,
    pub folder: String,
    pub object_key: String,
    pub public_url: String,
    pub recipients: Vec<String>,
    pub expiry_duration_minutes: i32,
}

pub struct FileAccessService {
    store: Arc<dyn FileRecordStore>,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
}

impl FileAccessService {
    pub fn new(
        store: Arc<dyn FileRecordStore>,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            clock,
            notifier,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Persist a `pending` record with a new access code and notify every recipient.
    ///
    /// The returned record is the only place the owner gets the plaintext code.
    #[tracing::instrument(skip(self, input), fields(owner_id = %input.owner.id, object_key = %input.object_key))]
    pub async fn create_record(&self, input: CreateFileRecord) -> Result<FileRecord, AppError> {
        validate_expiry_minutes(input.expiry_duration_minutes)?;
        let recipients = normalize_recipients(&input.recipients)?;
        let access_code = generate_access_code()?;

        let record = NewFileRecord {
            owner_id: input.owner.id,
            file_name: input.file_name,
            content_type: input.content_type,
            folder: input.folder,
            object_key: input.object_key,
            public_url: input.public_url,
            target_recipients: recipients,
            access_code,
            expiry_duration_minutes: input.expiry_duration_minutes,
        }
        .into_record(Uuid::new_v4(), self.clock.now());

        let record = self.store.insert(record).await?;
        tracing::info!(
            record_id = %record.id,
            recipients = record.target_recipients.len(),
            expiry_minutes = record.expiry_duration_minutes,
            "File record created"
        );

        self.notify_recipients(&record, &input.owner).await;
        Ok(record)
    }

    async fn notify_recipients(&self, record: &FileRecord, owner: &Owner) {
        let notices: Vec<AccessNotice> = record
            .target_recipients
            .iter()
            .map(|recipient| AccessNotice {
                recipient: recipient.clone(),
                file_name: record.file_name.clone(),
                access_code: record.access_code.clone(),
                expiry_duration_minutes: record.expiry_duration_minutes,
                owner_name: owner.name.clone(),
                owner_email: owner.email.clone(),
            })
            .collect();

        let results = join_all(notices.iter().map(|n| self.notifier.notify(n))).await;
        for (notice, result) in notices.iter().zip(results) {
            if let Err(e) = result {
                tracing::error!(
                    error = %e,
                    record_id = %record.id,
                    recipient = %notice.recipient,
                    "Failed to notify recipient"
                );
            }
        }
    }

    /// `pending -> uploaded`. A second confirmation finds no pending record and fails
    /// with `NotFound`.
    #[tracing::instrument(skip(self))]
    pub async fn confirm_upload(&self, object_key: &str) -> Result<FileRecord, AppError> {
        let record = self
            .store
            .mark_uploaded(object_key, self.clock.now())
            .await?
            .ok_or_else(|| AppError::NotFound("File not found or already confirmed".to_string()))?;

        tracing::info!(record_id = %record.id, "File upload confirmed");
        Ok(record)
    }

    /// [`confirm_upload`](Self::confirm_upload) restricted to the record's owner. Ownership
    /// is checked before the transition.
    pub async fn confirm_upload_for_owner(
        &self,
        owner_id: Uuid,
        object_key: &str,
    ) -> Result<FileRecord, AppError> {
        self.ensure_owner(owner_id, object_key).await?;
        self.confirm_upload(object_key).await
    }

    /// Decide whether `requester_email` may download `object_key` with `submitted_code`.
    ///
    /// Checks run in a fixed order: existence, status, recipient membership, code, window.
    /// The first successful access opens the window; concurrent first accesses all observe
    /// the single committed window. An access after the window closes moves the record to
    /// `expired` and fails.
    #[tracing::instrument(skip(self, submitted_code))]
    pub async fn authorize_access(
        &self,
        object_key: &str,
        submitted_code: &str,
        requester_email: &str,
    ) -> Result<FileRecord, AppError> {
        let now = self.clock.now();

        let record = self
            .store
            .find_by_object_key(object_key)
            .await?
            .ok_or_else(|| AppError::NotFound("File not found".to_string()))?;

        if record.status != FileStatus::Uploaded {
            tracing::debug!(record_id = %record.id, status = %record.status, "Download refused: not uploaded");
            return Err(AppError::InvalidState(
                "File is not available for download".to_string(),
            ));
        }

        if !record.is_recipient(requester_email) {
            tracing::warn!(record_id = %record.id, requester = %requester_email, "Download denied: not a recipient");
            return Err(AppError::Forbidden(
                "requester is not a recipient".to_string(),
            ));
        }

        if !record.access_code.matches(submitted_code) {
            tracing::warn!(record_id = %record.id, requester = %requester_email, "Download denied: access code mismatch");
            return Err(AppError::Forbidden("access code mismatch".to_string()));
        }

        let record = match record.first_accessed_at {
            Some(_) => record,
            None => self.open_window(&record, now).await?,
        };

        let expires_at = record.expires_at.ok_or_else(|| {
            AppError::Internal(format!("record {} has no access window", record.id))
        })?;

        if now > expires_at {
            // Losing this transition to a concurrent caller is fine; the outcome is the same.
            self.store.mark_expired(record.id, now).await?;
            tracing::info!(record_id = %record.id, expired_at = %expires_at, "Access window lapsed; file expired");
            return Err(AppError::Expired("access window lapsed".to_string()));
        }

        Ok(record)
    }

    async fn open_window(
        &self,
        record: &FileRecord,
        now: DateTime<Utc>,
    ) -> Result<FileRecord, AppError> {
        let expires_at = now + Duration::minutes(i64::from(record.expiry_duration_minutes));
        let committed = self
            .store
            .activate_first_access(record.id, now, expires_at)
            .await?
            .ok_or_else(|| AppError::NotFound("File not found".to_string()))?;

        // Withdrawn or expired between the read and the update.
        if committed.status != FileStatus::Uploaded || committed.first_accessed_at.is_none() {
            return Err(AppError::InvalidState(
                "File is not available for download".to_string(),
            ));
        }

        if committed.first_accessed_at == Some(now) {
            tracing::info!(
                record_id = %committed.id,
                expires_at = ?committed.expires_at,
                expiry_minutes = committed.expiry_duration_minutes,
                "File first accessed, expiry window opened"
            );
        }
        Ok(committed)
    }

    /// The owner's pending and uploaded files, newest first.
    pub async fn list_owned(&self, owner_id: Uuid) -> Result<Vec<FileRecord>, AppError> {
        self.store.list_active_by_owner(owner_id).await
    }

    pub async fn get_by_key(&self, object_key: &str) -> Result<FileRecord, AppError> {
        self.store
            .find_by_object_key(object_key)
            .await?
            .ok_or_else(|| AppError::NotFound("File not found".to_string()))
    }

    /// Record metadata for its owner or any of its recipients.
    pub async fn get_visible_to(
        &self,
        requester_id: Uuid,
        requester_email: &str,
        object_key: &str,
    ) -> Result<FileRecord, AppError> {
        let record = self.get_by_key(object_key).await?;
        if record.owner_id != requester_id && !record.is_recipient(requester_email) {
            return Err(AppError::Forbidden(
                "requester is neither owner nor recipient".to_string(),
            ));
        }
        Ok(record)
    }

    /// Move the record to `deleted` whatever its current status.
    #[tracing::instrument(skip(self))]
    pub async fn withdraw(&self, object_key: &str) -> Result<FileRecord, AppError> {
        let record = self
            .store
            .mark_deleted(object_key, self.clock.now())
            .await?
            .ok_or_else(|| AppError::NotFound("File not found".to_string()))?;

        tracing::info!(record_id = %record.id, "File withdrawn");
        Ok(record)
    }

    /// [`withdraw`](Self::withdraw) restricted to the record's owner.
    pub async fn withdraw_for_owner(
        &self,
        owner_id: Uuid,
        object_key: &str,
    ) -> Result<FileRecord, AppError> {
        self.ensure_owner(owner_id, object_key).await?;
        self.withdraw(object_key).await
    }

    async fn ensure_owner(&self, owner_id: Uuid, object_key: &str) -> Result<(), AppError> {
        let record = self.get_by_key(object_key).await?;
        if record.owner_id != owner_id {
            tracing::warn!(record_id = %record.id, caller = %owner_id, "Caller does not own file");
            return Err(AppError::Forbidden("caller does not own the file".to_string()));
        }
        Ok(())
    }

    /// Store reachability, for health reporting
    pub async fn ping(&self) -> Result<(), AppError> {
        self.store.ping().await
    }
}
