use async_trait::async_trait;
use chrono::{DateTime, Utc};
use codedrop_core::models::FileRecord;
use codedrop_core::AppError;
use sqlx::PgPool;
use uuid::Uuid;

use super::is_unique_violation;

/// Keyed store of file records.
///
/// Every state change is a single conditional update, so concurrent callers never overwrite
/// each other's transitions.
#[async_trait]
pub trait FileRecordStore: Send + Sync {
    /// Persist a new record. `Conflict` if a non-deleted record already uses the object key.
    async fn insert(&self, record: FileRecord) -> Result<FileRecord, AppError>;

    /// The live record for `object_key`, or the most recent withdrawn one if none is live.
    async fn find_by_object_key(&self, object_key: &str) -> Result<Option<FileRecord>, AppError>;

    /// `pending -> uploaded`. `None` when no pending record has that key.
    async fn mark_uploaded(
        &self,
        object_key: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<FileRecord>, AppError>;

    /// Open the access window if it is not open yet.
    ///
    /// Sets `first_accessed_at`/`expires_at` only while `first_accessed_at` is null and the
    /// record is `uploaded`. Whether or not this call won, the committed record is returned;
    /// `None` only if the record no longer exists.
    async fn activate_first_access(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<Option<FileRecord>, AppError>;

    /// `uploaded -> expired`. `None` if the record was not `uploaded`.
    async fn mark_expired(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<FileRecord>, AppError>;

    /// Withdraw the live record for `object_key`. An already withdrawn record is returned as is.
    async fn mark_deleted(
        &self,
        object_key: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<FileRecord>, AppError>;

    /// Pending and uploaded records of `owner_id`, newest first.
    async fn list_active_by_owner(&self, owner_id: Uuid) -> Result<Vec<FileRecord>, AppError>;

    /// Move every uploaded record whose window closed before `now` to `expired`.
    async fn expire_lapsed(&self, now: DateTime<Utc>) -> Result<u64, AppError>;

    /// Cheap reachability check for health reporting.
    async fn ping(&self) -> Result<(), AppError>;
}

const RECORD_COLUMNS: &str = r#"
    id, owner_id, file_name, content_type, folder, object_key, public_url,
    target_recipients, access_code, status, expiry_duration_minutes,
    first_accessed_at, expires_at, created_at, updated_at
"#;

/// PostgreSQL-backed [`FileRecordStore`]
#[derive(Clone)]
pub struct PgFileRecordRepository {
    pool: PgPool,
}

impl PgFileRecordRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<FileRecord>, AppError> {
        let record = sqlx::query_as::<_, FileRecord>(&format!(
            "SELECT {RECORD_COLUMNS} FROM file_records WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }
}

#[async_trait]
impl FileRecordStore for PgFileRecordRepository {
    #[tracing::instrument(skip(self, record), fields(
        db.system = "postgresql",
        db.table = "file_records",
        db.operation = "insert",
        record_id = %record.id,
        object_key = %record.object_key
    ))]
    async fn insert(&self, record: FileRecord) -> Result<FileRecord, AppError> {
        let inserted = sqlx::query_as::<_, FileRecord>(&format!(
            r#"
            INSERT INTO file_records (
                id, owner_id, file_name, content_type, folder, object_key, public_url,
                target_recipients, access_code, status, expiry_duration_minutes,
                first_accessed_at, expires_at, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, NULL, NULL, $12, $12)
            RETURNING {RECORD_COLUMNS}
            "#
        ))
        .bind(record.id)
        .bind(record.owner_id)
        .bind(&record.file_name)
        .bind(&record.content_type)
        .bind(&record.folder)
        .bind(&record.object_key)
        .bind(&record.public_url)
        .bind(&record.target_recipients)
        .bind(&record.access_code)
        .bind(record.status)
        .bind(record.expiry_duration_minutes)
        .bind(record.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict(format!(
                    "Object key already in use: {}",
                    record.object_key
                ))
            } else {
                AppError::Database(e)
            }
        })?;

        Ok(inserted)
    }

    async fn find_by_object_key(&self, object_key: &str) -> Result<Option<FileRecord>, AppError> {
        let record = sqlx::query_as::<_, FileRecord>(&format!(
            r#"
            SELECT {RECORD_COLUMNS}
            FROM file_records
            WHERE object_key = $1
            ORDER BY (status = 'deleted') ASC, created_at DESC
            LIMIT 1
            "#
        ))
        .bind(object_key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    #[tracing::instrument(skip(self), fields(db.table = "file_records", db.operation = "update"))]
    async fn mark_uploaded(
        &self,
        object_key: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<FileRecord>, AppError> {
        let record = sqlx::query_as::<_, FileRecord>(&format!(
            r#"
            UPDATE file_records
            SET status = 'uploaded', updated_at = $2
            WHERE object_key = $1 AND status = 'pending'
            RETURNING {RECORD_COLUMNS}
            "#
        ))
        .bind(object_key)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    #[tracing::instrument(skip(self), fields(db.table = "file_records", db.operation = "update"))]
    async fn activate_first_access(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<Option<FileRecord>, AppError> {
        let won = sqlx::query_as::<_, FileRecord>(&format!(
            r#"
            UPDATE file_records
            SET first_accessed_at = $2, expires_at = $3, updated_at = $2
            WHERE id = $1 AND first_accessed_at IS NULL AND status = 'uploaded'
            RETURNING {RECORD_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(now)
        .bind(expires_at)
        .fetch_optional(&self.pool)
        .await?;

        match won {
            Some(record) => Ok(Some(record)),
            // Lost the race (or the record moved on): report what is committed.
            None => self.find_by_id(id).await,
        }
    }

    #[tracing::instrument(skip(self), fields(db.table = "file_records", db.operation = "update"))]
    async fn mark_expired(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<FileRecord>, AppError> {
        let record = sqlx::query_as::<_, FileRecord>(&format!(
            r#"
            UPDATE file_records
            SET status = 'expired', updated_at = $2
            WHERE id = $1 AND status = 'uploaded'
            RETURNING {RECORD_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    #[tracing::instrument(skip(self), fields(db.table = "file_records", db.operation = "update"))]
    async fn mark_deleted(
        &self,
        object_key: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<FileRecord>, AppError> {
        let record = sqlx::query_as::<_, FileRecord>(&format!(
            r#"
            UPDATE file_records
            SET status = 'deleted', updated_at = $2
            WHERE object_key = $1 AND status <> 'deleted'
            RETURNING {RECORD_COLUMNS}
            "#
        ))
        .bind(object_key)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        match record {
            Some(record) => Ok(Some(record)),
            None => self.find_by_object_key(object_key).await,
        }
    }

    async fn list_active_by_owner(&self, owner_id: Uuid) -> Result<Vec<FileRecord>, AppError> {
        let records = sqlx::query_as::<_, FileRecord>(&format!(
            r#"
            SELECT {RECORD_COLUMNS}
            FROM file_records
            WHERE owner_id = $1 AND status IN ('pending', 'uploaded')
            ORDER BY created_at DESC, id DESC
            "#
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn expire_lapsed(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE file_records
            SET status = 'expired', updated_at = $1
            WHERE status = 'uploaded' AND expires_at IS NOT NULL AND expires_at < $1
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::path::Path;

    use chrono::Duration;
    use codedrop_core::models::{FileStatus, NewFileRecord, NewUser};
    use codedrop_core::AccessCode;
    use sqlx::migrate::Migrator;
    use sqlx::postgres::PgPoolOptions;

    use super::*;
    use crate::db::user::{PgUserRepository, UserStore};

    /// Runs only when DATABASE_URL points at a disposable database.
    async fn test_pool() -> Option<PgPool> {
        let database_url = env::var("DATABASE_URL").ok()?;
        let pool = PgPoolOptions::new()
            .max_connections(4)
            .connect(&database_url)
            .await
            .expect("connect test database");
        let migrations = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../migrations");
        Migrator::new(migrations)
            .await
            .expect("load migrations")
            .run(&pool)
            .await
            .expect("apply migrations");
        Some(pool)
    }

    async fn owner(pool: &PgPool) -> Uuid {
        PgUserRepository::new(pool.clone())
            .create(NewUser {
                email: format!("{}@example.com", Uuid::new_v4()),
                name: "Owner".to_string(),
                password_hash: "$argon2id$stub".to_string(),
            })
            .await
            .expect("create owner")
            .id
    }

    fn new_record(owner_id: Uuid, object_key: &str, now: DateTime<Utc>) -> FileRecord {
        NewFileRecord {
            owner_id,
            file_name: "notes.txt".to_string(),
            content_type: "text/plain".to_string(),
            folder: "uploads".to_string(),
            object_key: object_key.to_string(),
            public_url: format!("https://example.com/{object_key}"),
            target_recipients: vec!["bob@example.com".to_string()],
            access_code: AccessCode::from_stored("123456".to_string()),
            expiry_duration_minutes: 5,
        }
        .into_record(Uuid::new_v4(), now)
    }

    #[tokio::test]
    async fn live_object_keys_are_unique() {
        let Some(pool) = test_pool().await else {
            return;
        };
        let repo = PgFileRecordRepository::new(pool.clone());
        let owner_id = owner(&pool).await;
        let key = format!("uploads/{}-notes.txt", Uuid::new_v4());
        let now = Utc::now();

        repo.insert(new_record(owner_id, &key, now)).await.unwrap();
        let err = repo
            .insert(new_record(owner_id, &key, now))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        repo.mark_deleted(&key, now).await.unwrap();
        repo.insert(new_record(owner_id, &key, now)).await.unwrap();
        let live = repo.find_by_object_key(&key).await.unwrap().unwrap();
        assert_eq!(live.status, FileStatus::Pending);
    }

    #[tokio::test]
    async fn first_access_is_set_once() {
        let Some(pool) = test_pool().await else {
            return;
        };
        let repo = PgFileRecordRepository::new(pool.clone());
        let owner_id = owner(&pool).await;
        let key = format!("uploads/{}-notes.txt", Uuid::new_v4());
        let now = Utc::now();

        let record = repo.insert(new_record(owner_id, &key, now)).await.unwrap();
        repo.mark_uploaded(&key, now).await.unwrap().unwrap();
        assert!(repo.mark_uploaded(&key, now).await.unwrap().is_none());

        let first = repo
            .activate_first_access(record.id, now, now + Duration::minutes(5))
            .await
            .unwrap()
            .unwrap();
        let later = now + Duration::minutes(1);
        let second = repo
            .activate_first_access(record.id, later, later + Duration::minutes(5))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.first_accessed_at, second.first_accessed_at);
        assert_eq!(first.expires_at, second.expires_at);
    }

    #[tokio::test]
    async fn sweep_expires_only_lapsed_uploads() {
        let Some(pool) = test_pool().await else {
            return;
        };
        let repo = PgFileRecordRepository::new(pool.clone());
        let owner_id = owner(&pool).await;
        let key = format!("uploads/{}-notes.txt", Uuid::new_v4());
        let now = Utc::now();

        let record = repo.insert(new_record(owner_id, &key, now)).await.unwrap();
        repo.mark_uploaded(&key, now).await.unwrap();
        repo.activate_first_access(record.id, now, now + Duration::minutes(5))
            .await
            .unwrap();

        repo.expire_lapsed(now + Duration::minutes(1)).await.unwrap();
        let still = repo.find_by_object_key(&key).await.unwrap().unwrap();
        assert_eq!(still.status, FileStatus::Uploaded);

        repo.expire_lapsed(now + Duration::minutes(6)).await.unwrap();
        let expired = repo.find_by_object_key(&key).await.unwrap().unwrap();
        assert_eq!(expired.status, FileStatus::Expired);
        assert!(repo.list_active_by_owner(owner_id).await.unwrap().is_empty());
    }
}
