//! Process-local stores.
//!
//! Each operation takes the map lock once, so the conditional updates here are as atomic as
//! their SQL counterparts.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use codedrop_core::models::{FileRecord, FileStatus, NewUser, User};
use codedrop_core::AppError;
use uuid::Uuid;

use super::file_record::FileRecordStore;
use super::user::UserStore;

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, AppError> {
    mutex
        .lock()
        .map_err(|_| AppError::Internal("in-memory store lock poisoned".to_string()))
}

#[derive(Default)]
struct RecordTable {
    next_seq: u64,
    /// Insertion sequence breaks `created_at` ties when ordering.
    rows: HashMap<Uuid, (u64, FileRecord)>,
}

impl RecordTable {
    fn live_by_key_mut(&mut self, object_key: &str) -> Option<&mut FileRecord> {
        self.rows
            .values_mut()
            .map(|(_, r)| r)
            .find(|r| r.object_key == object_key && r.status != FileStatus::Deleted)
    }

    fn newest_by_key(&self, object_key: &str) -> Option<&FileRecord> {
        let mut matches: Vec<&(u64, FileRecord)> = self
            .rows
            .values()
            .filter(|(_, r)| r.object_key == object_key)
            .collect();
        matches.sort_by_key(|(seq, r)| (r.status != FileStatus::Deleted, r.created_at, *seq));
        matches.last().map(|(_, r)| r)
    }
}

#[derive(Default)]
pub struct InMemoryFileRecordStore {
    table: Mutex<RecordTable>,
}

impl InMemoryFileRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FileRecordStore for InMemoryFileRecordStore {
    async fn insert(&self, record: FileRecord) -> Result<FileRecord, AppError> {
        let mut table = lock(&self.table)?;
        if table.live_by_key_mut(&record.object_key).is_some() {
            return Err(AppError::Conflict(format!(
                "Object key already in use: {}",
                record.object_key
            )));
        }
        if table.rows.contains_key(&record.id) {
            return Err(AppError::Conflict(format!(
                "Record id already exists: {}",
                record.id
            )));
        }
        let seq = table.next_seq;
        table.next_seq += 1;
        table.rows.insert(record.id, (seq, record.clone()));
        Ok(record)
    }

    async fn find_by_object_key(&self, object_key: &str) -> Result<Option<FileRecord>, AppError> {
        let table = lock(&self.table)?;
        Ok(table.newest_by_key(object_key).cloned())
    }

    async fn mark_uploaded(
        &self,
        object_key: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<FileRecord>, AppError> {
        let mut table = lock(&self.table)?;
        Ok(table
            .live_by_key_mut(object_key)
            .filter(|r| r.status == FileStatus::Pending)
            .map(|r| {
                r.status = FileStatus::Uploaded;
                r.updated_at = now;
                r.clone()
            }))
    }

    async fn activate_first_access(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<Option<FileRecord>, AppError> {
        let mut table = lock(&self.table)?;
        Ok(table.rows.get_mut(&id).map(|(_, r)| {
            if r.first_accessed_at.is_none() && r.status == FileStatus::Uploaded {
                r.first_accessed_at = Some(now);
                r.expires_at = Some(expires_at);
                r.updated_at = now;
            }
            r.clone()
        }))
    }

    async fn mark_expired(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<FileRecord>, AppError> {
        let mut table = lock(&self.table)?;
        Ok(table
            .rows
            .get_mut(&id)
            .map(|(_, r)| r)
            .filter(|r| r.status == FileStatus::Uploaded)
            .map(|r| {
                r.status = FileStatus::Expired;
                r.updated_at = now;
                r.clone()
            }))
    }

    async fn mark_deleted(
        &self,
        object_key: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<FileRecord>, AppError> {
        let mut table = lock(&self.table)?;
        if let Some(r) = table.live_by_key_mut(object_key) {
            r.status = FileStatus::Deleted;
            r.updated_at = now;
            return Ok(Some(r.clone()));
        }
        Ok(table.newest_by_key(object_key).cloned())
    }

    async fn list_active_by_owner(&self, owner_id: Uuid) -> Result<Vec<FileRecord>, AppError> {
        let table = lock(&self.table)?;
        let mut rows: Vec<&(u64, FileRecord)> = table
            .rows
            .values()
            .filter(|(_, r)| r.owner_id == owner_id && r.status.is_listed())
            .collect();
        rows.sort_by(|(a_seq, a), (b_seq, b)| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b_seq.cmp(a_seq))
        });
        Ok(rows.into_iter().map(|(_, r)| r.clone()).collect())
    }

    async fn expire_lapsed(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        let mut table = lock(&self.table)?;
        let mut expired = 0;
        for (_, r) in table.rows.values_mut() {
            if r.status == FileStatus::Uploaded && r.expires_at.is_some_and(|at| at < now) {
                r.status = FileStatus::Expired;
                r.updated_at = now;
                expired += 1;
            }
        }
        Ok(expired)
    }

    async fn ping(&self) -> Result<(), AppError> {
        lock(&self.table).map(|_| ())
    }
}

#[derive(Default)]
pub struct InMemoryUserStore {
    users: Mutex<HashMap<Uuid, User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn create(&self, user: NewUser) -> Result<User, AppError> {
        let mut users = lock(&self.users)?;
        if users.values().any(|u| u.email == user.email) {
            return Err(AppError::Conflict(
                "Email is already registered".to_string(),
            ));
        }
        let created = User {
            id: Uuid::new_v4(),
            email: user.email,
            name: user.name,
            password_hash: user.password_hash,
            created_at: Utc::now(),
        };
        users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let users = lock(&self.users)?;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let users = lock(&self.users)?;
        Ok(users.get(&id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use codedrop_core::models::NewFileRecord;
    use codedrop_core::AccessCode;

    fn record(owner_id: Uuid, key: &str, now: DateTime<Utc>) -> FileRecord {
        NewFileRecord {
            owner_id,
            file_name: "a.bin".to_string(),
            content_type: "application/octet-stream".to_string(),
            folder: "uploads".to_string(),
            object_key: key.to_string(),
            public_url: format!("http://localhost/{key}"),
            target_recipients: vec!["bob@example.com".to_string()],
            access_code: AccessCode::from_stored("654321".to_string()),
            expiry_duration_minutes: 5,
        }
        .into_record(Uuid::new_v4(), now)
    }

    #[tokio::test]
    async fn duplicate_live_key_conflicts_until_withdrawn() {
        let store = InMemoryFileRecordStore::new();
        let owner = Uuid::new_v4();
        let now = Utc::now();

        store.insert(record(owner, "uploads/k", now)).await.unwrap();
        let err = store.insert(record(owner, "uploads/k", now)).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let withdrawn = store.mark_deleted("uploads/k", now).await.unwrap().unwrap();
        assert_eq!(withdrawn.status, FileStatus::Deleted);

        let fresh = store.insert(record(owner, "uploads/k", now)).await.unwrap();
        let found = store.find_by_object_key("uploads/k").await.unwrap().unwrap();
        assert_eq!(found.id, fresh.id);
    }

    #[tokio::test]
    async fn withdrawing_twice_returns_the_withdrawn_record() {
        let store = InMemoryFileRecordStore::new();
        let now = Utc::now();
        store.insert(record(Uuid::new_v4(), "uploads/k", now)).await.unwrap();

        store.mark_deleted("uploads/k", now).await.unwrap();
        let again = store.mark_deleted("uploads/k", now).await.unwrap().unwrap();
        assert_eq!(again.status, FileStatus::Deleted);
        assert!(store.mark_deleted("uploads/missing", now).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn first_access_window_is_compare_and_set() {
        let store = InMemoryFileRecordStore::new();
        let now = Utc::now();
        let created = store.insert(record(Uuid::new_v4(), "uploads/k", now)).await.unwrap();

        // Not yet uploaded: nothing changes.
        let pending = store
            .activate_first_access(created.id, now, now + Duration::minutes(5))
            .await
            .unwrap()
            .unwrap();
        assert!(pending.first_accessed_at.is_none());

        store.mark_uploaded("uploads/k", now).await.unwrap().unwrap();
        let first = store
            .activate_first_access(created.id, now, now + Duration::minutes(5))
            .await
            .unwrap()
            .unwrap();
        let later = now + Duration::seconds(30);
        let second = store
            .activate_first_access(created.id, later, later + Duration::minutes(5))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.expires_at, Some(now + Duration::minutes(5)));
        assert_eq!(second.first_accessed_at, first.first_accessed_at);
        assert_eq!(second.expires_at, first.expires_at);
    }

    #[tokio::test]
    async fn listing_is_newest_first_and_skips_terminal() {
        let store = InMemoryFileRecordStore::new();
        let owner = Uuid::new_v4();
        let now = Utc::now();

        store.insert(record(owner, "uploads/old", now)).await.unwrap();
        store
            .insert(record(owner, "uploads/new", now + Duration::seconds(1)))
            .await
            .unwrap();
        store
            .insert(record(owner, "uploads/gone", now + Duration::seconds(2)))
            .await
            .unwrap();
        store
            .insert(record(Uuid::new_v4(), "uploads/other", now))
            .await
            .unwrap();
        store.mark_deleted("uploads/gone", now).await.unwrap();

        let keys: Vec<String> = store
            .list_active_by_owner(owner)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.object_key)
            .collect();
        assert_eq!(keys, vec!["uploads/new", "uploads/old"]);
    }

    #[tokio::test]
    async fn expire_lapsed_counts_transitions() {
        let store = InMemoryFileRecordStore::new();
        let now = Utc::now();
        let created = store.insert(record(Uuid::new_v4(), "uploads/k", now)).await.unwrap();
        store.mark_uploaded("uploads/k", now).await.unwrap();
        store
            .activate_first_access(created.id, now, now + Duration::minutes(1))
            .await
            .unwrap();

        assert_eq!(store.expire_lapsed(now).await.unwrap(), 0);
        assert_eq!(store.expire_lapsed(now + Duration::minutes(2)).await.unwrap(), 1);
        assert_eq!(store.expire_lapsed(now + Duration::minutes(3)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let users = InMemoryUserStore::new();
        let new_user = || NewUser {
            email: "alice@example.com".to_string(),
            name: "Alice".to_string(),
            password_hash: "hash".to_string(),
        };
        let created = users.create(new_user()).await.unwrap();
        assert!(matches!(
            users.create(new_user()).await.unwrap_err(),
            AppError::Conflict(_)
        ));
        assert_eq!(
            users.find_by_email("alice@example.com").await.unwrap().unwrap().id,
            created.id
        );
        assert!(users.find_by_id(Uuid::new_v4()).await.unwrap().is_none());
    }
}
