//! Database repositories for data access layer
//!
//! `file_record` and `user` hold the store traits together with their PostgreSQL
//! repositories. `memory` holds process-local implementations used by tests and by
//! `RECORD_STORE=memory` deployments.

pub mod file_record;
pub mod memory;
pub mod user;

pub use file_record::{FileRecordStore, PgFileRecordRepository};
pub use memory::{InMemoryFileRecordStore, InMemoryUserStore};
pub use user::{PgUserRepository, UserStore};

/// Postgres `unique_violation`
pub(crate) fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(
        error,
        sqlx::Error::Database(db_error) if db_error.code().as_deref() == Some("23505")
    )
}
