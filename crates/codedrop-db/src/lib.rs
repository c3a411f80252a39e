//! Codedrop persistence layer
//!
//! Store traits for file records and accounts, with PostgreSQL and in-memory implementations.

pub mod db;

pub use db::{
    FileRecordStore, InMemoryFileRecordStore, InMemoryUserStore, PgFileRecordRepository,
    PgUserRepository, UserStore,
};
