//! Data models for the application
//!
//! Persisted entities and the request/response bodies of the HTTP API.

mod file_record;
mod user;

pub use file_record::*;
pub use user::*;
