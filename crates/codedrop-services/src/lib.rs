//! Codedrop Services Library
//!
//! The file-access engine and lifecycle operations, recipient notification, and the
//! background expiry sweep.

pub mod access;
pub mod expiry;
pub mod notification;

pub use access::{CreateFileRecord, FileAccessService, Owner};
pub use expiry::ExpirySweeper;
pub use notification::{AccessNotice, EmailNotifier, LogNotifier, Notifier, NotifyError};
