//! File access lifecycle and authorization
//!
//! [`FileAccessService`] owns every state transition of a shared file:
//!
//! - creation (`pending`, with a freshly generated access code)
//! - upload confirmation (`pending -> uploaded`)
//! - download authorization, which opens the access window on first success and lazily
//!   expires the record once that window has lapsed (`uploaded -> expired`)
//! - withdrawal (`* -> deleted`)

mod service;

pub use service::{CreateFileRecord, FileAccessService, Owner};
