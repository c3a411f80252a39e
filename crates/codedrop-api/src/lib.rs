//! Codedrop API Library
//!
//! HTTP handlers, authentication, error rendering and application setup.

mod api_doc;
pub mod constants;
mod handlers;
pub mod limiter;
pub mod middleware;
pub mod setup;
mod telemetry;

// Public modules
pub mod auth;
pub mod error;
pub mod state;

// Re-exports
pub use api_doc::ApiDoc;
pub use error::{ErrorResponse, HttpAppError};
