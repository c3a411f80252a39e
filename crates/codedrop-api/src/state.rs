//! Application state shared by every handler

use crate::auth::JwtKeys;
use crate::limiter::AccessAttemptLimiter;
use codedrop_core::Config;
use codedrop_db::UserStore;
use codedrop_services::FileAccessService;
use codedrop_storage::StorageGateway;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub files: Arc<FileAccessService>,
    pub storage: Arc<dyn StorageGateway>,
    pub users: Arc<dyn UserStore>,
    pub jwt: Arc<JwtKeys>,
    pub access_limiter: AccessAttemptLimiter,
}
