//! Test helpers: build AppState and router for integration tests.
//!
//! Run from workspace root: `cargo test -p codedrop-api`. The app runs on in-memory stores, a
//! temp-dir local storage backend and a manual clock, so no external services are needed.

#![allow(dead_code)]

pub mod auth;
pub mod notifier;

use axum_test::TestServer;
use chrono::Utc;
use codedrop_api::constants;
use codedrop_api::setup::routes;
use codedrop_api::setup::services::{build_state, Stores};
use codedrop_api::state::AppState;
use codedrop_core::{CodedropConfig, Config, ManualClock};
use codedrop_storage::LocalStorage;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub use notifier::RecordingNotifier;

pub const TEST_JWT_SECRET: &str = "test-jwt-secret-at-least-32-characters-long";
pub const OBJECT_BASE_URL: &str = "http://localhost:4000/objects";

/// API path prefix for tests (e.g. `/api/v0/files`).
pub fn api_path(path: &str) -> String {
    format!("{}{}", constants::API_PREFIX, path)
}

/// Test application: server plus the handles tests steer it with.
pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub clock: Arc<ManualClock>,
    pub notifier: Arc<RecordingNotifier>,
    pub _temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }
}

pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(&[]).await
}

/// Setup test app; `overrides` replace the default configuration keys.
pub async fn setup_test_app_with(overrides: &[(&str, &str)]) -> TestApp {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
    let storage_path = temp_dir.path().to_string_lossy().to_string();

    let mut vars: HashMap<String, String> = [
        ("JWT_SECRET", TEST_JWT_SECRET),
        ("RECORD_STORE", "memory"),
        ("STORAGE_BACKEND", "local"),
        ("LOCAL_STORAGE_BASE_URL", OBJECT_BASE_URL),
        ("DOWNLOAD_URL_TTL_SECS", "3600"),
        ("EXPIRY_SWEEP_INTERVAL_SECS", "0"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    vars.insert("LOCAL_STORAGE_PATH".to_string(), storage_path.clone());
    for (k, v) in overrides {
        vars.insert(k.to_string(), v.to_string());
    }

    let config = CodedropConfig::from_lookup(|key| vars.get(key).cloned())
        .expect("Failed to build test config");
    let config = Config(Box::new(config));
    config.validate().expect("Test config should be valid");

    let storage = Arc::new(
        LocalStorage::new(
            storage_path,
            OBJECT_BASE_URL.to_string(),
            Duration::from_secs(config.upload_url_ttl_secs()),
        )
        .await
        .expect("Failed to create local storage"),
    );
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let notifier = Arc::new(RecordingNotifier::default());

    let state = build_state(
        config,
        Stores::in_memory(),
        storage,
        clock.clone(),
        notifier.clone(),
    );
    let router = routes::setup_routes(state.clone());
    let server = TestServer::new(router).expect("Failed to create test server");

    TestApp {
        server,
        state,
        clock,
        notifier,
        _temp_dir: temp_dir,
    }
}
