//! API constants
//!
//! Every route lives under [`API_PREFIX`]. OpenAPI path annotations use the same literal.

/// Versioned prefix all routes are nested under
pub const API_PREFIX: &str = "/api/v0";

/// Where the generated OpenAPI document is served
pub const OPENAPI_JSON_PATH: &str = "/api/openapi.json";

pub const DOCS_PATH: &str = "/docs";

/// Upper bound on request bodies. Bodies are small JSON documents; file bytes go straight
/// to storage.
pub const MAX_REQUEST_BODY_BYTES: usize = 64 * 1024;

/// Per-dependency timeout for `/health`
pub const HEALTH_CHECK_TIMEOUT_SECS: u64 = 5;

pub const TOKEN_TYPE: &str = "Bearer";
