//! OpenAPI documentation, served at `/api/openapi.json` and browsable at `/docs`.

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::error;
use crate::handlers;
use codedrop_core::models;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Codedrop API",
        version = "0.1.0",
        description = "Share files with named recipients behind a six-digit access code. Access expires a fixed number of minutes after the first successful download. All endpoints are versioned under /api/v0/."
    ),
    paths(
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::me,
        handlers::files::request_upload_slot,
        handlers::files::confirm_upload,
        handlers::files::request_download,
        handlers::files::list_my_files,
        handlers::files::get_file_meta,
        handlers::files::withdraw_file,
        handlers::health::health_check,
    ),
    components(schemas(
        error::ErrorResponse,
        models::FileStatus,
        models::UploadSlotRequest,
        models::UploadSlotResponse,
        models::ConfirmUploadRequest,
        models::DownloadRequest,
        models::DownloadResponse,
        models::FileSummary,
        models::FileMetaResponse,
        models::RegisterRequest,
        models::LoginRequest,
        models::UserResponse,
        models::AuthResponse,
        handlers::health::HealthCheckResponse,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "auth", description = "Accounts and bearer tokens"),
        (name = "files", description = "Shared file lifecycle and download authorization"),
        (name = "health", description = "Liveness and dependency reachability")
    )
)]
pub struct ApiDoc;
