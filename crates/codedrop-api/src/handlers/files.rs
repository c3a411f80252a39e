//! Shared-file endpoints: upload slots, confirmation, download authorization, listing,
//! metadata and withdrawal.

use crate::auth::models::AuthUser;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use codedrop_core::models::{
    normalize_email, ConfirmUploadRequest, DownloadRequest, DownloadResponse, FileMetaResponse,
    FileSummary, UploadSlotRequest, UploadSlotResponse,
};
use codedrop_core::AppError;
use codedrop_services::{CreateFileRecord, Owner};
use codedrop_storage::keys::normalize_folder;
use std::sync::Arc;
use std::time::Duration;

/// Presigned download lifetime: the configured bound, cut short by the end of the access
/// window, never below one second.
pub(crate) fn download_url_ttl(
    max_ttl_secs: u64,
    expires_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Duration {
    let window_secs = u64::try_from((expires_at - now).num_seconds()).unwrap_or(0);
    Duration::from_secs(max_ttl_secs.min(window_secs).max(1))
}

/// Reserve an object key, presign the upload and create the pending record
#[utoipa::path(
    post,
    path = "/api/v0/files/upload-slot",
    tag = "files",
    request_body = UploadSlotRequest,
    responses(
        (status = 201, description = "Upload slot issued; the access code is only returned here", body = UploadSlotResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(
    skip(state, request),
    fields(user_id = %user.user_id, file_name = %request.file_name, operation = "upload_slot")
)]
pub async fn request_upload_slot(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<UploadSlotRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let folder = normalize_folder(
        request
            .folder
            .as_deref()
            .unwrap_or(state.config.default_upload_folder()),
    )?;
    let expiry_duration_minutes = request
        .expiry_duration_minutes
        .unwrap_or(state.config.default_expiry_minutes());

    let slot = state
        .storage
        .issue_upload_slot(&request.file_name, &request.content_type, &folder)
        .await?;

    let record = state
        .files
        .create_record(CreateFileRecord {
            owner: Owner {
                id: user.user_id,
                email: user.email,
                name: user.name,
            },
            file_name: request.file_name,
            content_type: request.content_type,
            folder,
            object_key: slot.object_key,
            public_url: slot.public_url,
            recipients: request.target_recipients,
            expiry_duration_minutes,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(UploadSlotResponse {
            id: record.id,
            upload_url: slot.upload_url,
            access_code: record.access_code.expose().to_string(),
            object_key: record.object_key,
            public_url: record.public_url,
            target_recipients: record.target_recipients,
            expiry_duration_minutes: record.expiry_duration_minutes,
            status: record.status,
            upload_url_expires_in: slot.expires_in.as_secs(),
        }),
    ))
}

/// Mark the owner's pending upload as uploaded
#[utoipa::path(
    post,
    path = "/api/v0/files/confirm",
    tag = "files",
    request_body = ConfirmUploadRequest,
    responses(
        (status = 200, description = "Upload confirmed", body = FileSummary),
        (status = 403, description = "Caller does not own the file", body = ErrorResponse),
        (status = 404, description = "File not found or already confirmed", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state, request), fields(user_id = %user.user_id, object_key = %request.object_key))]
pub async fn confirm_upload(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<ConfirmUploadRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let record = state
        .files
        .confirm_upload_for_owner(user.user_id, &request.object_key)
        .await?;
    Ok(Json(FileSummary::from(record)))
}

/// Authorize a recipient and hand out a short-lived download URL.
///
/// The first successful call opens the file's access window.
#[utoipa::path(
    post,
    path = "/api/v0/files/download",
    tag = "files",
    request_body = DownloadRequest,
    responses(
        (status = 200, description = "Download authorized", body = DownloadResponse),
        (status = 403, description = "Access denied", body = ErrorResponse),
        (status = 404, description = "File not found", body = ErrorResponse),
        (status = 409, description = "File is not available for download", body = ErrorResponse),
        (status = 429, description = "Too many failed attempts", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state, request), fields(user_id = %user.user_id, object_key = %request.object_key))]
pub async fn request_download(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<DownloadRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let requester = normalize_email(&user.email);

    if !state
        .access_limiter
        .try_acquire(&requester, &request.object_key)
        .await
    {
        tracing::warn!(requester = %requester, "Download refused: attempt limit reached");
        return Err(AppError::TooManyAttempts(
            "Too many failed access attempts for this file".to_string(),
        )
        .into());
    }

    // Only a rejected requester or code keeps the reserved attempt.
    let record = match state
        .files
        .authorize_access(&request.object_key, &request.access_code, &requester)
        .await
    {
        Ok(record) => {
            state
                .access_limiter
                .clear(&requester, &request.object_key)
                .await;
            record
        }
        Err(e @ AppError::Forbidden(_)) => return Err(e.into()),
        Err(e) => {
            state
                .access_limiter
                .release(&requester, &request.object_key)
                .await;
            return Err(e.into());
        }
    };

    let now = state.files.now();
    let expires_at = record.expires_at.ok_or_else(|| {
        AppError::Internal(format!("record {} has no access window", record.id))
    })?;

    let ttl = download_url_ttl(state.config.download_url_ttl_secs(), expires_at, now);
    let download_url = state
        .storage
        .issue_download_url(&record.object_key, ttl)
        .await?;

    tracing::info!(record_id = %record.id, url_ttl_secs = ttl.as_secs(), "Download authorized");

    Ok(Json(DownloadResponse {
        download_url,
        remaining_minutes: record.remaining_minutes_at(now),
        file_name: record.file_name,
        content_type: record.content_type,
        expires_at,
    }))
}

/// The caller's pending and uploaded files, newest first
#[utoipa::path(
    get,
    path = "/api/v0/files",
    tag = "files",
    responses(
        (status = 200, description = "Owned files", body = Vec<FileSummary>),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_my_files(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpAppError> {
    let records = state.files.list_owned(user.user_id).await?;
    let files: Vec<FileSummary> = records.into_iter().map(FileSummary::from).collect();
    Ok(Json(files))
}

/// Metadata for the owner or any recipient. Never includes the access code.
#[utoipa::path(
    get,
    path = "/api/v0/files/{object_key}",
    tag = "files",
    params(("object_key" = String, Path, description = "Object key, slashes included")),
    responses(
        (status = 200, description = "File metadata", body = FileMetaResponse),
        (status = 403, description = "Access denied", body = ErrorResponse),
        (status = 404, description = "File not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_file_meta(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(object_key): Path<String>,
) -> Result<impl IntoResponse, HttpAppError> {
    let record = state
        .files
        .get_visible_to(user.user_id, &normalize_email(&user.email), &object_key)
        .await?;
    Ok(Json(FileMetaResponse::from_record(
        record,
        state.files.now(),
    )))
}

/// Withdraw a file. Only its owner may do this; withdrawing twice is not an error.
#[utoipa::path(
    delete,
    path = "/api/v0/files/{object_key}",
    tag = "files",
    params(("object_key" = String, Path, description = "Object key, slashes included")),
    responses(
        (status = 200, description = "File withdrawn", body = FileSummary),
        (status = 403, description = "Caller does not own the file", body = ErrorResponse),
        (status = 404, description = "File not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state), fields(user_id = %user.user_id))]
pub async fn withdraw_file(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(object_key): Path<String>,
) -> Result<impl IntoResponse, HttpAppError> {
    let record = state
        .files
        .withdraw_for_owner(user.user_id, &object_key)
        .await?;

    if state.config.purge_on_withdraw() {
        // The record is already terminal; a leftover object is unreachable.
        if let Err(e) = state.storage.delete_object(&record.object_key).await {
            tracing::error!(error = %e, record_id = %record.id, "Failed to purge withdrawn object");
        }
    }

    Ok(Json(FileSummary::from(record)))
}
