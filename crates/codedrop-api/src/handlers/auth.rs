use crate::auth::password::{hash_password, verify_password};
use crate::auth::AuthUser;
use crate::constants::TOKEN_TYPE;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use codedrop_core::models::{
    normalize_email, AuthResponse, LoginRequest, NewUser, RegisterRequest, User, UserResponse,
};
use codedrop_core::AppError;
use std::sync::Arc;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

fn auth_response(state: &AppState, user: User) -> Result<AuthResponse, AppError> {
    let token = state.jwt.issue(&user)?;
    Ok(AuthResponse {
        token,
        token_type: TOKEN_TYPE.to_string(),
        expires_in: state.jwt.expires_in(),
        user: user.into(),
    })
}

/// Create an account and sign it in
#[utoipa::path(
    post,
    path = "/api/v0/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, request), fields(operation = "register"))]
pub async fn register(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<RegisterRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let password_hash = hash_password(&request.password)?;

    let user = state
        .users
        .create(NewUser {
            email: normalize_email(&request.email),
            name: request.name.trim().to_string(),
            password_hash,
        })
        .await?;

    tracing::info!(user_id = %user.id, "User registered");
    Ok((StatusCode::CREATED, Json(auth_response(&state, user)?)))
}

/// Exchange credentials for a bearer token
#[utoipa::path(
    post,
    path = "/api/v0/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = AuthResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, request), fields(operation = "login"))]
pub async fn login(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let user = state
        .users
        .find_by_email(&normalize_email(&request.email))
        .await?
        .ok_or_else(|| AppError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

    if !verify_password(&request.password, &user.password_hash)? {
        tracing::debug!(user_id = %user.id, "Login refused: wrong password");
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()).into());
    }

    tracing::info!(user_id = %user.id, "User signed in");
    Ok(Json(auth_response(&state, user)?))
}

/// The signed-in caller's account
#[utoipa::path(
    get,
    path = "/api/v0/auth/me",
    tag = "auth",
    responses(
        (status = 200, description = "Current account", body = UserResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Account no longer exists", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn me(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpAppError> {
    let account = state
        .users
        .find_by_id(user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(UserResponse::from(account)))
}
