//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for user registration, login, and logout.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use qa_engine_core::NewUser;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::web::rest::{AppJson, MessageResponse};
use crate::web::state::AppState;
use crate::web::token::{cleared_cookie, session_cookie};

//=========================================================================================
// Request Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub email: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub phone: i64,
    #[serde(default)]
    pub city: String,
}

/// Either `username` or `email` identifies the account.
#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    pub password: String,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /user/register - Create a new user account
#[utoipa::path(
    post,
    path = "/user/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "User created", body = MessageResponse),
        (status = 400, description = "Invalid request", body = MessageResponse),
        (status = 409, description = "Username or email already taken", body = MessageResponse),
        (status = 500, description = "Internal server error", body = MessageResponse)
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<RegisterRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if req.username.trim().is_empty() || req.email.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::BadRequest(
            "username, email and password are required".to_string(),
        ));
    }

    // 1. Hash the password
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            ApiError::Internal("Failed to hash password".to_string())
        })?
        .to_string();

    // 2. Create user in database; uniqueness is enforced by the store
    let user = state
        .db
        .create_user(&NewUser {
            username: req.username,
            email: req.email,
            hashed_password: password_hash,
            country: req.country,
            phone: req.phone,
            city: req.city,
        })
        .await?;

    info!(username = %user.username, "Registered new user");
    Ok(Json(MessageResponse::ok("User added to the database")))
}

/// GET|POST /user/login - Login with an existing account
#[utoipa::path(
    post,
    path = "/user/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful; sets the `token` cookie", body = MessageResponse),
        (status = 400, description = "Invalid request", body = MessageResponse),
        (status = 401, description = "Invalid credentials", body = MessageResponse),
        (status = 500, description = "Internal server error", body = MessageResponse)
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let invalid = || ApiError::Unauthenticated("Invalid credentials".to_string());

    // 1. Get user by username, falling back to email
    let lookup = if !req.username.is_empty() {
        state.db.get_credentials_by_username(&req.username).await
    } else if !req.email.is_empty() {
        state.db.get_credentials_by_email(&req.email).await
    } else {
        return Err(ApiError::BadRequest(
            "username or email is required".to_string(),
        ));
    };
    let creds = match lookup {
        Ok(creds) => creds,
        Err(e) if e.is_not_found() => return Err(invalid()),
        Err(e) => return Err(e.into()),
    };

    // 2. Verify password
    let parsed_hash = PasswordHash::new(&creds.hashed_password).map_err(|e| {
        error!("Failed to parse password hash: {:?}", e);
        ApiError::Internal("Authentication error".to_string())
    })?;

    let valid = Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .is_ok();
    if !valid {
        warn!(username = %creds.username, "Rejected login with wrong password");
        return Err(invalid());
    }

    // 3. Issue the signed session token
    let (token, _) = state.tokens.issue(&creds.username, &creds.email)?;
    let cookie = session_cookie(&token, state.tokens.ttl());

    info!(username = %creds.username, "User logged in");
    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(MessageResponse::ok("A-OK")),
    ))
}

/// POST /user/logout - Drop the session cookie
///
/// Tokens are stateless; an already issued token stays valid until it expires.
#[utoipa::path(
    post,
    path = "/user/logout",
    responses(
        (status = 200, description = "Cookie cleared", body = MessageResponse)
    )
)]
pub async fn logout_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::SET_COOKIE, cleared_cookie())],
        Json(MessageResponse::ok("Logged out")),
    )
}

