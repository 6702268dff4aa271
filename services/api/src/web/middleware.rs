//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;

use crate::error::ApiError;
use crate::web::state::AppState;
use crate::web::token::token_from_headers;

/// Middleware that verifies the `token` cookie and extracts the session claims.
///
/// If valid, inserts the `SessionClaims` into request extensions for handlers to use.
/// A missing, forged or expired token is a 401; an unreadable cookie is a 400.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = {
        let token = token_from_headers(req.headers())?;
        state.tokens.verify(token)?
    };
    debug!(username = %claims.username, "Session token accepted");

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
