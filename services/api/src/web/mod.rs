pub mod auth;
pub mod middleware;
pub mod questions;
pub mod rest;
pub mod state;
pub mod token;

use axum::{
    middleware as axum_middleware,
    routing::{any, get, post},
    Router,
};
use std::sync::Arc;

pub use middleware::require_auth;
pub use state::AppState;

/// Builds the API router: public auth and listing routes plus the
/// token-protected question, vote and answer routes.
pub fn api_router(app_state: Arc<AppState>) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/user/register", post(auth::register_handler))
        .route(
            "/user/login",
            get(auth::login_handler).post(auth::login_handler),
        )
        .route("/user/logout", post(auth::logout_handler))
        .route("/user/questions/all", get(questions::list_questions_handler))
        .route(
            "/user/questions/order",
            get(questions::ordered_questions_handler),
        );

    // Protected routes (session token required)
    let protected_routes = Router::new()
        .route("/user/question", any(questions::add_question_handler))
        .route("/user/question/vote", post(questions::vote_handler))
        .route("/user/question/answer", post(questions::answer_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(app_state)
}
