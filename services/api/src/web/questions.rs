//! services/api/src/web/questions.rs
//!
//! Handlers for posting questions, casting votes, appending answers and
//! listing questions. The mutating routes sit behind `require_auth` and only
//! act on behalf of the identity named in the session token.

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use qa_engine_core::{QuestionOrder, SessionClaims, VoteDirection};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use utoipa::{IntoParams, ToSchema};

use crate::error::ApiError;
use crate::web::rest::{AppJson, MessageResponse, QuestionListResponse, VoteResponse};
use crate::web::state::AppState;

//=========================================================================================
// Request Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct QuestionRequest {
    pub username: String,
    pub email: String,
    pub title: String,
    #[serde(default)]
    pub content: String,
}

/// `username`, `email` and `content` describe the question being voted on and
/// are accepted for compatibility; the title alone identifies it.
#[derive(Deserialize, ToSchema)]
pub struct VoteRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub voteusername: String,
    pub voteemail: String,
    /// `upvote` or `downvote`.
    pub votetype: String,
}

#[derive(Deserialize, ToSchema)]
pub struct AnswerRequest {
    pub answerusername: String,
    pub answeremail: String,
    pub questionusername: String,
    #[serde(default)]
    pub questionemail: String,
    pub answer: String,
    pub title: String,
}

#[derive(Deserialize, IntoParams)]
pub struct OrderQuery {
    /// Only `top` is supported.
    pub sort: Option<String>,
}

/// Rejects a request whose acting identity is not the token holder.
fn ensure_acting_as(claims: &SessionClaims, username: &str, email: &str) -> Result<(), ApiError> {
    if claims.is_identity(username, email) {
        Ok(())
    } else {
        Err(ApiError::Unauthenticated(
            "Session token does not belong to the acting user".to_string(),
        ))
    }
}

fn require_field(name: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        Err(ApiError::BadRequest(format!("{} is required", name)))
    } else {
        Ok(())
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// /user/question - Post a new question
#[utoipa::path(
    post,
    path = "/user/question",
    request_body = QuestionRequest,
    responses(
        (status = 200, description = "Question added", body = MessageResponse),
        (status = 400, description = "Invalid request", body = MessageResponse),
        (status = 401, description = "Missing or invalid session token", body = MessageResponse),
        (status = 404, description = "Author not registered", body = MessageResponse),
        (status = 409, description = "A question with this title exists", body = MessageResponse)
    )
)]
pub async fn add_question_handler(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<SessionClaims>,
    AppJson(req): AppJson<QuestionRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    require_field("title", &req.title)?;
    ensure_acting_as(&claims, &req.username, &req.email)?;

    let question = state
        .engine
        .add_question(&req.username, &req.email, &req.title, &req.content)
        .await?;

    info!(title = %question.title, author = %question.username, "Question added");
    Ok(Json(MessageResponse::ok("Added question successfully")))
}

/// POST /user/question/vote - Upvote or downvote a question
#[utoipa::path(
    post,
    path = "/user/question/vote",
    request_body = VoteRequest,
    responses(
        (status = 200, description = "Vote applied", body = VoteResponse),
        (status = 400, description = "Invalid request or vote type", body = MessageResponse),
        (status = 401, description = "Missing or invalid session token", body = MessageResponse),
        (status = 404, description = "Question not found", body = MessageResponse),
        (status = 409, description = "Vote already cast in this direction", body = MessageResponse),
        (status = 503, description = "Database timed out", body = MessageResponse)
    )
)]
pub async fn vote_handler(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<SessionClaims>,
    AppJson(req): AppJson<VoteRequest>,
) -> Result<Json<VoteResponse>, ApiError> {
    require_field("title", &req.title)?;
    let direction = req
        .votetype
        .parse::<VoteDirection>()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    ensure_acting_as(&claims, &req.voteusername, &req.voteemail)?;

    let receipt = state
        .engine
        .cast_vote(&req.voteusername, &req.voteemail, &req.title, direction)
        .await?;

    info!(
        title = %receipt.question_title,
        voter = %req.voteusername,
        direction = %direction,
        votes = receipt.votes,
        "Vote applied"
    );
    Ok(Json(VoteResponse {
        error: false,
        message: format!("{} successful", direction),
        data: receipt.into(),
    }))
}

/// POST /user/question/answer - Append an answer to a question
#[utoipa::path(
    post,
    path = "/user/question/answer",
    request_body = AnswerRequest,
    responses(
        (status = 200, description = "Answer added", body = MessageResponse),
        (status = 400, description = "Invalid request", body = MessageResponse),
        (status = 401, description = "Missing or invalid session token", body = MessageResponse),
        (status = 404, description = "Answerer or question not found", body = MessageResponse)
    )
)]
pub async fn answer_handler(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<SessionClaims>,
    AppJson(req): AppJson<AnswerRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    require_field("title", &req.title)?;
    require_field("answer", &req.answer)?;
    ensure_acting_as(&claims, &req.answerusername, &req.answeremail)?;

    let answer = state
        .engine
        .add_answer(
            &req.answerusername,
            &req.answeremail,
            &req.questionusername,
            &req.title,
            &req.answer,
        )
        .await?;

    info!(title = %req.title, answerer = %answer.username, "Answer added");
    Ok(Json(MessageResponse::ok("Added the answer to the database")))
}

/// GET /user/questions/all - Every question in posting order
#[utoipa::path(
    get,
    path = "/user/questions/all",
    responses(
        (status = 200, description = "All questions", body = QuestionListResponse)
    )
)]
pub async fn list_questions_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<QuestionListResponse>, ApiError> {
    let questions = state.engine.list_questions(QuestionOrder::Posted).await?;
    Ok(Json(QuestionListResponse::new(questions)))
}

/// GET /user/questions/order?sort=top - Questions by vote count, highest first
#[utoipa::path(
    get,
    path = "/user/questions/order",
    params(OrderQuery),
    responses(
        (status = 200, description = "Ordered questions", body = QuestionListResponse),
        (status = 400, description = "Missing or unsupported sort", body = MessageResponse)
    )
)]
pub async fn ordered_questions_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<OrderQuery>,
) -> Result<Json<QuestionListResponse>, ApiError> {
    let order = match query.sort.as_deref() {
        Some("top") => QuestionOrder::Top,
        Some(other) => {
            return Err(ApiError::BadRequest(format!("Unsupported sort '{}'", other)))
        }
        None => return Err(ApiError::BadRequest("sort is required".to_string())),
    };

    let questions = state.engine.list_questions(order).await?;
    Ok(Json(QuestionListResponse::new(questions)))
}
