//! services/api/src/web/rest.rs
//!
//! Contains the response envelope shared by every route, the JSON views of the
//! domain types, and the master definition for the OpenAPI specification.

use axum::extract::FromRequest;
use chrono::{DateTime, Utc};
use qa_engine_core::{Answer, Question, VoteReceipt};
use serde::Serialize;
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::auth::{LoginRequest, RegisterRequest};
use crate::web::questions::{AnswerRequest, QuestionRequest, VoteRequest};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::web::auth::register_handler,
        crate::web::auth::login_handler,
        crate::web::auth::logout_handler,
        crate::web::questions::add_question_handler,
        crate::web::questions::vote_handler,
        crate::web::questions::answer_handler,
        crate::web::questions::list_questions_handler,
        crate::web::questions::ordered_questions_handler,
    ),
    components(
        schemas(
            MessageResponse,
            QuestionListResponse,
            VoteResponse,
            VoteView,
            QuestionView,
            AnswerView,
            RegisterRequest,
            LoginRequest,
            QuestionRequest,
            VoteRequest,
            AnswerRequest,
        )
    ),
    tags(
        (name = "QA Engine API", description = "Questions, answers and votes.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Request Extraction
//=========================================================================================

/// `Json` with rejections rendered through `ApiError`, so a bad body gets the
/// same `{error, message}` envelope as every other failure.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct AppJson<T>(pub T);

//=========================================================================================
// API Response Envelopes
//=========================================================================================

/// The body of every response without a payload.
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub error: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            error: false,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            error: true,
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct QuestionListResponse {
    pub error: bool,
    pub message: String,
    pub data: Vec<QuestionView>,
}

impl QuestionListResponse {
    pub fn new(questions: Vec<Question>) -> Self {
        Self {
            error: false,
            message: "Successfully fetched all questions".to_string(),
            data: questions.into_iter().map(QuestionView::from).collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VoteResponse {
    pub error: bool,
    pub message: String,
    pub data: VoteView,
}

//=========================================================================================
// Views
//=========================================================================================

#[derive(Debug, Serialize, ToSchema)]
pub struct VoteView {
    pub applied: bool,
    pub votetype: String,
    pub title: String,
    pub votes: i32,
}

impl From<VoteReceipt> for VoteView {
    fn from(receipt: VoteReceipt) -> Self {
        Self {
            applied: receipt.applied,
            votetype: receipt.direction.to_string(),
            title: receipt.question_title,
            votes: receipt.votes,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AnswerView {
    pub userid: Uuid,
    pub username: String,
    pub email: String,
    pub answer: String,
    pub isselected: bool,
    pub votes: i32,
    pub dateposted: DateTime<Utc>,
}

impl From<Answer> for AnswerView {
    fn from(a: Answer) -> Self {
        Self {
            userid: a.user_id,
            username: a.username,
            email: a.email,
            answer: a.text,
            isselected: a.is_selected,
            votes: a.votes,
            dateposted: a.date_posted,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct QuestionView {
    pub username: String,
    pub title: String,
    pub content: String,
    pub votes: i32,
    pub answers: Vec<AnswerView>,
    pub selectedanswer: Option<AnswerView>,
}

impl From<Question> for QuestionView {
    fn from(q: Question) -> Self {
        Self {
            username: q.username,
            title: q.title,
            content: q.content,
            votes: q.votes,
            answers: q.answers.into_iter().map(AnswerView::from).collect(),
            selectedanswer: q.selected_answer.map(AnswerView::from),
        }
    }
}
