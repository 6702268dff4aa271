//! crates/qa_engine_core/src/ports.rs
//!
//! Defines the persistence contract for the QA engine.
//! The trait forms the boundary of the hexagonal architecture, allowing the core
//! to be independent of a specific database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    Answer, NewUser, Question, User, UserCredentials, VoteDirection, VoteRecord,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// The error type for all port and engine operations.
/// Lookup misses are ordinary variants; storage faults are `Unavailable`/`Unexpected`.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("User not present in the database")]
    UserNotFound,
    #[error("Question not found")]
    QuestionNotFound,
    #[error("User already cast the {0}")]
    DuplicateVote(VoteDirection),
    #[error("{0}")]
    Conflict(String),
    #[error("The database did not respond in time")]
    Unavailable,
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

impl PortError {
    /// True for the "record does not exist" family of errors.
    pub fn is_not_found(&self) -> bool {
        matches!(self, PortError::UserNotFound | PortError::QuestionNotFound)
    }
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- User Management ---

    /// Inserts a user. A taken username or email fails with `Conflict`.
    async fn create_user(&self, user: &NewUser) -> PortResult<User>;

    /// Exact match on the (username, email) natural key.
    async fn get_user(&self, username: &str, email: &str) -> PortResult<User>;

    async fn get_credentials_by_username(&self, username: &str) -> PortResult<UserCredentials>;

    async fn get_credentials_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    // --- Question Management ---

    /// Inserts a question with zero votes. A taken title fails with `Conflict`.
    async fn create_question(
        &self,
        author: &User,
        title: &str,
        content: &str,
    ) -> PortResult<Question>;

    async fn get_question_by_title(&self, title: &str) -> PortResult<Question>;

    /// Every question with its answers, oldest question first.
    async fn list_questions(&self) -> PortResult<Vec<Question>>;

    /// Appends an answer to the end of a question's answer sequence.
    /// Fails with `QuestionNotFound` when the question no longer exists.
    async fn append_answer(&self, question_id: Uuid, answer: &Answer) -> PortResult<()>;

    // --- Vote Ledger ---

    /// Applies one vote as a single atomic unit: the question's counter moves by
    /// `direction.delta()` and the ledger gains a (voter, title, direction) row.
    ///
    /// Fails with `DuplicateVote` if the row already exists and `QuestionNotFound`
    /// if no question has this title. In both cases nothing is written.
    /// Returns the counter value after the increment.
    async fn record_vote(
        &self,
        voter_username: &str,
        voter_email: &str,
        question_title: &str,
        direction: VoteDirection,
        cast_at: DateTime<Utc>,
    ) -> PortResult<i32>;

    /// All ledger rows for a voter, oldest first. Empty when they never voted.
    async fn get_vote_records(
        &self,
        voter_username: &str,
        voter_email: &str,
    ) -> PortResult<Vec<VoteRecord>>;
}
