//! services/api/src/adapters/timeout.rs
//!
//! A `DatabaseService` decorator that bounds every call by the configured I/O
//! timeout. An elapsed call fails with `PortError::Unavailable`; nothing is
//! retried here, retry policy belongs to the caller.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use qa_engine_core::domain::{
    Answer, NewUser, Question, User, UserCredentials, VoteDirection, VoteRecord,
};
use qa_engine_core::ports::{DatabaseService, PortError, PortResult};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use uuid::Uuid;

#[derive(Clone)]
pub struct TimeoutAdapter {
    inner: Arc<dyn DatabaseService>,
    timeout: Duration,
}

impl TimeoutAdapter {
    pub fn new(inner: Arc<dyn DatabaseService>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    async fn bounded<T, F>(&self, op: &'static str, fut: F) -> PortResult<T>
    where
        F: Future<Output = PortResult<T>> + Send,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!(op, timeout = ?self.timeout, "Database call timed out");
                Err(PortError::Unavailable)
            }
        }
    }
}

#[async_trait]
impl DatabaseService for TimeoutAdapter {
    async fn create_user(&self, user: &NewUser) -> PortResult<User> {
        self.bounded("create_user", self.inner.create_user(user)).await
    }

    async fn get_user(&self, username: &str, email: &str) -> PortResult<User> {
        self.bounded("get_user", self.inner.get_user(username, email))
            .await
    }

    async fn get_credentials_by_username(&self, username: &str) -> PortResult<UserCredentials> {
        self.bounded(
            "get_credentials_by_username",
            self.inner.get_credentials_by_username(username),
        )
        .await
    }

    async fn get_credentials_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        self.bounded(
            "get_credentials_by_email",
            self.inner.get_credentials_by_email(email),
        )
        .await
    }

    async fn create_question(
        &self,
        author: &User,
        title: &str,
        content: &str,
    ) -> PortResult<Question> {
        self.bounded(
            "create_question",
            self.inner.create_question(author, title, content),
        )
        .await
    }

    async fn get_question_by_title(&self, title: &str) -> PortResult<Question> {
        self.bounded("get_question_by_title", self.inner.get_question_by_title(title))
            .await
    }

    async fn list_questions(&self) -> PortResult<Vec<Question>> {
        self.bounded("list_questions", self.inner.list_questions())
            .await
    }

    async fn append_answer(&self, question_id: Uuid, answer: &Answer) -> PortResult<()> {
        self.bounded("append_answer", self.inner.append_answer(question_id, answer))
            .await
    }

    // Dropping the inner future on timeout drops an open sqlx transaction,
    // which rolls it back: a timed-out vote is never half applied.
    async fn record_vote(
        &self,
        voter_username: &str,
        voter_email: &str,
        question_title: &str,
        direction: VoteDirection,
        cast_at: DateTime<Utc>,
    ) -> PortResult<i32> {
        self.bounded(
            "record_vote",
            self.inner.record_vote(
                voter_username,
                voter_email,
                question_title,
                direction,
                cast_at,
            ),
        )
        .await
    }

    async fn get_vote_records(
        &self,
        voter_username: &str,
        voter_email: &str,
    ) -> PortResult<Vec<VoteRecord>> {
        self.bounded(
            "get_vote_records",
            self.inner.get_vote_records(voter_username, voter_email),
        )
        .await
    }
}
