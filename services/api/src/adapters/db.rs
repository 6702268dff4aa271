//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.
//!
//! Uniqueness of usernames, emails, question titles and ledger rows is enforced
//! by table constraints, not by read-then-insert checks.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use qa_engine_core::domain::{
    Answer, NewUser, Question, User, UserCredentials, VoteDirection, VoteRecord,
};
use qa_engine_core::ports::{DatabaseService, PortError, PortResult};
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;
use uuid::Uuid;

const UNIQUE_VIOLATION: &str = "23505";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    match e {
        sqlx::Error::PoolTimedOut => PortError::Unavailable,
        other => PortError::Unexpected(other.to_string()),
    }
}

/// The violated constraint name, if `e` is a unique-key violation.
fn unique_violation(e: &sqlx::Error) -> Option<String> {
    match e {
        sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            Some(db.constraint().unwrap_or_default().to_string())
        }
        _ => None,
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    user_id: Uuid,
    username: String,
    email: String,
    country: String,
    phone: i64,
    city: String,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            user_id: self.user_id,
            username: self.username,
            email: self.email,
            country: self.country,
            phone: self.phone,
            city: self.city,
        }
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    user_id: Uuid,
    username: String,
    email: String,
    password_hash: String,
}
impl CredentialsRecord {
    fn to_domain(self) -> UserCredentials {
        UserCredentials {
            user_id: self.user_id,
            username: self.username,
            email: self.email,
            hashed_password: self.password_hash,
        }
    }
}

#[derive(FromRow)]
struct QuestionRecord {
    id: Uuid,
    username: String,
    title: String,
    content: String,
    votes: i32,
    selected_answer_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}
impl QuestionRecord {
    fn to_domain(self, answers: Vec<Answer>) -> Question {
        let selected_answer = self
            .selected_answer_id
            .and_then(|id| answers.iter().find(|a| a.id == id).cloned());
        Question {
            id: self.id,
            username: self.username,
            title: self.title,
            content: self.content,
            votes: self.votes,
            answers,
            selected_answer,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct AnswerRecord {
    id: Uuid,
    question_id: Uuid,
    user_id: Uuid,
    username: String,
    email: String,
    body: String,
    is_selected: bool,
    votes: i32,
    date_posted: DateTime<Utc>,
}
impl AnswerRecord {
    fn to_domain(self) -> Answer {
        Answer {
            id: self.id,
            user_id: self.user_id,
            username: self.username,
            email: self.email,
            text: self.body,
            is_selected: self.is_selected,
            votes: self.votes,
            date_posted: self.date_posted,
        }
    }
}

#[derive(FromRow)]
struct LedgerRecord {
    question_title: String,
    direction: String,
    cast_at: DateTime<Utc>,
}
impl LedgerRecord {
    fn to_domain(self) -> PortResult<VoteRecord> {
        let direction = self
            .direction
            .parse::<VoteDirection>()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(VoteRecord {
            question_title: self.question_title,
            direction,
            cast_at: self.cast_at,
        })
    }
}

const QUESTION_COLUMNS: &str =
    "id, username, title, content, votes, selected_answer_id, created_at";
const ANSWER_COLUMNS: &str =
    "id, question_id, user_id, username, email, body, is_selected, votes, date_posted";

impl DbAdapter {
    async fn answers_for(&self, question_id: Uuid) -> PortResult<Vec<Answer>> {
        let records = sqlx::query_as::<_, AnswerRecord>(&format!(
            "SELECT {} FROM answers WHERE question_id = $1 ORDER BY seq ASC",
            ANSWER_COLUMNS
        ))
        .bind(question_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn create_user(&self, user: &NewUser) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "INSERT INTO users (user_id, username, email, password_hash, country, phone, city) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING user_id, username, email, country, phone, city",
        )
        .bind(Uuid::new_v4())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.hashed_password)
        .bind(&user.country)
        .bind(user.phone)
        .bind(&user.city)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match unique_violation(&e).as_deref() {
            Some("users_username_key") => {
                PortError::Conflict("Username already taken".to_string())
            }
            Some("users_email_key") => PortError::Conflict("Email already taken".to_string()),
            Some(_) => PortError::Conflict("User already exists".to_string()),
            None => unexpected(e),
        })?;
        Ok(record.to_domain())
    }

    async fn get_user(&self, username: &str, email: &str) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT user_id, username, email, country, phone, city FROM users \
             WHERE username = $1 AND email = $2",
        )
        .bind(username)
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        record
            .map(UserRecord::to_domain)
            .ok_or(PortError::UserNotFound)
    }

    async fn get_credentials_by_username(&self, username: &str) -> PortResult<UserCredentials> {
        sqlx::query_as::<_, CredentialsRecord>(
            "SELECT user_id, username, email, password_hash FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .map(CredentialsRecord::to_domain)
        .ok_or(PortError::UserNotFound)
    }

    async fn get_credentials_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        sqlx::query_as::<_, CredentialsRecord>(
            "SELECT user_id, username, email, password_hash FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .map(CredentialsRecord::to_domain)
        .ok_or(PortError::UserNotFound)
    }

    async fn create_question(
        &self,
        author: &User,
        title: &str,
        content: &str,
    ) -> PortResult<Question> {
        let record = sqlx::query_as::<_, QuestionRecord>(&format!(
            "INSERT INTO questions (id, username, title, content) VALUES ($1, $2, $3, $4) \
             RETURNING {}",
            QUESTION_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(&author.username)
        .bind(title)
        .bind(content)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match unique_violation(&e) {
            Some(_) => {
                PortError::Conflict("Question already present in the database".to_string())
            }
            None => unexpected(e),
        })?;
        Ok(record.to_domain(Vec::new()))
    }

    async fn get_question_by_title(&self, title: &str) -> PortResult<Question> {
        let record = sqlx::query_as::<_, QuestionRecord>(&format!(
            "SELECT {} FROM questions WHERE title = $1",
            QUESTION_COLUMNS
        ))
        .bind(title)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or(PortError::QuestionNotFound)?;
        let answers = self.answers_for(record.id).await?;
        Ok(record.to_domain(answers))
    }

    async fn list_questions(&self) -> PortResult<Vec<Question>> {
        let questions = sqlx::query_as::<_, QuestionRecord>(&format!(
            "SELECT {} FROM questions ORDER BY seq ASC",
            QUESTION_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        let answers = sqlx::query_as::<_, AnswerRecord>(&format!(
            "SELECT {} FROM answers ORDER BY seq ASC",
            ANSWER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        let mut by_question: HashMap<Uuid, Vec<Answer>> = HashMap::new();
        for record in answers {
            by_question
                .entry(record.question_id)
                .or_default()
                .push(record.to_domain());
        }

        Ok(questions
            .into_iter()
            .map(|q| {
                let answers = by_question.remove(&q.id).unwrap_or_default();
                q.to_domain(answers)
            })
            .collect())
    }

    async fn append_answer(&self, question_id: Uuid, answer: &Answer) -> PortResult<()> {
        // Insert-select so a question removed since the lookup matches zero rows.
        let result = sqlx::query(
            "INSERT INTO answers \
             (id, question_id, user_id, username, email, body, is_selected, votes, date_posted) \
             SELECT $1, q.id, $3, $4, $5, $6, $7, $8, $9 FROM questions q WHERE q.id = $2",
        )
        .bind(answer.id)
        .bind(question_id)
        .bind(answer.user_id)
        .bind(&answer.username)
        .bind(&answer.email)
        .bind(&answer.text)
        .bind(answer.is_selected)
        .bind(answer.votes)
        .bind(answer.date_posted)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;

        if result.rows_affected() == 0 {
            return Err(PortError::QuestionNotFound);
        }
        Ok(())
    }

    async fn record_vote(
        &self,
        voter_username: &str,
        voter_email: &str,
        question_title: &str,
        direction: VoteDirection,
        cast_at: DateTime<Utc>,
    ) -> PortResult<i32> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        // 1. Claim the ledger row. A concurrent claim of the same key blocks on
        //    the unique index until the other transaction finishes.
        let claimed = sqlx::query(
            "INSERT INTO vote_ledger \
             (voter_username, voter_email, question_title, direction, cast_at) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT ON CONSTRAINT vote_ledger_once_per_direction DO NOTHING",
        )
        .bind(voter_username)
        .bind(voter_email)
        .bind(question_title)
        .bind(direction.as_str())
        .bind(cast_at)
        .execute(&mut *tx)
        .await
        .map_err(unexpected)?
        .rows_affected();

        if claimed == 0 {
            tx.rollback().await.map_err(unexpected)?;
            return Err(PortError::DuplicateVote(direction));
        }

        // 2. Move the counter in place; no read-modify-write of the row.
        let votes: Option<i32> = sqlx::query_scalar(
            "UPDATE questions SET votes = votes + $1 WHERE title = $2 RETURNING votes",
        )
        .bind(direction.delta())
        .bind(question_title)
        .fetch_optional(&mut *tx)
        .await
        .map_err(unexpected)?;

        let Some(votes) = votes else {
            tx.rollback().await.map_err(unexpected)?;
            return Err(PortError::QuestionNotFound);
        };

        tx.commit().await.map_err(unexpected)?;
        Ok(votes)
    }

    async fn get_vote_records(
        &self,
        voter_username: &str,
        voter_email: &str,
    ) -> PortResult<Vec<VoteRecord>> {
        let records = sqlx::query_as::<_, LedgerRecord>(
            "SELECT question_title, direction, cast_at FROM vote_ledger \
             WHERE voter_username = $1 AND voter_email = $2 ORDER BY id ASC",
        )
        .bind(voter_username)
        .bind(voter_email)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records.into_iter().map(LedgerRecord::to_domain).collect()
    }
}
