//! services/api/src/adapters/memory.rs
//!
//! An in-process implementation of the `DatabaseService` port, used for tests
//! and for running the service with `DATABASE_URL=memory://`.
//!
//! All collections live behind one `RwLock`, so every port call is a single
//! critical section. That is what makes `record_vote` atomic here: the counter
//! and the ledger row change under the same write guard.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use qa_engine_core::domain::{
    Answer, NewUser, Question, User, UserCredentials, VoteDirection, VoteRecord,
};
use qa_engine_core::ports::{DatabaseService, PortError, PortResult};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    users: Vec<(User, String)>,
    /// Questions in posting order.
    questions: Vec<Question>,
    /// Ledger rows per (voter username, voter email), oldest first.
    ledger: HashMap<(String, String), Vec<VoteRecord>>,
    /// Uniqueness index over (voter username, voter email, title, direction).
    ledger_keys: HashSet<(String, String, String, VoteDirection)>,
}

#[derive(Clone, Default)]
pub struct MemoryAdapter {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }
}

fn credentials(user: &User, hash: &str) -> UserCredentials {
    UserCredentials {
        user_id: user.user_id,
        username: user.username.clone(),
        email: user.email.clone(),
        hashed_password: hash.to_string(),
    }
}

#[async_trait]
impl DatabaseService for MemoryAdapter {
    async fn create_user(&self, user: &NewUser) -> PortResult<User> {
        let mut tables = self.tables.write().await;
        if tables.users.iter().any(|(u, _)| u.username == user.username) {
            return Err(PortError::Conflict("Username already taken".to_string()));
        }
        if tables.users.iter().any(|(u, _)| u.email == user.email) {
            return Err(PortError::Conflict("Email already taken".to_string()));
        }

        let created = User {
            user_id: Uuid::new_v4(),
            username: user.username.clone(),
            email: user.email.clone(),
            country: user.country.clone(),
            phone: user.phone,
            city: user.city.clone(),
        };
        tables
            .users
            .push((created.clone(), user.hashed_password.clone()));
        Ok(created)
    }

    async fn get_user(&self, username: &str, email: &str) -> PortResult<User> {
        let tables = self.tables.read().await;
        tables
            .users
            .iter()
            .find(|(u, _)| u.username == username && u.email == email)
            .map(|(u, _)| u.clone())
            .ok_or(PortError::UserNotFound)
    }

    async fn get_credentials_by_username(&self, username: &str) -> PortResult<UserCredentials> {
        let tables = self.tables.read().await;
        tables
            .users
            .iter()
            .find(|(u, _)| u.username == username)
            .map(|(u, hash)| credentials(u, hash))
            .ok_or(PortError::UserNotFound)
    }

    async fn get_credentials_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let tables = self.tables.read().await;
        tables
            .users
            .iter()
            .find(|(u, _)| u.email == email)
            .map(|(u, hash)| credentials(u, hash))
            .ok_or(PortError::UserNotFound)
    }

    async fn create_question(
        &self,
        author: &User,
        title: &str,
        content: &str,
    ) -> PortResult<Question> {
        let mut tables = self.tables.write().await;
        if tables.questions.iter().any(|q| q.title == title) {
            return Err(PortError::Conflict(
                "Question already present in the database".to_string(),
            ));
        }

        let question = Question {
            id: Uuid::new_v4(),
            username: author.username.clone(),
            title: title.to_string(),
            content: content.to_string(),
            votes: 0,
            answers: Vec::new(),
            selected_answer: None,
            created_at: Utc::now(),
        };
        tables.questions.push(question.clone());
        Ok(question)
    }

    async fn get_question_by_title(&self, title: &str) -> PortResult<Question> {
        let tables = self.tables.read().await;
        tables
            .questions
            .iter()
            .find(|q| q.title == title)
            .cloned()
            .ok_or(PortError::QuestionNotFound)
    }

    async fn list_questions(&self) -> PortResult<Vec<Question>> {
        Ok(self.tables.read().await.questions.clone())
    }

    async fn append_answer(&self, question_id: Uuid, answer: &Answer) -> PortResult<()> {
        let mut tables = self.tables.write().await;
        let question = tables
            .questions
            .iter_mut()
            .find(|q| q.id == question_id)
            .ok_or(PortError::QuestionNotFound)?;
        question.answers.push(answer.clone());
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
        let mut tables = self.tables.write().await;

        let key = (
            voter_username.to_string(),
            voter_email.to_string(),
            question_title.to_string(),
            direction,
        );
        if tables.ledger_keys.contains(&key) {
            return Err(PortError::DuplicateVote(direction));
        }

        let question = tables
            .questions
            .iter_mut()
            .find(|q| q.title == question_title)
            .ok_or(PortError::QuestionNotFound)?;
        question.votes += direction.delta();
        let votes = question.votes;

        tables.ledger_keys.insert(key);
        tables
            .ledger
            .entry((voter_username.to_string(), voter_email.to_string()))
            .or_default()
            .push(VoteRecord {
                question_title: question_title.to_string(),
                direction,
                cast_at,
            });
        Ok(votes)
    }

    async fn get_vote_records(
        &self,
        voter_username: &str,
        voter_email: &str,
    ) -> PortResult<Vec<VoteRecord>> {
        let tables = self.tables.read().await;
        Ok(tables
            .ledger
            .get(&(voter_username.to_string(), voter_email.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded() -> (MemoryAdapter, User) {
        let db = MemoryAdapter::new();
        let bob = db
            .create_user(&NewUser {
                username: "bob".into(),
                email: "b@x.com".into(),
                hashed_password: "hash".into(),
                country: "NZ".into(),
                phone: 5550100,
                city: "Wellington".into(),
            })
            .await
            .unwrap();
        db.create_question(&bob, "Why Go?", "Convince me").await.unwrap();
        (db, bob)
    }

    #[tokio::test]
    async fn duplicate_username_and_email_conflict() {
        let (db, _) = seeded().await;
        let mut dup = NewUser {
            username: "bob".into(),
            email: "other@x.com".into(),
            hashed_password: "hash".into(),
            country: String::new(),
            phone: 0,
            city: String::new(),
        };
        assert!(matches!(
            db.create_user(&dup).await,
            Err(PortError::Conflict(m)) if m == "Username already taken"
        ));

        dup.username = "robert".into();
        dup.email = "b@x.com".into();
        assert!(matches!(
            db.create_user(&dup).await,
            Err(PortError::Conflict(m)) if m == "Email already taken"
        ));
    }

    #[tokio::test]
    async fn record_vote_on_missing_question_leaves_ledger_untouched() {
        let (db, _) = seeded().await;
        let result = db
            .record_vote("alice", "a@x.com", "Nope", VoteDirection::Up, Utc::now())
            .await;

        assert!(matches!(result, Err(PortError::QuestionNotFound)));
        assert!(db.get_vote_records("alice", "a@x.com").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn record_vote_rejects_second_row_for_same_key() {
        let (db, _) = seeded().await;
        let first = db
            .record_vote("alice", "a@x.com", "Why Go?", VoteDirection::Up, Utc::now())
            .await
            .unwrap();
        let second = db
            .record_vote("alice", "a@x.com", "Why Go?", VoteDirection::Up, Utc::now())
            .await;

        assert_eq!(first, 1);
        assert!(matches!(second, Err(PortError::DuplicateVote(VoteDirection::Up))));
        assert_eq!(db.get_question_by_title("Why Go?").await.unwrap().votes, 1);
    }

    #[tokio::test]
    async fn append_answer_to_removed_question_is_not_found() {
        let (db, bob) = seeded().await;
        let answer = Answer::new(&bob, "text");
        assert!(matches!(
            db.append_answer(Uuid::new_v4(), &answer).await,
            Err(PortError::QuestionNotFound)
        ));
    }
}
