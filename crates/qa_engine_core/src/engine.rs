//! crates/qa_engine_core/src/engine.rs
//!
//! The application service behind every mutating route: identity resolution,
//! the vote-casting protocol and the answer appender. It owns no state of its
//! own; all persistence goes through the injected `DatabaseService`.

use chrono::Utc;
use std::sync::Arc;

use crate::domain::{
    Answer, Question, QuestionOrder, User, VoteDirection, VoteLedger, VoteReceipt,
};
use crate::ports::{DatabaseService, PortError, PortResult};

#[derive(Clone)]
pub struct QaEngine {
    db: Arc<dyn DatabaseService>,
}

impl QaEngine {
    pub fn new(db: Arc<dyn DatabaseService>) -> Self {
        Self { db }
    }

    //=====================================================================================
    // Identity Resolver
    //=====================================================================================

    /// Looks up a user by (username, email). A miss is `Ok(None)`, not an error.
    pub async fn find_user(&self, username: &str, email: &str) -> PortResult<Option<User>> {
        found(self.db.get_user(username, email).await)
    }

    /// Looks up a question by title, optionally also requiring its author.
    pub async fn find_question(
        &self,
        title: &str,
        author: Option<&str>,
    ) -> PortResult<Option<Question>> {
        let question = found(self.db.get_question_by_title(title).await)?;
        Ok(question.filter(|q| author.map_or(true, |a| q.username == a)))
    }

    //=====================================================================================
    // Questions
    //=====================================================================================

    pub async fn add_question(
        &self,
        author_username: &str,
        author_email: &str,
        title: &str,
        content: &str,
    ) -> PortResult<Question> {
        let author = self
            .find_user(author_username, author_email)
            .await?
            .ok_or(PortError::UserNotFound)?;
        self.db.create_question(&author, title, content).await
    }

    pub async fn list_questions(&self, order: QuestionOrder) -> PortResult<Vec<Question>> {
        let mut questions = self.db.list_questions().await?;
        if order == QuestionOrder::Top {
            // Stable sort keeps posting order among equal counts.
            questions.sort_by(|a, b| b.votes.cmp(&a.votes));
        }
        Ok(questions)
    }

    //=====================================================================================
    // Vote Ledger
    //=====================================================================================

    pub async fn vote_ledger(&self, username: &str, email: &str) -> PortResult<VoteLedger> {
        let records = self.db.get_vote_records(username, email).await?;
        Ok(VoteLedger::from_records(username, email, records))
    }

    /// Casts one vote by `voter` on the question titled `question_title`.
    ///
    /// The ledger read is only a fast rejection path. Two concurrent calls for the
    /// same (voter, question, direction) can both get past it; `record_vote` is the
    /// step that guarantees exactly one of them is applied.
    pub async fn cast_vote(
        &self,
        voter_username: &str,
        voter_email: &str,
        question_title: &str,
        direction: VoteDirection,
    ) -> PortResult<VoteReceipt> {
        let ledger = self.vote_ledger(voter_username, voter_email).await?;
        if ledger.has_voted(question_title, direction) {
            return Err(PortError::DuplicateVote(direction));
        }

        let votes = self
            .db
            .record_vote(
                voter_username,
                voter_email,
                question_title,
                direction,
                Utc::now(),
            )
            .await?;

        Ok(VoteReceipt {
            applied: true,
            direction,
            question_title: question_title.to_string(),
            votes,
        })
    }

    //=====================================================================================
    // Answer Appender
    //=====================================================================================

    pub async fn add_answer(
        &self,
        answerer_username: &str,
        answerer_email: &str,
        question_author: &str,
        question_title: &str,
        text: &str,
    ) -> PortResult<Answer> {
        let answerer = self
            .find_user(answerer_username, answerer_email)
            .await?
            .ok_or(PortError::UserNotFound)?;
        let question = self
            .find_question(question_title, Some(question_author))
            .await?
            .ok_or(PortError::QuestionNotFound)?;

        let answer = Answer::new(&answerer, text);
        self.db.append_answer(question.id, &answer).await?;
        Ok(answer)
    }
}

/// Turns a not-found port error into `None`, passing every other error through.
fn found<T>(result: PortResult<T>) -> PortResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}
