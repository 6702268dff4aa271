//! crates/qa_engine_core/src/domain.rs
//!
//! Defines the pure, core data structures for the QA engine.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// Represents a registered user - used throughout app
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    pub country: String,
    pub phone: i64,
    pub city: String,
}

/// The fields needed to register a user. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub hashed_password: String,
    pub country: String,
    pub phone: i64,
    pub city: String,
}

// Only used internally for login - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    pub hashed_password: String,
}

/// The identity carried by a verified session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionClaims {
    pub username: String,
    pub email: String,
    pub expires_at: DateTime<Utc>,
}

impl SessionClaims {
    /// True when the claim names the given (username, email) pair.
    pub fn is_identity(&self, username: &str, email: &str) -> bool {
        self.username == username && self.email == email
    }
}

/// A question together with its embedded answers.
///
/// `title` is the natural key: at most one question exists per title.
#[derive(Debug, Clone)]
pub struct Question {
    pub id: Uuid,
    pub username: String,
    pub title: String,
    pub content: String,
    pub votes: i32,
    /// Answers in the order they were appended.
    pub answers: Vec<Answer>,
    pub selected_answer: Option<Answer>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Answer {
    pub id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    pub text: String,
    pub is_selected: bool,
    pub votes: i32,
    pub date_posted: DateTime<Utc>,
}

impl Answer {
    /// Builds a fresh, unselected answer authored by `author`.
    pub fn new(author: &User, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: author.user_id,
            username: author.username.clone(),
            email: author.email.clone(),
            text: text.into(),
            is_selected: false,
            votes: 0,
            date_posted: Utc::now(),
        }
    }
}

//=========================================================================================
// Votes
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoteDirection {
    Up,
    Down,
}

impl VoteDirection {
    /// The change applied to a question's counter by one vote in this direction.
    pub fn delta(self) -> i32 {
        match self {
            VoteDirection::Up => 1,
            VoteDirection::Down => -1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            VoteDirection::Up => "upvote",
            VoteDirection::Down => "downvote",
        }
    }
}

impl fmt::Display for VoteDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown vote type '{0}', expected 'upvote' or 'downvote'")]
pub struct ParseVoteDirectionError(pub String);

impl FromStr for VoteDirection {
    type Err = ParseVoteDirectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "upvote" => Ok(VoteDirection::Up),
            "downvote" => Ok(VoteDirection::Down),
            other => Err(ParseVoteDirectionError(other.to_string())),
        }
    }
}

/// One cast vote as stored in the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteRecord {
    pub question_title: String,
    pub direction: VoteDirection,
    pub cast_at: DateTime<Utc>,
}

/// A voter's ledger entry: every question they have upvoted or downvoted.
///
/// Each title appears at most once per direction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoteLedger {
    pub username: String,
    pub email: String,
    pub upvotes: Vec<VoteRecord>,
    pub downvotes: Vec<VoteRecord>,
}

impl VoteLedger {
    pub fn empty(username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            ..Self::default()
        }
    }

    /// Groups flat ledger rows into the per-direction sets.
    pub fn from_records(
        username: impl Into<String>,
        email: impl Into<String>,
        records: Vec<VoteRecord>,
    ) -> Self {
        let mut ledger = Self::empty(username, email);
        for record in records {
            match record.direction {
                VoteDirection::Up => ledger.upvotes.push(record),
                VoteDirection::Down => ledger.downvotes.push(record),
            }
        }
        ledger
    }

    pub fn has_voted(&self, title: &str, direction: VoteDirection) -> bool {
        let set = match direction {
            VoteDirection::Up => &self.upvotes,
            VoteDirection::Down => &self.downvotes,
        };
        set.iter().any(|r| r.question_title == title)
    }

    pub fn is_empty(&self) -> bool {
        self.upvotes.is_empty() && self.downvotes.is_empty()
    }
}

/// The outcome of an applied vote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteReceipt {
    pub applied: bool,
    pub direction: VoteDirection,
    pub question_title: String,
    /// The question's counter after this vote was applied.
    pub votes: i32,
}

/// How a question listing is ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionOrder {
    /// Oldest question first.
    Posted,
    /// Highest vote count first.
    Top,
}
