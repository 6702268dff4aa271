pub mod domain;
pub mod engine;
pub mod ports;

pub use domain::{
    Answer, NewUser, Question, QuestionOrder, SessionClaims, User, UserCredentials,
    VoteDirection, VoteLedger, VoteReceipt, VoteRecord,
};
pub use engine::QaEngine;
pub use ports::{DatabaseService, PortError, PortResult};
