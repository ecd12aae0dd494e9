#![forbid(unsafe_code)]

pub mod auth;
pub mod client;
pub mod error;
pub mod sessions;

pub use quiz_core::Clock;
pub use sessions as session;

pub use auth::{AuthProvider, AuthSession, AuthSubscription};
pub use client::{HttpQuizApi, QuestionSource, QuizApiConfig, ResultSink, ResultSubmission, SavedResult};
pub use error::{FetchError, SaveError, SessionError};

pub use sessions::{
    AnswerStore, QuestionPhase, QuizSession, QuizSessionController, SaveStatus, SessionPhase,
    SessionProgress, SubmittedAnswer,
};
