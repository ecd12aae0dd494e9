mod controller;
pub mod presenter;
mod progress;
mod service;
mod store;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use controller::{
    DEFAULT_QUESTION_LIMIT, QuizSessionController, SaveStatus, SessionPhase,
};
pub use progress::SessionProgress;
pub use service::{Advance, QuizSession, SubmittedAnswer};
pub use store::{AnswerStore, QuestionPhase};
