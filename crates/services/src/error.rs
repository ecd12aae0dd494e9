//! Shared error types for the services crate.

use thiserror::Error;

/// Failure modes of the question-set fetch collaborator.
///
/// `NotFound` means the category/difficulty combination has no questions;
/// the session treats that as an empty state, not an error.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FetchError {
    #[error("no questions exist for this category and difficulty")]
    NotFound,
    #[error("question fetch failed with status {0}")]
    Status(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl FetchError {
    /// Whether this failure should render as "no content" rather than an error.
    #[must_use]
    pub fn is_empty_result(&self) -> bool {
        matches!(self, FetchError::NotFound)
    }
}

/// Failure modes of the result-save collaborator.
///
/// Neither variant blocks the result screen; `Unauthorized` is suppressed
/// silently and transport failures are surfaced as a retry affordance.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SaveError {
    #[error("not authorized to save quiz results")]
    Unauthorized,
    #[error("result save failed with status {0}")]
    Status(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl SaveError {
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, SaveError::Unauthorized)
    }
}

/// Errors emitted by the quiz session engine.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no questions available for session")]
    Empty,
    #[error("session already completed")]
    Completed,
    #[error("no session is active")]
    NotActive,
    #[error("no answer selected for the current question")]
    NoSelection,
    #[error("current question must be submitted before advancing")]
    NotSubmitted,
    #[error("already at the first question")]
    AtFirstQuestion,
    #[error("nothing to retry in the current phase")]
    NothingToRetry,
}
