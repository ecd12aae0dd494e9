use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{AnswerId, QuestionId, QuizId};

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

/// Errors that can occur when constructing a question.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QuestionError {
    #[error("question text must not be empty")]
    EmptyText,
    #[error("question {0} has no answer choices")]
    NoAnswers(QuestionId),
}

//
// ─── ANSWER CHOICE ────────────────────────────────────────────────────────────
//

/// One selectable choice belonging to a question.
///
/// `order` ties the choice to a stable display sequence (A, B, C, D).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub id: AnswerId,
    pub text: String,
    pub is_correct: bool,
    pub order: u32,
}

impl Answer {
    #[must_use]
    pub fn new(id: AnswerId, text: impl Into<String>, is_correct: bool, order: u32) -> Self {
        Self {
            id,
            text: text.into(),
            is_correct,
            order,
        }
    }
}

//
// ─── QUESTION ─────────────────────────────────────────────────────────────────
//

/// A single-choice question with its answer choices.
///
/// Immutable once fetched for a session; `order` is unique within the
/// question set and drives the display sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    id: QuestionId,
    text: String,
    explanation: Option<String>,
    points: u32,
    order: u32,
    quiz_id: Option<QuizId>,
    answers: Vec<Answer>,
}

impl Question {
    /// Builds a question, sorting its choices by display order.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::EmptyText` if the prompt is blank and
    /// `QuestionError::NoAnswers` if no choices are provided.
    pub fn new(
        id: QuestionId,
        text: impl Into<String>,
        explanation: Option<String>,
        points: u32,
        order: u32,
        mut answers: Vec<Answer>,
    ) -> Result<Self, QuestionError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(QuestionError::EmptyText);
        }
        if answers.is_empty() {
            return Err(QuestionError::NoAnswers(id));
        }
        answers.sort_by_key(|answer| answer.order);

        Ok(Self {
            id,
            text,
            explanation,
            points,
            order,
            quiz_id: None,
            answers,
        })
    }

    /// Tags the question with the quiz it was served from.
    #[must_use]
    pub fn with_quiz(mut self, quiz_id: QuizId) -> Self {
        self.quiz_id = Some(quiz_id);
        self
    }

    /// The quiz this question was served from, when the backend reports one.
    #[must_use]
    pub fn quiz_id(&self) -> Option<QuizId> {
        self.quiz_id
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }

    #[must_use]
    pub fn points(&self) -> u32 {
        self.points
    }

    #[must_use]
    pub fn order(&self) -> u32 {
        self.order
    }

    #[must_use]
    pub fn answers(&self) -> &[Answer] {
        &self.answers
    }

    /// Looks up an answer choice by its identifier.
    #[must_use]
    pub fn answer(&self, id: AnswerId) -> Option<&Answer> {
        self.answers.iter().find(|answer| answer.id == id)
    }

    /// The single correct choice, if the question is well formed.
    ///
    /// Returns `None` when zero or more than one choice is flagged correct.
    /// Scoring treats that case as "no correct answer matched": any user
    /// selection is marked incorrect rather than crashing.
    #[must_use]
    pub fn correct_answer(&self) -> Option<&Answer> {
        let mut correct = self.answers.iter().filter(|answer| answer.is_correct);
        let first = correct.next()?;
        if correct.next().is_some() {
            return None;
        }
        Some(first)
    }

    /// Identifier of the single correct choice, if one exists.
    #[must_use]
    pub fn correct_answer_id(&self) -> Option<AnswerId> {
        self.correct_answer().map(|answer| answer.id)
    }

    /// Whether the given selection matches the single correct choice.
    #[must_use]
    pub fn is_correct_selection(&self, selected: AnswerId) -> bool {
        self.correct_answer_id() == Some(selected)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
