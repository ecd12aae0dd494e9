use serde::{Deserialize, Serialize};

use crate::model::ids::{AnswerId, QuestionId};

/// Durable binding of a question to the answer the user submitted.
///
/// One record exists per submitted question; once a question's submission
/// is finalized the record never changes for the rest of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub question_id: QuestionId,
    pub answer_id: AnswerId,
}

impl AnswerRecord {
    #[must_use]
    pub fn new(question_id: QuestionId, answer_id: AnswerId) -> Self {
        Self {
            question_id,
            answer_id,
        }
    }
}
