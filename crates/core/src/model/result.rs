use serde::{Deserialize, Serialize};

use crate::model::ids::{AnswerId, QuestionId};

//
// ─── PER-QUESTION OUTCOME ─────────────────────────────────────────────────────
//

/// Scored outcome for one question of a completed session.
///
/// `selected_answer_id` is `None` when the user never submitted an answer
/// for the question; such questions always score incorrect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOutcome {
    pub question_id: QuestionId,
    pub selected_answer_id: Option<AnswerId>,
    pub is_correct: bool,
}

//
// ─── QUIZ RESULT ──────────────────────────────────────────────────────────────
//

/// Scored breakdown of a completed quiz session.
///
/// Computed, not stored client-side beyond display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizResult {
    pub total_questions: u32,
    pub correct_answers: u32,
    pub score_percent: u32,
    pub time_taken_seconds: u64,
    pub per_question: Vec<QuestionOutcome>,
}

impl QuizResult {
    /// Percentage of questions answered correctly, rounded half-up.
    ///
    /// An empty question set scores zero rather than dividing by zero.
    #[must_use]
    pub fn percent(correct: u32, total: u32) -> u32 {
        if total == 0 {
            return 0;
        }
        // round-half-up without floating point: (200c + t) / 2t
        let numerator = u64::from(correct) * 200 + u64::from(total);
        let percent = numerator / (u64::from(total) * 2);
        u32::try_from(percent).unwrap_or(u32::MAX)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_rounds_half_up() {
        assert_eq!(QuizResult::percent(1, 3), 33); // 33.33 -> 33
        assert_eq!(QuizResult::percent(2, 3), 67); // 66.67 -> 67
        assert_eq!(QuizResult::percent(1, 2), 50);
        assert_eq!(QuizResult::percent(1, 8), 13); // 12.5 rounds up
        assert_eq!(QuizResult::percent(3, 4), 75);
    }

    #[test]
    fn percent_full_and_empty() {
        assert_eq!(QuizResult::percent(5, 5), 100);
        assert_eq!(QuizResult::percent(0, 5), 0);
        assert_eq!(QuizResult::percent(0, 0), 0);
    }
}
