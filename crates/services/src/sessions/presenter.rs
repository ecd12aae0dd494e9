//! Pure transformation of a finished (or force-completed) session into a
//! scored breakdown. Deterministic and free of side effects, so it is safe
//! to call both for display and for the save pathway.

use quiz_core::model::{Question, QuestionOutcome, QuizResult};

use super::store::AnswerStore;

/// Scores every question against the answer store.
///
/// A question without a submitted record scores incorrect with no selected
/// answer; zero or multiple correct choices on a question also score
/// incorrect rather than crashing.
#[must_use]
pub fn score_questions(questions: &[Question], store: &AnswerStore) -> Vec<QuestionOutcome> {
    questions
        .iter()
        .map(|question| {
            let record = store.record(question.id());
            let is_correct = record
                .map(|record| question.is_correct_selection(record.answer_id))
                .unwrap_or(false);
            QuestionOutcome {
                question_id: question.id(),
                selected_answer_id: record.map(|record| record.answer_id),
                is_correct,
            }
        })
        .collect()
}

/// Builds the full quiz result for a question set.
///
/// `total_questions` always counts the whole set, including questions the
/// user never reached.
#[must_use]
pub fn build_result(
    questions: &[Question],
    store: &AnswerStore,
    time_taken_seconds: u64,
) -> QuizResult {
    let per_question = score_questions(questions, store);
    let correct_answers = per_question.iter().filter(|o| o.is_correct).count() as u32;
    let total_questions = questions.len() as u32;

    QuizResult {
        total_questions,
        correct_answers,
        score_percent: QuizResult::percent(correct_answers, total_questions),
        time_taken_seconds,
        per_question,
    }
}

/// Points earned across correctly answered questions, plus the maximum
/// the set was worth. This is what the backend stores as `score` and
/// `total_possible`.
#[must_use]
pub fn points_earned(questions: &[Question], per_question: &[QuestionOutcome]) -> (u32, u32) {
    let mut earned = 0_u32;
    let mut possible = 0_u32;
    for question in questions {
        possible = possible.saturating_add(question.points());
        let correct = per_question
            .iter()
            .any(|o| o.question_id == question.id() && o.is_correct);
        if correct {
            earned = earned.saturating_add(question.points());
        }
    }
    (earned, possible)
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{Answer, AnswerId, QuestionId};

    fn build_question(id: u64, points: u32) -> Question {
        let answers = vec![
            Answer::new(AnswerId::new(id * 10 + 1), "right", true, 0),
            Answer::new(AnswerId::new(id * 10 + 2), "wrong", false, 1),
        ];
        Question::new(QuestionId::new(id), format!("Q{id}"), None, points, id as u32, answers)
            .unwrap()
    }

    fn three_question_fixture() -> (Vec<Question>, AnswerStore) {
        let questions = vec![
            build_question(1, 10),
            build_question(2, 10),
            build_question(3, 20),
        ];
        let mut store = AnswerStore::new();
        // Q1 correct, Q2 wrong, Q3 never answered
        store.select(QuestionId::new(1), AnswerId::new(11));
        store.submit(QuestionId::new(1));
        store.select(QuestionId::new(2), AnswerId::new(22));
        store.submit(QuestionId::new(2));
        (questions, store)
    }

    #[test]
    fn scores_one_of_three_with_missing_record() {
        let (questions, store) = three_question_fixture();
        let result = build_result(&questions, &store, 120);

        assert_eq!(result.total_questions, 3);
        assert_eq!(result.correct_answers, 1);
        assert_eq!(result.score_percent, 33);
        assert_eq!(result.time_taken_seconds, 120);

        let unanswered = &result.per_question[2];
        assert_eq!(unanswered.question_id, QuestionId::new(3));
        assert_eq!(unanswered.selected_answer_id, None);
        assert!(!unanswered.is_correct);
    }

    #[test]
    fn presenter_is_deterministic() {
        let (questions, store) = three_question_fixture();
        let first = build_result(&questions, &store, 120);
        let second = build_result(&questions, &store, 120);
        assert_eq!(first, second);
    }

    #[test]
    fn malformed_question_scores_incorrect() {
        let answers = vec![
            Answer::new(AnswerId::new(1), "a", true, 0),
            Answer::new(AnswerId::new(2), "b", true, 1),
        ];
        let question =
            Question::new(QuestionId::new(1), "Q", None, 10, 0, answers).unwrap();
        let mut store = AnswerStore::new();
        store.select(QuestionId::new(1), AnswerId::new(1));
        store.submit(QuestionId::new(1));

        let result = build_result(&[question], &store, 0);
        assert_eq!(result.correct_answers, 0);
    }

    #[test]
    fn points_follow_correct_answers() {
        let (questions, store) = three_question_fixture();
        let result = build_result(&questions, &store, 0);
        let (earned, possible) = points_earned(&questions, &result.per_question);
        assert_eq!(earned, 10);
        assert_eq!(possible, 40);
    }
}
