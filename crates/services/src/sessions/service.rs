use chrono::{DateTime, Utc};
use std::fmt;

use quiz_core::model::{
    AnswerId, AnswerRecord, CategoryId, DifficultyId, Question, QuestionId, QuizId, SessionId,
};

use super::progress::SessionProgress;
use super::store::{AnswerStore, QuestionPhase};
use crate::error::SessionError;

//
// ─── SUBMITTED ANSWER ─────────────────────────────────────────────────────────
//

/// Outcome of submitting an answer within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmittedAnswer {
    pub record: AnswerRecord,
    pub is_correct: bool,
}

/// What happened when the session advanced past the current question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Moved to the next question.
    Moved,
    /// The last question was passed; the session is now complete.
    Completed,
}

//
// ─── SESSION ──────────────────────────────────────────────────────────────────
//

/// One user's walk through a fixed, ordered question set.
///
/// Holds the question sequence, the cursor, and the answer store. The
/// questions are fixed at creation and never mutated; a restart creates a
/// fresh session rather than resetting this one, so completed records stay
/// immutable for any in-flight save.
pub struct QuizSession {
    id: SessionId,
    category_id: CategoryId,
    difficulty_id: DifficultyId,
    questions: Vec<Question>,
    current: usize,
    store: AnswerStore,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl QuizSession {
    /// Creates a session over the given question set, ordered by each
    /// question's display order.
    ///
    /// `started_at` should come from the services layer clock to keep time
    /// deterministic.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` if no questions are provided.
    pub fn new(
        category_id: CategoryId,
        difficulty_id: DifficultyId,
        mut questions: Vec<Question>,
        started_at: DateTime<Utc>,
    ) -> Result<Self, SessionError> {
        if questions.is_empty() {
            return Err(SessionError::Empty);
        }
        questions.sort_by_key(Question::order);

        Ok(Self {
            id: SessionId::generate(),
            category_id,
            difficulty_id,
            questions,
            current: 0,
            store: AnswerStore::new(),
            started_at,
            completed_at: None,
        })
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn category_id(&self) -> CategoryId {
        self.category_id
    }

    #[must_use]
    pub fn difficulty_id(&self) -> DifficultyId {
        self.difficulty_id
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn store(&self) -> &AnswerStore {
        &self.store
    }

    /// Quiz the question set belongs to, when the backend reports one.
    #[must_use]
    pub fn quiz_id(&self) -> Option<QuizId> {
        self.questions.iter().find_map(Question::quiz_id)
    }

    /// Total number of questions, including any the user never reached.
    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn current_question(&self) -> &Question {
        &self.questions[self.current]
    }

    /// Lifecycle stage of the current question.
    #[must_use]
    pub fn current_phase(&self) -> QuestionPhase {
        self.store.phase(self.current_question().id())
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.completed_at.is_some()
    }

    #[must_use]
    pub fn is_first_question(&self) -> bool {
        self.current == 0
    }

    #[must_use]
    pub fn is_last_question(&self) -> bool {
        self.current + 1 == self.questions.len()
    }

    /// Returns a summary of the current session progress.
    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let total = self.total_questions();
        let answered = self.store.answered_count();
        SessionProgress {
            total,
            answered,
            remaining: total.saturating_sub(answered),
            is_complete: self.is_complete(),
        }
    }

    /// The answer shown for a question when navigating back to it:
    /// the submitted record if present, else the pending selection.
    #[must_use]
    pub fn selection(&self, question_id: QuestionId) -> Option<AnswerId> {
        self.store.selection(question_id)
    }

    /// Selects an answer for the current question.
    ///
    /// Legal only while the question is unanswered or re-selecting; a
    /// submitted question ignores the event and keeps its record. Returns
    /// whether the selection was applied.
    pub fn select_answer(&mut self, answer_id: AnswerId) -> bool {
        if self.is_complete() {
            return false;
        }
        let question_id = self.current_question().id();
        self.store.select(question_id, answer_id)
    }

    /// Submits the pending selection for the current question.
    ///
    /// A duplicate submit returns the existing record unchanged, which
    /// keeps duplicate UI events harmless.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` if the session already finished
    /// and `SessionError::NoSelection` if nothing is selected yet.
    pub fn confirm_answer(&mut self) -> Result<SubmittedAnswer, SessionError> {
        if self.is_complete() {
            return Err(SessionError::Completed);
        }
        let question = &self.questions[self.current];
        let question_id = question.id();

        let record = match self.store.record(question_id) {
            Some(existing) => existing,
            None => self
                .store
                .submit(question_id)
                .ok_or(SessionError::NoSelection)?,
        };

        Ok(SubmittedAnswer {
            record,
            is_correct: question.is_correct_selection(record.answer_id),
        })
    }

    /// Advances past the current question.
    ///
    /// On the last question this completes the session and stamps
    /// `completed_at`; otherwise the cursor moves forward and the next
    /// question's stage is whatever the answer store already holds for it.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotSubmitted` if the current question has no
    /// submitted answer yet, and `SessionError::Completed` after the
    /// session finished.
    pub fn go_to_next(&mut self, now: DateTime<Utc>) -> Result<Advance, SessionError> {
        if self.is_complete() {
            return Err(SessionError::Completed);
        }
        if self.current_phase() != QuestionPhase::Submitted {
            return Err(SessionError::NotSubmitted);
        }

        if self.is_last_question() {
            self.completed_at = Some(now);
            return Ok(Advance::Completed);
        }

        self.current += 1;
        Ok(Advance::Moved)
    }

    /// Steps back to the previous question.
    ///
    /// Always allowed regardless of the current question's stage; no
    /// submission is required to go back.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AtFirstQuestion` when already at index 0.
    pub fn go_to_previous(&mut self) -> Result<(), SessionError> {
        if self.current == 0 {
            return Err(SessionError::AtFirstQuestion);
        }
        self.current -= 1;
        Ok(())
    }

    /// Seconds between session start and completion, zero while active.
    #[must_use]
    pub fn time_taken_seconds(&self) -> u64 {
        let Some(completed_at) = self.completed_at else {
            return 0;
        };
        (completed_at - self.started_at)
            .num_seconds()
            .try_into()
            .unwrap_or(0)
    }
}

impl fmt::Debug for QuizSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizSession")
            .field("id", &self.id)
            .field("category_id", &self.category_id)
            .field("difficulty_id", &self.difficulty_id)
            .field("questions_len", &self.questions.len())
            .field("current", &self.current)
            .field("answered", &self.store.answered_count())
            .field("started_at", &self.started_at)
            .field("completed_at", &self.completed_at)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use quiz_core::model::Answer;
    use quiz_core::time::fixed_now;

    fn build_question(id: u64, order: u32) -> Question {
        // answer (id*10 + 1) is correct, (id*10 + 2) is wrong
        let answers = vec![
            Answer::new(AnswerId::new(id * 10 + 1), "right", true, 0),
            Answer::new(AnswerId::new(id * 10 + 2), "wrong", false, 1),
        ];
        Question::new(QuestionId::new(id), format!("Q{id}"), None, 10, order, answers).unwrap()
    }

    fn build_session(count: u64) -> QuizSession {
        let questions = (1..=count).map(|id| build_question(id, id as u32)).collect();
        QuizSession::new(
            CategoryId::new(1),
            DifficultyId::new(2),
            questions,
            fixed_now(),
        )
        .unwrap()
    }

    #[test]
    fn empty_question_set_is_rejected() {
        let err = QuizSession::new(
            CategoryId::new(1),
            DifficultyId::new(2),
            Vec::new(),
            fixed_now(),
        )
        .unwrap_err();
        assert!(matches!(err, SessionError::Empty));
    }

    #[test]
    fn questions_ordered_by_display_order() {
        let questions = vec![build_question(2, 5), build_question(1, 1)];
        let session = QuizSession::new(
            CategoryId::new(1),
            DifficultyId::new(2),
            questions,
            fixed_now(),
        )
        .unwrap();
        assert_eq!(session.current_question().id(), QuestionId::new(1));
    }

    #[test]
    fn walk_to_completion() {
        let mut session = build_session(2);
        assert_eq!(session.current_phase(), QuestionPhase::Unanswered);

        assert!(session.select_answer(AnswerId::new(11)));
        assert_eq!(session.current_phase(), QuestionPhase::Selected);
        let submitted = session.confirm_answer().unwrap();
        assert!(submitted.is_correct);

        assert_eq!(session.go_to_next(fixed_now()).unwrap(), Advance::Moved);
        session.select_answer(AnswerId::new(22));
        let submitted = session.confirm_answer().unwrap();
        assert!(!submitted.is_correct);

        let at = fixed_now() + Duration::seconds(90);
        assert_eq!(session.go_to_next(at).unwrap(), Advance::Completed);
        assert!(session.is_complete());
        assert_eq!(session.completed_at(), Some(at));
        assert_eq!(session.time_taken_seconds(), 90);
    }

    #[test]
    fn next_requires_submission() {
        let mut session = build_session(2);
        assert!(matches!(
            session.go_to_next(fixed_now()),
            Err(SessionError::NotSubmitted)
        ));

        session.select_answer(AnswerId::new(11));
        assert!(matches!(
            session.go_to_next(fixed_now()),
            Err(SessionError::NotSubmitted)
        ));
    }

    #[test]
    fn confirm_requires_selection() {
        let mut session = build_session(1);
        assert!(matches!(
            session.confirm_answer(),
            Err(SessionError::NoSelection)
        ));
    }

    #[test]
    fn duplicate_confirm_returns_same_record() {
        let mut session = build_session(1);
        session.select_answer(AnswerId::new(12));
        let first = session.confirm_answer().unwrap();
        let second = session.confirm_answer().unwrap();

        assert_eq!(first, second);
        assert_eq!(session.store().answered_count(), 1);
    }

    #[test]
    fn select_after_submit_keeps_the_record() {
        let mut session = build_session(1);
        session.select_answer(AnswerId::new(11));
        session.confirm_answer().unwrap();

        assert!(!session.select_answer(AnswerId::new(12)));
        assert_eq!(
            session.selection(QuestionId::new(1)),
            Some(AnswerId::new(11))
        );
    }

    #[test]
    fn back_navigation_redisplays_submitted_selection() {
        let mut session = build_session(3);
        session.select_answer(AnswerId::new(11));
        session.confirm_answer().unwrap();
        session.go_to_next(fixed_now()).unwrap();
        session.select_answer(AnswerId::new(22));
        session.confirm_answer().unwrap();
        session.go_to_next(fixed_now()).unwrap();

        session.go_to_previous().unwrap();
        session.go_to_previous().unwrap();
        assert_eq!(session.current_index(), 0);
        assert_eq!(session.current_phase(), QuestionPhase::Submitted);
        assert_eq!(
            session.selection(QuestionId::new(1)),
            Some(AnswerId::new(11))
        );
    }

    #[test]
    fn previous_from_first_question_fails() {
        let mut session = build_session(2);
        assert!(matches!(
            session.go_to_previous(),
            Err(SessionError::AtFirstQuestion)
        ));
    }

    #[test]
    fn forward_navigation_restores_submitted_stage() {
        let mut session = build_session(2);
        session.select_answer(AnswerId::new(11));
        session.confirm_answer().unwrap();
        session.go_to_next(fixed_now()).unwrap();
        session.select_answer(AnswerId::new(21));
        session.confirm_answer().unwrap();

        session.go_to_previous().unwrap();
        // moving forward over an already-answered question needs no re-prompt
        assert_eq!(session.go_to_next(fixed_now()).unwrap(), Advance::Moved);
        assert_eq!(session.current_phase(), QuestionPhase::Submitted);
    }

    #[test]
    fn progress_reports_counts() {
        let mut session = build_session(3);
        session.select_answer(AnswerId::new(11));
        session.confirm_answer().unwrap();

        let progress = session.progress();
        assert_eq!(progress.total, 3);
        assert_eq!(progress.answered, 1);
        assert_eq!(progress.remaining, 2);
        assert!(!progress.is_complete);
    }
}
