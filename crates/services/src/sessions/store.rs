use std::collections::HashMap;

use quiz_core::model::{AnswerId, AnswerRecord, QuestionId};

/// Per-question lifecycle stage inside an active session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionPhase {
    Unanswered,
    Selected,
    Submitted,
}

/// Tracks the user's current selections and the durable record of
/// submitted answers for the active session.
///
/// Selections are mutable until submission; a submitted question is locked
/// for the remainder of the session. No I/O happens here.
#[derive(Debug, Default, Clone)]
pub struct AnswerStore {
    pending: HashMap<QuestionId, AnswerId>,
    submitted: HashMap<QuestionId, AnswerRecord>,
}

impl AnswerStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the pending selection for a question.
    ///
    /// Returns `false` without changing anything if the question was
    /// already submitted; selection is locked after submission.
    pub fn select(&mut self, question_id: QuestionId, answer_id: AnswerId) -> bool {
        if self.submitted.contains_key(&question_id) {
            return false;
        }
        self.pending.insert(question_id, answer_id);
        true
    }

    /// Moves the pending selection into the permanent record map.
    ///
    /// Duplicate submits and submits without a pending selection are
    /// idempotent no-ops so duplicate UI events stay harmless. Returns the
    /// record in effect after the call, if any.
    pub fn submit(&mut self, question_id: QuestionId) -> Option<AnswerRecord> {
        if let Some(record) = self.submitted.get(&question_id) {
            return Some(*record);
        }
        let answer_id = self.pending.remove(&question_id)?;
        let record = AnswerRecord::new(question_id, answer_id);
        self.submitted.insert(question_id, record);
        Some(record)
    }

    /// The answer currently associated with a question: the submitted
    /// record if present, else the pending selection.
    #[must_use]
    pub fn selection(&self, question_id: QuestionId) -> Option<AnswerId> {
        self.submitted
            .get(&question_id)
            .map(|record| record.answer_id)
            .or_else(|| self.pending.get(&question_id).copied())
    }

    /// The submitted record for a question, if it exists.
    #[must_use]
    pub fn record(&self, question_id: QuestionId) -> Option<AnswerRecord> {
        self.submitted.get(&question_id).copied()
    }

    #[must_use]
    pub fn is_answered(&self, question_id: QuestionId) -> bool {
        self.submitted.contains_key(&question_id)
    }

    /// Number of questions with a submitted answer.
    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.submitted.len()
    }

    /// The lifecycle stage of a question as this store sees it.
    #[must_use]
    pub fn phase(&self, question_id: QuestionId) -> QuestionPhase {
        if self.submitted.contains_key(&question_id) {
            QuestionPhase::Submitted
        } else if self.pending.contains_key(&question_id) {
            QuestionPhase::Selected
        } else {
            QuestionPhase::Unanswered
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn q(id: u64) -> QuestionId {
        QuestionId::new(id)
    }

    fn a(id: u64) -> AnswerId {
        AnswerId::new(id)
    }

    #[test]
    fn select_then_submit_records_the_answer() {
        let mut store = AnswerStore::new();
        assert!(store.select(q(1), a(10)));
        assert_eq!(store.phase(q(1)), QuestionPhase::Selected);

        let record = store.submit(q(1)).unwrap();
        assert_eq!(record.answer_id, a(10));
        assert!(store.is_answered(q(1)));
        assert_eq!(store.phase(q(1)), QuestionPhase::Submitted);
    }

    #[test]
    fn reselection_allowed_before_submission() {
        let mut store = AnswerStore::new();
        store.select(q(1), a(10));
        store.select(q(1), a(11));
        assert_eq!(store.selection(q(1)), Some(a(11)));
    }

    #[test]
    fn selection_locked_after_submission() {
        let mut store = AnswerStore::new();
        store.select(q(1), a(10));
        store.submit(q(1));

        assert!(!store.select(q(1), a(11)));
        assert_eq!(store.selection(q(1)), Some(a(10)));
        assert_eq!(store.record(q(1)).unwrap().answer_id, a(10));
    }

    #[test]
    fn duplicate_submit_is_idempotent() {
        let mut store = AnswerStore::new();
        store.select(q(1), a(10));
        let first = store.submit(q(1)).unwrap();
        let second = store.submit(q(1)).unwrap();

        assert_eq!(first, second);
        assert_eq!(store.answered_count(), 1);
    }

    #[test]
    fn submit_without_selection_is_a_silent_no_op() {
        let mut store = AnswerStore::new();
        assert!(store.submit(q(1)).is_none());
        assert!(!store.is_answered(q(1)));
        assert_eq!(store.phase(q(1)), QuestionPhase::Unanswered);
    }

    #[test]
    fn selection_prefers_submitted_record() {
        let mut store = AnswerStore::new();
        store.select(q(1), a(10));
        store.submit(q(1));
        // a stray late select is rejected, record stays authoritative
        store.select(q(1), a(99));
        assert_eq!(store.selection(q(1)), Some(a(10)));
    }
}
