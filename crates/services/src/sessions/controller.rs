use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, warn};

use quiz_core::Clock;
use quiz_core::model::{AnswerId, CategoryId, DifficultyId, Question, QuizResult};

use super::presenter;
use super::progress::SessionProgress;
use super::service::{Advance, QuizSession, SubmittedAnswer};
use crate::auth::{AuthSession, AuthSubscription};
use crate::client::{QuestionSource, ResultSink, ResultSubmission, SavedResult};
use crate::error::{FetchError, SaveError, SessionError};

/// Default number of questions requested per session.
pub const DEFAULT_QUESTION_LIMIT: u32 = 10;

//
// ─── PHASES ───────────────────────────────────────────────────────────────────
//

/// Observable phase of the session controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No question set loaded.
    Idle,
    /// A question-set fetch is in flight.
    Loading,
    /// Questions loaded, the user is walking through them.
    Active,
    /// The category/difficulty pair has no questions. Terminal, not an error.
    Empty,
    /// The fetch failed; an explicit retry re-enters Loading.
    Errored,
    /// The session finished and its result is available.
    Completed,
}

/// Where the automatic result save currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStatus {
    /// Completion has not produced a save attempt.
    NotAttempted,
    /// Save was skipped (signed out, or the question set carried no quiz id).
    Skipped,
    /// A save request is in flight.
    Saving,
    /// The backend stored the result.
    Saved,
    /// The save failed; the result screen renders regardless.
    Failed,
}

enum Phase {
    Idle,
    Loading,
    Active(QuizSession),
    Empty,
    Errored {
        category: CategoryId,
        difficulty: DifficultyId,
        error: FetchError,
    },
    Completed(CompletedSession),
}

struct CompletedSession {
    session: QuizSession,
    result: QuizResult,
    save: SaveState,
}

enum SaveState {
    NotAttempted,
    Skipped,
    Saving,
    Saved(SavedResult),
    Failed(SaveError),
}

impl SaveState {
    fn status(&self) -> SaveStatus {
        match self {
            SaveState::NotAttempted => SaveStatus::NotAttempted,
            SaveState::Skipped => SaveStatus::Skipped,
            SaveState::Saving => SaveStatus::Saving,
            SaveState::Saved(_) => SaveStatus::Saved,
            SaveState::Failed(_) => SaveStatus::Failed,
        }
    }
}

struct ControllerState {
    /// Bumped on every (re)start; async continuations compare it to drop
    /// responses issued against a superseded session.
    epoch: u64,
    phase: Phase,
}

//
// ─── CONTROLLER ───────────────────────────────────────────────────────────────
//

/// Drives the ordered walk through a question set: loads questions, gates
/// navigation on submission, detects completion, computes the result, and
/// persists it exactly once when the user is signed in.
///
/// Methods take `&self`; the UI shell holds an `Arc` and calls in from
/// event handlers. The internal lock is never held across an await.
pub struct QuizSessionController {
    clock: Clock,
    questions: Arc<dyn QuestionSource>,
    results: Arc<dyn ResultSink>,
    question_limit: u32,
    authenticated: Arc<AtomicBool>,
    inner: Mutex<ControllerState>,
    _auth_subscription: AuthSubscription,
}

impl QuizSessionController {
    #[must_use]
    pub fn new(
        clock: Clock,
        questions: Arc<dyn QuestionSource>,
        results: Arc<dyn ResultSink>,
        auth: &dyn AuthSession,
    ) -> Self {
        let authenticated = Arc::new(AtomicBool::new(auth.is_authenticated()));
        let flag = Arc::clone(&authenticated);
        // A logout flips the flag and thereby suppresses any save that has
        // not been issued yet; computed results are never discarded.
        let subscription = auth.subscribe(Box::new(move |signed_in| {
            flag.store(signed_in, Ordering::SeqCst);
        }));

        Self {
            clock,
            questions,
            results,
            question_limit: DEFAULT_QUESTION_LIMIT,
            authenticated,
            inner: Mutex::new(ControllerState {
                epoch: 0,
                phase: Phase::Idle,
            }),
            _auth_subscription: subscription,
        }
    }

    #[must_use]
    pub fn with_question_limit(mut self, limit: u32) -> Self {
        self.question_limit = limit;
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ControllerState> {
        self.inner.lock().expect("controller state poisoned")
    }

    //
    // ─── OBSERVERS ────────────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        phase_of(&self.lock().phase)
    }

    /// The question currently shown, while a session is active.
    #[must_use]
    pub fn current_question(&self) -> Option<Question> {
        match &self.lock().phase {
            Phase::Active(session) => Some(session.current_question().clone()),
            _ => None,
        }
    }

    /// The selection shown for the current question, submitted or pending.
    #[must_use]
    pub fn current_selection(&self) -> Option<AnswerId> {
        match &self.lock().phase {
            Phase::Active(session) => session.selection(session.current_question().id()),
            _ => None,
        }
    }

    #[must_use]
    pub fn progress(&self) -> Option<SessionProgress> {
        match &self.lock().phase {
            Phase::Active(session) => Some(session.progress()),
            Phase::Completed(completed) => Some(completed.session.progress()),
            _ => None,
        }
    }

    /// The computed result, available from completion onward even when the
    /// save failed or was suppressed.
    #[must_use]
    pub fn result(&self) -> Option<QuizResult> {
        match &self.lock().phase {
            Phase::Completed(completed) => Some(completed.result.clone()),
            _ => None,
        }
    }

    #[must_use]
    pub fn save_status(&self) -> Option<SaveStatus> {
        match &self.lock().phase {
            Phase::Completed(completed) => Some(completed.save.status()),
            _ => None,
        }
    }

    /// Human-readable description of the last fetch failure.
    #[must_use]
    pub fn fetch_error(&self) -> Option<String> {
        match &self.lock().phase {
            Phase::Errored { error, .. } => Some(error.to_string()),
            _ => None,
        }
    }

    //
    // ─── SESSION START ────────────────────────────────────────────────────────
    //

    /// Starts a session for the category/difficulty pair.
    ///
    /// Enters `Loading`, fetches the question set, and lands in `Active`,
    /// `Empty`, or `Errored`. Any in-flight operation from an earlier
    /// session is superseded.
    ///
    /// # Errors
    ///
    /// Infallible at the API level today; failures surface as the
    /// `Errored` phase so the UI can offer a retry.
    pub async fn start(
        &self,
        category: CategoryId,
        difficulty: DifficultyId,
    ) -> Result<SessionPhase, SessionError> {
        let epoch = {
            let mut state = self.lock();
            state.epoch += 1;
            state.phase = Phase::Loading;
            state.epoch
        };

        let outcome = self
            .questions
            .fetch_questions(category, difficulty, self.question_limit)
            .await;

        let mut state = self.lock();
        if state.epoch != epoch {
            debug!(%category, %difficulty, "discarding stale question fetch");
            return Ok(phase_of(&state.phase));
        }

        state.phase = match outcome {
            Ok(questions) => {
                match QuizSession::new(category, difficulty, questions, self.clock.now()) {
                    Ok(session) => {
                        debug!(session = %session.id(), total = session.total_questions(), "session active");
                        Phase::Active(session)
                    }
                    Err(SessionError::Empty) => Phase::Empty,
                    Err(error) => return Err(error),
                }
            }
            Err(error) if error.is_empty_result() => Phase::Empty,
            Err(error) => {
                warn!(%category, %difficulty, %error, "question fetch failed");
                Phase::Errored {
                    category,
                    difficulty,
                    error,
                }
            }
        };
        Ok(phase_of(&state.phase))
    }

    /// Re-attempts the fetch after a transport failure.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NothingToRetry` unless the controller is in
    /// the `Errored` phase.
    pub async fn retry(&self) -> Result<SessionPhase, SessionError> {
        let (category, difficulty) = match &self.lock().phase {
            Phase::Errored {
                category,
                difficulty,
                ..
            } => (*category, *difficulty),
            _ => return Err(SessionError::NothingToRetry),
        };
        self.start(category, difficulty).await
    }

    /// Discards the session and returns to `Idle`.
    ///
    /// A fresh session state is created on the next start; responses still
    /// in flight for the old session are dropped by the epoch guard.
    pub fn restart(&self) {
        let mut state = self.lock();
        state.epoch += 1;
        state.phase = Phase::Idle;
    }

    //
    // ─── NAVIGATION ───────────────────────────────────────────────────────────
    //

    /// Selects an answer for the current question. Ignored once the
    /// question is submitted; returns whether the selection was applied.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotActive` outside the active phase.
    pub fn select_answer(&self, answer_id: AnswerId) -> Result<bool, SessionError> {
        match &mut self.lock().phase {
            Phase::Active(session) => Ok(session.select_answer(answer_id)),
            Phase::Completed(_) => Err(SessionError::Completed),
            _ => Err(SessionError::NotActive),
        }
    }

    /// Submits the pending selection for the current question.
    ///
    /// # Errors
    ///
    /// `SessionError::NoSelection` if nothing is selected,
    /// `SessionError::NotActive` outside the active phase.
    pub fn confirm_answer(&self) -> Result<SubmittedAnswer, SessionError> {
        match &mut self.lock().phase {
            Phase::Active(session) => session.confirm_answer(),
            Phase::Completed(_) => Err(SessionError::Completed),
            _ => Err(SessionError::NotActive),
        }
    }

    /// Steps back to the previous question; allowed regardless of the
    /// current question's stage.
    ///
    /// # Errors
    ///
    /// `SessionError::AtFirstQuestion` at index 0,
    /// `SessionError::NotActive` outside the active phase.
    pub fn go_to_previous(&self) -> Result<(), SessionError> {
        match &mut self.lock().phase {
            Phase::Active(session) => session.go_to_previous(),
            Phase::Completed(_) => Err(SessionError::Completed),
            _ => Err(SessionError::NotActive),
        }
    }

    /// Advances past the current question; on the last question this
    /// completes the session, computes the result, and triggers the
    /// at-most-one automatic save.
    ///
    /// A duplicate call after completion is a tolerated no-op so double
    /// "next" events cannot double-save.
    ///
    /// # Errors
    ///
    /// `SessionError::NotSubmitted` when the current question was not
    /// submitted, `SessionError::NotActive` outside a session.
    pub async fn go_to_next(&self) -> Result<SessionPhase, SessionError> {
        let (epoch, submission) = {
            let mut state = self.lock();
            let epoch = state.epoch;
            let advance = match &mut state.phase {
                Phase::Completed(_) => return Ok(SessionPhase::Completed),
                Phase::Active(session) => session.go_to_next(self.clock.now())?,
                _ => return Err(SessionError::NotActive),
            };
            if advance == Advance::Moved {
                return Ok(SessionPhase::Active);
            }

            let mut completed = complete(take_session(&mut state.phase));
            let submission = self.prepare_save(&completed);
            completed.save = if submission.is_some() {
                SaveState::Saving
            } else {
                SaveState::Skipped
            };
            state.phase = Phase::Completed(completed);
            (epoch, submission)
        };

        if let Some(submission) = submission {
            self.run_save(epoch, submission).await;
        }
        Ok(SessionPhase::Completed)
    }

    /// Re-attempts a failed result save from the completed phase.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NothingToRetry` unless a previous save
    /// failed and the user is still signed in.
    pub async fn retry_save(&self) -> Result<SessionPhase, SessionError> {
        let (epoch, submission) = {
            let mut state = self.lock();
            let epoch = state.epoch;
            let Phase::Completed(completed) = &mut state.phase else {
                return Err(SessionError::NothingToRetry);
            };
            if !matches!(completed.save, SaveState::Failed(_)) {
                return Err(SessionError::NothingToRetry);
            }
            let Some(submission) = self.prepare_save(completed) else {
                return Err(SessionError::NothingToRetry);
            };
            completed.save = SaveState::Saving;
            (epoch, submission)
        };

        self.run_save(epoch, submission).await;
        Ok(SessionPhase::Completed)
    }

    //
    // ─── SAVE PATHWAY ─────────────────────────────────────────────────────────
    //

    /// Builds the save payload if a save should be attempted at all.
    ///
    /// Evaluated synchronously while holding the lock, so the decision and
    /// the flag flip close the duplicate-event race window together.
    fn prepare_save(&self, completed: &CompletedSession) -> Option<ResultSubmission> {
        if !self.authenticated.load(Ordering::SeqCst) {
            debug!("signed out at completion, result save suppressed");
            return None;
        }
        let Some(quiz_id) = completed.session.quiz_id() else {
            debug!("question set carries no quiz id, result save skipped");
            return None;
        };

        let questions = completed.session.questions();
        let (score, total_possible) =
            presenter::points_earned(questions, &completed.result.per_question);
        let percentage = if total_possible == 0 {
            0.0
        } else {
            f64::from(score) / f64::from(total_possible) * 100.0
        };

        Some(ResultSubmission {
            quiz_id,
            score,
            total_possible,
            percentage,
            time_taken_seconds: completed.session.time_taken_seconds(),
        })
    }

    async fn run_save(&self, epoch: u64, submission: ResultSubmission) {
        let outcome = self.results.save_result(&submission).await;

        let mut state = self.lock();
        if state.epoch != epoch {
            debug!("discarding stale result-save response");
            return;
        }
        let Phase::Completed(completed) = &mut state.phase else {
            return;
        };

        completed.save = match outcome {
            Ok(saved) => {
                debug!(id = saved.id, "quiz result saved");
                SaveState::Saved(saved)
            }
            Err(error) if error.is_unauthorized() => {
                // viewing an unsaved score is still valid, stay quiet
                debug!("result save rejected as unauthorized");
                SaveState::Skipped
            }
            Err(error) => {
                warn!(%error, "quiz result save failed, result still shown");
                SaveState::Failed(error)
            }
        };
    }
}

fn phase_of(phase: &Phase) -> SessionPhase {
    match phase {
        Phase::Idle => SessionPhase::Idle,
        Phase::Loading => SessionPhase::Loading,
        Phase::Active(_) => SessionPhase::Active,
        Phase::Empty => SessionPhase::Empty,
        Phase::Errored { .. } => SessionPhase::Errored,
        Phase::Completed(_) => SessionPhase::Completed,
    }
}

/// Replaces an active phase with `Idle` and hands the session out.
///
/// Only called on the `Active` arm; the placeholder is overwritten by the
/// caller in the same critical section.
fn take_session(phase: &mut Phase) -> QuizSession {
    match std::mem::replace(phase, Phase::Idle) {
        Phase::Active(session) => session,
        _ => unreachable!("take_session outside the active phase"),
    }
}

fn complete(session: QuizSession) -> CompletedSession {
    let result = presenter::build_result(
        session.questions(),
        session.store(),
        session.time_taken_seconds(),
    );
    CompletedSession {
        session,
        result,
        save: SaveState::NotAttempted,
    }
}
