//! The session state machine.
//!
//! One session owns one user's ledger for its lifetime and drives questions
//! through present -> submit -> grade -> advance. Rounds regenerate
//! automatically when the batch is exhausted; persistence follows a
//! configurable cadence with forced writes at round boundaries and resets.
//!
//! Gateway write failures never roll back the in-memory ledger: local
//! progress keeps advancing and the failure surfaces as a notice
//! (at-least-once-local, best-effort-remote).

use crate::batch::{self, BatchPlan};
use crate::error::{BatchError, GatewayError, SessionError};
use crate::gateway::{PersistenceGateway, ProgressRecord, RowHandle};
use crate::grading;
use crate::ledger::{Ledger, ProgressStats};
use crate::types::{Question, QuestionId, QuizMode, Submission, TypeFilter};
use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use std::sync::Arc;

/// When the ledger is written back to the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePolicy {
    /// Write after every graded answer.
    EveryAnswer,
    /// Write every Nth answer, and only if the ledger changed since the
    /// last successful write.
    EveryNth(u32),
}

#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    pub batch_size: usize,
    pub error_batch_size: usize,
    pub write_policy: WritePolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            error_batch_size: 100,
            write_policy: WritePolicy::EveryAnswer,
        }
    }
}

/// How a freshly generated round came to be.
#[derive(Debug, Clone)]
pub struct RoundStart {
    pub mode: QuizMode,
    pub size: usize,
    pub from_missed: usize,
    pub from_review: usize,
    pub from_unseen: usize,
    /// An error-drill round was requested but nothing was left to drill.
    pub fell_back_to_normal: bool,
    /// A boundary write failed; local state is intact.
    pub save_error: Option<String>,
}

/// Result of starting a session: whether the user is new, whether loading
/// fell back to an empty ledger, and the initial round.
#[derive(Debug, Clone)]
pub struct StartReport {
    pub new_user: bool,
    pub load_warning: Option<String>,
    pub round: RoundStart,
}

/// Outcome of one graded submission.
#[derive(Debug, Clone)]
pub struct Graded {
    pub question_id: QuestionId,
    pub is_correct: bool,
    pub correct_options: Vec<String>,
    pub explanation: Option<String>,
    pub save_error: Option<String>,
}

/// Outcome of advancing past an answered question.
#[derive(Debug, Clone)]
pub enum Advance {
    /// Moved to the next unanswered question.
    Next,
    /// The batch is exhausted; the next round has already been generated.
    RoundComplete(RoundStart),
}

/// One entry of the review list ("wrong-answer book").
#[derive(Debug, Clone)]
pub struct ReviewEntry<'a> {
    pub question: &'a Question,
    pub miss_count: u32,
    pub last_wrong: Option<&'a Submission>,
    /// The question has since been mastered but its history is kept until
    /// cleared.
    pub corrected: bool,
}

#[derive(Debug, Default)]
struct Round {
    batch: Vec<Question>,
    cursor: usize,
    submitted: HashMap<QuestionId, Submission>,
}

impl Round {
    fn from_plan(plan: &BatchPlan) -> Self {
        Self {
            batch: plan.questions.clone(),
            cursor: 0,
            submitted: HashMap::new(),
        }
    }

    fn current(&self) -> Option<&Question> {
        self.batch.get(self.cursor)
    }

    fn is_finished(&self) -> bool {
        self.cursor >= self.batch.len()
    }
}

/// A logged-in user's quiz session.
pub struct Session<G: PersistenceGateway> {
    user_id: String,
    questions: Arc<[Question]>,
    ledger: Ledger,
    last_saved: Ledger,
    answers_since_save: u32,
    round: Round,
    mode: QuizMode,
    filter: TypeFilter,
    config: SessionConfig,
    gateway: G,
    row: Option<RowHandle>,
    rng: StdRng,
}

impl<G: PersistenceGateway> Session<G> {
    /// Log a user in: locate and load their progress row, then generate the
    /// initial round.
    ///
    /// A gateway failure or an undecodable row falls back to an empty ledger
    /// with a warning in the report; only a blank user id is an error here.
    pub fn start(
        user_id: &str,
        questions: Arc<[Question]>,
        gateway: G,
        config: SessionConfig,
    ) -> Result<(Self, StartReport), SessionError> {
        Self::start_with_rng(user_id, questions, gateway, config, StdRng::from_entropy())
    }

    /// Like [`Session::start`], with deterministic round generation.
    pub fn start_seeded(
        user_id: &str,
        questions: Arc<[Question]>,
        gateway: G,
        config: SessionConfig,
        seed: u64,
    ) -> Result<(Self, StartReport), SessionError> {
        Self::start_with_rng(user_id, questions, gateway, config, StdRng::seed_from_u64(seed))
    }

    fn start_with_rng(
        user_id: &str,
        questions: Arc<[Question]>,
        mut gateway: G,
        config: SessionConfig,
        rng: StdRng,
    ) -> Result<(Self, StartReport), SessionError> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(SessionError::EmptyUserId);
        }

        let mut ledger = Ledger::new();
        let mut row = None;
        let mut new_user = false;
        let mut load_warning = None;

        match gateway.find(user_id) {
            Ok(Some(handle)) => match gateway.read(&handle) {
                Ok(record) => {
                    ledger = record.ledger;
                    row = Some(handle);
                }
                Err(e) => {
                    // keep the handle so the next write repairs the row
                    row = Some(handle);
                    load_warning = Some(format!("progress row unreadable, starting empty: {e}"));
                }
            },
            Ok(None) => new_user = true,
            Err(e) => {
                load_warning = Some(format!("progress could not be loaded, starting empty: {e}"));
            }
        }

        let mut session = Self {
            user_id: user_id.to_string(),
            questions,
            last_saved: ledger.clone(),
            ledger,
            answers_since_save: 0,
            round: Round::default(),
            mode: QuizMode::Normal,
            filter: TypeFilter::All,
            config,
            gateway,
            row,
            rng,
        };
        let round = session.next_round(false);

        Ok((
            session,
            StartReport {
                new_user,
                load_warning,
                round,
            },
        ))
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn mode(&self) -> QuizMode {
        self.mode
    }

    pub fn type_filter(&self) -> TypeFilter {
        self.filter
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// The question currently being served, if the round is not finished.
    pub fn current_question(&self) -> Option<&Question> {
        self.round.current()
    }

    /// True when the cursor has reached the end of the batch. An empty batch
    /// (nothing matched the filter) counts as finished, not as an error.
    pub fn is_round_finished(&self) -> bool {
        self.round.is_finished()
    }

    /// (cursor, batch length) for progress display.
    pub fn progress(&self) -> (usize, usize) {
        (self.round.cursor, self.round.batch.len())
    }

    pub fn submitted_for(&self, id: QuestionId) -> Option<&Submission> {
        self.round.submitted.get(&id)
    }

    pub fn stats(&self) -> ProgressStats {
        self.ledger.stats(self.questions.len())
    }

    /// Grade a submission for the current question and apply the result.
    ///
    /// The ledger mutation and (policy-permitting) the write complete before
    /// control returns, so the cursor can never move past an ungraded answer.
    pub fn submit_answer(&mut self, submitted: Submission) -> Result<Graded, SessionError> {
        let question = self.round.current().ok_or(SessionError::NoActiveQuestion)?;
        let id = question.id;
        if self.round.submitted.contains_key(&id) {
            return Err(SessionError::AlreadyAnswered(id));
        }

        let is_correct = grading::grade(question, &submitted)?;
        let correct_options = grading::correct_option_texts(question);
        let explanation = question.explanation.clone();

        self.round.submitted.insert(id, submitted.clone());
        self.ledger.apply_result(id, submitted, is_correct);
        let save_error = self.save_per_policy();

        Ok(Graded {
            question_id: id,
            is_correct,
            correct_options,
            explanation,
            save_error,
        })
    }

    /// Move past an answered question. Exhausting the batch force-writes the
    /// ledger and immediately generates the next round; the returned
    /// [`Advance::RoundComplete`] is the one-time round-finished notification.
    pub fn advance(&mut self) -> Result<Advance, SessionError> {
        let question = self.round.current().ok_or(SessionError::NoActiveQuestion)?;
        let id = question.id;
        if !self.round.submitted.contains_key(&id) {
            return Err(SessionError::NotYetAnswered(id));
        }

        self.round.cursor += 1;
        if self.round.is_finished() {
            let round = self.next_round(true);
            Ok(Advance::RoundComplete(round))
        } else {
            Ok(Advance::Next)
        }
    }

    /// Discard the current round and generate a fresh one in the current
    /// mode. Unsaved progress is flushed first.
    pub fn refresh_batch(&mut self) -> RoundStart {
        let flush_error = self.flush_if_dirty();
        let mut round = self.next_round(false);
        if round.save_error.is_none() {
            round.save_error = flush_error;
        }
        round
    }

    /// Select which generator entry point the next round uses. Does not
    /// touch the current round or the ledger.
    pub fn switch_mode(&mut self, mode: QuizMode) {
        self.mode = mode;
    }

    /// Change the question-type filter and regenerate the round.
    pub fn set_type_filter(&mut self, filter: TypeFilter) -> RoundStart {
        self.filter = filter;
        self.refresh_batch()
    }

    /// Zero all progress, persist the empty ledger, and start a fresh round.
    pub fn reset_progress(&mut self) -> RoundStart {
        self.ledger.reset();
        self.next_round(true)
    }

    /// Mark a question mastered without grading, from the review list.
    /// Returns a save notice if the write failed.
    pub fn mark_mastered(&mut self, id: QuestionId) -> Result<Option<String>, SessionError> {
        if !self.questions.iter().any(|q| q.id == id) {
            return Err(SessionError::UnknownQuestion(id));
        }
        self.ledger.mark_mastered(id);
        Ok(self.persist().err().map(|e| e.to_string()))
    }

    /// Drop miss history for questions that have since been mastered.
    /// Returns how many entries were cleared plus any save notice.
    pub fn clear_corrected(&mut self) -> (usize, Option<String>) {
        let removed = self.ledger.clear_corrected();
        let save_error = if removed > 0 {
            self.persist().err().map(|e| e.to_string())
        } else {
            None
        };
        (removed, save_error)
    }

    /// Questions with outstanding miss history, worst offenders first.
    pub fn review_list(&self) -> Vec<ReviewEntry<'_>> {
        let mut entries: Vec<ReviewEntry<'_>> = self
            .questions
            .iter()
            .filter_map(|question| {
                let miss_count = *self.ledger.miss_counts().get(&question.id)?;
                Some(ReviewEntry {
                    question,
                    miss_count,
                    last_wrong: self.ledger.last_wrong(question.id),
                    corrected: self.ledger.mastered().contains(&question.id),
                })
            })
            .collect();
        entries.sort_by(|a, b| {
            b.miss_count
                .cmp(&a.miss_count)
                .then(a.question.id.cmp(&b.question.id))
        });
        entries
    }

    fn next_round(&mut self, force_save: bool) -> RoundStart {
        let save_error = if force_save {
            self.persist().err().map(|e| e.to_string())
        } else {
            None
        };

        let mut fell_back = false;
        let plan = match self.mode {
            QuizMode::ErrorDrill => match batch::generate_error_batch(
                &self.questions,
                &self.ledger,
                self.config.error_batch_size,
                self.filter,
                &mut self.rng,
            ) {
                Ok(plan) => plan,
                Err(BatchError::NothingToDrill) => {
                    fell_back = true;
                    self.mode = QuizMode::Normal;
                    batch::generate(
                        &self.questions,
                        &self.ledger,
                        self.config.batch_size,
                        self.filter,
                        &mut self.rng,
                    )
                }
            },
            QuizMode::Normal => batch::generate(
                &self.questions,
                &self.ledger,
                self.config.batch_size,
                self.filter,
                &mut self.rng,
            ),
        };

        self.round = Round::from_plan(&plan);
        RoundStart {
            mode: self.mode,
            size: plan.len(),
            from_missed: plan.from_missed,
            from_review: plan.from_review,
            from_unseen: plan.from_unseen,
            fell_back_to_normal: fell_back,
            save_error,
        }
    }

    fn save_per_policy(&mut self) -> Option<String> {
        match self.config.write_policy {
            WritePolicy::EveryAnswer => self.persist().err().map(|e| e.to_string()),
            WritePolicy::EveryNth(n) => {
                self.answers_since_save += 1;
                if self.answers_since_save >= n.max(1) {
                    self.answers_since_save = 0;
                    if self.ledger != self.last_saved {
                        return self.persist().err().map(|e| e.to_string());
                    }
                }
                None
            }
        }
    }

    fn flush_if_dirty(&mut self) -> Option<String> {
        if self.ledger != self.last_saved {
            self.persist().err().map(|e| e.to_string())
        } else {
            None
        }
    }

    fn persist(&mut self) -> Result<(), GatewayError> {
        let record = ProgressRecord::new(self.ledger.clone(), Some(Utc::now()));
        let handle = self.gateway.write(&self.user_id, &record, self.row.as_ref())?;
        self.row = Some(handle);
        self.last_saved = self.ledger.clone();
        self.answers_since_save = 0;
        Ok(())
    }
}
