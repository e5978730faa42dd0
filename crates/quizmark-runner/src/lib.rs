//! quizmark-runner: taking and submitting attempts.
//!
//! An [`Attempt`] collects answers and reports live progress; the
//! [`AttemptRunner`] finishes it and saves the result exactly once, and a
//! [`TimedAttempt`] submits automatically when the time limit runs out.

pub mod attempt;
pub mod timed;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use quizmark_core::model::Answer;
use quizmark_core::results::{AttemptResult, AttemptStatus};
use quizmark_core::scoring::ScoreResult;
use quizmark_core::traits::ResultStore;

pub use attempt::{Attempt, AttemptError, QuestionReview};
pub use timed::TimedAttempt;

/// Receives live progress and submission events.
pub trait ProgressReporter: Send + Sync {
    fn on_progress(&self, attempt: &Attempt, progress: &ScoreResult);
    fn on_submitted(&self, result: &AttemptResult, stored_id: &str);
}

/// No-op progress reporter.
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn on_progress(&self, _: &Attempt, _: &ScoreResult) {}
    fn on_submitted(&self, _: &AttemptResult, _: &str) {}
}

/// What a successful submission hands back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitReceipt {
    /// Id assigned by the store.
    pub stored_id: String,
    pub result: AttemptResult,
}

/// Drives attempts against a result store.
pub struct AttemptRunner {
    store: Arc<dyn ResultStore>,
    reporter: Arc<dyn ProgressReporter>,
}

impl AttemptRunner {
    pub fn new(store: Arc<dyn ResultStore>) -> Self {
        Self {
            store,
            reporter: Arc::new(NoopReporter),
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn store(&self) -> &Arc<dyn ResultStore> {
        &self.store
    }

    /// Record an answer and report the new live progress.
    pub fn answer(
        &self,
        attempt: &mut Attempt,
        question_id: &str,
        answer: Answer,
    ) -> Result<ScoreResult, AttemptError> {
        let progress = attempt.answer(question_id, answer)?;
        self.reporter.on_progress(attempt, &progress);
        Ok(progress)
    }

    /// Finish the attempt if needed and save its result once.
    ///
    /// When the save fails the attempt stays finished but unsubmitted, so
    /// calling `submit` again retries the save with the same result.
    pub async fn submit(
        &self,
        attempt: &mut Attempt,
        now: DateTime<Utc>,
    ) -> Result<SubmitReceipt, AttemptError> {
        if attempt.stored_id().is_some() {
            return Err(AttemptError::AlreadySubmitted(attempt.id()));
        }

        let result = match attempt.status() {
            AttemptStatus::InProgress => attempt.finish(now)?,
            AttemptStatus::Completed | AttemptStatus::Expired => attempt.result().clone(),
        };

        let saved = self.store.save(&result).await?;
        attempt.mark_submitted(saved.id.clone());
        tracing::info!(
            attempt = %result.id,
            store = self.store.name(),
            stored_id = %saved.id,
            "attempt submitted"
        );
        self.reporter.on_submitted(&result, &saved.id);

        Ok(SubmitReceipt {
            stored_id: saved.id,
            result,
        })
    }
}
