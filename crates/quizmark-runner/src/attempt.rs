//! A single user's attempt at a test, from first answer to submission.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use quizmark_core::error::StoreError;
use quizmark_core::model::{Answer, Answers, QuestionType, Test};
use quizmark_core::results::{answer_records, AttemptResult, AttemptStatus, ResultError};
use quizmark_core::scoring::{grade_question, score_uniform, score_weighted, ScoreResult, Verdict};

/// Errors raised while taking or submitting an attempt.
#[derive(Debug, Error)]
pub enum AttemptError {
    #[error("test has no question '{0}'")]
    UnknownQuestion(String),

    #[error("answer does not fit {expected} question '{question_id}'")]
    AnswerShape {
        question_id: String,
        expected: QuestionType,
    },

    #[error("attempt is already {0}")]
    Finished(AttemptStatus),

    #[error("attempt {0} was already submitted")]
    AlreadySubmitted(Uuid),

    #[error(transparent)]
    Result(#[from] ResultError),

    #[error("failed to save result: {0}")]
    Store(#[from] StoreError),
}

/// One row of the answer-review screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionReview {
    pub question_id: String,
    pub text: String,
    pub answer: Option<Answer>,
    pub verdict: Verdict,
}

/// An attempt in progress.
#[derive(Debug, Clone)]
pub struct Attempt {
    test: Arc<Test>,
    answers: Answers,
    result: AttemptResult,
    stored_id: Option<String>,
}

impl Attempt {
    /// Begin an attempt with no answers.
    pub fn start(test: Arc<Test>, user_id: &str, now: DateTime<Utc>) -> Self {
        let result = AttemptResult::start(&test.id, user_id, now);
        tracing::debug!(attempt = %result.id, test_id = %test.id, user_id, "attempt started");
        Self {
            test,
            answers: Answers::new(),
            result,
            stored_id: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.result.id
    }

    pub fn test(&self) -> &Test {
        &self.test
    }

    pub fn status(&self) -> AttemptStatus {
        self.result.status
    }

    pub fn answers(&self) -> &Answers {
        &self.answers
    }

    /// The result as it stands: empty while in progress, scored once finished.
    pub fn result(&self) -> &AttemptResult {
        &self.result
    }

    /// Id assigned by the store, once submitted.
    pub fn stored_id(&self) -> Option<&str> {
        self.stored_id.as_deref()
    }

    pub(crate) fn mark_submitted(&mut self, stored_id: String) {
        self.stored_id = Some(stored_id);
    }

    fn ensure_open(&self) -> Result<(), AttemptError> {
        if self.result.status.is_final() {
            return Err(AttemptError::Finished(self.result.status));
        }
        Ok(())
    }

    /// Record an answer and return the live progress score.
    pub fn answer(&mut self, question_id: &str, answer: Answer) -> Result<ScoreResult, AttemptError> {
        self.ensure_open()?;
        let question = self
            .test
            .question(question_id)
            .ok_or_else(|| AttemptError::UnknownQuestion(question_id.to_string()))?;
        if !answer.fits(&question.kind) {
            return Err(AttemptError::AnswerShape {
                question_id: question_id.to_string(),
                expected: question.kind.question_type(),
            });
        }

        self.answers.insert(question_id.to_string(), answer);
        Ok(self.progress())
    }

    /// Remove an answer and return the live progress score.
    pub fn clear(&mut self, question_id: &str) -> Result<ScoreResult, AttemptError> {
        self.ensure_open()?;
        if self.test.question(question_id).is_none() {
            return Err(AttemptError::UnknownQuestion(question_id.to_string()));
        }
        self.answers.remove(question_id);
        Ok(self.progress())
    }

    /// Live progress: uniform scoring over the current answers.
    pub fn progress(&self) -> ScoreResult {
        score_uniform(&self.test.questions, &self.answers)
    }

    /// Per-question verdicts, in question order.
    pub fn review(&self) -> Vec<QuestionReview> {
        self.test
            .questions
            .iter()
            .map(|q| {
                let answer = self.answers.get(&q.id);
                QuestionReview {
                    question_id: q.id.clone(),
                    text: q.text.clone(),
                    answer: answer.cloned(),
                    verdict: grade_question(q, answer),
                }
            })
            .collect()
    }

    /// Questions with a non-empty answer.
    pub fn answered_count(&self) -> usize {
        self.answers.values().filter(|a| !a.is_empty()).count()
    }

    /// The moment the time limit runs out, if the test has one.
    ///
    /// A limit too large to represent as a timestamp counts as no limit.
    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        let secs = i64::try_from(self.test.time_limit_secs?).ok()?;
        let limit = chrono::Duration::try_seconds(secs)?;
        self.result.started_at.checked_add_signed(limit)
    }

    /// Time left before the limit, or `None` for untimed tests.
    pub fn time_remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.deadline()
            .map(|deadline| (deadline - now).to_std().unwrap_or(Duration::ZERO))
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.deadline().is_some_and(|deadline| now >= deadline)
    }

    /// Freeze the answers, score them in weighted mode and complete the result.
    pub fn finish(&mut self, now: DateTime<Utc>) -> Result<AttemptResult, AttemptError> {
        self.ensure_open()?;
        let score = score_weighted(&self.test.questions, &self.answers);
        let records = answer_records(&score, &self.answers);
        self.result.complete(&score, records, now)?;
        tracing::info!(
            attempt = %self.result.id,
            score = score.score,
            max_score = score.max_score,
            percentage = score.percentage,
            "attempt finished"
        );
        Ok(self.result.clone())
    }

    /// Abandon the attempt without scoring it.
    pub fn expire(&mut self, now: DateTime<Utc>) -> Result<AttemptResult, AttemptError> {
        self.ensure_open()?;
        self.result.expire(now)?;
        Ok(self.result.clone())
    }
}
