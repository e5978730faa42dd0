//! Attempt results and their lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::model::{Answer, Answers, Test};
use crate::scoring::{ScoreResult, Verdict};

/// Lifecycle state of an attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    #[default]
    InProgress,
    Completed,
    Expired,
}

impl AttemptStatus {
    pub fn is_final(self) -> bool {
        !matches!(self, AttemptStatus::InProgress)
    }
}

impl fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptStatus::InProgress => write!(f, "in_progress"),
            AttemptStatus::Completed => write!(f, "completed"),
            AttemptStatus::Expired => write!(f, "expired"),
        }
    }
}

/// The stored outcome for one question of an attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub question_id: String,
    #[serde(default)]
    pub answer: Option<Answer>,
    pub verdict: Verdict,
    pub points_awarded: u32,
    pub points_possible: u32,
}

/// Build answer records in question order from a score and the answers it
/// was computed from.
pub fn answer_records(score: &ScoreResult, answers: &Answers) -> Vec<AnswerRecord> {
    score
        .outcomes
        .iter()
        .map(|o| AnswerRecord {
            question_id: o.question_id.clone(),
            answer: answers.get(&o.question_id).cloned(),
            verdict: o.verdict,
            points_awarded: o.points_awarded,
            points_possible: o.points_possible,
        })
        .collect()
}

/// Errors raised by invalid lifecycle transitions.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResultError {
    /// The result is already completed or expired.
    #[error("result {id} is already {status}")]
    AlreadyFinalized { id: Uuid, status: AttemptStatus },
}

/// One user's attempt at a test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptResult {
    pub id: Uuid,
    pub test_id: String,
    pub user_id: String,
    #[serde(default)]
    pub answers: Vec<AnswerRecord>,
    pub score: u32,
    pub max_score: u32,
    pub percentage: f64,
    pub status: AttemptStatus,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    /// Seconds between start and completion.
    #[serde(default)]
    pub time_spent_secs: u64,
}

impl AttemptResult {
    /// A fresh, empty attempt.
    pub fn start(test_id: &str, user_id: &str, started_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            test_id: test_id.to_string(),
            user_id: user_id.to_string(),
            answers: Vec::new(),
            score: 0,
            max_score: 0,
            percentage: 0.0,
            status: AttemptStatus::InProgress,
            started_at,
            completed_at: None,
            time_spent_secs: 0,
        }
    }

    fn ensure_open(&self) -> Result<(), ResultError> {
        if self.status.is_final() {
            return Err(ResultError::AlreadyFinalized {
                id: self.id,
                status: self.status,
            });
        }
        Ok(())
    }

    /// Record the final score and mark the attempt completed.
    pub fn complete(
        &mut self,
        score: &ScoreResult,
        answers: Vec<AnswerRecord>,
        completed_at: DateTime<Utc>,
    ) -> Result<(), ResultError> {
        self.ensure_open()?;
        self.answers = answers;
        self.score = score.score;
        self.max_score = score.max_score;
        self.percentage = score.percentage;
        self.status = AttemptStatus::Completed;
        self.completed_at = Some(completed_at);
        self.time_spent_secs = elapsed_secs(self.started_at, completed_at);
        Ok(())
    }

    /// Mark the attempt expired without scoring it.
    pub fn expire(&mut self, at: DateTime<Utc>) -> Result<(), ResultError> {
        self.ensure_open()?;
        self.status = AttemptStatus::Expired;
        self.completed_at = Some(at);
        self.time_spent_secs = elapsed_secs(self.started_at, at);
        Ok(())
    }

    /// Whether a completed attempt reached `threshold` percent.
    pub fn passed(&self, threshold: f64) -> bool {
        self.status == AttemptStatus::Completed && self.percentage >= threshold
    }

    /// Score `answers` against `test` in weighted mode and return a
    /// completed result in one step.
    pub fn completed_from(
        test: &Test,
        user_id: &str,
        answers: &Answers,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
    ) -> Self {
        let score = crate::scoring::score_weighted(&test.questions, answers);
        let records = answer_records(&score, answers);
        let mut result = Self::start(&test.id, user_id, started_at);
        let completed = result.complete(&score, records, completed_at);
        debug_assert!(completed.is_ok(), "a freshly started result is open");
        result
    }
}

fn elapsed_secs(from: DateTime<Utc>, to: DateTime<Utc>) -> u64 {
    u64::try_from((to - from).num_seconds()).unwrap_or(0)
}
