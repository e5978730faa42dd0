//! Attempts with a time limit that submit themselves.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use quizmark_core::model::{Answer, Test};
use quizmark_core::scoring::ScoreResult;

use crate::{Attempt, AttemptError, AttemptRunner, SubmitReceipt};

/// An attempt shared between the user and a timer task.
///
/// Whichever of the two submits first wins; the other finds the attempt
/// already submitted, so the store sees a single save.
pub struct TimedAttempt {
    attempt: Arc<Mutex<Attempt>>,
    runner: Arc<AttemptRunner>,
    timer: Option<JoinHandle<()>>,
}

impl TimedAttempt {
    /// Start an attempt, arming a timer when the test has a time limit.
    ///
    /// Must be called inside a tokio runtime.
    pub fn start(runner: Arc<AttemptRunner>, test: Arc<Test>, user_id: &str) -> Self {
        let attempt = Attempt::start(test, user_id, Utc::now());
        let limit = attempt.test().time_limit_secs;
        let deadline = attempt.deadline();
        let attempt = Arc::new(Mutex::new(attempt));

        let timer = deadline.and(limit).map(|secs| {
            let attempt = Arc::clone(&attempt);
            let runner = Arc::clone(&runner);
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(secs)).await;

                let mut attempt = attempt.lock().await;
                if attempt.stored_id().is_some() {
                    return;
                }
                let at = deadline.unwrap_or_else(Utc::now);
                match runner.submit(&mut attempt, at).await {
                    Ok(receipt) => tracing::info!(
                        attempt = %receipt.result.id,
                        "time limit reached, attempt submitted automatically"
                    ),
                    Err(e) => tracing::error!(
                        attempt = %attempt.id(),
                        "automatic submission failed: {e}"
                    ),
                }
            })
        });

        Self {
            attempt,
            runner,
            timer,
        }
    }

    pub async fn answer(&self, question_id: &str, answer: Answer) -> Result<ScoreResult, AttemptError> {
        let mut attempt = self.attempt.lock().await;
        self.runner.answer(&mut attempt, question_id, answer)
    }

    pub async fn clear(&self, question_id: &str) -> Result<ScoreResult, AttemptError> {
        self.attempt.lock().await.clear(question_id)
    }

    /// Submit now, cancelling the timer on success.
    pub async fn submit(&self) -> Result<SubmitReceipt, AttemptError> {
        let receipt = {
            let mut attempt = self.attempt.lock().await;
            self.runner.submit(&mut attempt, Utc::now()).await?
        };
        if let Some(timer) = &self.timer {
            timer.abort();
        }
        Ok(receipt)
    }

    /// A copy of the attempt as it stands.
    pub async fn snapshot(&self) -> Attempt {
        self.attempt.lock().await.clone()
    }

    /// Wait for the timer task to finish, whether it fired or was cancelled.
    pub async fn wait(&mut self) {
        if let Some(timer) = self.timer.take() {
            let _ = timer.await;
        }
    }
}
