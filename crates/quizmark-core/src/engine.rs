//! Batch grading engine.
//!
//! Scores many answer sheets for one test and saves the results
//! concurrently, retrying transient store failures.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use crate::error::StoreError;
use crate::model::Test;
use crate::results::AttemptResult;
use crate::sheet::AnswerSheet;
use crate::traits::{ResultStore, SavedResult};

/// Configuration for the grading engine.
#[derive(Debug, Clone)]
pub struct GradingConfig {
    /// Maximum concurrent saves.
    pub parallelism: usize,
    /// Retries on transient store errors.
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each further retry.
    pub retry_delay: Duration,
}

impl Default for GradingConfig {
    fn default() -> Self {
        Self {
            parallelism: 4,
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
        }
    }
}

/// Progress reporting trait.
pub trait ProgressReporter: Send + Sync {
    fn on_sheet_graded(&self, result: &AttemptResult, stored_id: &str);
    fn on_sheet_error(&self, user_id: &str, error: &str);
    fn on_batch_complete(&self, total: usize, saved: usize, failed: usize, elapsed: Duration);
}

/// No-op progress reporter.
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn on_sheet_graded(&self, _: &AttemptResult, _: &str) {}
    fn on_sheet_error(&self, _: &str, _: &str) {}
    fn on_batch_complete(&self, _: usize, _: usize, _: usize, _: Duration) {}
}

/// A sheet that could not be graded or saved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchFailure {
    pub user_id: String,
    pub error: String,
}

/// Outcome of grading a batch of answer sheets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub test_id: String,
    /// Saved results paired with the id the store assigned.
    pub saved: Vec<(String, AttemptResult)>,
    pub failures: Vec<BatchFailure>,
    pub duration_ms: u64,
}

impl BatchReport {
    pub fn results(&self) -> impl Iterator<Item = &AttemptResult> {
        self.saved.iter().map(|(_, r)| r)
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Grades answer sheets and persists the results.
pub struct GradingEngine {
    store: Arc<dyn ResultStore>,
    config: GradingConfig,
}

impl GradingEngine {
    pub fn new(store: Arc<dyn ResultStore>, config: GradingConfig) -> Self {
        Self { store, config }
    }

    /// Score every sheet in weighted mode and save each completed result.
    ///
    /// Failures are collected in the report and never abort the batch.
    pub async fn grade_batch(
        &self,
        test: &Test,
        sheets: &[AnswerSheet],
        progress: &dyn ProgressReporter,
    ) -> BatchReport {
        let start = Instant::now();
        let semaphore = Arc::new(Semaphore::new(self.config.parallelism.max(1)));
        let mut futures = FuturesUnordered::new();
        let mut failures = Vec::new();

        for sheet in sheets {
            if sheet.test_id != test.id {
                let error = format!(
                    "answer sheet is for test '{}', expected '{}'",
                    sheet.test_id, test.id
                );
                tracing::warn!(user_id = %sheet.user_id, "{error}");
                progress.on_sheet_error(&sheet.user_id, &error);
                failures.push(BatchFailure {
                    user_id: sheet.user_id.clone(),
                    error,
                });
                continue;
            }

            let answers = sheet.bind(test);
            let completed_at = sheet.completed_at.unwrap_or_else(Utc::now);
            let started_at = sheet.started_at.unwrap_or(completed_at);
            let result =
                AttemptResult::completed_from(test, &sheet.user_id, &answers, started_at, completed_at);

            let store = Arc::clone(&self.store);
            let semaphore = Arc::clone(&semaphore);
            let config = self.config.clone();

            futures.push(async move {
                let saved = match semaphore.acquire_owned().await {
                    Ok(_permit) => save_with_retry(store.as_ref(), &result, &config).await,
                    Err(_) => Err(StoreError::Network("grading was shut down".into())),
                };
                (result, saved)
            });
        }

        let total = sheets.len();
        let mut saved = Vec::new();

        while let Some((result, outcome)) = futures.next().await {
            match outcome {
                Ok(ack) => {
                    progress.on_sheet_graded(&result, &ack.id);
                    saved.push((ack.id, result));
                }
                Err(e) => {
                    tracing::error!(user_id = %result.user_id, "failed to save result: {e}");
                    progress.on_sheet_error(&result.user_id, &e.to_string());
                    failures.push(BatchFailure {
                        user_id: result.user_id.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        let elapsed = start.elapsed();
        progress.on_batch_complete(total, saved.len(), failures.len(), elapsed);
        tracing::info!(
            test_id = %test.id,
            total,
            saved = saved.len(),
            failed = failures.len(),
            "batch graded"
        );

        BatchReport {
            test_id: test.id.clone(),
            saved,
            failures,
            duration_ms: elapsed.as_millis() as u64,
        }
    }
}

/// Save a result, retrying transient failures with exponential backoff.
pub async fn save_with_retry(
    store: &dyn ResultStore,
    result: &AttemptResult,
    config: &GradingConfig,
) -> Result<SavedResult, StoreError> {
    let mut retry_delay = config.retry_delay;
    let mut attempt = 0u32;
    loop {
        match store.save(result).await {
            Ok(saved) => return Ok(saved),
            Err(e) if e.is_permanent() || attempt >= config.max_retries => return Err(e),
            Err(e) => {
                attempt += 1;
                tracing::warn!(
                    store = store.name(),
                    attempt,
                    "transient store error, retrying in {retry_delay:?}: {e}"
                );
                tokio::time::sleep(retry_delay).await;
                retry_delay = (retry_delay * 2).min(Duration::from_secs(60));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ChoiceOption, Question, QuestionKind};
    use crate::sheet::RawAnswer;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use uuid::Uuid;

    /// Fails the first `failures` saves with the error built by `fail_with`.
    struct FlakyStore {
        failures: u32,
        fail_with: fn() -> StoreError,
        calls: AtomicU32,
        saved: Mutex<Vec<AttemptResult>>,
    }

    impl FlakyStore {
        fn new(failures: u32, fail_with: fn() -> StoreError) -> Self {
            Self {
                failures,
                fail_with,
                calls: AtomicU32::new(0),
                saved: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ResultStore for FlakyStore {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn save(&self, result: &AttemptResult) -> Result<SavedResult, StoreError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err((self.fail_with)());
            }
            self.saved.lock().unwrap().push(result.clone());
            Ok(SavedResult {
                id: result.id.to_string(),
            })
        }

        async fn get(&self, id: Uuid) -> Result<AttemptResult, StoreError> {
            Err(StoreError::NotFound(id.to_string()))
        }

        async fn list_for_test(&self, _: &str) -> Result<Vec<AttemptResult>, StoreError> {
            Ok(self.saved.lock().unwrap().clone())
        }
    }

    fn quiz() -> Test {
        Test {
            id: "t1".into(),
            title: "Quiz".into(),
            description: String::new(),
            category: Default::default(),
            time_limit_secs: None,
            passing_percentage: None,
            questions: vec![Question {
                id: "q1".into(),
                text: String::new(),
                points: None,
                kind: QuestionKind::Single {
                    options: vec![ChoiceOption {
                        id: "a".into(),
                        text: "A".into(),
                    }],
                    correct_option_id: Some("a".into()),
                },
            }],
        }
    }

    fn sheet(test_id: &str, user: &str, choice: &str) -> AnswerSheet {
        AnswerSheet {
            test_id: test_id.into(),
            user_id: user.into(),
            answers: HashMap::from([("q1".to_string(), Some(RawAnswer::Text(choice.into())))]),
            started_at: None,
            completed_at: None,
        }
    }

    fn fast_config() -> GradingConfig {
        GradingConfig {
            parallelism: 2,
            max_retries: 3,
            retry_delay: Duration::from_millis(10),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn grades_and_saves_every_sheet() {
        let store = Arc::new(FlakyStore::new(0, || StoreError::Timeout(1)));
        let engine = GradingEngine::new(store.clone(), fast_config());
        let sheets = vec![
            sheet("t1", "u1", "a"),
            sheet("t1", "u2", "b"),
            sheet("t1", "u3", "a"),
        ];

        let report = engine.grade_batch(&quiz(), &sheets, &NoopReporter).await;

        assert_eq!(report.saved.len(), 3);
        assert!(!report.has_failures());
        let mut pcts: Vec<f64> = report.results().map(|r| r.percentage).collect();
        pcts.sort_by(|a, b| a.total_cmp(b));
        assert_eq!(pcts, vec![0.0, 100.0, 100.0]);
        assert_eq!(store.saved.lock().unwrap().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transient_errors() {
        let store = Arc::new(FlakyStore::new(2, || StoreError::Timeout(30)));
        let engine = GradingEngine::new(store.clone(), fast_config());

        let report = engine
            .grade_batch(&quiz(), &[sheet("t1", "u1", "a")], &NoopReporter)
            .await;

        assert_eq!(report.saved.len(), 1);
        assert_eq!(store.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_retries() {
        let store = Arc::new(FlakyStore::new(10, || StoreError::Network("reset".into())));
        let engine = GradingEngine::new(store.clone(), fast_config());

        let report = engine
            .grade_batch(&quiz(), &[sheet("t1", "u1", "a")], &NoopReporter)
            .await;

        assert_eq!(report.failures.len(), 1);
        assert_eq!(store.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_errors_are_not_retried() {
        let store = Arc::new(FlakyStore::new(10, || {
            StoreError::Unauthorized("bad token".into())
        }));
        let engine = GradingEngine::new(store.clone(), fast_config());

        let report = engine
            .grade_batch(&quiz(), &[sheet("t1", "u1", "a")], &NoopReporter)
            .await;

        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].error.contains("unauthorized"));
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn sheets_for_other_tests_fail_without_saving() {
        let store = Arc::new(FlakyStore::new(0, || StoreError::Timeout(1)));
        let engine = GradingEngine::new(store.clone(), fast_config());

        let report = engine
            .grade_batch(&quiz(), &[sheet("other", "u1", "a")], &NoopReporter)
            .await;

        assert!(report.saved.is_empty());
        assert!(report.failures[0].error.contains("other"));
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }
}
