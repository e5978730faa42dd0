//! In-process result store for tests and dry runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use quizmark_core::error::StoreError;
use quizmark_core::results::AttemptResult;
use quizmark_core::traits::{ResultStore, SavedResult};

/// A result store backed by a `HashMap`.
///
/// Counts calls and can be primed to fail the next few saves with a
/// transient error, which makes it useful for exercising retry paths.
#[derive(Default)]
pub struct MemoryStore {
    results: Mutex<HashMap<Uuid, AttemptResult>>,
    save_count: AtomicU32,
    failing_saves: AtomicU32,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` saves fail with [`StoreError::Network`].
    pub fn fail_next_saves(&self, n: u32) {
        self.failing_saves.store(n, Ordering::SeqCst);
    }

    /// Number of `save` calls made, including failed ones.
    pub fn save_count(&self) -> u32 {
        self.save_count.load(Ordering::SeqCst)
    }

    /// Number of results currently stored.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of every stored result.
    pub fn all(&self) -> Vec<AttemptResult> {
        self.lock().values().cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, AttemptResult>> {
        // A poisoned map is still consistent: every write is a single insert.
        self.results
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn take_injected_failure(&self) -> bool {
        self.failing_saves
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl ResultStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn save(&self, result: &AttemptResult) -> Result<SavedResult, StoreError> {
        self.save_count.fetch_add(1, Ordering::SeqCst);
        if self.take_injected_failure() {
            return Err(StoreError::Network("injected failure".into()));
        }

        let mut results = self.lock();
        if let Some(existing) = results.get(&result.id) {
            if existing.status.is_final() {
                return Err(StoreError::Conflict(format!(
                    "result {} is already {}",
                    result.id, existing.status
                )));
            }
        }
        results.insert(result.id, result.clone());
        tracing::debug!(id = %result.id, status = %result.status, "stored result in memory");

        Ok(SavedResult {
            id: result.id.to_string(),
        })
    }

    async fn get(&self, id: Uuid) -> Result<AttemptResult, StoreError> {
        self.lock()
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn list_for_test(&self, test_id: &str) -> Result<Vec<AttemptResult>, StoreError> {
        Ok(self
            .lock()
            .values()
            .filter(|r| r.test_id == test_id)
            .cloned()
            .collect())
    }
}
