//! Core trait definitions for result storage.
//!
//! Implemented by the `quizmark-store` crate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StoreError;
use crate::results::AttemptResult;

/// Acknowledgement of a stored result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedResult {
    /// Identifier assigned by the store.
    pub id: String,
}

/// Trait for backends that persist attempt results.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Human-readable store name (e.g. "file").
    fn name(&self) -> &str;

    /// Persist a result and return its id.
    ///
    /// Overwriting a result already stored as completed or expired fails
    /// with [`StoreError::Conflict`].
    async fn save(&self, result: &AttemptResult) -> Result<SavedResult, StoreError>;

    /// Fetch a single result.
    async fn get(&self, id: Uuid) -> Result<AttemptResult, StoreError>;

    /// All results recorded for a test, in no particular order.
    async fn list_for_test(&self, test_id: &str) -> Result<Vec<AttemptResult>, StoreError>;
}
