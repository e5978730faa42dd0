//! Directory-backed result store: one JSON document per result.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use uuid::Uuid;

use quizmark_core::error::StoreError;
use quizmark_core::results::AttemptResult;
use quizmark_core::traits::{ResultStore, SavedResult};

/// Stores each result as `<dir>/<id>.json`.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: Uuid) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    /// Write `contents` to a scratch file beside `path`, then rename it into
    /// place so readers never see a partial document.
    async fn write_atomic(&self, path: &Path, contents: String) -> Result<(), StoreError> {
        let scratch = self.dir.join(format!(".{}.tmp", Uuid::new_v4()));
        tokio::fs::write(&scratch, contents).await?;
        if let Err(e) = tokio::fs::rename(&scratch, path).await {
            let _ = tokio::fs::remove_file(&scratch).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn read(path: &Path) -> Result<AttemptResult, StoreError> {
        let content = tokio::fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[async_trait]
impl ResultStore for FileStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn save(&self, result: &AttemptResult) -> Result<SavedResult, StoreError> {
        let path = self.path_for(result.id);

        if tokio::fs::try_exists(&path).await? {
            let existing = Self::read(&path).await?;
            if existing.status.is_final() {
                return Err(StoreError::Conflict(format!(
                    "result {} is already {}",
                    result.id, existing.status
                )));
            }
        }

        tokio::fs::create_dir_all(&self.dir).await?;
        let json = serde_json::to_string_pretty(result)?;
        self.write_atomic(&path, json).await?;
        tracing::debug!(id = %result.id, path = %path.display(), "wrote result");

        Ok(SavedResult {
            id: result.id.to_string(),
        })
    }

    async fn get(&self, id: Uuid) -> Result<AttemptResult, StoreError> {
        let path = self.path_for(id);
        match tokio::fs::try_exists(&path).await? {
            true => Self::read(&path).await,
            false => Err(StoreError::NotFound(id.to_string())),
        }
    }

    async fn list_for_test(&self, test_id: &str) -> Result<Vec<AttemptResult>, StoreError> {
        if !tokio::fs::try_exists(&self.dir).await? {
            return Ok(Vec::new());
        }

        let mut results = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !path.extension().is_some_and(|ext| ext == "json") {
                continue;
            }
            match Self::read(&path).await {
                Ok(result) if result.test_id == test_id => results.push(result),
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!("skipping {}: {e}", path.display());
                }
            }
        }
        Ok(results)
    }
}
