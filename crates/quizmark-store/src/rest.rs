//! Result store backed by a document database's REST API.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

use quizmark_core::error::StoreError;
use quizmark_core::results::AttemptResult;
use quizmark_core::traits::{ResultStore, SavedResult};

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const COLLECTION: &str = "collections/results";

/// Remote document-database store.
///
/// Note: custom Debug impl masks the bearer token.
pub struct RestStore {
    base_url: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl std::fmt::Debug for RestStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestStore")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "***"))
            .finish()
    }
}

#[derive(Deserialize)]
struct CreatedResponse {
    id: String,
}

impl RestStore {
    pub fn new(base_url: &str, token: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .expect("failed to build HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
            client,
        }
    }

    fn collection_url(&self) -> String {
        format!("{}/{COLLECTION}", self.base_url)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, StoreError> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status().as_u16();
        if status < 400 {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(match status {
            401 | 403 => StoreError::Unauthorized(body),
            404 => StoreError::NotFound(body),
            409 => StoreError::Conflict(body),
            _ => StoreError::Backend {
                status,
                message: body,
            },
        })
    }

    fn transport_error(&self, e: reqwest::Error) -> StoreError {
        if e.is_timeout() {
            StoreError::Timeout(DEFAULT_TIMEOUT_SECS)
        } else if e.is_connect() {
            StoreError::Network(format!("store not reachable at {}: {e}", self.base_url))
        } else {
            StoreError::Network(e.to_string())
        }
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, StoreError> {
        let body = response
            .text()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl ResultStore for RestStore {
    fn name(&self) -> &str {
        "rest"
    }

    #[instrument(skip(self, result), fields(id = %result.id, test_id = %result.test_id))]
    async fn save(&self, result: &AttemptResult) -> Result<SavedResult, StoreError> {
        let response = self
            .send(self.client.post(self.collection_url()).json(result))
            .await?;
        let created: CreatedResponse = Self::decode(response).await?;
        tracing::debug!(stored_id = %created.id, "result saved");
        Ok(SavedResult { id: created.id })
    }

    #[instrument(skip(self))]
    async fn get(&self, id: Uuid) -> Result<AttemptResult, StoreError> {
        let url = format!("{}/{id}", self.collection_url());
        let response = self.send(self.client.get(url)).await?;
        Self::decode(response).await
    }

    #[instrument(skip(self))]
    async fn list_for_test(&self, test_id: &str) -> Result<Vec<AttemptResult>, StoreError> {
        let mut url = reqwest::Url::parse(&self.collection_url())
            .map_err(|e| StoreError::Network(format!("invalid store URL: {e}")))?;
        url.query_pairs_mut().append_pair("test_id", test_id);

        let response = self.send(self.client.get(url)).await?;
        Self::decode(response).await
    }
}
