//! REST API client for the generation backend.
//!
//! [`TaskBackend`] is the seam between the protocol machinery and the
//! network: the manager and poller only ever talk to the trait, so
//! tests can drive them with an in-memory implementation.
//! [`HttpBackend`] is the production implementation over [`reqwest`].

use async_trait::async_trait;
use serde::Deserialize;

use muse_core::request::GenerationRequest;
use muse_core::result::{ResultMetadataUpdate, ResultRow};
use muse_core::types::TaskId;

use crate::config::ClientConfig;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from the REST API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend returned a non-2xx status code.
    #[error("Backend API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },
}

// ---------------------------------------------------------------------------
// Backend trait
// ---------------------------------------------------------------------------

/// Network operations the protocol needs from the backend.
///
/// The ambient identity (auth token, user id) belongs to the
/// implementation, injected at construction -- callers never pass it.
#[async_trait]
pub trait TaskBackend: Send + Sync {
    /// Create a generation task. Exactly one call per submission;
    /// returns the backend-assigned task id.
    async fn create_task(&self, request: &GenerationRequest) -> Result<TaskId, ApiError>;

    /// Fetch all result rows currently recorded for a task.
    ///
    /// May legitimately return an empty list while the backend has not
    /// materialized any rows yet.
    async fn fetch_results(&self, task_id: &TaskId) -> Result<Vec<ResultRow>, ApiError>;

    /// Patch the user-editable metadata of one result row, returning
    /// the updated row.
    async fn update_result_metadata(
        &self,
        task_id: &TaskId,
        sequence: u32,
        update: &ResultMetadataUpdate,
    ) -> Result<ResultRow, ApiError>;
}

// ---------------------------------------------------------------------------
// HTTP implementation
// ---------------------------------------------------------------------------

/// Response returned by `POST /v1/tasks` after queuing a job.
#[derive(Debug, Deserialize)]
struct CreateTaskResponse {
    /// Backend-assigned identifier for the queued task.
    id: TaskId,
}

/// [`reqwest`]-backed implementation of [`TaskBackend`].
pub struct HttpBackend {
    client: reqwest::Client,
    api_url: String,
    auth_token: String,
    user_id: String,
}

impl HttpBackend {
    /// Create an HTTP backend from the client configuration.
    pub fn new(config: &ClientConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    /// Create an HTTP backend reusing an existing [`reqwest::Client`]
    /// (useful for connection pooling across clients).
    pub fn with_client(client: reqwest::Client, config: &ClientConfig) -> Self {
        Self {
            client,
            api_url: config.api_base_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone(),
            user_id: config.user_id.clone(),
        }
    }

    // ---- private helpers ----

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if self.auth_token.is_empty() {
            builder
        } else {
            builder.bearer_auth(&self.auth_token)
        }
    }

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or an [`ApiError::Api`] carrying
    /// the status and body text on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ApiError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl TaskBackend for HttpBackend {
    /// `POST /v1/tasks` with the JSON job description.
    async fn create_task(&self, request: &GenerationRequest) -> Result<TaskId, ApiError> {
        let body = serde_json::json!({
            "job": request,
            "user_id": self.user_id,
        });

        let response = self
            .authorize(self.client.post(format!("{}/v1/tasks", self.api_url)))
            .json(&body)
            .send()
            .await?;

        let created: CreateTaskResponse = Self::parse_response(response).await?;
        Ok(created.id)
    }

    /// `GET /v1/tasks/{id}/results`, sorted ascending by sequence
    /// number server-side (the caller re-sorts anyway).
    async fn fetch_results(&self, task_id: &TaskId) -> Result<Vec<ResultRow>, ApiError> {
        let response = self
            .authorize(self.client.get(format!(
                "{}/v1/tasks/{}/results",
                self.api_url, task_id
            )))
            .query(&[("order", "image_sequence_number.asc")])
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// `PATCH /v1/tasks/{id}/results/{sequence}` with the changed
    /// metadata fields.
    async fn update_result_metadata(
        &self,
        task_id: &TaskId,
        sequence: u32,
        update: &ResultMetadataUpdate,
    ) -> Result<ResultRow, ApiError> {
        let response = self
            .authorize(self.client.patch(format!(
                "{}/v1/tasks/{}/results/{}",
                self.api_url, task_id, sequence
            )))
            .json(update)
            .send()
            .await?;

        Self::parse_response(response).await
    }
}
