//! Generation task manager.
//!
//! [`GenerationClient`] orchestrates the full protocol: it submits
//! tasks, synthesizes the placeholder set, spawns one polling task per
//! submission (each with its own child [`CancellationToken`]), and
//! broadcasts [`TaskEvent`]s. Call [`GenerationClient::subscribe`] to
//! receive them.
//!
//! The per-task display list is mutated only from the polling task that
//! owns it, so there is a single writer per task id.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{broadcast, RwLock};
use tokio_util::sync::CancellationToken;

use muse_core::display::make_placeholders;
use muse_core::error::CoreError;
use muse_core::request::{validate_request, GenerationRequest};
use muse_core::result::{validate_metadata_update, ResultMetadataUpdate, ResultRow};
use muse_core::types::TaskId;

use crate::api::{ApiError, HttpBackend, TaskBackend};
use crate::assets::resolve_output_url;
use crate::config::ClientConfig;
use crate::events::TaskEvent;
use crate::poller::poll_task;

/// Broadcast channel capacity for task events.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Errors surfaced by the client API.
///
/// These only cover the pre-polling phase (submission, lookups, and
/// metadata edits). Once a submission has succeeded, every failure mode
/// of that task is delivered as a [`TaskEvent`], never as an error.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The request or update failed local validation; no network call
    /// was made.
    #[error(transparent)]
    Invalid(#[from] CoreError),

    /// The backend call failed (network or non-2xx).
    #[error(transparent)]
    Api(#[from] ApiError),

    /// No submission is known for the given task id.
    #[error("Unknown task {0}")]
    UnknownTask(TaskId),
}

/// Internal bookkeeping for one submitted task.
struct ManagedTask {
    /// The original parameter bundle, kept for `regenerate`.
    request: GenerationRequest,
    #[allow(dead_code)]
    handle: tokio::task::JoinHandle<()>,
    /// Per-task cancellation token (child of the master token).
    cancel: CancellationToken,
}

/// Client for the generation task submission & polling protocol.
///
/// Created once per backend context via [`GenerationClient::new`] (or
/// [`with_backend`](GenerationClient::with_backend) in tests). The
/// returned `Arc` can be cheaply cloned into UI state.
pub struct GenerationClient {
    backend: Arc<dyn TaskBackend>,
    config: ClientConfig,
    /// Polling tasks indexed by task id.
    tasks: RwLock<HashMap<TaskId, ManagedTask>>,
    event_tx: broadcast::Sender<TaskEvent>,
    /// Master cancellation token -- cancelled during shutdown.
    cancel: CancellationToken,
}

impl GenerationClient {
    /// Create a client talking to the real HTTP backend.
    pub fn new(config: ClientConfig) -> Arc<Self> {
        let backend = Arc::new(HttpBackend::new(&config));
        Self::with_backend(config, backend)
    }

    /// Create a client over an arbitrary [`TaskBackend`] implementation.
    pub fn with_backend(config: ClientConfig, backend: Arc<dyn TaskBackend>) -> Arc<Self> {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Arc::new(Self {
            backend,
            config,
            tasks: RwLock::new(HashMap::new()),
            event_tx,
            cancel: CancellationToken::new(),
        })
    }

    /// Subscribe to lifecycle events for all tasks managed by this
    /// client. Filter by [`TaskEvent::task_id`] as needed.
    pub fn subscribe(&self) -> broadcast::Receiver<TaskEvent> {
        self.event_tx.subscribe()
    }

    /// Submit a generation request.
    ///
    /// Validates locally, performs exactly one task-creation call, then
    /// emits the placeholder set and starts polling. On error, polling
    /// never starts and no display state is created -- the caller is
    /// responsible for surfacing the failure to the user.
    pub async fn submit(&self, request: GenerationRequest) -> Result<TaskId, ClientError> {
        validate_request(&request)?;

        let task_id = self.backend.create_task(&request).await?;

        tracing::info!(
            task_id = %task_id,
            engine = %request.engine,
            expected_outputs = request.expected_outputs,
            "Task submitted",
        );

        // Placeholders go out before the first poll so subscribers have
        // something to render without delay.
        let records = make_placeholders(&task_id, request.expected_outputs);
        let _ = self.event_tx.send(TaskEvent::PlaceholdersReady {
            task_id: task_id.clone(),
            records: records.clone(),
        });

        let task_cancel = self.cancel.child_token();
        let handle = tokio::spawn(poll_task(
            Arc::clone(&self.backend),
            task_id.clone(),
            request.expected_outputs,
            records,
            self.config.poll,
            task_cancel.clone(),
            self.event_tx.clone(),
        ));

        self.tasks.write().await.insert(
            task_id.clone(),
            ManagedTask {
                request,
                handle,
                cancel: task_cancel,
            },
        );

        Ok(task_id)
    }

    /// Resubmit a fresh task built from the original parameters of an
    /// earlier submission.
    ///
    /// This is the user-initiated "regenerate" action -- failed or
    /// timed-out generations are never retried automatically.
    pub async fn regenerate(&self, task_id: &TaskId) -> Result<TaskId, ClientError> {
        let request = {
            let tasks = self.tasks.read().await;
            tasks
                .get(task_id)
                .map(|t| t.request.clone())
                .ok_or_else(|| ClientError::UnknownTask(task_id.clone()))?
        };

        tracing::info!(original_task_id = %task_id, "Regenerating task");
        self.submit(request).await
    }

    /// Patch the user-editable metadata (rating, favorite, notes, tags)
    /// of one result row.
    pub async fn update_result_metadata(
        &self,
        task_id: &TaskId,
        sequence: u32,
        update: ResultMetadataUpdate,
    ) -> Result<ResultRow, ClientError> {
        validate_metadata_update(&update)?;
        let row = self
            .backend
            .update_result_metadata(task_id, sequence, &update)
            .await?;
        Ok(row)
    }

    /// Resolve a completed row's `file_path` into a fetchable URL.
    ///
    /// Returns `None` for rows without an output path.
    pub fn output_url(&self, row: &ResultRow) -> Option<String> {
        row.file_path
            .as_deref()
            .map(|path| resolve_output_url(&self.config.storage_base_url, path))
    }

    /// Stop polling for one task and forget it.
    ///
    /// The polling task observes the cancellation before its next
    /// scheduled read. Returns `false` if the task id is unknown.
    pub async fn unsubscribe_task(&self, task_id: &TaskId) -> bool {
        match self.tasks.write().await.remove(task_id) {
            Some(managed) => {
                tracing::info!(task_id = %task_id, "Unsubscribing task");
                managed.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Gracefully stop all polling tasks.
    ///
    /// Cancels the master token, then waits up to 5 seconds per task
    /// for a clean exit.
    pub async fn shutdown(&self) {
        tracing::info!("Shutting down generation client");
        self.cancel.cancel();

        let mut tasks = self.tasks.write().await;
        for (id, managed) in tasks.drain() {
            tracing::debug!(task_id = %id, "Stopping polling task");
            managed.cancel.cancel();
            let _ =
                tokio::time::timeout(std::time::Duration::from_secs(5), managed.handle).await;
        }

        tracing::info!("Generation client shut down");
    }
}
