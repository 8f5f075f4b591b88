//! Shared test helpers: a scripted in-memory backend and event-stream
//! assertions.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;

use muse_client::api::{ApiError, TaskBackend};
use muse_client::{ClientConfig, GenerationClient, PollConfig, TaskEvent};
use muse_core::request::{GenerationRequest, ReferenceAsset, TAG_FACE};
use muse_core::result::{ResultMetadataUpdate, ResultRow};
use muse_core::status::GenerationStatus;
use muse_core::types::TaskId;

/// One scripted response for a `fetch_results` call.
pub enum ScriptedRead {
    Rows(Vec<ResultRow>),
    Error(u16),
}

/// In-memory [`TaskBackend`] driven by a queue of scripted reads.
///
/// `fetch_results` pops the next scripted read; once the script is
/// exhausted it keeps returning an empty row set, which keeps the
/// poller polling until its budget runs out.
pub struct ScriptedBackend {
    next_task: AtomicU32,
    reads: Mutex<VecDeque<ScriptedRead>>,
    pub fetch_calls: AtomicU32,
    pub submitted: Mutex<Vec<GenerationRequest>>,
    fail_submissions: AtomicBool,
}

impl ScriptedBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next_task: AtomicU32::new(1),
            reads: Mutex::new(VecDeque::new()),
            fetch_calls: AtomicU32::new(0),
            submitted: Mutex::new(Vec::new()),
            fail_submissions: AtomicBool::new(false),
        })
    }

    /// Queue a successful read returning `rows`.
    pub fn script_rows(&self, rows: Vec<ResultRow>) {
        self.reads.lock().unwrap().push_back(ScriptedRead::Rows(rows));
    }

    /// Queue a read failing with the given HTTP status.
    pub fn script_error(&self, status: u16) {
        self.reads
            .lock()
            .unwrap()
            .push_back(ScriptedRead::Error(status));
    }

    /// Make every subsequent `create_task` call fail with a 503.
    pub fn fail_submissions(&self) {
        self.fail_submissions.store(true, Ordering::SeqCst);
    }

    pub fn fetch_count(&self) -> u32 {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TaskBackend for ScriptedBackend {
    async fn create_task(&self, request: &GenerationRequest) -> Result<TaskId, ApiError> {
        if self.fail_submissions.load(Ordering::SeqCst) {
            return Err(ApiError::Api {
                status: 503,
                body: "scripted submission failure".to_string(),
            });
        }
        self.submitted.lock().unwrap().push(request.clone());
        let n = self.next_task.fetch_add(1, Ordering::SeqCst);
        Ok(TaskId::new(format!("task-{n}")))
    }

    async fn fetch_results(&self, _task_id: &TaskId) -> Result<Vec<ResultRow>, ApiError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        match self.reads.lock().unwrap().pop_front() {
            Some(ScriptedRead::Rows(rows)) => Ok(rows),
            Some(ScriptedRead::Error(status)) => Err(ApiError::Api {
                status,
                body: "scripted read failure".to_string(),
            }),
            None => Ok(Vec::new()),
        }
    }

    async fn update_result_metadata(
        &self,
        task_id: &TaskId,
        sequence: u32,
        update: &ResultMetadataUpdate,
    ) -> Result<ResultRow, ApiError> {
        // Echo the update back as the patched row.
        Ok(ResultRow {
            task_id: task_id.clone(),
            image_sequence_number: sequence,
            generation_status: GenerationStatus::Completed,
            file_path: Some(format!("outputs/{task_id}/{sequence}.png")),
            error_message: None,
            rating: update.rating,
            favorite: update.favorite.unwrap_or(false),
            user_notes: update.user_notes.clone(),
            tags: update.tags.clone().unwrap_or_default(),
        })
    }
}

/// Build a client over a scripted backend with the given poll config.
pub fn build_client(backend: Arc<ScriptedBackend>, poll: PollConfig) -> Arc<GenerationClient> {
    let mut config = ClientConfig::new(
        "http://localhost:8000",
        "http://localhost:8000/storage",
        "test-token",
        "test-user",
    );
    config.poll = poll;
    GenerationClient::with_backend(config, backend)
}

/// A valid request with `expected_outputs` outputs.
pub fn request(expected_outputs: u32) -> GenerationRequest {
    GenerationRequest {
        prompt: "golden hour rooftop portrait".to_string(),
        engine: "flux-dev".to_string(),
        aspect_ratio: "3:4".to_string(),
        guidance: Some(7.5),
        strength: Some(0.8),
        seed: Some(1234),
        reference_assets: vec![ReferenceAsset {
            url: "https://vault.example/face.png".to_string(),
            tag: TAG_FACE.to_string(),
        }],
        influencer_id: Some("mia".to_string()),
        expected_outputs,
    }
}

/// A result row for `task_id` with the given sequence and status.
pub fn row(task_id: &TaskId, seq: u32, status: GenerationStatus) -> ResultRow {
    ResultRow {
        task_id: task_id.clone(),
        image_sequence_number: seq,
        generation_status: status,
        file_path: matches!(status, GenerationStatus::Completed)
            .then(|| format!("outputs/{task_id}/{seq}.png")),
        error_message: None,
        rating: None,
        favorite: false,
        user_notes: None,
        tags: Vec::new(),
    }
}

/// A failed row carrying an error message.
pub fn failed_row(task_id: &TaskId, seq: u32, error: &str) -> ResultRow {
    let mut r = row(task_id, seq, GenerationStatus::Failed);
    r.error_message = Some(error.to_string());
    r
}

/// Receive the next event, letting the paused clock advance as needed.
pub async fn next_event(rx: &mut broadcast::Receiver<TaskEvent>) -> TaskEvent {
    tokio::time::timeout(Duration::from_secs(600), rx.recv())
        .await
        .expect("timed out waiting for an event")
        .expect("event channel closed")
}

/// Assert that no further event arrives within a generous window of
/// virtual time.
pub async fn assert_no_more_events(rx: &mut broadcast::Receiver<TaskEvent>) {
    match tokio::time::timeout(Duration::from_secs(60), rx.recv()).await {
        Err(_) => {}
        Ok(Err(_)) => {}
        Ok(Ok(event)) => panic!("Expected no further events, got {event:?}"),
    }
}
