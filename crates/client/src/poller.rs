//! Fixed-interval result polling.
//!
//! [`poll_task`] is the single polling primitive used for every
//! submitted task: wait the fixed interval, issue one read, interpret
//! the rows, repeat until a terminal phase or the attempt budget runs
//! out. Reads are strictly sequential -- attempt `k + 1` is never issued
//! before attempt `k`'s response has been processed -- and the
//! [`CancellationToken`] is honored before every scheduled re-poll.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use muse_core::display::{mark_timed_out, reconcile, DisplayRecord};
use muse_core::result::sort_rows;
use muse_core::status::{first_failure_message, phase_from_rows, TaskPhase, TimeoutKind};
use muse_core::types::TaskId;

use crate::api::TaskBackend;
use crate::events::TaskEvent;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Tunable parameters for the polling loop.
#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    /// Fixed delay between consecutive read attempts.
    pub interval: Duration,
    /// Total read attempts before the task is declared timed out.
    pub max_attempts: u32,
}

impl Default for PollConfig {
    /// 5 seconds x 60 attempts -- a 5-minute overall budget.
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_attempts: 60,
        }
    }
}

// ---------------------------------------------------------------------------
// Polling loop
// ---------------------------------------------------------------------------

/// Poll the results endpoint for one task until a terminal outcome.
///
/// Runs as a spawned task, one per submission. `records` is the initial
/// display list (the placeholder set synthesized at submission time).
/// Events are emitted on `event_tx`:
///
/// - a `Snapshot` whenever the display list changes,
/// - a `PhaseChanged` for each non-terminal phase transition, exactly
///   once per transition, in order,
/// - exactly one terminal event (`Completed`, `Failed`, or `TimedOut`).
///
/// A failed read is retried after the same fixed delay and counts
/// against the same attempt budget; it only escalates to a timeout when
/// the budget is exhausted without a terminal observation.
pub async fn poll_task(
    backend: Arc<dyn TaskBackend>,
    task_id: TaskId,
    expected: u32,
    mut records: Vec<DisplayRecord>,
    config: PollConfig,
    cancel: CancellationToken,
    event_tx: broadcast::Sender<TaskEvent>,
) {
    let mut phase = TaskPhase::Pending;
    let mut seen_rows = false;

    for attempt in 1..=config.max_attempts {
        // Wait before the next read, respecting cancellation.
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!(task_id = %task_id, attempt, "Polling cancelled");
                return;
            }
            _ = tokio::time::sleep(config.interval) => {}
        }

        let rows = match backend.fetch_results(&task_id).await {
            Ok(rows) => rows,
            Err(e) => {
                // A single failed read does not abort polling.
                tracing::warn!(
                    task_id = %task_id,
                    attempt,
                    error = %e,
                    "Result read failed, will retry",
                );
                continue;
            }
        };

        if rows.is_empty() {
            tracing::debug!(task_id = %task_id, attempt, "No result rows yet");
            continue;
        }
        seen_rows = true;

        let rows = sort_rows(rows);
        let next_phase = phase.advance(phase_from_rows(&rows, expected));

        let merged = reconcile(&records, rows.clone());
        if merged != records {
            records = merged;
            let _ = event_tx.send(TaskEvent::Snapshot {
                task_id: task_id.clone(),
                records: records.clone(),
            });
        }

        if next_phase != phase {
            phase = next_phase;
            match phase {
                TaskPhase::Completed => {
                    tracing::info!(task_id = %task_id, attempt, "Task completed");
                    let _ = event_tx.send(TaskEvent::Completed {
                        task_id,
                        records,
                    });
                    return;
                }
                TaskPhase::Failed => {
                    let error = first_failure_message(&rows);
                    tracing::warn!(
                        task_id = %task_id,
                        attempt,
                        error = error.as_deref().unwrap_or("<no reason recorded>"),
                        "Task failed",
                    );
                    let _ = event_tx.send(TaskEvent::Failed {
                        task_id,
                        error,
                        records,
                    });
                    return;
                }
                _ => {
                    tracing::debug!(task_id = %task_id, ?phase, "Task phase changed");
                    let _ = event_tx.send(TaskEvent::PhaseChanged {
                        task_id: task_id.clone(),
                        phase,
                    });
                }
            }
        }
    }

    // Attempt budget exhausted without a terminal status.
    let kind = if seen_rows {
        TimeoutKind::StuckProcessing
    } else {
        TimeoutKind::NeverObserved
    };
    tracing::warn!(
        task_id = %task_id,
        attempts = config.max_attempts,
        ?kind,
        "Polling budget exhausted",
    );

    if !seen_rows {
        // Placeholders are converted to a failed display state rather
        // than silently removed.
        records = mark_timed_out(records);
        let _ = event_tx.send(TaskEvent::Snapshot {
            task_id: task_id.clone(),
            records: records.clone(),
        });
    }

    let _ = event_tx.send(TaskEvent::TimedOut {
        task_id,
        kind,
        records,
    });
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
