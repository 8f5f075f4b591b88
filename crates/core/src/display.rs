//! Placeholder records and display-list reconciliation.
//!
//! A placeholder is a client-only stand-in for a result row the backend
//! has not produced yet: it is synthesized at submission time (one per
//! expected output) so consumers can render immediately, and the whole
//! set is superseded the moment any real row for the task is observed.
//! Placeholders are never persisted and never sent to the backend.

use serde::Serialize;

use crate::result::{sort_rows, ResultRow};
use crate::types::{ClientId, TaskId, Timestamp};

// ---------------------------------------------------------------------------
// Models
// ---------------------------------------------------------------------------

/// Client-only stand-in for an expected result row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Placeholder {
    /// Synthetic id for keying in the display list.
    pub client_id: ClientId,
    pub task_id: TaskId,
    /// Which of the expected outputs this stands in for (0-based).
    pub index: u32,
    pub created_at: Timestamp,
}

/// One entry of the display list a subscriber renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DisplayRecord {
    /// Awaiting the first real row for this task.
    Pending { placeholder: Placeholder },
    /// Polling gave up without ever observing a row ("failed -- not
    /// found"). Shown rather than silently removed.
    NotFound { placeholder: Placeholder },
    /// A real backend result row.
    Result { row: ResultRow },
}

impl DisplayRecord {
    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Pending { .. } | Self::NotFound { .. })
    }
}

// ---------------------------------------------------------------------------
// Synthesis & reconciliation
// ---------------------------------------------------------------------------

/// Synthesize `n` pending placeholders for a freshly submitted task.
pub fn make_placeholders(task_id: &TaskId, n: u32) -> Vec<DisplayRecord> {
    let created_at = chrono::Utc::now();
    (0..n)
        .map(|index| DisplayRecord::Pending {
            placeholder: Placeholder {
                client_id: ClientId::new(),
                task_id: task_id.clone(),
                index,
                created_at,
            },
        })
        .collect()
}

/// Merge freshly polled rows into the current display list.
///
/// Real data fully supersedes the placeholder set: as soon as *any* row
/// exists for the task, every placeholder is dropped (regardless of the
/// row's status or how many rows arrived) and the list becomes the rows
/// sorted by sequence number. An empty read leaves the list untouched.
pub fn reconcile(current: &[DisplayRecord], rows: Vec<ResultRow>) -> Vec<DisplayRecord> {
    if rows.is_empty() {
        return current.to_vec();
    }
    sort_rows(rows)
        .into_iter()
        .map(|row| DisplayRecord::Result { row })
        .collect()
}

/// Convert remaining pending placeholders to the "not found" failed
/// display state after the polling budget is exhausted with no rows.
pub fn mark_timed_out(records: Vec<DisplayRecord>) -> Vec<DisplayRecord> {
    records
        .into_iter()
        .map(|record| match record {
            DisplayRecord::Pending { placeholder } => DisplayRecord::NotFound { placeholder },
            other => other,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
