//! Lifecycle events delivered to subscribers.
//!
//! Every post-submission outcome -- including backend failures and
//! client-declared timeouts -- is modeled as an event on this channel,
//! never as an error crossing the subscribe boundary. The consuming UI
//! decides presentation.

use serde::Serialize;

use muse_core::display::DisplayRecord;
use muse_core::status::{TaskPhase, TimeoutKind};
use muse_core::types::TaskId;

/// An event in the lifecycle of one generation task.
///
/// Events that carry `records` include the full ordered display list
/// for the task at the moment of the event, so consumers can render
/// statelessly.
#[derive(Debug, Clone, Serialize)]
pub enum TaskEvent {
    /// Placeholders were synthesized at submission time, before any
    /// poll has returned data.
    PlaceholdersReady {
        task_id: TaskId,
        records: Vec<DisplayRecord>,
    },

    /// The display list changed (rows arrived or changed status).
    Snapshot {
        task_id: TaskId,
        records: Vec<DisplayRecord>,
    },

    /// The task moved to a new non-terminal phase.
    PhaseChanged { task_id: TaskId, phase: TaskPhase },

    /// Every expected output completed. Terminal.
    Completed {
        task_id: TaskId,
        records: Vec<DisplayRecord>,
    },

    /// The backend explicitly failed the task. Terminal. Carries the
    /// backend's reason verbatim when one was recorded.
    Failed {
        task_id: TaskId,
        error: Option<String>,
        records: Vec<DisplayRecord>,
    },

    /// The polling attempt budget was exhausted without a terminal
    /// status. Terminal, distinct from [`TaskEvent::Failed`].
    TimedOut {
        task_id: TaskId,
        kind: TimeoutKind,
        records: Vec<DisplayRecord>,
    },
}

impl TaskEvent {
    /// The task this event belongs to, for subscriber-side filtering.
    pub fn task_id(&self) -> &TaskId {
        match self {
            Self::PlaceholdersReady { task_id, .. }
            | Self::Snapshot { task_id, .. }
            | Self::PhaseChanged { task_id, .. }
            | Self::Completed { task_id, .. }
            | Self::Failed { task_id, .. }
            | Self::TimedOut { task_id, .. } => task_id,
        }
    }

    /// Whether this event ends the task's lifecycle.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed { .. } | Self::Failed { .. } | Self::TimedOut { .. }
        )
    }
}
