//! Result statuses and the client-side task lifecycle state machine.
//!
//! [`GenerationStatus`] mirrors the wire values the backend writes on
//! result rows. [`TaskPhase`] is the client's aggregate view of a whole
//! task, derived from the rows observed so far via [`phase_from_rows`]
//! and advanced monotonically via [`TaskPhase::advance`] so that a
//! stale read can never move a task backwards.

use serde::{Deserialize, Serialize};

use crate::result::ResultRow;

// ---------------------------------------------------------------------------
// Wire status
// ---------------------------------------------------------------------------

/// Status of a single result row as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl GenerationStatus {
    /// `completed` and `failed` are terminal: the backend never updates
    /// a row past either of them.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

// ---------------------------------------------------------------------------
// Task phase
// ---------------------------------------------------------------------------

/// Which flavor of client-declared timeout was reached.
///
/// Both mean the polling attempt budget ran out without a terminal
/// status, but they are surfaced distinctly: `NeverObserved` means the
/// backend never produced a single row for the task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutKind {
    /// The attempt budget ran out before any result row was seen.
    NeverObserved,
    /// Rows were seen but never all reached a terminal status.
    StuckProcessing,
}

/// Client-observed lifecycle of a whole task.
///
/// ```text
/// Unsubmitted -> Pending -> Processing -> Completed
///                      \            \--> Failed
///                       \----------------> TimedOut (client-declared)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPhase {
    /// No submission has happened yet.
    Unsubmitted,
    /// Submitted; no row has reached `processing` yet.
    Pending,
    /// At least one row is processing (or partially terminal).
    Processing,
    /// Every expected row completed.
    Completed,
    /// All rows terminal and at least one failed.
    Failed,
    /// The polling attempt budget was exhausted.
    TimedOut(TimeoutKind),
}

impl TaskPhase {
    /// Terminal phases never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::TimedOut(_))
    }

    /// Monotonic ordering used to reject backwards transitions.
    fn rank(&self) -> u8 {
        match self {
            Self::Unsubmitted => 0,
            Self::Pending => 1,
            Self::Processing => 2,
            Self::Completed | Self::Failed | Self::TimedOut(_) => 3,
        }
    }

    /// Advance the phase given a freshly observed phase.
    ///
    /// - A terminal phase absorbs everything (no further transitions).
    /// - An observation that would move the task backwards (e.g. a read
    ///   returning all-pending rows after `Processing` was seen) keeps
    ///   the current phase.
    pub fn advance(self, observed: TaskPhase) -> TaskPhase {
        if self.is_terminal() {
            return self;
        }
        if observed.rank() < self.rank() {
            return self;
        }
        observed
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Derive the aggregate [`TaskPhase`] from the rows observed in one
/// poll read.
///
/// - No rows yet -> `Pending`.
/// - All of the `expected` rows present and terminal -> `Failed` if any
///   row failed, otherwise `Completed`.
/// - Any activity short of that (a processing row, a partial terminal
///   set, fewer rows than expected) -> `Processing`.
/// - Rows present but all still `pending` -> `Pending`.
pub fn phase_from_rows(rows: &[ResultRow], expected: u32) -> TaskPhase {
    if rows.is_empty() {
        return TaskPhase::Pending;
    }

    let all_terminal = rows.iter().all(|r| r.generation_status.is_terminal());
    if all_terminal && rows.len() >= expected as usize {
        if rows
            .iter()
            .any(|r| r.generation_status == GenerationStatus::Failed)
        {
            return TaskPhase::Failed;
        }
        return TaskPhase::Completed;
    }

    let any_activity = rows
        .iter()
        .any(|r| r.generation_status != GenerationStatus::Pending);
    if any_activity {
        TaskPhase::Processing
    } else {
        TaskPhase::Pending
    }
}

/// First failure reason among the rows, in sequence order.
///
/// Callers should sort the rows first so "first" is deterministic.
pub fn first_failure_message(rows: &[ResultRow]) -> Option<String> {
    rows.iter()
        .find(|r| r.generation_status == GenerationStatus::Failed)
        .and_then(|r| r.error_message.clone())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::ResultRow;
    use crate::types::TaskId;

    fn row(seq: u32, status: GenerationStatus) -> ResultRow {
        ResultRow {
            task_id: TaskId::new("t1"),
            image_sequence_number: seq,
            generation_status: status,
            file_path: None,
            error_message: None,
            rating: None,
            favorite: false,
            user_notes: None,
            tags: Vec::new(),
        }
    }

    // -- Wire status --

    #[test]
    fn completed_and_failed_are_terminal() {
        assert!(GenerationStatus::Completed.is_terminal());
        assert!(GenerationStatus::Failed.is_terminal());
        assert!(!GenerationStatus::Pending.is_terminal());
        assert!(!GenerationStatus::Processing.is_terminal());
    }

    #[test]
    fn status_deserializes_from_wire_values() {
        let s: GenerationStatus = serde_json::from_str(r#""processing""#).unwrap();
        assert_eq!(s, GenerationStatus::Processing);
    }

    // -- phase_from_rows --

    #[test]
    fn no_rows_is_pending() {
        assert_eq!(phase_from_rows(&[], 3), TaskPhase::Pending);
    }

    #[test]
    fn all_pending_rows_stay_pending() {
        let rows = vec![row(0, GenerationStatus::Pending)];
        assert_eq!(phase_from_rows(&rows, 1), TaskPhase::Pending);
    }

    #[test]
    fn processing_row_makes_task_processing() {
        let rows = vec![
            row(0, GenerationStatus::Pending),
            row(1, GenerationStatus::Processing),
        ];
        assert_eq!(phase_from_rows(&rows, 2), TaskPhase::Processing);
    }

    #[test]
    fn partial_terminal_set_is_still_processing() {
        // One of two expected rows completed -- keep waiting for the rest.
        let rows = vec![row(0, GenerationStatus::Completed)];
        assert_eq!(phase_from_rows(&rows, 2), TaskPhase::Processing);
    }

    #[test]
    fn all_expected_completed_is_completed() {
        let rows = vec![
            row(0, GenerationStatus::Completed),
            row(1, GenerationStatus::Completed),
        ];
        assert_eq!(phase_from_rows(&rows, 2), TaskPhase::Completed);
    }

    #[test]
    fn any_failed_among_terminal_is_failed() {
        let rows = vec![
            row(0, GenerationStatus::Completed),
            row(1, GenerationStatus::Failed),
        ];
        assert_eq!(phase_from_rows(&rows, 2), TaskPhase::Failed);
    }

    #[test]
    fn failed_row_with_sibling_processing_is_not_terminal() {
        let rows = vec![
            row(0, GenerationStatus::Failed),
            row(1, GenerationStatus::Processing),
        ];
        assert_eq!(phase_from_rows(&rows, 2), TaskPhase::Processing);
    }

    // -- advance --

    #[test]
    fn advance_moves_forward() {
        let p = TaskPhase::Pending.advance(TaskPhase::Processing);
        assert_eq!(p, TaskPhase::Processing);
    }

    #[test]
    fn advance_rejects_backwards_transition() {
        let p = TaskPhase::Processing.advance(TaskPhase::Pending);
        assert_eq!(p, TaskPhase::Processing);
    }

    #[test]
    fn terminal_phase_absorbs_all_observations() {
        let p = TaskPhase::Completed.advance(TaskPhase::Processing);
        assert_eq!(p, TaskPhase::Completed);

        let t = TaskPhase::TimedOut(TimeoutKind::NeverObserved).advance(TaskPhase::Completed);
        assert_eq!(t, TaskPhase::TimedOut(TimeoutKind::NeverObserved));
    }

    #[test]
    fn advance_reaches_terminal_from_processing() {
        let p = TaskPhase::Processing.advance(TaskPhase::Failed);
        assert_eq!(p, TaskPhase::Failed);
    }

    // -- first_failure_message --

    #[test]
    fn first_failure_message_picks_lowest_sequence() {
        let mut r0 = row(0, GenerationStatus::Failed);
        r0.error_message = Some("first".into());
        let mut r1 = row(1, GenerationStatus::Failed);
        r1.error_message = Some("second".into());

        assert_eq!(
            first_failure_message(&[r0, r1]).as_deref(),
            Some("first")
        );
    }

    #[test]
    fn first_failure_message_none_without_failures() {
        let rows = vec![row(0, GenerationStatus::Completed)];
        assert!(first_failure_message(&rows).is_none());
    }
}
