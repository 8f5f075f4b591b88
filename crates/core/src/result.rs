//! Result row model and post-hoc metadata editing.
//!
//! A result row is owned by the backend: the client polls it and never
//! mutates it, with the single exception of the user-editable metadata
//! fields (rating, favorite, notes, tags) attached after generation.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::status::GenerationStatus;
use crate::types::TaskId;

// ---------------------------------------------------------------------------
// Validation limits
// ---------------------------------------------------------------------------

/// Minimum allowed rating value.
pub const MIN_RATING: i16 = 1;

/// Maximum allowed rating value.
pub const MAX_RATING: i16 = 5;

/// Maximum length for user notes.
pub const MAX_NOTES_LEN: usize = 5000;

/// Maximum number of tags on a single result.
pub const MAX_TAGS: usize = 20;

// ---------------------------------------------------------------------------
// Result row
// ---------------------------------------------------------------------------

/// One backend record describing the status/output of one expected
/// output image belonging to a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    pub task_id: TaskId,
    /// Position of this output within the task (0-based).
    pub image_sequence_number: u32,
    pub generation_status: GenerationStatus,
    /// Storage-relative output path. Present iff completed.
    #[serde(default)]
    pub file_path: Option<String>,
    /// Human-readable failure reason. Present iff failed.
    #[serde(default)]
    pub error_message: Option<String>,
    /// User rating (1-5), attached post-hoc.
    #[serde(default)]
    pub rating: Option<i16>,
    #[serde(default)]
    pub favorite: bool,
    #[serde(default)]
    pub user_notes: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Sort rows by sequence number ascending.
///
/// The results endpoint is asked to sort server-side, but display order
/// must hold even when the backend returns rows out of order, so the
/// client re-sorts on every delivery. The sort is stable: duplicate
/// sequence numbers keep their backend order.
pub fn sort_rows(mut rows: Vec<ResultRow>) -> Vec<ResultRow> {
    rows.sort_by_key(|r| r.image_sequence_number);
    rows
}

// ---------------------------------------------------------------------------
// Metadata editing
// ---------------------------------------------------------------------------

/// Fields a user may edit on a result after generation.
///
/// `None` means "leave unchanged".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultMetadataUpdate {
    pub rating: Option<i16>,
    pub favorite: Option<bool>,
    pub user_notes: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// Validate a metadata update against the limits above.
pub fn validate_metadata_update(update: &ResultMetadataUpdate) -> Result<(), CoreError> {
    if let Some(rating) = update.rating {
        if !(MIN_RATING..=MAX_RATING).contains(&rating) {
            return Err(CoreError::Validation(format!(
                "Rating must be between {MIN_RATING} and {MAX_RATING}, got {rating}"
            )));
        }
    }
    if let Some(ref notes) = update.user_notes {
        if notes.len() > MAX_NOTES_LEN {
            return Err(CoreError::Validation(format!(
                "Notes exceed maximum length of {MAX_NOTES_LEN} characters"
            )));
        }
    }
    if let Some(ref tags) = update.tags {
        if tags.len() > MAX_TAGS {
            return Err(CoreError::Validation(format!(
                "At most {MAX_TAGS} tags are allowed, got {}",
                tags.len()
            )));
        }
        if tags.iter().any(|t| t.trim().is_empty()) {
            return Err(CoreError::Validation(
                "Tags must not be empty or whitespace".to_string(),
            ));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
