use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::media::MediaKind;

/// Terminal outcome recorded in the processed-file ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessedStatus {
    Success,
    Failed,
    Skipped,
    DuplicateDeleted,
}

impl ProcessedStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessedStatus::Success => "success",
            ProcessedStatus::Failed => "failed",
            ProcessedStatus::Skipped => "skipped",
            ProcessedStatus::DuplicateDeleted => "duplicate_deleted",
        }
    }

    /// Statuses that keep a path out of future scans. Failed files are
    /// deliberately re-offered so they can succeed once the underlying
    /// issue is fixed.
    pub fn is_terminal_for_scan(&self) -> bool {
        !matches!(self, ProcessedStatus::Failed)
    }
}

/// Currently filed copy for one catalog entity (and episode, for
/// series). Sole source of truth for replacement comparisons; one row
/// per key, overwritten on every successful move or replace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityRecord {
    pub tmdb_id: i64,
    pub kind: MediaKind,
    pub season: Option<i64>,
    pub episode: Option<i64>,
    pub quality: String,
    pub remote: String,
    pub path: String,
}

/// One ledger row: the terminal outcome for a source path together
/// with whatever identity was resolved for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub remote: String,
    pub original_path: String,
    pub destination_path: Option<String>,
    pub tmdb_id: Option<i64>,
    pub kind: Option<MediaKind>,
    pub title: String,
    pub year: Option<i32>,
    pub season: Option<u32>,
    pub episode: Option<u32>,
    pub quality: String,
    pub content_class: String,
    pub status: ProcessedStatus,
    pub error_message: Option<String>,
    pub processed_at: DateTime<Utc>,
}
