use serde::{Deserialize, Serialize};

use crate::files::FileRef;
use crate::media::{ContentClass, MediaKind};
use crate::quality::Quality;

/// Terminal action for a single file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionAction {
    /// File new content at the destination.
    Move,
    /// Supersede an existing lower-quality copy: move first, delete
    /// the old file only after the move is confirmed.
    Replace,
    /// Leave the source alone and never offer it again.
    Skip,
    /// The destination already holds an equal-or-better copy; delete
    /// the source to clear the duplicate.
    DeleteSource,
    /// Identity could not be resolved; leave the file for manual
    /// intervention or a later scan.
    Error,
}

impl DecisionAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionAction::Move => "move",
            DecisionAction::Replace => "replace",
            DecisionAction::Skip => "skip",
            DecisionAction::DeleteSource => "delete_source",
            DecisionAction::Error => "error",
        }
    }
}

/// Identity resolved by the matching cascade, carried on the decision
/// for destination rendering and bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedMetadata {
    pub title: String,
    pub year: Option<i32>,
    pub season: Option<u32>,
    pub episode: Option<u32>,
    pub quality: Quality,
    pub languages: Vec<String>,
    pub content_class: ContentClass,
    pub tmdb_id: Option<u64>,
    pub kind: Option<MediaKind>,
}

/// The file an accepted replace supersedes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplaceTarget {
    pub remote: String,
    pub path: String,
}

/// Final output of the decision pipeline. Immutable once built and
/// consumed exactly once by the executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveDecision {
    pub action: DecisionAction,
    pub source: FileRef,
    /// Rendered destination path on the source's remote. Absent for
    /// error decisions.
    pub destination_path: Option<String>,
    pub metadata: ResolvedMetadata,
    /// Set only for replace and delete-source actions.
    pub replace_target: Option<ReplaceTarget>,
    /// Human-readable reason, set only for error decisions.
    pub error_reason: Option<String>,
}

impl MoveDecision {
    pub fn error(source: FileRef, metadata: ResolvedMetadata, reason: String) -> Self {
        MoveDecision {
            action: DecisionAction::Error,
            source,
            destination_path: None,
            metadata,
            replace_target: None,
            error_reason: Some(reason),
        }
    }
}
