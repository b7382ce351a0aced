//! Carries out decisions against the remote, exactly once each.
//!
//! The one hard ordering rule lives here: a replace moves the new file
//! first and deletes the superseded copy only after the move is
//! confirmed. A failed move aborts with the old file intact; a failed
//! deletion is logged for manual cleanup and does not fail the
//! operation.

use std::sync::Arc;

use chrono::Utc;

use reelvault_model::{
    DecisionAction, FileRef, LedgerEntry, MediaKind, MoveDecision, ProcessedStatus,
    QualityRecord,
};

use crate::error::Result;
use crate::store::Store;
use crate::transfer::FileTransfer;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionResult {
    Moved,
    Replaced,
    Skipped,
    SourceDeleted,
    Failed(String),
    /// Dry-run mode: logged only, nothing touched or recorded.
    DryRun,
}

pub struct Executor {
    transfer: Arc<dyn FileTransfer>,
    store: Store,
    dry_run: bool,
}

impl Executor {
    pub fn new(transfer: Arc<dyn FileTransfer>, store: Store, dry_run: bool) -> Self {
        Self {
            transfer,
            store,
            dry_run,
        }
    }

    pub async fn execute(&self, decision: &MoveDecision) -> Result<ExecutionResult> {
        if self.dry_run {
            tracing::info!(
                action = decision.action.as_str(),
                source = %decision.source,
                destination = ?decision.destination_path,
                "dry run"
            );
            return Ok(ExecutionResult::DryRun);
        }

        match decision.action {
            DecisionAction::Move => self.do_move(decision).await,
            DecisionAction::Replace => self.do_replace(decision).await,
            DecisionAction::Skip => {
                self.record(decision, ProcessedStatus::Skipped, None).await?;
                self.clear_stability(&decision.source).await;
                Ok(ExecutionResult::Skipped)
            }
            DecisionAction::DeleteSource => self.do_delete_source(decision).await,
            DecisionAction::Error => {
                // File stays untouched and will be re-offered once the
                // underlying problem is fixed.
                self.record(decision, ProcessedStatus::Failed, None).await?;
                let reason = decision
                    .error_reason
                    .clone()
                    .unwrap_or_else(|| "unresolved".to_string());
                Ok(ExecutionResult::Failed(reason))
            }
        }
    }

    async fn do_move(&self, decision: &MoveDecision) -> Result<ExecutionResult> {
        let Some(destination_path) = decision.destination_path.as_deref() else {
            let reason = "move decision carried no destination".to_string();
            self.fail(decision, &reason).await?;
            return Ok(ExecutionResult::Failed(reason));
        };
        let destination = FileRef::new(decision.source.remote.clone(), destination_path);

        if let Err(e) = self.transfer.move_file(&decision.source, &destination).await {
            let reason = format!("move failed: {e}");
            tracing::error!(source = %decision.source, %destination, error = %e, "move failed");
            self.fail(decision, &reason).await?;
            return Ok(ExecutionResult::Failed(reason));
        }

        self.bookkeep_success(decision, destination_path).await?;
        Ok(ExecutionResult::Moved)
    }

    async fn do_replace(&self, decision: &MoveDecision) -> Result<ExecutionResult> {
        let Some(destination_path) = decision.destination_path.as_deref() else {
            let reason = "replace decision carried no destination".to_string();
            self.fail(decision, &reason).await?;
            return Ok(ExecutionResult::Failed(reason));
        };
        let destination = FileRef::new(decision.source.remote.clone(), destination_path);

        // Move first. Any failure here aborts with the old file intact.
        if let Err(e) = self.transfer.move_file(&decision.source, &destination).await {
            let reason = format!("replace aborted, move failed: {e}");
            tracing::error!(source = %decision.source, %destination, error = %e, "replace aborted");
            self.fail(decision, &reason).await?;
            return Ok(ExecutionResult::Failed(reason));
        }

        // Verify the new copy before touching the old one. A failed
        // verification call is tolerated; a confirmed absence is not.
        let verified = match self.transfer.exists(&destination).await {
            Ok(present) => present,
            Err(e) => {
                tracing::warn!(%destination, error = %e, "could not verify new copy, proceeding");
                true
            }
        };

        if let Some(target) = &decision.replace_target {
            if verified {
                let old = FileRef::new(target.remote.clone(), target.path.clone());
                if let Err(e) = self.transfer.delete_file(&old).await {
                    tracing::error!(%old, error = %e, "superseded copy not deleted, clean up manually");
                } else if let Some(parent) = old.parent_path() {
                    self.cleanup_dirs(&old.remote, parent).await;
                }
            } else {
                tracing::error!(
                    %destination,
                    old = %target.path,
                    "new copy missing after move, keeping superseded file"
                );
            }
        }

        self.bookkeep_success(decision, destination_path).await?;
        Ok(ExecutionResult::Replaced)
    }

    async fn do_delete_source(&self, decision: &MoveDecision) -> Result<ExecutionResult> {
        if let Err(e) = self.transfer.delete_file(&decision.source).await {
            let reason = format!("duplicate deletion failed: {e}");
            tracing::error!(source = %decision.source, error = %e, "duplicate deletion failed");
            self.fail(decision, &reason).await?;
            return Ok(ExecutionResult::Failed(reason));
        }

        self.record(decision, ProcessedStatus::DuplicateDeleted, None)
            .await?;
        self.clear_stability(&decision.source).await;
        if let Some(parent) = decision.source.parent_path() {
            self.cleanup_dirs(&decision.source.remote, parent).await;
        }
        Ok(ExecutionResult::SourceDeleted)
    }

    /// Shared post-move bookkeeping: ledger, quality record, stability
    /// row, and source-side directory cleanup.
    async fn bookkeep_success(
        &self,
        decision: &MoveDecision,
        destination_path: &str,
    ) -> Result<()> {
        self.record(decision, ProcessedStatus::Success, Some(destination_path))
            .await?;
        if let Some(record) = quality_record(decision, destination_path) {
            self.store.upsert_quality(&record).await?;
        }
        self.clear_stability(&decision.source).await;
        if let Some(parent) = decision.source.parent_path() {
            self.cleanup_dirs(&decision.source.remote, parent).await;
        }
        Ok(())
    }

    async fn fail(&self, decision: &MoveDecision, reason: &str) -> Result<()> {
        let mut entry = ledger_entry(decision, ProcessedStatus::Failed, None);
        entry.error_message = Some(reason.to_string());
        self.store.record_ledger(&entry).await
    }

    async fn record(
        &self,
        decision: &MoveDecision,
        status: ProcessedStatus,
        destination: Option<&str>,
    ) -> Result<()> {
        self.store
            .record_ledger(&ledger_entry(decision, status, destination))
            .await
    }

    async fn clear_stability(&self, file: &FileRef) {
        if let Err(e) = self.store.clear_stability(&file.remote, &file.path).await {
            tracing::warn!(%file, error = %e, "stability row not cleared");
        }
    }

    async fn cleanup_dirs(&self, remote: &str, path: &str) {
        if let Err(e) = self.transfer.remove_empty_dirs(remote, path).await {
            tracing::debug!(remote, path, error = %e, "empty-dir cleanup skipped");
        }
    }
}

fn ledger_entry(
    decision: &MoveDecision,
    status: ProcessedStatus,
    destination: Option<&str>,
) -> LedgerEntry {
    let m = &decision.metadata;
    LedgerEntry {
        remote: decision.source.remote.clone(),
        original_path: decision.source.path.clone(),
        destination_path: destination.map(str::to_string),
        tmdb_id: m.tmdb_id.map(|id| id as i64),
        kind: m.kind,
        title: m.title.clone(),
        year: m.year,
        season: m.season,
        episode: m.episode,
        quality: m.quality.label().to_string(),
        content_class: m.content_class.as_str().to_string(),
        status,
        error_message: decision.error_reason.clone(),
        processed_at: Utc::now(),
    }
}

/// Quality record for a filed copy; None when the identity carries no
/// catalog id to key on.
fn quality_record(decision: &MoveDecision, destination_path: &str) -> Option<QualityRecord> {
    let m = &decision.metadata;
    let (tmdb_id, kind) = m.tmdb_id.zip(m.kind)?;
    let (season, episode) = match kind {
        MediaKind::Movie => (None, None),
        MediaKind::Series => (m.season.map(i64::from), m.episode.map(i64::from)),
    };
    Some(QualityRecord {
        tmdb_id: tmdb_id as i64,
        kind,
        season,
        episode,
        quality: m.quality.label().to_string(),
        remote: decision.source.remote.clone(),
        path: destination_path.to_string(),
    })
}
