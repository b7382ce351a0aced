//! End-to-end executor behavior against a scripted fake transfer.
//!
//! The central property under test: replacing an existing copy moves
//! the new file first, and the superseded copy is never deleted unless
//! that move succeeded.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use reelvault_core::executor::{ExecutionResult, Executor};
use reelvault_core::transfer::{FileTransfer, TransferError};
use reelvault_core::Store;
use reelvault_model::{
    ContentClass, DecisionAction, FileRef, MediaKind, MoveDecision, Quality, RemoteEntry,
    ReplaceTarget, ResolvedMetadata,
};

#[derive(Default)]
struct FakeTransfer {
    fail_moves: bool,
    calls: Mutex<Vec<String>>,
}

impl FakeTransfer {
    fn failing_moves() -> Self {
        Self {
            fail_moves: true,
            ..Self::default()
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl FileTransfer for FakeTransfer {
    async fn list(&self, _remote: &str) -> Result<Vec<RemoteEntry>, TransferError> {
        Ok(Vec::new())
    }

    async fn move_file(&self, source: &FileRef, dest: &FileRef) -> Result<(), TransferError> {
        self.record(format!("move {} -> {}", source.path, dest.path));
        if self.fail_moves {
            return Err(TransferError::CommandFailed {
                command: "moveto".to_string(),
                stderr: "simulated failure".to_string(),
            });
        }
        Ok(())
    }

    async fn delete_file(&self, file: &FileRef) -> Result<(), TransferError> {
        self.record(format!("delete {}", file.path));
        Ok(())
    }

    async fn exists(&self, _file: &FileRef) -> Result<bool, TransferError> {
        Ok(true)
    }

    async fn remove_empty_dirs(&self, _remote: &str, path: &str) -> Result<(), TransferError> {
        self.record(format!("rmdirs {path}"));
        Ok(())
    }

    async fn is_remote_available(&self, _remote: &str) -> bool {
        true
    }
}

fn metadata() -> ResolvedMetadata {
    ResolvedMetadata {
        title: "Maa".to_string(),
        year: Some(2025),
        season: None,
        episode: None,
        quality: Quality::P1080,
        languages: vec!["Hindi".to_string()],
        content_class: ContentClass::Movie,
        tmdb_id: Some(77),
        kind: Some(MediaKind::Movie),
    }
}

fn replace_decision() -> MoveDecision {
    MoveDecision {
        action: DecisionAction::Replace,
        source: FileRef::new("movies", "incoming/Maa.2025.1080p.mkv"),
        destination_path: Some("Movies/Maa (2025) - Hindi/Maa (2025) - Hindi - 1080p.mkv".to_string()),
        metadata: metadata(),
        replace_target: Some(ReplaceTarget {
            remote: "movies".to_string(),
            path: "Movies/Maa (2025) - Hindi/Maa (2025) - Hindi - CAM.mkv".to_string(),
        }),
        error_reason: None,
    }
}

fn move_decision() -> MoveDecision {
    MoveDecision {
        action: DecisionAction::Move,
        source: FileRef::new("movies", "incoming/Maa.2025.1080p.mkv"),
        destination_path: Some("Movies/Maa (2025) - Hindi/Maa (2025) - Hindi - 1080p.mkv".to_string()),
        metadata: metadata(),
        replace_target: None,
        error_reason: None,
    }
}

#[tokio::test]
async fn failed_move_during_replace_never_deletes_the_old_copy() {
    let transfer = Arc::new(FakeTransfer::failing_moves());
    let store = Store::open_in_memory().await.unwrap();
    let executor = Executor::new(transfer.clone(), store.clone(), false);

    let result = executor.execute(&replace_decision()).await.unwrap();

    assert!(matches!(result, ExecutionResult::Failed(_)));
    let calls = transfer.calls();
    assert!(calls.iter().any(|c| c.starts_with("move ")));
    assert!(
        !calls.iter().any(|c| c.starts_with("delete ")),
        "old copy must survive a failed move: {calls:?}"
    );

    // The failure is recorded, but the path stays eligible for rescan.
    assert!(!store
        .is_processed("movies", "incoming/Maa.2025.1080p.mkv")
        .await
        .unwrap());
    let counts = store.ledger_counts().await.unwrap();
    assert_eq!(counts, vec![("failed".to_string(), 1)]);
}

#[tokio::test]
async fn successful_replace_moves_before_deleting() {
    let transfer = Arc::new(FakeTransfer::default());
    let store = Store::open_in_memory().await.unwrap();
    let executor = Executor::new(transfer.clone(), store.clone(), false);

    let result = executor.execute(&replace_decision()).await.unwrap();
    assert_eq!(result, ExecutionResult::Replaced);

    let calls = transfer.calls();
    let move_at = calls.iter().position(|c| c.starts_with("move ")).unwrap();
    let delete_at = calls.iter().position(|c| c.starts_with("delete ")).unwrap();
    assert!(move_at < delete_at, "move must precede delete: {calls:?}");

    // The quality record now points at the new copy.
    let record = store
        .get_quality(77, MediaKind::Movie, None, None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.quality, "1080p");
    assert_eq!(
        record.path,
        "Movies/Maa (2025) - Hindi/Maa (2025) - Hindi - 1080p.mkv"
    );
}

#[tokio::test]
async fn successful_move_records_ledger_and_quality() {
    let transfer = Arc::new(FakeTransfer::default());
    let store = Store::open_in_memory().await.unwrap();
    let executor = Executor::new(transfer.clone(), store.clone(), false);

    let result = executor.execute(&move_decision()).await.unwrap();
    assert_eq!(result, ExecutionResult::Moved);

    assert!(store
        .is_processed("movies", "incoming/Maa.2025.1080p.mkv")
        .await
        .unwrap());
    assert!(store
        .get_quality(77, MediaKind::Movie, None, None)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn skip_records_outcome_without_touching_the_remote() {
    let transfer = Arc::new(FakeTransfer::default());
    let store = Store::open_in_memory().await.unwrap();
    let executor = Executor::new(transfer.clone(), store.clone(), false);

    let decision = MoveDecision {
        action: DecisionAction::Skip,
        destination_path: None,
        ..move_decision()
    };
    let result = executor.execute(&decision).await.unwrap();

    assert_eq!(result, ExecutionResult::Skipped);
    assert!(transfer.calls().is_empty());
    assert!(store
        .is_processed("movies", "incoming/Maa.2025.1080p.mkv")
        .await
        .unwrap());
}

#[tokio::test]
async fn delete_source_removes_duplicate_and_records_it() {
    let transfer = Arc::new(FakeTransfer::default());
    let store = Store::open_in_memory().await.unwrap();
    let executor = Executor::new(transfer.clone(), store.clone(), false);

    let decision = MoveDecision {
        action: DecisionAction::DeleteSource,
        destination_path: None,
        ..move_decision()
    };
    let result = executor.execute(&decision).await.unwrap();

    assert_eq!(result, ExecutionResult::SourceDeleted);
    assert!(transfer
        .calls()
        .iter()
        .any(|c| c == "delete incoming/Maa.2025.1080p.mkv"));

    let counts = store.ledger_counts().await.unwrap();
    assert_eq!(counts, vec![("duplicate_deleted".to_string(), 1)]);
}

#[tokio::test]
async fn error_decision_marks_failed_and_leaves_file() {
    let transfer = Arc::new(FakeTransfer::default());
    let store = Store::open_in_memory().await.unwrap();
    let executor = Executor::new(transfer.clone(), store.clone(), false);

    let decision = MoveDecision::error(
        FileRef::new("movies", "incoming/garbled.mkv"),
        metadata(),
        "could not resolve identity".to_string(),
    );
    let result = executor.execute(&decision).await.unwrap();

    assert!(matches!(result, ExecutionResult::Failed(_)));
    assert!(transfer.calls().is_empty());
    assert!(!store.is_processed("movies", "incoming/garbled.mkv").await.unwrap());
}

#[tokio::test]
async fn dry_run_neither_touches_nor_records() {
    let transfer = Arc::new(FakeTransfer::default());
    let store = Store::open_in_memory().await.unwrap();
    let executor = Executor::new(transfer.clone(), store.clone(), true);

    let result = executor.execute(&replace_decision()).await.unwrap();

    assert_eq!(result, ExecutionResult::DryRun);
    assert!(transfer.calls().is_empty());
    assert!(store.ledger_counts().await.unwrap().is_empty());
}
