//! Shared data types for the Reelvault pipeline.
//!
//! Everything in this crate is plain data: no I/O, no network, no
//! database handles. The flow through the pipeline is
//! `FileRef` -> [`ParsedFilename`] -> [`CatalogMatch`] ->
//! [`MoveDecision`], with [`QualityRecord`] and ledger rows as the
//! persisted state the decision stage reads and the executor writes.

pub mod decision;
pub mod files;
pub mod media;
pub mod parsed;
pub mod quality;
pub mod records;

pub use decision::{DecisionAction, MoveDecision, ReplaceTarget, ResolvedMetadata};
pub use files::{FileRef, RemoteEntry, ScannedFile};
pub use media::{CatalogMatch, ContentClass, MediaKind};
pub use parsed::ParsedFilename;
pub use quality::{Quality, QualityLadder};
pub use records::{LedgerEntry, ProcessedStatus, QualityRecord};
