//! Core library for Reelvault.
//!
//! Resolves the true identity of a media file from an unreliable
//! filename and decides whether it should be filed as new content,
//! replace an existing lower-quality copy, be skipped as a duplicate,
//! or be rejected as unresolvable. The pipeline is strictly
//! sequential: parse -> catalog match -> web correction -> optional AI
//! fallback -> replacement check -> execution.

pub mod config;
pub mod engine;
pub mod error;
pub mod executor;
pub mod filename_parser;
pub mod matcher;
pub mod normalizer;
pub mod providers;
pub mod scanner;
pub mod store;
pub mod transfer;
pub mod web_verify;

pub use config::Config;
pub use engine::DecisionEngine;
pub use error::{CoreError, Result};
pub use executor::{ExecutionResult, Executor};
pub use filename_parser::FilenameParser;
pub use matcher::CatalogMatcher;
pub use scanner::Scanner;
pub use store::Store;
pub use transfer::{FileTransfer, RcloneTransfer};
