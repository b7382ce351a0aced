use serde::{Deserialize, Serialize};

use crate::quality::Quality;

/// Best-effort facts extracted from a release filename.
///
/// Recomputed per file, never persisted. Parsing cannot fail: unknown
/// fields default rather than erroring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedFilename {
    /// The filename stem the parse was derived from.
    pub original_name: String,
    pub title: String,
    pub year: Option<i32>,
    pub season: Option<u32>,
    pub episode: Option<u32>,
    /// Final episode of a multi-episode file (`S01E01E03` style).
    pub episode_end: Option<u32>,
    pub is_multi_episode: bool,
    pub quality: Quality,
    /// Detected languages in order of appearance, deduplicated. Never
    /// empty: falls back to the configured default language.
    pub languages: Vec<String>,
    pub is_series: bool,
    /// Lowercased extension including the leading dot, or empty.
    pub extension: String,
    pub release_group: Option<String>,
}

impl ParsedFilename {
    /// Copy of this parse with a substituted title/year, used when a
    /// correction source (web search, AI) proposes a better identity.
    pub fn with_correction(
        &self,
        title: String,
        year: Option<i32>,
        is_series: bool,
    ) -> ParsedFilename {
        ParsedFilename {
            title,
            year: year.or(self.year),
            is_series: is_series || self.is_series,
            ..self.clone()
        }
    }
}
