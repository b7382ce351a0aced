use std::fmt;

use serde::{Deserialize, Serialize};

/// What kind of catalog entity a match refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaKind {
    Movie,
    Series,
}

impl MediaKind {
    /// Stable string form used as part of the quality-record key.
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Movie => "movie",
            MediaKind::Series => "tv",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<MediaKind> {
        match s {
            "movie" => Some(MediaKind::Movie),
            "tv" => Some(MediaKind::Series),
            _ => None,
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Content classification driving destination folder layout.
///
/// Anime and K-drama are preserved from the source remote's configured
/// hint; the catalog itself only distinguishes movie from series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentClass {
    Movie,
    TvShow,
    Anime,
    KDrama,
}

impl ContentClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentClass::Movie => "movie",
            ContentClass::TvShow => "tvshow",
            ContentClass::Anime => "anime",
            ContentClass::KDrama => "kdrama",
        }
    }

    pub fn is_series(&self) -> bool {
        !matches!(self, ContentClass::Movie)
    }

    /// Reconcile this hint with what the catalog said the match is.
    /// A series match keeps an anime/kdrama hint; a movie match always
    /// wins over any series hint.
    pub fn reconcile(self, kind: MediaKind) -> ContentClass {
        match kind {
            MediaKind::Movie => ContentClass::Movie,
            MediaKind::Series => match self {
                ContentClass::Anime | ContentClass::KDrama => self,
                _ => ContentClass::TvShow,
            },
        }
    }
}

impl fmt::Display for ContentClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a catalog lookup, scored against the parsed filename.
/// Ephemeral: only the identifier survives, via the quality record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogMatch {
    pub tmdb_id: u64,
    pub kind: MediaKind,
    pub title: String,
    pub year: Option<i32>,
    /// Match confidence in [0.0, 1.0].
    pub confidence: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reconcile_preserves_regional_series_classes() {
        assert_eq!(
            ContentClass::Anime.reconcile(MediaKind::Series),
            ContentClass::Anime
        );
        assert_eq!(
            ContentClass::KDrama.reconcile(MediaKind::Series),
            ContentClass::KDrama
        );
        assert_eq!(
            ContentClass::Movie.reconcile(MediaKind::Series),
            ContentClass::TvShow
        );
        assert_eq!(
            ContentClass::Anime.reconcile(MediaKind::Movie),
            ContentClass::Movie
        );
    }
}
