//! Catalog matching: turn a parsed filename into a scored TMDB match.

use std::collections::HashSet;
use std::sync::Arc;

use reelvault_model::{CatalogMatch, ContentClass, MediaKind, ParsedFilename};

use crate::normalizer::{normalize_for_compare, normalize_title, significant_words};
use crate::providers::tmdb::{Candidate, ProviderError, TmdbClient};

/// Best score below which the matcher retries with a cleaned-up title.
const RETRY_NORMALIZED_BELOW: f32 = 0.4;
/// Score below which the significant-words fallback may fire. It also
/// requires that no match was found at all: a truncated query can pull
/// in a higher-scoring wrong candidate, so an existing weak match is
/// left alone.
const RETRY_WORDS_BELOW: f32 = 0.3;
/// Endpoint score below which the other endpoint is also queried.
const CROSS_ENDPOINT_BELOW: f32 = 0.5;
/// How many hits per endpoint are worth scoring.
const CANDIDATES_PER_ENDPOINT: usize = 5;

pub struct CatalogMatcher {
    tmdb: Arc<TmdbClient>,
}

impl CatalogMatcher {
    pub fn new(tmdb: Arc<TmdbClient>) -> Self {
        Self { tmdb }
    }

    /// Find the best catalog match for a parsed filename. Returns the
    /// highest-scoring match found across the retry ladder, or None;
    /// acceptance thresholds are the caller's concern.
    pub async fn match_parsed(
        &self,
        parsed: &ParsedFilename,
        hint: ContentClass,
    ) -> Option<CatalogMatch> {
        let series_leaning = parsed.is_series || hint.is_series();

        let mut best = self.attempt(&parsed.title, parsed.year, series_leaning).await;

        if best_confidence(&best) < RETRY_NORMALIZED_BELOW {
            let cleaned = normalize_title(&parsed.title);
            if !cleaned.is_empty() && cleaned != parsed.title {
                tracing::debug!(original = %parsed.title, retry = %cleaned, "retrying with normalized title");
                let retry = self.attempt(&cleaned, parsed.year, series_leaning).await;
                best = better_of(best, retry);
            }
        }

        if wants_words_retry(&best) {
            let words = significant_words(&parsed.title, 3);
            if !words.is_empty() && words != normalize_for_compare(&parsed.title) {
                tracing::debug!(original = %parsed.title, retry = %words, "retrying with significant words");
                let retry = self.attempt(&words, None, series_leaning).await;
                best = better_of(best, retry);
            }
        }

        // Search hits occasionally omit the date; backfill from the
        // details endpoint so destination folders still carry a year.
        if let Some(ref mut m) = best {
            if m.year.is_none() {
                match self.tmdb.release_year(m.kind, m.tmdb_id).await {
                    Ok(year) => m.year = year,
                    Err(e) => {
                        tracing::debug!(error = %e, tmdb_id = m.tmdb_id, "year backfill failed")
                    }
                }
            }
        }

        best
    }

    /// Query the intent-matching endpoint, crossing over to the other
    /// one when the best hit is weak.
    async fn attempt(
        &self,
        title: &str,
        year: Option<i32>,
        series_leaning: bool,
    ) -> Option<CatalogMatch> {
        let primary = if series_leaning {
            MediaKind::Series
        } else {
            MediaKind::Movie
        };
        let mut best = self.search_scored(title, year, primary).await;

        if best_confidence(&best) < CROSS_ENDPOINT_BELOW {
            let secondary = match primary {
                MediaKind::Movie => MediaKind::Series,
                MediaKind::Series => MediaKind::Movie,
            };
            let other = self.search_scored(title, year, secondary).await;
            best = better_of(best, other);
        }

        best
    }

    async fn search_scored(
        &self,
        title: &str,
        year: Option<i32>,
        kind: MediaKind,
    ) -> Option<CatalogMatch> {
        let result = match kind {
            MediaKind::Movie => self.tmdb.search_movie(title, year).await,
            MediaKind::Series => self.tmdb.search_tv(title, year).await,
        };

        let candidates = match result {
            Ok(candidates) => candidates,
            // Mid-run provider failures degrade this attempt only; a
            // bad credential is caught by the startup probe.
            Err(ProviderError::Auth) => {
                tracing::error!("catalog rejected credentials mid-run");
                return None;
            }
            Err(e) => {
                tracing::warn!(error = %e, %kind, query = title, "catalog search failed");
                return None;
            }
        };

        candidates
            .into_iter()
            .take(CANDIDATES_PER_ENDPOINT)
            .map(|c| {
                let confidence = score_candidate(&c, title, year);
                CatalogMatch {
                    tmdb_id: c.id,
                    kind,
                    title: c.title,
                    year: c.year,
                    confidence,
                }
            })
            .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
    }
}

fn best_confidence(m: &Option<CatalogMatch>) -> f32 {
    m.as_ref().map(|m| m.confidence).unwrap_or(0.0)
}

fn wants_words_retry(best: &Option<CatalogMatch>) -> bool {
    best.is_none() && best_confidence(best) < RETRY_WORDS_BELOW
}

fn better_of(a: Option<CatalogMatch>, b: Option<CatalogMatch>) -> Option<CatalogMatch> {
    match (a, b) {
        (Some(a), Some(b)) => Some(if b.confidence > a.confidence { b } else { a }),
        (a, b) => a.or(b),
    }
}

/// Confidence model: title agreement dominates, year agreement is
/// strong supporting evidence, popularity and vote counts are weak
/// tie-breakers. Always clipped to [0, 1].
fn score_candidate(candidate: &Candidate, query_title: &str, query_year: Option<i32>) -> f32 {
    let mut score = 0.0f32;

    let query_norm = normalize_for_compare(query_title);
    let candidate_norm = normalize_for_compare(&candidate.title);

    if !query_norm.is_empty() && query_norm == candidate_norm {
        score += 0.5;
    } else if !query_norm.is_empty()
        && (candidate_norm.contains(&query_norm) || query_norm.contains(&candidate_norm))
    {
        score += 0.3;
    } else {
        let query_tokens: HashSet<&str> = query_norm.split_whitespace().collect();
        let candidate_tokens: HashSet<&str> = candidate_norm.split_whitespace().collect();
        let larger = query_tokens.len().max(candidate_tokens.len());
        if larger > 0 {
            let common = query_tokens.intersection(&candidate_tokens).count();
            score += (common as f32 / larger as f32) * 0.3;
        }
    }

    match (query_year, candidate.year) {
        (Some(q), Some(c)) if q == c => score += 0.3,
        (Some(q), Some(c)) if (q - c).abs() == 1 => score += 0.15,
        _ => {}
    }

    if candidate.popularity > 100.0 {
        score += 0.1;
    } else if candidate.popularity > 50.0 {
        score += 0.05;
    }

    if candidate.vote_count > 1000 {
        score += 0.1;
    } else if candidate.vote_count > 100 {
        score += 0.05;
    }

    score.clamp(0.0, 1.0)
}
