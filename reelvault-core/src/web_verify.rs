//! Web search correction for mangled titles.
//!
//! Scrapes the DuckDuckGo HTML endpoint for the parsed title and looks
//! for results pointing at the big catalog sites. Strictly best-effort:
//! every failure path degrades to None and the cascade moves on.

use std::time::{Duration, Instant};

use once_cell::sync::Lazy;
use regex::Regex;
use tokio::sync::Mutex;

use reelvault_model::MediaKind;

use crate::normalizer::titles_similar;

const SEARCH_URL: &str = "https://html.duckduckgo.com/html/";
const MIN_CALL_SPACING: Duration = Duration::from_secs(1);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const MAX_RESULTS: usize = 5;

static RESULT_ANCHOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<a[^>]*class="result__a"[^>]*href="([^"]+)"[^>]*>(.*?)</a>"#).unwrap()
});
static TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());
static YEAR_PAREN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(((?:19|20)\d{2})\)").unwrap());
static YEAR_BARE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b((?:19|20)\d{2})\b").unwrap());

/// A corrected identity suggested by search results.
#[derive(Debug, Clone)]
pub struct TitleCorrection {
    pub title: String,
    pub year: Option<i32>,
    pub kind: Option<MediaKind>,
    pub confidence: f32,
}

pub struct WebTitleVerifier {
    http: reqwest::Client,
    last_call: Mutex<Option<Instant>>,
}

impl Default for WebTitleVerifier {
    fn default() -> Self {
        Self::new()
    }
}

impl WebTitleVerifier {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .user_agent("Mozilla/5.0 (X11; Linux x86_64) Gecko/20100101 Firefox/128.0")
                .build()
                .unwrap_or_default(),
            last_call: Mutex::new(None),
        }
    }

    /// Search the web for what a title most likely refers to.
    pub async fn search_title(
        &self,
        title: &str,
        year: Option<i32>,
        kind_hint: Option<MediaKind>,
    ) -> Option<TitleCorrection> {
        let query = build_query(title, year, kind_hint);

        self.pace().await;
        let html = match self
            .http
            .get(SEARCH_URL)
            .query(&[("q", query.as_str())])
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    tracing::debug!(error = %e, "web search body unreadable");
                    return None;
                }
            },
            Ok(response) => {
                tracing::debug!(status = %response.status(), "web search refused");
                return None;
            }
            Err(e) => {
                tracing::debug!(error = %e, "web search failed");
                return None;
            }
        };

        let correction = best_correction(&html, title);
        if let Some(ref c) = correction {
            tracing::debug!(
                original = title,
                corrected = %c.title,
                confidence = c.confidence,
                "web correction found"
            );
        }
        correction
    }

    async fn pace(&self) {
        let mut last = self.last_call.lock().await;
        if let Some(at) = *last {
            let elapsed = at.elapsed();
            if elapsed < MIN_CALL_SPACING {
                tokio::time::sleep(MIN_CALL_SPACING - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// The query names the catalog site so its pages rank near the top;
/// the kind hint disambiguates films from shows with the same title.
fn build_query(title: &str, year: Option<i32>, kind_hint: Option<MediaKind>) -> String {
    let mut query = title.to_string();
    if let Some(year) = year {
        query.push_str(&format!(" {year}"));
    }
    query.push_str(match kind_hint {
        Some(MediaKind::Series) => " TV series TMDB",
        Some(MediaKind::Movie) => " movie TMDB",
        None => " TMDB",
    });
    query
}

fn best_correction(html: &str, original_title: &str) -> Option<TitleCorrection> {
    let results: Vec<(String, String)> = RESULT_ANCHOR
        .captures_iter(html)
        .take(MAX_RESULTS)
        .map(|caps| {
            let link = resolve_redirect(&caps[1]);
            let text = clean_text(&caps[2]);
            (link, text)
        })
        .collect();

    // Catalog-site hits are authoritative regardless of rank.
    for (link, text) in &results {
        let confidence = if link.contains("themoviedb.org") {
            0.9
        } else if link.contains("imdb.com") {
            0.85
        } else {
            continue;
        };
        return Some(TitleCorrection {
            title: extract_title(text),
            year: extract_year(text),
            kind: extract_kind(link, text),
            confidence,
        });
    }

    // A generic first result counts only when it resembles what we
    // searched for.
    let (link, text) = results.first()?;
    let candidate = extract_title(text);
    if !titles_similar(&candidate, original_title) {
        return None;
    }
    Some(TitleCorrection {
        title: candidate,
        year: extract_year(text),
        kind: extract_kind(link, text),
        confidence: 0.5,
    })
}

/// DuckDuckGo wraps result links in a redirect with the target in the
/// `uddg` parameter.
fn resolve_redirect(href: &str) -> String {
    let absolute = if href.starts_with("//") {
        format!("https:{href}")
    } else {
        href.to_string()
    };
    if let Ok(url) = url::Url::parse(&absolute) {
        if let Some((_, target)) = url.query_pairs().find(|(k, _)| k == "uddg") {
            return target.into_owned();
        }
    }
    absolute
}

fn clean_text(fragment: &str) -> String {
    let stripped = TAGS.replace_all(fragment, "");
    stripped
        .replace("&amp;", "&")
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&quot;", "\"")
        .trim()
        .to_string()
}

/// Result titles come formatted like "Maa (2025) - IMDb"; keep the
/// part before the first separator and drop the year.
fn extract_title(text: &str) -> String {
    let head = text
        .split(" - ")
        .next()
        .and_then(|h| h.split(" | ").next())
        .unwrap_or(text);
    let without_year = YEAR_PAREN.replace_all(head, "");
    without_year.trim().trim_end_matches(['-', '|', ':']).trim().to_string()
}

fn extract_year(text: &str) -> Option<i32> {
    YEAR_PAREN
        .captures(text)
        .or_else(|| YEAR_BARE.captures(text))
        .and_then(|caps| caps[1].parse().ok())
}

fn extract_kind(link: &str, text: &str) -> Option<MediaKind> {
    if link.contains("/tv/") {
        return Some(MediaKind::Series);
    }
    if link.contains("/movie/") {
        return Some(MediaKind::Movie);
    }
    let lower = text.to_lowercase();
    if lower.contains("tv series") || lower.contains("tv show") {
        Some(MediaKind::Series)
    } else if lower.contains("film") || lower.contains("movie") {
        Some(MediaKind::Movie)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchor(href: &str, text: &str) -> String {
        format!(r#"<a rel="nofollow" class="result__a" href="{href}">{text}</a>"#)
    }

    #[test]
    fn prefers_catalog_site_hits() {
        let html = [
            anchor("https://example.com/blog", "Some blog post about films"),
            anchor(
                "//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.themoviedb.org%2Fmovie%2F12345-maa",
                "Maa (2025) - The Movie Database",
            ),
        ]
        .join("\n");

        let correction = best_correction(&html, "Maa").unwrap();
        assert_eq!(correction.title, "Maa");
        assert_eq!(correction.year, Some(2025));
        assert_eq!(correction.kind, Some(MediaKind::Movie));
        assert!((correction.confidence - 0.9).abs() < 1e-6);
    }

    #[test]
    fn imdb_hit_scores_slightly_lower() {
        let html = anchor(
            "https://www.imdb.com/title/tt0137523/",
            "Fight Club (1999) - IMDb",
        );
        let correction = best_correction(&html, "Fight Club").unwrap();
        assert!((correction.confidence - 0.85).abs() < 1e-6);
        assert_eq!(correction.year, Some(1999));
    }

    #[test]
    fn tv_path_sets_series_kind() {
        let html = anchor(
            "https://www.themoviedb.org/tv/93405-squid-game",
            "Squid Game (TV Series 2021) &#x27;s page",
        );
        let correction = best_correction(&html, "Squid Game").unwrap();
        assert_eq!(correction.kind, Some(MediaKind::Series));
    }

    #[test]
    fn generic_result_requires_similarity() {
        let similar = anchor("https://example.com/a", "The Matrix full plot");
        assert!(best_correction(&similar, "Matrix").is_some());
        let matched = best_correction(&similar, "Matrix").unwrap();
        assert!((matched.confidence - 0.5).abs() < 1e-6);

        let unrelated = anchor("https://example.com/a", "Ten unrelated gardening tips");
        assert!(best_correction(&unrelated, "Matrix").is_none());
    }

    #[test]
    fn query_names_the_catalog_site() {
        assert_eq!(
            build_query("Maa", Some(2025), Some(MediaKind::Movie)),
            "Maa 2025 movie TMDB"
        );
        assert_eq!(
            build_query("Squid Game", None, Some(MediaKind::Series)),
            "Squid Game TV series TMDB"
        );
        assert_eq!(build_query("Maa", None, None), "Maa TMDB");
    }

    #[test]
    fn no_results_yields_none() {
        assert!(best_correction("<html><body></body></html>", "Anything").is_none());
    }
}
