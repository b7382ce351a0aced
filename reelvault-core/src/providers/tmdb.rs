//! Thin TMDB v3 REST client.
//!
//! Written directly against the HTTP API so rate-limit handling stays
//! explicit: a fixed 250 ms spacing before every outbound call, and a
//! single retry honoring the server's Retry-After hint on 429.

use std::time::{Duration, Instant};

use serde::Deserialize;
use thiserror::Error;
use tokio::sync::Mutex;

use reelvault_model::MediaKind;

const BASE_URL: &str = "https://api.themoviedb.org/3";
const MIN_CALL_SPACING: Duration = Duration::from_millis(250);
const DEFAULT_RETRY_AFTER_SECS: u64 = 10;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Error, Debug)]
pub enum ProviderError {
    /// Invalid credential. Fatal at the startup probe; never expected
    /// mid-run.
    #[error("catalog rejected the API key")]
    Auth,

    #[error("rate limited even after honoring Retry-After ({retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("transient catalog failure: {0}")]
    Transient(String),

    #[error("unexpected catalog response: {0}")]
    Parse(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

/// One search hit, normalized across the movie and TV endpoints.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub id: u64,
    pub title: String,
    pub year: Option<i32>,
    pub popularity: f64,
    pub vote_count: i64,
}

#[derive(Debug, Deserialize)]
struct SearchResponse<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct MovieResult {
    id: u64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    release_date: String,
    #[serde(default)]
    popularity: f64,
    #[serde(default)]
    vote_count: i64,
}

#[derive(Debug, Deserialize)]
struct MovieDetails {
    #[serde(default)]
    release_date: String,
}

#[derive(Debug, Deserialize)]
struct TvDetails {
    #[serde(default)]
    first_air_date: String,
}

#[derive(Debug, Deserialize)]
struct TvResult {
    id: u64,
    #[serde(default)]
    name: String,
    #[serde(default)]
    first_air_date: String,
    #[serde(default)]
    popularity: f64,
    #[serde(default)]
    vote_count: i64,
}

fn year_of(date: &str) -> Option<i32> {
    date.get(..4)?.parse().ok()
}

pub struct TmdbClient {
    http: reqwest::Client,
    api_key: String,
    language: String,
    include_adult: bool,
    last_call: Mutex<Option<Instant>>,
}

impl TmdbClient {
    pub fn new(api_key: String, language: String, include_adult: bool) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
            api_key,
            language,
            include_adult,
            last_call: Mutex::new(None),
        }
    }

    /// Startup probe; an auth failure here is fatal.
    pub async fn verify_auth(&self) -> Result<(), ProviderError> {
        let _ = self.get("/configuration", &[]).await?;
        tracing::info!("catalog credentials verified");
        Ok(())
    }

    pub async fn search_movie(
        &self,
        query: &str,
        year: Option<i32>,
    ) -> Result<Vec<Candidate>, ProviderError> {
        let mut params = vec![("query".to_string(), query.to_string())];
        if let Some(year) = year {
            params.push(("year".to_string(), year.to_string()));
        }
        let body = self.get("/search/movie", &params).await?;
        let parsed: SearchResponse<MovieResult> =
            serde_json::from_str(&body).map_err(|e| ProviderError::Parse(e.to_string()))?;
        Ok(parsed
            .results
            .into_iter()
            .map(|r| Candidate {
                id: r.id,
                title: r.title,
                year: year_of(&r.release_date),
                popularity: r.popularity,
                vote_count: r.vote_count,
            })
            .collect())
    }

    pub async fn search_tv(
        &self,
        query: &str,
        year: Option<i32>,
    ) -> Result<Vec<Candidate>, ProviderError> {
        let mut params = vec![("query".to_string(), query.to_string())];
        if let Some(year) = year {
            params.push(("first_air_date_year".to_string(), year.to_string()));
        }
        let body = self.get("/search/tv", &params).await?;
        let parsed: SearchResponse<TvResult> =
            serde_json::from_str(&body).map_err(|e| ProviderError::Parse(e.to_string()))?;
        Ok(parsed
            .results
            .into_iter()
            .map(|r| Candidate {
                id: r.id,
                title: r.name,
                year: year_of(&r.first_air_date),
                popularity: r.popularity,
                vote_count: r.vote_count,
            })
            .collect())
    }

    /// Release year from the details endpoint, for matches whose
    /// search hit carried no date.
    pub async fn release_year(
        &self,
        kind: MediaKind,
        id: u64,
    ) -> Result<Option<i32>, ProviderError> {
        let body = match kind {
            MediaKind::Movie => {
                let body = self.get(&format!("/movie/{id}"), &[]).await?;
                let details: MovieDetails = serde_json::from_str(&body)
                    .map_err(|e| ProviderError::Parse(e.to_string()))?;
                details.release_date
            }
            MediaKind::Series => {
                let body = self.get(&format!("/tv/{id}"), &[]).await?;
                let details: TvDetails = serde_json::from_str(&body)
                    .map_err(|e| ProviderError::Parse(e.to_string()))?;
                details.first_air_date
            }
        };
        Ok(year_of(&body))
    }

    async fn get(
        &self,
        path: &str,
        params: &[(String, String)],
    ) -> Result<String, ProviderError> {
        self.pace().await;
        match self.get_once(path, params).await {
            Err(ProviderError::RateLimited { retry_after_secs }) => {
                tracing::warn!(retry_after_secs, path, "rate limited, retrying once");
                tokio::time::sleep(Duration::from_secs(retry_after_secs)).await;
                self.pace().await;
                self.get_once(path, params).await
            }
            other => other,
        }
    }

    async fn get_once(
        &self,
        path: &str,
        params: &[(String, String)],
    ) -> Result<String, ProviderError> {
        let url = format!("{BASE_URL}{path}");
        let response = self
            .http
            .get(&url)
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("language", self.language.as_str()),
                ("include_adult", if self.include_adult { "true" } else { "false" }),
            ])
            .query(params)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    ProviderError::Transient(e.to_string())
                } else {
                    ProviderError::Http(e)
                }
            })?;

        match response.status().as_u16() {
            200 => Ok(response.text().await?),
            401 => Err(ProviderError::Auth),
            429 => {
                let retry_after_secs = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
                Err(ProviderError::RateLimited { retry_after_secs })
            }
            status => Err(ProviderError::Transient(format!("HTTP {status} from {path}"))),
        }
    }

    /// Enforce the minimum spacing between outbound calls.
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn year_parses_from_release_dates() {
        assert_eq!(year_of("2024-07-01"), Some(2024));
        assert_eq!(year_of("1999"), Some(1999));
        assert_eq!(year_of(""), None);
        assert_eq!(year_of("n/a"), None);
    }

    #[test]
    fn search_response_tolerates_missing_fields() {
        let body = r#"{"results":[{"id":5,"title":"Maa"},{"id":6,"title":"Other","release_date":"2025-06-27","popularity":120.5,"vote_count":1500}]}"#;
        let parsed: SearchResponse<MovieResult> = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.results.len(), 2);
        assert_eq!(parsed.results[0].vote_count, 0);
        assert_eq!(year_of(&parsed.results[1].release_date), Some(2025));
    }
}
