//! Configuration loading and validation.
//!
//! Settings come from a TOML file plus `REELVAULT_`-prefixed
//! environment overrides; the TMDB credential is environment-only so
//! it never lands in a config file.

use std::path::Path;

use serde::{Deserialize, Serialize};

use reelvault_model::{ContentClass, QualityLadder};

use crate::error::{CoreError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scan: ScanConfig,
    pub quality: QualityConfig,
    pub tmdb: TmdbConfig,
    pub destinations: DestinationConfig,
    pub ai: AiConfig,
    pub database: DatabaseConfig,
    pub parser: ParserConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Remotes to watch, each carrying its content-class hint.
    pub remotes: Vec<RemoteConfig>,
    pub interval_minutes: u64,
    /// A file is stable once its size has not changed for this long.
    pub stability_check_seconds: u64,
    pub run_on_startup: bool,
    pub video_extensions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub name: String,
    #[serde(default = "default_content_class")]
    pub content: ContentClass,
}

fn default_content_class() -> ContentClass {
    ContentClass::Movie
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    /// Quality ladder, worst to best.
    pub priority: Vec<String>,
    /// Replace lower-quality copies automatically.
    pub auto_replace: bool,
    /// Minimum quality allowed to supersede a CAM copy.
    pub cam_replacement_threshold: String,
    /// Delete the source when the destination already holds an
    /// equal-or-better copy, instead of skipping it.
    pub delete_duplicate_sources: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TmdbConfig {
    pub language: String,
    pub include_adult: bool,
}

/// Destination root folder per content class.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DestinationConfig {
    pub movie: String,
    pub tvshow: String,
    pub anime: String,
    pub kdrama: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// AI metadata fallback is opt-in; the cascade is catalog-first
    /// with AI strictly as a last resort.
    pub enabled: bool,
    pub model: String,
    pub endpoint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Language assumed when the filename names none.
    pub fallback_language: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scan: ScanConfig::default(),
            quality: QualityConfig::default(),
            tmdb: TmdbConfig::default(),
            destinations: DestinationConfig::default(),
            ai: AiConfig::default(),
            database: DatabaseConfig::default(),
            parser: ParserConfig::default(),
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            remotes: Vec::new(),
            interval_minutes: 5,
            stability_check_seconds: 120,
            run_on_startup: true,
            video_extensions: [
                ".mkv", ".mp4", ".avi", ".mov", ".wmv", ".flv", ".webm", ".m4v",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            priority: [
                "CAM", "HDTS", "HDTC", "DVDScr", "DVDRip", "720p", "1080p", "2160p", "4K",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            auto_replace: true,
            cam_replacement_threshold: "720p".to_string(),
            delete_duplicate_sources: false,
        }
    }
}

impl Default for TmdbConfig {
    fn default() -> Self {
        Self {
            language: "en-US".to_string(),
            include_adult: false,
        }
    }
}

impl Default for DestinationConfig {
    fn default() -> Self {
        Self {
            movie: "Movies".to_string(),
            tvshow: "TV Shows".to_string(),
            anime: "Anime".to_string(),
            kdrama: "K-Drama".to_string(),
        }
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            model: "gpt-4o-mini".to_string(),
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "reelvault.db".to_string(),
        }
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            fallback_language: "English".to_string(),
        }
    }
}

impl Config {
    /// Load from a TOML file with `REELVAULT_` environment overrides
    /// layered on top (e.g. `REELVAULT_SCAN__INTERVAL_MINUTES=10`).
    pub fn load(path: &Path) -> Result<Config> {
        let builder = config::Config::builder()
            .add_source(config::File::from(path).required(true))
            .add_source(
                config::Environment::with_prefix("REELVAULT").separator("__"),
            );

        let cfg: Config = builder
            .build()
            .map_err(|e| CoreError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| CoreError::Config(e.to_string()))?;

        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        if self.scan.remotes.is_empty() {
            return Err(CoreError::Config(
                "at least one remote must be configured under [scan]".to_string(),
            ));
        }
        if self.quality.priority.is_empty() {
            return Err(CoreError::Config(
                "quality priority ladder must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// TMDB credential comes from the environment only.
    pub fn tmdb_api_key() -> Result<String> {
        std::env::var("TMDB_API_KEY")
            .map_err(|_| CoreError::Config("TMDB_API_KEY is not set".to_string()))
    }

    /// Optional OpenAI-compatible credential for the AI fallback.
    pub fn ai_api_key() -> Option<String> {
        std::env::var("OPENAI_API_KEY").ok()
    }

    pub fn content_class_for(&self, remote: &str) -> ContentClass {
        self.scan
            .remotes
            .iter()
            .find(|r| r.name == remote)
            .map(|r| r.content)
            .unwrap_or(ContentClass::Movie)
    }

    pub fn destination_root(&self, class: ContentClass) -> &str {
        match class {
            ContentClass::Movie => &self.destinations.movie,
            ContentClass::TvShow => &self.destinations.tvshow,
            ContentClass::Anime => &self.destinations.anime,
            ContentClass::KDrama => &self.destinations.kdrama,
        }
    }

    pub fn quality_ladder(&self) -> QualityLadder {
        QualityLadder::new(self.quality.priority.clone())
    }
}
