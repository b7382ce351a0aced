//! The decision pipeline: resolve a file's identity, render its
//! destination, and decide whether it moves, replaces, or stays put.
//!
//! Identity resolution is an explicit ordered strategy list: direct
//! catalog match, web-corrected catalog match, then the optional AI
//! fallback. The first accepted result wins and later strategies are
//! never consulted. Exhaustion yields an error decision carrying the
//! best-effort parse so the ledger still records something useful.

use std::collections::HashSet;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use reelvault_model::{
    CatalogMatch, ContentClass, DecisionAction, FileRef, MediaKind, MoveDecision,
    ParsedFilename, Quality, QualityLadder, QualityRecord, ReplaceTarget, ResolvedMetadata,
};

use crate::config::{Config, QualityConfig};
use crate::filename_parser::FilenameParser;
use crate::matcher::CatalogMatcher;
use crate::providers::ai::AiClient;
use crate::store::Store;
use crate::web_verify::WebTitleVerifier;

/// Minimum catalog confidence to accept a match.
const ACCEPT_CATALOG: f32 = 0.6;
/// Minimum self-reported confidence to accept an AI guess.
const ACCEPT_AI: f32 = 0.7;
/// Catalog confidence needed to attach ids to an AI-resolved identity.
const AI_BOOKKEEPING: f32 = 0.5;

/// Titles that carry no identity of their own.
static JUNK_TITLES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    ["movie", "video", "film", "sample", "rarbg", "yify", "yts"]
        .into_iter()
        .collect()
});

static UNSAFE_PATH_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r#"[<>:"/\\|?*]"#).unwrap());
static MULTI_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{2,}").unwrap());

pub struct DecisionEngine {
    config: Arc<Config>,
    parser: FilenameParser,
    matcher: CatalogMatcher,
    web: WebTitleVerifier,
    ai: Option<AiClient>,
    store: Store,
    ladder: QualityLadder,
}

impl DecisionEngine {
    pub fn new(
        config: Arc<Config>,
        parser: FilenameParser,
        matcher: CatalogMatcher,
        web: WebTitleVerifier,
        ai: Option<AiClient>,
        store: Store,
    ) -> Self {
        let ladder = config.quality_ladder();
        Self {
            config,
            parser,
            matcher,
            web,
            ai,
            store,
            ladder,
        }
    }

    /// Decide what should happen to one file. Never fails: resolution
    /// exhaustion becomes an error decision, not an Err.
    pub async fn decide(&self, file: &FileRef) -> MoveDecision {
        let hint = self.config.content_class_for(&file.remote);
        let mut parsed = self.parser.parse(file.file_name());

        if is_generic_parse(&parsed) {
            if let Some(folder) = file.parent_folder() {
                tracing::info!(%file, folder, "generic filename, merging folder parse");
                parsed = merge_parses(&parsed, &self.parser.parse(folder));
            }
        }

        let metadata = match self.resolve_identity(&parsed, hint).await {
            Some(metadata) => metadata,
            None => {
                tracing::warn!(%file, title = %parsed.title, "identity resolution exhausted");
                return MoveDecision::error(
                    file.clone(),
                    best_effort_metadata(&parsed, hint),
                    format!("could not resolve identity for '{}'", parsed.original_name),
                );
            }
        };

        self.finish(file, &parsed, metadata).await
    }

    /// Run the strategy list and return the first accepted identity.
    async fn resolve_identity(
        &self,
        parsed: &ParsedFilename,
        hint: ContentClass,
    ) -> Option<ResolvedMetadata> {
        // 1. Direct catalog match on the parsed title.
        if let Some(m) = self.matcher.match_parsed(parsed, hint).await {
            if m.confidence >= ACCEPT_CATALOG {
                tracing::info!(title = %m.title, confidence = m.confidence, "direct catalog match");
                return Some(metadata_from_match(parsed, hint, &m));
            }
            tracing::debug!(title = %m.title, confidence = m.confidence, "direct match below threshold");
        }

        // 2. Web-corrected title, re-run through the catalog.
        let kind_hint = if parsed.is_series || hint.is_series() {
            Some(MediaKind::Series)
        } else {
            Some(MediaKind::Movie)
        };
        if let Some(correction) = self
            .web
            .search_title(&parsed.title, parsed.year, kind_hint)
            .await
        {
            if !correction.title.is_empty() {
                let corrected = parsed.with_correction(
                    correction.title,
                    correction.year,
                    matches!(correction.kind, Some(MediaKind::Series)),
                );
                if let Some(m) = self.matcher.match_parsed(&corrected, hint).await {
                    if m.confidence >= ACCEPT_CATALOG {
                        tracing::info!(
                            original = %parsed.title,
                            corrected = %corrected.title,
                            confidence = m.confidence,
                            "web-corrected catalog match"
                        );
                        return Some(metadata_from_match(&corrected, hint, &m));
                    }
                }
            }
        }

        // 3. AI fallback, strictly last and opt-in.
        let ai = self.ai.as_ref()?;
        match ai.guess(&parsed.original_name).await {
            Ok(Some(guess)) if guess.confidence >= ACCEPT_AI => {
                tracing::info!(title = %guess.title, confidence = guess.confidence, "AI fallback accepted");
                let mut metadata = metadata_from_guess(parsed, hint, &guess);
                // Best-effort id lookup so replacement bookkeeping works.
                let corrected =
                    parsed.with_correction(guess.title.clone(), guess.year, guess.is_series);
                if let Some(m) = self.matcher.match_parsed(&corrected, hint).await {
                    if m.confidence >= AI_BOOKKEEPING {
                        metadata.tmdb_id = Some(m.tmdb_id);
                        metadata.kind = Some(m.kind);
                        metadata.content_class = hint.reconcile(m.kind);
                    }
                }
                Some(metadata)
            }
            Ok(Some(guess)) => {
                tracing::debug!(confidence = guess.confidence, "AI guess below threshold");
                None
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "AI fallback failed");
                None
            }
        }
    }

    /// Render the destination and apply the replacement sub-decision.
    async fn finish(
        &self,
        file: &FileRef,
        parsed: &ParsedFilename,
        metadata: ResolvedMetadata,
    ) -> MoveDecision {
        let destination = render_destination(&self.config, &metadata, parsed);

        let existing = match metadata.tmdb_id.zip(metadata.kind) {
            Some((tmdb_id, kind)) => {
                let (season, episode) = match kind {
                    MediaKind::Movie => (None, None),
                    MediaKind::Series => (
                        metadata.season.map(i64::from),
                        metadata.episode.map(i64::from),
                    ),
                };
                match self
                    .store
                    .get_quality(tmdb_id as i64, kind, season, episode)
                    .await
                {
                    Ok(existing) => existing,
                    Err(e) => {
                        // Degrade to "nothing filed yet" rather than
                        // failing the whole file.
                        tracing::warn!(error = %e, %file, "quality lookup failed");
                        None
                    }
                }
            }
            None => None,
        };

        let outcome = replacement_outcome(
            &self.ladder,
            &self.config.quality,
            metadata.quality,
            existing.as_ref(),
        );

        match outcome {
            ReplacementOutcome::New => MoveDecision {
                action: DecisionAction::Move,
                source: file.clone(),
                destination_path: Some(destination),
                metadata,
                replace_target: None,
                error_reason: None,
            },
            ReplacementOutcome::Replace => {
                let existing = existing.as_ref();
                MoveDecision {
                    action: DecisionAction::Replace,
                    source: file.clone(),
                    destination_path: Some(destination),
                    replace_target: existing.map(|r| ReplaceTarget {
                        remote: r.remote.clone(),
                        path: r.path.clone(),
                    }),
                    metadata,
                    error_reason: None,
                }
            }
            ReplacementOutcome::Skip => {
                tracing::info!(%file, "equal or better copy already filed, skipping");
                MoveDecision {
                    action: DecisionAction::Skip,
                    source: file.clone(),
                    destination_path: None,
                    metadata,
                    replace_target: None,
                    error_reason: None,
                }
            }
            ReplacementOutcome::DeleteSource => {
                tracing::info!(%file, "equal or better copy already filed, deleting source");
                MoveDecision {
                    action: DecisionAction::DeleteSource,
                    source: file.clone(),
                    destination_path: None,
                    metadata,
                    replace_target: None,
                    error_reason: None,
                }
            }
        }
    }
}

/// A parse too weak to search for: three characters or fewer, a junk
/// word, or a bare one-word title with no year and no quality marker.
/// Short titles can still resolve directly; generic only means the
/// parent folder is worth consulting first.
fn is_generic_parse(parsed: &ParsedFilename) -> bool {
    let lower = parsed.title.to_lowercase();
    lower.chars().count() <= 3
        || JUNK_TITLES.contains(lower.as_str())
        || (parsed.year.is_none()
            && parsed.quality.is_unknown()
            && !parsed.is_series
            && lower.split_whitespace().count() <= 1)
}

/// Merge a generic file parse with its parent folder's parse. The
/// folder is the authoritative identity: its title (unless it too is
/// generic) and year win; per-file fields stay with the file.
fn merge_parses(file: &ParsedFilename, folder: &ParsedFilename) -> ParsedFilename {
    let mut languages = file.languages.clone();
    for lang in &folder.languages {
        if !languages.contains(lang) {
            languages.push(lang.clone());
        }
    }
    let title = if is_generic_parse(folder) {
        file.title.clone()
    } else {
        folder.title.clone()
    };
    ParsedFilename {
        original_name: file.original_name.clone(),
        title,
        year: folder.year.or(file.year),
        season: file.season.or(folder.season),
        episode: file.episode.or(folder.episode),
        episode_end: file.episode_end.or(folder.episode_end),
        is_multi_episode: file.is_multi_episode || folder.is_multi_episode,
        quality: if file.quality.is_unknown() {
            folder.quality
        } else {
            file.quality
        },
        languages,
        is_series: file.is_series || folder.is_series,
        extension: file.extension.clone(),
        release_group: file.release_group.clone().or(folder.release_group.clone()),
    }
}

fn metadata_from_match(
    parsed: &ParsedFilename,
    hint: ContentClass,
    m: &CatalogMatch,
) -> ResolvedMetadata {
    let (season, episode) = match m.kind {
        MediaKind::Movie => (None, None),
        MediaKind::Series => (parsed.season.or(Some(1)), parsed.episode),
    };
    ResolvedMetadata {
        title: m.title.clone(),
        year: m.year.or(parsed.year),
        season,
        episode,
        quality: parsed.quality,
        languages: parsed.languages.clone(),
        content_class: hint.reconcile(m.kind),
        tmdb_id: Some(m.tmdb_id),
        kind: Some(m.kind),
    }
}

fn metadata_from_guess(
    parsed: &ParsedFilename,
    hint: ContentClass,
    guess: &crate::providers::ai::AiGuess,
) -> ResolvedMetadata {
    let kind = if guess.is_series || parsed.is_series {
        MediaKind::Series
    } else {
        MediaKind::Movie
    };
    let (season, episode) = match kind {
        MediaKind::Movie => (None, None),
        MediaKind::Series => (
            parsed.season.or(guess.season).or(Some(1)),
            parsed.episode.or(guess.episode),
        ),
    };
    ResolvedMetadata {
        title: guess.title.clone(),
        year: guess.year.or(parsed.year),
        season,
        episode,
        quality: parsed.quality,
        languages: parsed.languages.clone(),
        content_class: hint.reconcile(kind),
        tmdb_id: None,
        kind: Some(kind),
    }
}

fn best_effort_metadata(parsed: &ParsedFilename, hint: ContentClass) -> ResolvedMetadata {
    ResolvedMetadata {
        title: parsed.title.clone(),
        year: parsed.year,
        season: parsed.season,
        episode: parsed.episode,
        quality: parsed.quality,
        languages: parsed.languages.clone(),
        content_class: hint,
        tmdb_id: None,
        kind: None,
    }
}

/// Strip filesystem-hostile characters from a path component.
fn sanitize(component: &str) -> String {
    let stripped = UNSAFE_PATH_CHARS.replace_all(component, "");
    MULTI_SPACE
        .replace_all(&stripped, " ")
        .trim()
        .trim_end_matches('.')
        .to_string()
}

/// Render the destination path on the source's remote.
///
/// Movies:  `Root/Title (Year) - Langs/Title (Year) - Langs - Quality.ext`
/// Series:  `Root/Title (Year) - Langs/Season NN/Title SNNENN - Langs.ext`
fn render_destination(
    config: &Config,
    metadata: &ResolvedMetadata,
    parsed: &ParsedFilename,
) -> String {
    let root = config.destination_root(metadata.content_class);
    let title = sanitize(&metadata.title);
    let base = match metadata.year {
        Some(year) => format!("{title} ({year})"),
        None => title.clone(),
    };
    let langs = if metadata.languages.is_empty() {
        String::new()
    } else {
        format!(" - {}", metadata.languages.join("-"))
    };
    let ext = &parsed.extension;

    let is_series = matches!(metadata.kind, Some(MediaKind::Series))
        || (metadata.kind.is_none() && metadata.season.is_some());

    if is_series {
        // Season and episode both default to 1 when the parse never
        // found one.
        let season = metadata.season.unwrap_or(1);
        let episode = metadata.episode.unwrap_or(1);
        let mut tag = format!("S{season:02}E{episode:02}");
        if let Some(end) = parsed.episode_end.filter(|_| parsed.is_multi_episode) {
            tag.push_str(&format!("-E{end:02}"));
        }
        format!("{root}/{base}{langs}/Season {season:02}/{title} {tag}{langs}{ext}")
    } else {
        let quality_suffix = if metadata.quality.is_unknown() {
            String::new()
        } else {
            format!(" - {}", metadata.quality)
        };
        format!("{root}/{base}{langs}/{base}{langs}{quality_suffix}{ext}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReplacementOutcome {
    New,
    Replace,
    Skip,
    DeleteSource,
}

/// The quality replacement sub-decision against the filed copy.
fn replacement_outcome(
    ladder: &QualityLadder,
    quality_cfg: &QualityConfig,
    new_quality: Quality,
    existing: Option<&QualityRecord>,
) -> ReplacementOutcome {
    let Some(existing) = existing else {
        return ReplacementOutcome::New;
    };
    let existing_quality = Quality::from_label(&existing.quality);

    if ladder.is_better(&new_quality, &existing_quality) {
        if !quality_cfg.auto_replace {
            return ReplacementOutcome::Skip;
        }
        // A CAM copy is only superseded by something worth keeping.
        if existing_quality == Quality::Cam
            && !ladder.meets_threshold(&new_quality, &quality_cfg.cam_replacement_threshold)
        {
            return ReplacementOutcome::Skip;
        }
        ReplacementOutcome::Replace
    } else if quality_cfg.delete_duplicate_sources {
        ReplacementOutcome::DeleteSource
    } else {
        ReplacementOutcome::Skip
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(quality: &str) -> QualityRecord {
        QualityRecord {
            tmdb_id: 7,
            kind: MediaKind::Movie,
            season: None,
            episode: None,
            quality: quality.to_string(),
            remote: "movies".to_string(),
            path: "Movies/X/X.mkv".to_string(),
        }
    }

    fn quality_cfg() -> QualityConfig {
        QualityConfig::default()
    }

    #[test]
    fn no_existing_copy_means_move() {
        let outcome =
            replacement_outcome(&QualityLadder::default(), &quality_cfg(), Quality::P720, None);
        assert_eq!(outcome, ReplacementOutcome::New);
    }

    #[test]
    fn better_quality_replaces() {
        let existing = record("720p");
        let outcome = replacement_outcome(
            &QualityLadder::default(),
            &quality_cfg(),
            Quality::P1080,
            Some(&existing),
        );
        assert_eq!(outcome, ReplacementOutcome::Replace);
    }

    #[test]
    fn worse_quality_skips() {
        // 1080p already filed, a 720p copy arrives: keep the original.
        let existing = record("1080p");
        let outcome = replacement_outcome(
            &QualityLadder::default(),
            &quality_cfg(),
            Quality::P720,
            Some(&existing),
        );
        assert_eq!(outcome, ReplacementOutcome::Skip);
    }

    #[test]
    fn cam_threshold_gates_replacement() {
        let existing = record("CAM");

        // Threshold 720p: a 720p copy may supersede the CAM.
        let mut cfg = quality_cfg();
        cfg.cam_replacement_threshold = "720p".to_string();
        let outcome = replacement_outcome(
            &QualityLadder::default(),
            &cfg,
            Quality::P720,
            Some(&existing),
        );
        assert_eq!(outcome, ReplacementOutcome::Replace);

        // Threshold 1080p: the same 720p copy is not good enough.
        cfg.cam_replacement_threshold = "1080p".to_string();
        let outcome = replacement_outcome(
            &QualityLadder::default(),
            &cfg,
            Quality::P720,
            Some(&existing),
        );
        assert_eq!(outcome, ReplacementOutcome::Skip);
    }

    #[test]
    fn auto_replace_off_always_skips_upgrades() {
        let existing = record("720p");
        let mut cfg = quality_cfg();
        cfg.auto_replace = false;
        let outcome = replacement_outcome(
            &QualityLadder::default(),
            &cfg,
            Quality::P2160,
            Some(&existing),
        );
        assert_eq!(outcome, ReplacementOutcome::Skip);
    }

    #[test]
    fn duplicate_deletion_is_opt_in() {
        let existing = record("1080p");
        let mut cfg = quality_cfg();
        cfg.delete_duplicate_sources = true;
        let outcome = replacement_outcome(
            &QualityLadder::default(),
            &cfg,
            Quality::P1080,
            Some(&existing),
        );
        assert_eq!(outcome, ReplacementOutcome::DeleteSource);
    }

    #[test]
    fn generic_parse_detection() {
        let parser = FilenameParser::default();
        assert!(is_generic_parse(&parser.parse("movie.mkv")));
        assert!(is_generic_parse(&parser.parse("ab.mkv")));
        // Three characters or fewer counts as generic even with a year
        // and quality attached; the folder gets a look first.
        assert!(is_generic_parse(&parser.parse("MAA.2025.1080p.mkv")));
        assert!(!is_generic_parse(&parser.parse("Inception.2010.mkv")));
    }

    #[test]
    fn folder_merge_prefers_folder_identity_and_file_specifics() {
        let parser = FilenameParser::default();
        let file = parser.parse("sample.1080p.mkv");
        let folder = parser.parse("Inception (2010)");
        let merged = merge_parses(&file, &folder);
        assert_eq!(merged.title, "Inception");
        assert_eq!(merged.year, Some(2010));
        assert_eq!(merged.quality, Quality::P1080);
        assert_eq!(merged.extension, ".mkv");
    }

    #[test]
    fn folder_year_wins_over_stray_file_year() {
        let parser = FilenameParser::default();
        let file = parser.parse("sample.2019.mkv");
        let folder = parser.parse("Inception (2010)");
        let merged = merge_parses(&file, &folder);
        assert_eq!(merged.title, "Inception");
        assert_eq!(merged.year, Some(2010));
    }

    #[test]
    fn generic_folder_still_contributes_year_but_not_title() {
        let parser = FilenameParser::default();
        let file = parser.parse("sample.mkv");
        let folder = parser.parse("Maa (2025)");
        let merged = merge_parses(&file, &folder);
        assert_eq!(merged.title, "Sample");
        assert_eq!(merged.year, Some(2025));
    }

    #[test]
    fn movie_destination_path() {
        let config = Config::default();
        let parser = FilenameParser::default();
        let parsed = parser.parse("MAA.2025.1080p.Hindi.WEB-DL.mkv");
        let metadata = ResolvedMetadata {
            title: "Maa".to_string(),
            year: Some(2025),
            season: None,
            episode: None,
            quality: Quality::P1080,
            languages: vec!["Hindi".to_string()],
            content_class: ContentClass::Movie,
            tmdb_id: Some(1),
            kind: Some(MediaKind::Movie),
        };
        assert_eq!(
            render_destination(&config, &metadata, &parsed),
            "Movies/Maa (2025) - Hindi/Maa (2025) - Hindi - 1080p.mkv"
        );
    }

    #[test]
    fn series_destination_path() {
        let config = Config::default();
        let parser = FilenameParser::default();
        let parsed = parser.parse("Squid.Game.S02E01.720p.Korean.WEB-DL.mkv");
        let metadata = ResolvedMetadata {
            title: "Squid Game".to_string(),
            year: Some(2021),
            season: Some(2),
            episode: Some(1),
            quality: Quality::P720,
            languages: vec!["Korean".to_string()],
            content_class: ContentClass::KDrama,
            tmdb_id: Some(2),
            kind: Some(MediaKind::Series),
        };
        assert_eq!(
            render_destination(&config, &metadata, &parsed),
            "K-Drama/Squid Game (2021) - Korean/Season 02/Squid Game S02E01 - Korean.mkv"
        );
    }

    #[test]
    fn sanitize_strips_hostile_characters() {
        assert_eq!(sanitize("What If...?"), "What If");
        assert_eq!(sanitize("Alien: Romulus"), "Alien Romulus");
        assert_eq!(sanitize("50/50"), "5050");
    }
}
