//! Best-effort extraction of structured facts from release filenames.
//!
//! Pure and stateless: no external calls, no failure mode. Every
//! unknown field defaults rather than erroring, so the matcher always
//! has something to work with.

use once_cell::sync::Lazy;
use regex::Regex;

use reelvault_model::{ParsedFilename, Quality};

/// Ordered quality rules, evaluated top to bottom; first match wins.
/// Telesync/telecine/cam markers sit above the `720p` rule and the
/// bare `hd` catch-all: a theater recording tagged 720p is still a
/// theater recording.
static QUALITY_RULES: Lazy<Vec<(Regex, Quality)>> = Lazy::new(|| {
    [
        (r"(?i)2160p|4k|uhd", Quality::P2160),
        (r"(?i)1080p|1080i|fullhd|fhd", Quality::P1080),
        (r"(?i)hdts|hd-ts|hd\.ts|hdtelesync|telesync", Quality::HdTs),
        (r"(?i)hdtc|hd-tc|hd\.tc|hdtelecine|telecine", Quality::HdTc),
        (r"(?i)\bcam(?:rip)?\b|hdcam", Quality::Cam),
        (r"(?i)720p", Quality::P720),
        (r"(?i)dvdscr|dvd-scr|screener", Quality::DvdScr),
        (r"(?i)dvdrip|dvd-rip|\bdvd\b", Quality::DvdRip),
        // Source markers that imply a resolution when none is given.
        (r"(?i)bluray|blu-ray|bdrip|brrip", Quality::P1080),
        (r"(?i)webrip|web-rip", Quality::P720),
        (r"(?i)webdl|web-dl|web\.dl", Quality::P1080),
        (r"(?i)\bhd\b", Quality::P720),
    ]
    .iter()
    .map(|(pattern, quality)| (Regex::new(pattern).unwrap(), *quality))
    .collect()
});

/// S01E01 / S01E01E02 / S01E01-02 style, the most common convention.
static SXXEYY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[Ss](\d{1,2})[Ee](\d{1,3})(?:[Ee-](\d{1,3}))?").unwrap());

static SEASON_EPISODE_WORDS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)season\s*(\d{1,2})\s*episode\s*(\d{1,3})").unwrap());

static NXM: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{1,2})[xX](\d{1,3})").unwrap());

/// "E05" / "Episode 5" with no season; season defaults to 1.
static EPISODE_ONLY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[Ee](?:pisode|p)?\.?\s*(\d{1,3})(?:\D|$)").unwrap());

/// " - 05 " token convention used by single-season anime releases.
static DASH_EPISODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s-\s(\d{1,3})\s").unwrap());

static YEAR_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(19|20)\d{2}").unwrap());

static RELEASE_GROUP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[-\s]([A-Za-z0-9]+)(?:\.[a-z]{2,4})?$").unwrap());

/// Codec, audio, source, subtitle, and scene-tag vocabulary stripped
/// from titles.
static NOISE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\b(?:extended|directors?\.?cut|unrated|remastered|repack|proper|real)\b",
        r"(?i)\b(?:internal|limited|complete|dual\.?audio|multi)\b",
        r"(?i)\b(?:dubbed|subbed)\b",
        r"(?i)\b(?:x264|x265|hevc|h\.?264|h\.?265|avc|xvid|divx)\b",
        r"(?i)\b(?:aac|ac3|dts|dd5\.?1|atmos|truehd|flac|mp3)\b",
        r"(?i)\b(?:10bit|hdr|sdr|dv|dolby\.?vision)\b",
        r"(?i)\b(?:amzn|nf|netflix|hmax|dsnp|atvp|hulu|pcok)\b",
        r"(?i)\b(?:web-?dl|webrip|bluray|bdrip|brrip|dvdrip)\b",
        r"(?i)\b(?:hdrip|hdtv|pdtv|dsr)\b",
        r"(?i)\b(?:esub|esubs|msub|msubs)\b",
        r"(?i)\b(?:yts|yify|rarbg|ettv|eztv|ds4k)\b",
        r"\[\w+\]",
        r"\(\w+\)$",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Language vocabulary: token to canonical name, in detection order.
/// Short scene codes map onto the same canonical names.
static LANGUAGE_TOKENS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        ("hindi", "Hindi"),
        ("english", "English"),
        ("tamil", "Tamil"),
        ("telugu", "Telugu"),
        ("malayalam", "Malayalam"),
        ("kannada", "Kannada"),
        ("bengali", "Bengali"),
        ("marathi", "Marathi"),
        ("punjabi", "Punjabi"),
        ("korean", "Korean"),
        ("japanese", "Japanese"),
        ("chinese", "Chinese"),
        ("spanish", "Spanish"),
        ("french", "French"),
        ("german", "German"),
        ("italian", "Italian"),
        ("portuguese", "Portuguese"),
        ("russian", "Russian"),
        ("arabic", "Arabic"),
        ("thai", "Thai"),
        ("hin", "Hindi"),
        ("eng", "English"),
        ("tam", "Tamil"),
        ("tel", "Telugu"),
        ("mal", "Malayalam"),
        ("kor", "Korean"),
        ("jpn", "Japanese"),
        ("jap", "Japanese"),
    ]
    .iter()
    .map(|(token, name)| {
        (
            Regex::new(&format!(r"(?i)\b{token}\b")).unwrap(),
            *name,
        )
    })
    .collect()
});

/// Words kept lowercase in title case unless they lead the title.
const MINOR_WORDS: &[&str] = &[
    "a", "an", "the", "and", "but", "or", "nor", "for", "yet", "so", "at", "by", "in",
    "of", "on", "to", "up",
];

static EXTENSION_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\.[a-z0-9]{2,4}$").unwrap());

static SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[._\-]+").unwrap());
static BRACKETED: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[.*?\]|\(.*?\)").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

#[derive(Debug, Clone)]
pub struct FilenameParser {
    video_extensions: Vec<String>,
    fallback_language: String,
}

impl Default for FilenameParser {
    fn default() -> Self {
        Self::new(
            [".mkv", ".mp4", ".avi", ".mov", ".wmv", ".flv", ".webm", ".m4v"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            "English".to_string(),
        )
    }
}

impl FilenameParser {
    pub fn new(video_extensions: Vec<String>, fallback_language: String) -> Self {
        Self {
            video_extensions,
            fallback_language,
        }
    }

    /// Parse a filename (a path is fine; only the final component is
    /// used). Always returns a best-effort result.
    pub fn parse(&self, filename: &str) -> ParsedFilename {
        let name = filename.rsplit('/').next().unwrap_or(filename);
        let (stem, extension) = split_extension(name);

        let quality = extract_quality(stem);
        let (season, episode, episode_end) = extract_season_episode(stem);
        let is_series = season.is_some() || episode.is_some();
        let year = extract_year(stem);
        let release_group = extract_release_group(stem);
        let languages = self.extract_languages(stem);
        let title = extract_title(stem, year);

        let parsed = ParsedFilename {
            original_name: stem.to_string(),
            title,
            year,
            // Episode without season implies a single-season release.
            season: season.or(episode.map(|_| 1)),
            episode,
            episode_end,
            is_multi_episode: episode_end.is_some(),
            quality,
            languages,
            is_series,
            extension,
            release_group,
        };

        tracing::debug!(
            title = %parsed.title,
            year = ?parsed.year,
            season = ?parsed.season,
            episode = ?parsed.episode,
            quality = %parsed.quality,
            "parsed filename"
        );

        parsed
    }

    pub fn is_video_file(&self, filename: &str) -> bool {
        let (_, ext) = split_extension(filename);
        !ext.is_empty() && self.video_extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext))
    }

    fn extract_languages(&self, name: &str) -> Vec<String> {
        let mut found: Vec<String> = Vec::new();
        for (pattern, canonical) in LANGUAGE_TOKENS.iter() {
            if pattern.is_match(name) && !found.iter().any(|l| l == canonical) {
                found.push(canonical.to_string());
            }
        }
        if found.is_empty() {
            found.push(self.fallback_language.clone());
        }
        found
    }
}

fn split_extension(name: &str) -> (&str, String) {
    match name.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty() && ext.len() <= 4 && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            (stem, format!(".{}", ext.to_ascii_lowercase()))
        }
        _ => (name, String::new()),
    }
}

fn extract_quality(name: &str) -> Quality {
    for (pattern, quality) in QUALITY_RULES.iter() {
        if pattern.is_match(name) {
            return *quality;
        }
    }
    Quality::Unknown
}

/// Pattern cascade: first successful convention wins, later ones are
/// not attempted.
fn extract_season_episode(name: &str) -> (Option<u32>, Option<u32>, Option<u32>) {
    if let Some(caps) = SXXEYY.captures(name) {
        let season = caps[1].parse().ok();
        let episode = caps[2].parse().ok();
        let end = caps.get(3).and_then(|m| m.as_str().parse().ok());
        return (season, episode, end);
    }
    if let Some(caps) = SEASON_EPISODE_WORDS.captures(name) {
        return (caps[1].parse().ok(), caps[2].parse().ok(), None);
    }
    if let Some(caps) = NXM.captures(name) {
        return (caps[1].parse().ok(), caps[2].parse().ok(), None);
    }
    if let Some(caps) = EPISODE_ONLY.captures(name) {
        return (Some(1), caps[1].parse().ok(), None);
    }
    if let Some(caps) = DASH_EPISODE.captures(name) {
        return (Some(1), caps[1].parse().ok(), None);
    }
    (None, None, None)
}

/// Collect all plausible 4-digit years; a single hit is authoritative,
/// otherwise prefer the first inside the realistic release window.
fn extract_year(name: &str) -> Option<i32> {
    let years: Vec<i32> = YEAR_TOKEN
        .find_iter(name)
        .filter_map(|m| m.as_str().parse().ok())
        .collect();

    match years.as_slice() {
        [] => None,
        [only] => Some(*only),
        all => all
            .iter()
            .find(|y| (1950..=2030).contains(*y))
            .or_else(|| all.first())
            .copied(),
    }
}

fn extract_release_group(name: &str) -> Option<String> {
    let caps = RELEASE_GROUP.captures(name)?;
    let group = caps[1].to_string();
    let lower = group.to_ascii_lowercase();
    // Trailing extension fragments look like groups; ignore them.
    if ["mkv", "mp4", "avi", "mov", "wmv"].contains(&lower.as_str()) {
        return None;
    }
    Some(group)
}

fn extract_title(name: &str, year: Option<i32>) -> String {
    let mut title = EXTENSION_SUFFIX.replace(name, "").into_owned();

    for (pattern, _) in QUALITY_RULES.iter() {
        title = pattern.replace_all(&title, "").into_owned();
    }

    title = SXXEYY.replace_all(&title, "").into_owned();
    title = SEASON_EPISODE_WORDS.replace_all(&title, "").into_owned();
    title = NXM.replace_all(&title, "").into_owned();
    title = DASH_EPISODE.replace_all(&title, " ").into_owned();

    if let Some(year) = year {
        title = title
            .replace(&format!("({year})"), "")
            .replace(&year.to_string(), "");
    }

    for pattern in NOISE_PATTERNS.iter() {
        title = pattern.replace_all(&title, "").into_owned();
    }
    for (pattern, _) in LANGUAGE_TOKENS.iter() {
        title = pattern.replace_all(&title, "").into_owned();
    }

    title = SEPARATORS.replace_all(&title, " ").into_owned();
    title = BRACKETED.replace_all(&title, "").into_owned();
    title = WHITESPACE.replace_all(&title, " ").trim().to_string();

    title_case(&title)
}

fn title_case(title: &str) -> String {
    title
        .to_lowercase()
        .split_whitespace()
        .enumerate()
        .map(|(i, word)| {
            if i > 0 && MINOR_WORDS.contains(&word) {
                word.to_string()
            } else {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                    None => String::new(),
                }
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
