//! Title normalization helpers shared by the matcher and the web
//! verifier.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9\s]").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Leftover vocabulary that survives filename cleanup but never
/// belongs in a search query.
static JUNK_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    ["complete", "series", "season", "full", "final", "new", "latest", "original"]
        .into_iter()
        .collect()
});

/// Stopwords ignored when reducing a title to its significant words.
static STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    ["the", "a", "an", "and", "or", "of", "in", "on", "at", "to", "for", "with"]
        .into_iter()
        .collect()
});

/// Canonical lowercase form for comparing two titles.
pub fn normalize_for_compare(title: &str) -> String {
    let lower = title.to_lowercase();
    let stripped = NON_ALNUM.replace_all(&lower, " ");
    WHITESPACE.replace_all(&stripped, " ").trim().to_string()
}

/// Cleanup pass for the retry ladder: drop junk words and stray
/// punctuation while keeping the original casing of what remains.
pub fn normalize_title(title: &str) -> String {
    let kept: Vec<&str> = title
        .split_whitespace()
        .filter(|word| {
            let bare = word
                .trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase();
            !bare.is_empty() && !JUNK_WORDS.contains(bare.as_str())
        })
        .collect();
    kept.join(" ")
}

/// First `limit` significant words, the last rung of the retry ladder.
pub fn significant_words(title: &str, limit: usize) -> String {
    normalize_for_compare(title)
        .split_whitespace()
        .filter(|w| w.len() > 2 && !STOPWORDS.contains(*w))
        .take(limit)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whether two titles plausibly name the same release: one normalized
/// form contains the other, or at least half the smaller token set
/// overlaps.
pub fn titles_similar(a: &str, b: &str) -> bool {
    let na = normalize_for_compare(a);
    let nb = normalize_for_compare(b);
    if na.is_empty() || nb.is_empty() {
        return false;
    }
    if na.contains(&nb) || nb.contains(&na) {
        return true;
    }
    let ta: HashSet<&str> = na.split_whitespace().collect();
    let tb: HashSet<&str> = nb.split_whitespace().collect();
    let common = ta.intersection(&tb).count();
    let smaller = ta.len().min(tb.len());
    smaller > 0 && common as f32 / smaller as f32 >= 0.5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compare_form_is_lowercase_alnum() {
        assert_eq!(normalize_for_compare("Spider-Man: No Way Home!"), "spider man no way home");
        assert_eq!(normalize_for_compare("  MAA  "), "maa");
    }

    #[test]
    fn normalize_drops_junk_words() {
        assert_eq!(normalize_title("Breaking Bad Complete Series"), "Breaking Bad");
        assert_eq!(normalize_title("The Office"), "The Office");
    }

    #[test]
    fn significant_words_skips_stopwords_and_short_tokens() {
        assert_eq!(
            significant_words("The Lord of the Rings: The Two Towers", 3),
            "lord rings two"
        );
    }

    #[test]
    fn similarity() {
        assert!(titles_similar("Squid Game", "Squid Game (TV Series)"));
        assert!(titles_similar("The Matrix", "Matrix"));
        assert!(!titles_similar("The Matrix", "Inception"));
        assert!(!titles_similar("", "Anything"));
    }
}
