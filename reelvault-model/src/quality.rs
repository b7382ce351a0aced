use std::fmt;

use serde::{Deserialize, Serialize};

/// Quality label extracted from a release name.
///
/// The set is fixed; anything the parser cannot classify becomes
/// [`Quality::Unknown`], which ranks below every named quality in any
/// ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quality {
    Cam,
    HdTs,
    HdTc,
    DvdScr,
    DvdRip,
    P720,
    P1080,
    P2160,
    Unknown,
}

impl Quality {
    pub fn label(&self) -> &'static str {
        match self {
            Quality::Cam => "CAM",
            Quality::HdTs => "HDTS",
            Quality::HdTc => "HDTC",
            Quality::DvdScr => "DVDScr",
            Quality::DvdRip => "DVDRip",
            Quality::P720 => "720p",
            Quality::P1080 => "1080p",
            Quality::P2160 => "2160p",
            Quality::Unknown => "Unknown",
        }
    }

    /// Parse a stored label back into a quality. Unrecognized labels
    /// collapse to `Unknown` rather than erroring, since old database
    /// rows may carry labels from a previous ladder configuration.
    pub fn from_label(label: &str) -> Quality {
        match label.to_ascii_lowercase().as_str() {
            "cam" => Quality::Cam,
            "hdts" => Quality::HdTs,
            "hdtc" => Quality::HdTc,
            "dvdscr" => Quality::DvdScr,
            "dvdrip" => Quality::DvdRip,
            "720p" => Quality::P720,
            "1080p" => Quality::P1080,
            "2160p" | "4k" => Quality::P2160,
            _ => Quality::Unknown,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Quality::Unknown)
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Ordered quality ladder, worst to best, used for replacement
/// comparisons. Labels are matched case-insensitively; a quality whose
/// label is absent from the ladder ranks below everything on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityLadder {
    labels: Vec<String>,
}

impl QualityLadder {
    pub fn new(labels: Vec<String>) -> Self {
        Self { labels }
    }

    fn rank_label(&self, label: &str) -> i64 {
        self.labels
            .iter()
            .position(|l| l.eq_ignore_ascii_case(label))
            .map(|i| i as i64)
            .unwrap_or(-1)
    }

    pub fn rank(&self, quality: &Quality) -> i64 {
        self.rank_label(quality.label())
    }

    /// Strictly-better comparison per the ladder ordering.
    pub fn is_better(&self, new: &Quality, existing: &Quality) -> bool {
        self.rank(new) > self.rank(existing)
    }

    /// Whether `quality` meets or exceeds the named threshold rung.
    /// Used for the CAM replacement gate.
    pub fn meets_threshold(&self, quality: &Quality, threshold: &str) -> bool {
        self.rank(quality) >= self.rank_label(threshold)
    }
}

impl Default for QualityLadder {
    fn default() -> Self {
        Self::new(
            [
                "CAM", "HDTS", "HDTC", "DVDScr", "DVDRip", "720p", "1080p", "2160p", "4K",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ladder_is_total_order_over_members() {
        let ladder = QualityLadder::default();
        let members = [
            Quality::Cam,
            Quality::HdTs,
            Quality::HdTc,
            Quality::DvdScr,
            Quality::DvdRip,
            Quality::P720,
            Quality::P1080,
            Quality::P2160,
        ];
        for a in &members {
            for b in &members {
                let better = ladder.is_better(a, b);
                let worse = ladder.is_better(b, a);
                let equal = ladder.rank(a) == ladder.rank(b);
                // Exactly one of a>b, a<b, a=b must hold.
                assert_eq!(
                    1,
                    better as u8 + worse as u8 + equal as u8,
                    "{a} vs {b}"
                );
            }
        }
    }

    #[test]
    fn unknown_ranks_below_everything() {
        let ladder = QualityLadder::default();
        assert_eq!(ladder.rank(&Quality::Unknown), -1);
        assert!(ladder.is_better(&Quality::Cam, &Quality::Unknown));
        assert!(!ladder.is_better(&Quality::Unknown, &Quality::Cam));
    }

    #[test]
    fn off_ladder_quality_ranks_lowest() {
        // An operator-trimmed ladder leaves DVDScr unranked.
        let ladder = QualityLadder::new(
            ["CAM", "720p", "1080p"].iter().map(|s| s.to_string()).collect(),
        );
        assert_eq!(ladder.rank(&Quality::DvdScr), -1);
        assert!(ladder.is_better(&Quality::Cam, &Quality::DvdScr));
    }

    #[test]
    fn disc_rips_sit_between_cam_family_and_720p() {
        let ladder = QualityLadder::default();
        assert!(ladder.is_better(&Quality::DvdRip, &Quality::HdTc));
        assert!(ladder.is_better(&Quality::DvdRip, &Quality::DvdScr));
        assert!(ladder.is_better(&Quality::P720, &Quality::DvdRip));
        assert!(ladder.is_better(&Quality::DvdRip, &Quality::Unknown));
    }

    #[test]
    fn threshold_check() {
        let ladder = QualityLadder::default();
        assert!(ladder.meets_threshold(&Quality::P720, "720p"));
        assert!(ladder.meets_threshold(&Quality::P1080, "720p"));
        assert!(!ladder.meets_threshold(&Quality::P720, "1080p"));
    }

    #[test]
    fn label_round_trip() {
        assert_eq!(Quality::from_label("1080p"), Quality::P1080);
        assert_eq!(Quality::from_label("HDTS"), Quality::HdTs);
        assert_eq!(Quality::from_label("4K"), Quality::P2160);
        assert_eq!(Quality::from_label("telecine"), Quality::Unknown);
    }
}
