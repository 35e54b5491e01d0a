use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

static PAGE_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+$").unwrap());
static PAGE_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^--- PAGE \d+ ---$").unwrap());
static FOOTNOTE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\[\d+\]$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Noise {
    PageNumber,
    RunningHeader,
    TocLeader,
    Contents,
    PageMarker,
    Footnote,
}

/// Drops lines that never belong to a reading.
#[derive(Debug, Clone, Default)]
pub struct NoiseFilter {
    running_headers: HashSet<String>,
}

impl NoiseFilter {
    pub fn new<I, S>(running_headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        NoiseFilter {
            running_headers: running_headers
                .into_iter()
                .map(|h| h.as_ref().trim().to_string())
                .collect(),
        }
    }

    pub fn classify(&self, line: &str) -> Option<Noise> {
        if PAGE_NUMBER_RE.is_match(line) {
            Some(Noise::PageNumber)
        } else if self.running_headers.contains(line) {
            Some(Noise::RunningHeader)
        } else if is_toc_leader(line) {
            Some(Noise::TocLeader)
        } else if line == "Contents" {
            Some(Noise::Contents)
        } else if PAGE_MARKER_RE.is_match(line) {
            Some(Noise::PageMarker)
        } else if FOOTNOTE_RE.is_match(line) {
            Some(Noise::Footnote)
        } else {
            None
        }
    }

    pub fn is_noise(&self, line: &str) -> bool {
        self.classify(line).is_some()
    }
}

/// Table-of-contents leader dots.
pub fn is_toc_leader(line: &str) -> bool {
    line.contains("...") || line.contains(". . .")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> NoiseFilter {
        NoiseFilter::new(["From the Heart"])
    }

    #[test]
    fn every_rule_fires() {
        let f = filter();
        assert_eq!(f.classify("781"), Some(Noise::PageNumber));
        assert_eq!(f.classify("From the Heart"), Some(Noise::RunningHeader));
        assert_eq!(f.classify("The Old Year . . . 12"), Some(Noise::TocLeader));
        assert_eq!(f.classify("A New Song........45"), Some(Noise::TocLeader));
        assert_eq!(f.classify("Contents"), Some(Noise::Contents));
        assert_eq!(f.classify("--- PAGE 12 ---"), Some(Noise::PageMarker));
        assert_eq!(f.classify("[7]"), Some(Noise::Footnote));
    }

    #[test]
    fn content_passes() {
        let f = filter();
        assert_eq!(f.classify("The Gift of Love, January 1"), None);
        assert_eq!(f.classify("From the Heart of God"), None);
        assert_eq!(f.classify("12 disciples"), None);
        assert_eq!(f.classify("[7] See note"), None);
        assert!(!f.is_noise("Table of Contents"));
    }
}
