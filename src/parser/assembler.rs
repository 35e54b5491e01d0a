use std::collections::{BTreeMap, HashSet};

use tracing::debug;

use super::header::{anchor_date, first_match, initial_chain, Chain, HeaderMatch, MatchContext, Strategy};
use super::noise::NoiseFilter;
use super::verse::split_verse;
use crate::model::{DateKey, Record};
use crate::settings::{BookConfig, Limits};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmentStats {
    pub lines: usize,
    pub noise: usize,
    /// Content lines before the first header.
    pub preamble: usize,
    /// Short lines repeating an already-recognized date, dropped.
    pub duplicates: usize,
    pub headers: BTreeMap<Strategy, usize>,
}

#[derive(Debug, Clone)]
pub struct Segmentation {
    pub records: Vec<Record>,
    pub stats: SegmentStats,
}

struct OpenRecord {
    record: Record,
    buffer: Vec<String>,
}

impl OpenRecord {
    fn close(self, verse_window: usize) -> Record {
        let split = split_verse(&self.buffer, verse_window);
        Record {
            verse: split.verse,
            verse_ref: split.verse_ref,
            content: split.content,
            ..self.record
        }
    }
}

enum State {
    NoOpenRecord,
    RecordOpen(OpenRecord),
}

/// Turns a book's lines into dated records, one open record at a time.
pub struct Segmenter {
    prefix: String,
    noise: NoiseFilter,
    chain: Chain,
    verse_window: usize,
    header_max_chars: usize,
}

impl Segmenter {
    pub fn new(prefix: &str, noise: NoiseFilter, chain: Chain, limits: &Limits) -> Self {
        Segmenter {
            prefix: prefix.to_string(),
            noise,
            chain,
            verse_window: limits.verse_window,
            header_max_chars: limits.header_max_chars,
        }
    }

    pub fn for_book(book: &BookConfig, limits: &Limits) -> Self {
        Segmenter::new(
            &book.prefix(),
            NoiseFilter::new(&book.running_headers),
            initial_chain(book, limits),
            limits,
        )
    }

    pub fn segment(&self, lines: &[String]) -> Segmentation {
        let mut records = Vec::new();
        let mut stats = SegmentStats {
            lines: lines.len(),
            ..Default::default()
        };
        let mut seen: HashSet<DateKey> = HashSet::new();
        let mut state = State::NoOpenRecord;

        let mut i = 0;
        while i < lines.len() {
            let line = &lines[i];
            if self.noise.is_noise(line) {
                stats.noise += 1;
                i += 1;
                continue;
            }

            let found = {
                let ctx = MatchContext {
                    lines,
                    index: i,
                    noise: &self.noise,
                    seen: &seen,
                    targets: None,
                };
                first_match(&self.chain, &ctx)
            };

            match found {
                Some(m) => {
                    debug!("{} header via {}: {:?}", m.key, m.strategy, m.title);
                    seen.insert(m.key);
                    *stats.headers.entry(m.strategy).or_default() += 1;
                    i += m.span.max(1);
                    if let State::RecordOpen(open) = std::mem::replace(&mut state, State::NoOpenRecord) {
                        records.push(open.close(self.verse_window));
                    }
                    state = State::RecordOpen(self.open(m));
                }
                None if self.is_duplicate(line, &seen) => {
                    debug!("dropping repeated header {:?}", line);
                    stats.duplicates += 1;
                    i += 1;
                }
                None => {
                    match &mut state {
                        State::RecordOpen(open) => open.buffer.push(line.clone()),
                        State::NoOpenRecord => stats.preamble += 1,
                    }
                    i += 1;
                }
            }
        }

        if let State::RecordOpen(open) = state {
            records.push(open.close(self.verse_window));
        }

        Segmentation { records, stats }
    }

    /// A header-length line naming a date that already has a record.
    fn is_duplicate(&self, line: &str, seen: &HashSet<DateKey>) -> bool {
        line.chars().count() < self.header_max_chars
            && anchor_date(line).is_some_and(|key| seen.contains(&key))
    }

    fn open(&self, m: HeaderMatch) -> OpenRecord {
        OpenRecord {
            record: Record::open(&self.prefix, m.key, m.title),
            buffer: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::year_keys;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    fn segmenter() -> Segmenter {
        let mut book = BookConfig::named("fh");
        book.running_headers.push("From the Heart".into());
        Segmenter::for_book(&book, &Limits::default())
    }

    #[test]
    fn single_reading_with_verse() {
        let l = lines(&[
            "The Gift of Love, January 1",
            "God so loved the world",
            "John 3:16.",
            "Reflect on this today.",
        ]);
        let out = segmenter().segment(&l);
        assert_eq!(out.records.len(), 1);
        let r = &out.records[0];
        assert_eq!(r.id, "fh_01_01");
        assert_eq!((r.month, r.day), (1, 1));
        assert_eq!(r.title, "The Gift of Love");
        assert_eq!(r.verse, "God so loved the world John 3:16.");
        assert_eq!(r.verse_ref, "John 3:16");
        assert_eq!(r.content, "Reflect on this today.");
        assert_eq!(out.stats.headers.get(&Strategy::Anchor), Some(&1));
    }

    #[test]
    fn final_reading_is_flushed() {
        let l = lines(&[
            "Front matter",
            "First, January 1",
            "one",
            "Second, January 2",
            "two",
        ]);
        let out = segmenter().segment(&l);
        assert_eq!(out.records.len(), 2);
        assert_eq!(out.records[1].title, "Second");
        assert_eq!(out.records[1].content, "two");
        assert_eq!(out.stats.preamble, 1);
    }

    #[test]
    fn repeated_header_is_dropped() {
        let l = lines(&[
            "First, January 1",
            "one",
            "Compare The Desire of Ages, January 1",
            "Second, January 2",
        ]);
        let out = segmenter().segment(&l);
        assert_eq!(out.records.len(), 2);
        assert_eq!(out.records[0].content, "one");
        assert_eq!(out.stats.duplicates, 1);
    }

    #[test]
    fn prose_naming_a_seen_date_stays_content() {
        let prose = format!("{}as we read on January 1 of this year.", "word ".repeat(30));
        let l = vec![
            "First, January 1".to_string(),
            prose.clone(),
            "Second, January 2".to_string(),
        ];
        let out = segmenter().segment(&l);
        assert_eq!(out.records[0].content, prose);
        assert_eq!(out.stats.duplicates, 0);
    }

    #[test]
    fn noise_never_reaches_records() {
        let l = lines(&[
            "Contents",
            "The Old Year . . . 7",
            "The Old Year and the New, January 1",
            "From the Heart",
            "Let us go forward",
            "781",
            "[4]",
            "--- PAGE 9 ---",
            "Philippians 3:13.",
            "More text",
        ]);
        let out = segmenter().segment(&l);
        assert_eq!(out.records.len(), 1);
        let r = &out.records[0];
        assert_eq!(r.verse, "Let us go forward Philippians 3:13.");
        assert_eq!(r.content, "More text");
        assert_eq!(out.stats.noise, 6);
        for noise in ["781", "From the Heart", ". . .", "[4]", "PAGE"] {
            assert!(!r.title.contains(noise));
            assert!(!r.verse.contains(noise));
            assert!(!r.content.contains(noise));
        }
    }

    #[test]
    fn full_year_gives_366_unique_readings() {
        let mut l = Vec::new();
        for key in year_keys() {
            l.push(format!("Reading for {}", key));
            l.push("Text of the day".to_string());
            l.push("Psalm 118:24.".to_string());
            l.push("More text".to_string());
        }
        let seg = segmenter();
        let out = seg.segment(&l);
        assert_eq!(out.records.len(), 366);
        let keys: HashSet<DateKey> = out.records.iter().map(Record::key).collect();
        assert_eq!(keys.len(), 366);
        assert!(out.records.iter().all(|r| r.title == "Reading for"));

        let again = seg.segment(&l);
        assert_eq!(again.records, out.records);
    }

    #[test]
    fn fixture_book() {
        let raw = std::fs::read_to_string("tests/fixtures/sample_book.txt").unwrap();
        let pages = crate::source::split_pages(&raw);
        let l = crate::source::book_lines(&pages);
        let out = segmenter().segment(&l);
        let keys: Vec<String> = out.records.iter().map(|r| r.key().to_string()).collect();
        assert_eq!(keys, vec!["January 1", "January 2", "January 3", "January 5"]);
        assert_eq!(out.records[2].title, "Rest in Him");
        assert_eq!(out.records[0].verse_ref, "Isaiah 43:19");
    }
}
