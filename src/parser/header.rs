//! Date-header recognition as an ordered chain of strategies.
//!
//! Every strategy looks at one line (plus its neighbours) and either names
//! the reading that starts there or passes. Callers run the chain in order
//! and take the first hit.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use super::noise::{is_toc_leader, NoiseFilter};
use crate::calendar::{self, MONTH_NAMES};
use crate::model::DateKey;
use crate::settings::{BookConfig, Limits};

pub const FALLBACK_TITLE: &str = "Devotional Reading";

static DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)(?:^|\s|[,.\-])({})\s+(\d{{1,2}})\b",
        MONTH_NAMES.join("|")
    ))
    .unwrap()
});
static ABBREV_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    let abbrevs: Vec<&str> = MONTH_NAMES.iter().map(|m| &m[..3]).collect();
    Regex::new(&format!(
        r"(?i)\b({}|{})\.?\s*(\d{{1,2}})\b",
        MONTH_NAMES.join("|"),
        abbrevs.join("|")
    ))
    .unwrap()
});
static BRACKET_NUM_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[\d+\]").unwrap());
static LEADING_NUM_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[\d\s.\-]+").unwrap());
static TRAILING_NUM_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[.\s\d]+$").unwrap());
static TRAILING_COMMA_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r",\s*$").unwrap());
static DIGITS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Strategy {
    Forced,
    Anchor,
    Squashed,
    Split,
    Abbreviated,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strategy::Forced => "forced",
            Strategy::Anchor => "anchor",
            Strategy::Squashed => "squashed",
            Strategy::Split => "split",
            Strategy::Abbreviated => "abbreviated",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderMatch {
    pub key: DateKey,
    pub title: String,
    pub strategy: Strategy,
    /// Lines taken by the header (2 when the day wrapped onto the next line).
    pub span: usize,
}

pub struct MatchContext<'a> {
    pub lines: &'a [String],
    pub index: usize,
    pub noise: &'a NoiseFilter,
    pub seen: &'a HashSet<DateKey>,
    /// Dates a repair pass is hunting for; `None` accepts any date.
    pub targets: Option<&'a BTreeSet<DateKey>>,
}

impl<'a> MatchContext<'a> {
    pub fn line(&self) -> &'a str {
        &self.lines[self.index]
    }

    fn next_line(&self) -> Option<&'a str> {
        self.lines.get(self.index + 1).map(String::as_str)
    }

    fn prev_line(&self) -> Option<&'a str> {
        self.index
            .checked_sub(1)
            .and_then(|i| self.lines.get(i))
            .map(String::as_str)
    }

    pub fn wants(&self, key: DateKey) -> bool {
        !self.seen.contains(&key) && self.targets.map_or(true, |t| t.contains(&key))
    }

    /// Outstanding repair targets. Empty outside a repair pass.
    fn open_targets(&self) -> impl Iterator<Item = DateKey> + 'a {
        let seen = self.seen;
        self.targets
            .into_iter()
            .flatten()
            .copied()
            .filter(move |k| !seen.contains(k))
    }

    /// First non-noise line among the `max` lines above the current one.
    fn lookback(&self, max: usize) -> Option<&'a str> {
        (1..=max)
            .take_while(|back| *back <= self.index)
            .map(|back| self.lines[self.index - back].as_str())
            .find(|l| !self.noise.is_noise(l))
    }
}

pub trait HeaderStrategy {
    fn kind(&self) -> Strategy;
    fn try_match(&self, ctx: &MatchContext<'_>) -> Option<HeaderMatch>;
}

pub type Chain = Vec<Box<dyn HeaderStrategy>>;

pub fn first_match(chain: &[Box<dyn HeaderStrategy>], ctx: &MatchContext<'_>) -> Option<HeaderMatch> {
    chain.iter().find_map(|s| s.try_match(ctx))
}

/// Forced patches first, then the month/day anchor.
pub fn initial_chain(book: &BookConfig, limits: &Limits) -> Chain {
    let forced: Box<dyn HeaderStrategy> =
        Box::new(ForcedStrategy::new(book, limits.forced_max_chars));
    let anchor: Box<dyn HeaderStrategy> = Box::new(AnchorStrategy::new(book, limits));
    vec![forced, anchor]
}

/// Repair-pass heuristics for headers mangled by extraction.
pub fn rescue_chain(limits: &Limits) -> Chain {
    let squashed: Box<dyn HeaderStrategy> = Box::new(SquashedStrategy {
        max_chars: limits.rescue_max_chars,
    });
    let abbreviated: Box<dyn HeaderStrategy> = Box::new(AbbreviatedStrategy {
        max_chars: limits.rescue_max_chars,
    });
    let split: Box<dyn HeaderStrategy> = Box::new(SplitStrategy);
    vec![squashed, split, abbreviated]
}

// ── Anchor ──

/// "Title, January 1" style headers.
pub struct AnchorStrategy {
    max_chars: usize,
    lookback: usize,
    overrides: HashMap<DateKey, String>,
}

impl AnchorStrategy {
    pub fn new(book: &BookConfig, limits: &Limits) -> Self {
        AnchorStrategy {
            max_chars: limits.header_max_chars,
            lookback: limits.lookback_lines,
            overrides: book.overrides(),
        }
    }
}

impl HeaderStrategy for AnchorStrategy {
    fn kind(&self) -> Strategy {
        Strategy::Anchor
    }

    fn try_match(&self, ctx: &MatchContext<'_>) -> Option<HeaderMatch> {
        let line = ctx.line();
        let (key, start) = find_date(line)?;
        if !ctx.wants(key) {
            return None;
        }

        if let Some(title) = self.overrides.get(&key) {
            return Some(header(key, title.clone(), self.kind(), 1));
        }
        // Long lines are prose that mentions a date.
        if line.chars().count() >= self.max_chars {
            return None;
        }

        let candidate = strip_separators(&line[..start]);
        let mut title = clean_title(candidate);
        if title.chars().count() < 3 {
            match ctx.lookback(self.lookback) {
                Some(prev) => title = clean_title(prev),
                None if candidate.is_empty() => return None,
                None => {}
            }
        }
        Some(header(key, title, self.kind(), 1))
    }
}

/// First "Month day" date on the line and the byte offset where its match
/// starts.
fn find_date(line: &str) -> Option<(DateKey, usize)> {
    let caps = DATE_RE.captures(line)?;
    let month = calendar::parse_month(&caps[1])?;
    let key = DateKey::new(month, caps[2].parse().ok()?)?;
    Some((key, caps.get(0)?.start()))
}

/// Date an anchor header on this line would carry, ignoring what was seen.
pub fn anchor_date(line: &str) -> Option<DateKey> {
    find_date(line).map(|(key, _)| key)
}

// ── Forced patches ──

/// Configured (date, title) pairs forced onto any short line naming the
/// month and containing the day number.
pub struct ForcedStrategy {
    entries: Vec<(DateKey, String)>,
    max_chars: usize,
}

impl ForcedStrategy {
    pub fn new(book: &BookConfig, max_chars: usize) -> Self {
        let entries = book
            .forced_headers
            .iter()
            .filter_map(|p| Some((p.key()?, p.title.clone())))
            .collect();
        ForcedStrategy { entries, max_chars }
    }
}

impl HeaderStrategy for ForcedStrategy {
    fn kind(&self) -> Strategy {
        Strategy::Forced
    }

    fn try_match(&self, ctx: &MatchContext<'_>) -> Option<HeaderMatch> {
        let line = ctx.line();
        if self.entries.is_empty() || line.chars().count() >= self.max_chars {
            return None;
        }
        let lower = line.to_lowercase();
        // An entry whose date was already taken counts as consumed.
        self.entries
            .iter()
            .find(|(key, _)| {
                ctx.wants(*key)
                    && lower.contains(&key.month_name().to_lowercase())
                    && line.contains(&key.day_text())
            })
            .map(|(key, title)| header(*key, title.clone(), self.kind(), 1))
    }
}

// ── Rescue strategies ──

/// "February 17" extracted as "Febru ary 17" or "February17".
pub struct SquashedStrategy {
    max_chars: usize,
}

impl HeaderStrategy for SquashedStrategy {
    fn kind(&self) -> Strategy {
        Strategy::Squashed
    }

    fn try_match(&self, ctx: &MatchContext<'_>) -> Option<HeaderMatch> {
        let line = ctx.line();
        if line.chars().count() >= self.max_chars {
            return None;
        }
        let squashed: String = line
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();
        let key = ctx.open_targets().find(|k| {
            let needle = format!("{}{}", k.month_name().to_lowercase(), k.day);
            squashed.match_indices(&needle).any(|(at, _)| {
                !squashed[at + needle.len()..]
                    .starts_with(|c: char| c.is_ascii_digit())
            })
        })?;
        Some(header(key, rescue_title(ctx, key), self.kind(), 1))
    }
}

/// Month on one line, day number starting the next.
pub struct SplitStrategy;

impl HeaderStrategy for SplitStrategy {
    fn kind(&self) -> Strategy {
        Strategy::Split
    }

    fn try_match(&self, ctx: &MatchContext<'_>) -> Option<HeaderMatch> {
        let line = ctx.line();
        let next = ctx.next_line()?;
        let key = ctx
            .open_targets()
            .find(|k| line.contains(k.month_name()) && starts_with_token(next, &k.day_text()))?;
        Some(header(key, rescue_title(ctx, key), self.kind(), 2))
    }
}

/// "JAN. 5", "Jan 5" and other abbreviated or upper-cased headers.
pub struct AbbreviatedStrategy {
    max_chars: usize,
}

impl HeaderStrategy for AbbreviatedStrategy {
    fn kind(&self) -> Strategy {
        Strategy::Abbreviated
    }

    fn try_match(&self, ctx: &MatchContext<'_>) -> Option<HeaderMatch> {
        let line = ctx.line();
        if is_toc_leader(line) || line.chars().count() >= self.max_chars {
            return None;
        }
        let key = ABBREV_DATE_RE.captures_iter(line).find_map(|caps| {
            let month = calendar::parse_month(&caps[1])?;
            let key = DateKey::new(month, caps[2].parse().ok()?)?;
            ctx.open_targets().any(|k| k == key).then_some(key)
        })?;
        Some(header(key, rescue_title(ctx, key), self.kind(), 1))
    }
}

// ── Titles ──

fn header(key: DateKey, title: String, strategy: Strategy, span: usize) -> HeaderMatch {
    HeaderMatch {
        key,
        title,
        strategy,
        span,
    }
}

fn strip_separators(raw: &str) -> &str {
    raw.trim()
        .trim_end_matches(|c: char| matches!(c, ',' | '-' | '–' | '—'))
        .trim()
}

/// Removes footnote markers, enumeration prefixes and trailing page numbers.
pub fn clean_title(raw: &str) -> String {
    let text = BRACKET_NUM_RE.replace_all(raw, "");
    let text = LEADING_NUM_RE.replace(&text, "");
    let text = TRAILING_NUM_RE.replace(&text, "");
    let text = TRAILING_COMMA_RE.replace(&text, "");
    text.trim().to_string()
}

/// Title of a rescued header: the header line minus its date, else the line
/// above it, else a generic title.
fn rescue_title(ctx: &MatchContext<'_>, key: DateKey) -> String {
    let mut title = clean_title(&strip_date(ctx.line(), key));
    if title.chars().count() < 3 {
        if let Some(prev) = ctx.prev_line().filter(|p| !DIGITS_RE.is_match(p)) {
            title = clean_title(prev);
        }
    }
    if title.chars().count() < 3 {
        FALLBACK_TITLE.to_string()
    } else {
        title
    }
}

fn strip_date(line: &str, key: DateKey) -> String {
    // Month first, so a glued "February17" leaves a standalone day. The
    // full name may carry stray spaces ("Febru ary"); neither form may run
    // into a following letter.
    let spaced: Vec<String> = key.month_name().chars().map(|c| c.to_string()).collect();
    let month_re = Regex::new(&format!(
        r"(?i)\b(?:{}|{})\.?([^a-z]|$)",
        spaced.join(r"\s*"),
        key.month_abbrev()
    ));
    let day_re = Regex::new(&format!(r"\b{}\b", key.day));
    let (Ok(month_re), Ok(day_re)) = (month_re, day_re) else {
        return line.to_string();
    };
    let text = month_re.replace_all(line, " ${1}");
    let text = day_re.replace_all(&text, " ");
    text.replace(',', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn starts_with_token(line: &str, token: &str) -> bool {
    line.strip_prefix(token)
        .is_some_and(|rest| !rest.starts_with(|c: char| c.is_alphanumeric() || c == '_'))
}

// ── Tests ──
