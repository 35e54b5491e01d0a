//! Missing-date reconciliation and the repair pass that hunts for headers
//! the initial conversion missed.

use std::collections::{BTreeSet, HashSet};

use tracing::{debug, info};

use crate::calendar::year_keys;
use crate::model::{DateKey, Record};
use crate::parser::header::{first_match, rescue_chain, MatchContext, Strategy};
use crate::parser::noise::NoiseFilter;
use crate::parser::verse::split_verse;
use crate::settings::{BookConfig, Limits};
use crate::source::Page;

/// Calendar dates with no record. Feb 29 counts only for leap-day books.
pub fn missing_dates(records: &[Record], include_leap_day: bool) -> Vec<DateKey> {
    let present: HashSet<DateKey> = records.iter().map(Record::key).collect();
    year_keys()
        .filter(|k| include_leap_day || !(k.month == 2 && k.day == 29))
        .filter(|k| !present.contains(k))
        .collect()
}

/// Dates whose record exists but has too little content to be real.
pub fn blank_dates(records: &[Record], min_chars: usize) -> Vec<DateKey> {
    records
        .iter()
        .filter(|r| r.is_blank(min_chars))
        .map(Record::key)
        .collect()
}

/// Text recovered for one date from a single page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rescue {
    pub key: DateKey,
    pub strategy: Strategy,
    pub page: usize,
    pub title: String,
    pub verse: String,
    pub verse_ref: String,
    pub content: String,
}

/// Scans the top of every page for the target dates. A page yields at most
/// one reading, and a date is taken from the first page that has it.
pub fn rescue_pages(
    pages: &[Page],
    targets: &BTreeSet<DateKey>,
    noise: &NoiseFilter,
    limits: &Limits,
) -> Vec<Rescue> {
    let chain = rescue_chain(limits);
    let seen = HashSet::new();
    let mut remaining = targets.clone();
    let mut rescues = Vec::new();

    for page in pages {
        if remaining.is_empty() {
            break;
        }
        // Table-of-contents and image pages.
        if page.char_len() < limits.min_page_chars {
            continue;
        }
        let lines = page.lines();
        let zone = lines.len().min(limits.header_zone);
        // The split day line is read raw through the context, but no noise
        // line (a TOC entry, say) is ever taken as the header itself.
        let found = (0..zone).filter(|&i| !noise.is_noise(&lines[i])).find_map(|index| {
            let ctx = MatchContext {
                lines: &lines,
                index,
                noise,
                seen: &seen,
                targets: Some(&remaining),
            };
            first_match(&chain, &ctx).map(|m| (index, m))
        });
        let Some((index, m)) = found else {
            continue;
        };

        let body: Vec<String> = lines
            .iter()
            .skip(index + m.span)
            .filter(|l| !noise.is_noise(l))
            .cloned()
            .collect();
        let split = split_verse(&body, limits.rescue_verse_window);
        info!("Found {} on page {} ({} match)", m.key, page.number, m.strategy);
        remaining.remove(&m.key);
        rescues.push(Rescue {
            key: m.key,
            strategy: m.strategy,
            page: page.number,
            title: m.title,
            verse: split.verse,
            verse_ref: split.verse_ref,
            content: split.content,
        });
    }
    rescues
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyCounts {
    pub updated: usize,
    pub inserted: usize,
}

/// Overwrites the text of existing records or inserts new ones, then
/// restores calendar order. Ids and dates of existing records never change.
pub fn apply_rescues(records: &mut Vec<Record>, prefix: &str, rescues: &[Rescue]) -> ApplyCounts {
    let mut counts = ApplyCounts::default();
    for rescue in rescues {
        match records.iter_mut().find(|r| r.key() == rescue.key) {
            Some(record) => {
                record.title = rescue.title.clone();
                record.verse = rescue.verse.clone();
                record.verse_ref = rescue.verse_ref.clone();
                record.content = rescue.content.clone();
                counts.updated += 1;
            }
            None => {
                debug!("{} was missing, inserting", rescue.key);
                records.push(Record {
                    verse: rescue.verse.clone(),
                    verse_ref: rescue.verse_ref.clone(),
                    content: rescue.content.clone(),
                    ..Record::open(prefix, rescue.key, rescue.title.clone())
                });
                counts.inserted += 1;
            }
        }
    }
    records.sort_by_key(Record::key);
    counts
}

#[derive(Debug, Clone, Default)]
pub struct RepairReport {
    pub targets: usize,
    pub recovered: Vec<Rescue>,
    pub still_missing: Vec<DateKey>,
    pub counts: ApplyCounts,
}

/// Which dates a repair run should look for.
pub fn repair_targets(
    records: &[Record],
    book: &BookConfig,
    limits: &Limits,
    include_blank: bool,
) -> BTreeSet<DateKey> {
    let mut targets: BTreeSet<DateKey> = missing_dates(records, book.has_leap_day)
        .into_iter()
        .collect();
    if include_blank {
        targets.extend(blank_dates(records, limits.blank_content_chars));
    }
    targets
}

pub fn repair(
    records: &mut Vec<Record>,
    book: &BookConfig,
    limits: &Limits,
    pages: &[Page],
    targets: &BTreeSet<DateKey>,
) -> RepairReport {
    let noise = NoiseFilter::new(&book.running_headers);
    let rescues = rescue_pages(pages, targets, &noise, limits);
    let counts = apply_rescues(records, &book.prefix(), &rescues);

    let found: HashSet<DateKey> = rescues.iter().map(|r| r.key).collect();
    RepairReport {
        targets: targets.len(),
        still_missing: targets.iter().filter(|k| !found.contains(k)).copied().collect(),
        recovered: rescues,
        counts,
    }
}
