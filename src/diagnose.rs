use crate::model::DateKey;
use crate::source::Page;

const SAMPLE_LINES: usize = 5;
const MAX_CANDIDATES: usize = 2;

/// A page that mentions both the month name and the day number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub page: usize,
    pub sample: Vec<String>,
}

/// First pages that could hold `key`'s header, with their top lines, for a
/// human to inspect when every rescue strategy failed.
pub fn candidates(pages: &[Page], key: DateKey) -> Vec<Candidate> {
    let month = key.month_name();
    let day = key.day_text();
    pages
        .iter()
        .filter_map(|page| {
            let text = page.text.as_deref()?;
            (text.contains(month) && text.contains(&day)).then(|| Candidate {
                page: page.number,
                sample: page.lines().into_iter().take(SAMPLE_LINES).collect(),
            })
        })
        .take(MAX_CANDIDATES)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::split_pages;

    #[test]
    fn samples_top_lines_of_first_two_pages() {
        let raw = std::fs::read_to_string("tests/fixtures/sample_book.txt").unwrap();
        let pages = split_pages(&raw);
        let found = candidates(&pages, DateKey::new(1, 4).unwrap());
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].page, 2);
        assert_eq!(found[0].sample.len(), 5);
    }

    #[test]
    fn no_candidates() {
        let pages = split_pages("nothing here\x0Cnor here");
        assert!(candidates(&pages, DateKey::new(9, 29).unwrap()).is_empty());
    }
}
