//! PDF text extractor collaborator: a book path becomes ordered pages, each
//! holding its raw text or nothing (blank/image page, failed extraction).

use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use lopdf::Document;
use tracing::debug;

use crate::error::ExtractError;

#[derive(Debug, Clone)]
pub struct Page {
    /// 1-based page number.
    pub number: usize,
    pub text: Option<String>,
}

impl Page {
    pub fn lines(&self) -> Vec<String> {
        self.text.as_deref().map(page_lines).unwrap_or_default()
    }

    pub fn char_len(&self) -> usize {
        self.text.as_deref().map_or(0, |t| t.chars().count())
    }
}

pub trait PageSource {
    fn pages(&self) -> Result<Vec<Page>, ExtractError>;
}

pub struct PdfSource {
    path: PathBuf,
}

impl PageSource for PdfSource {
    fn pages(&self) -> Result<Vec<Page>, ExtractError> {
        let doc = Document::load(&self.path).map_err(|source| ExtractError::Pdf {
            path: self.path.clone(),
            source,
        })?;
        let numbers: Vec<u32> = doc.get_pages().keys().copied().collect();

        let pb = ProgressBar::new(numbers.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40} {pos}/{len} pages ({per_sec})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );

        let mut pages = Vec::with_capacity(numbers.len());
        for (idx, number) in numbers.into_iter().enumerate() {
            let text = match doc.extract_text(&[number]) {
                Ok(t) if !t.trim().is_empty() => Some(t),
                Ok(_) => None,
                Err(e) => {
                    debug!("page {} of {:?} has no text: {}", number, self.path, e);
                    None
                }
            };
            pages.push(Page {
                number: idx + 1,
                text,
            });
            pb.inc(1);
        }
        pb.finish_and_clear();
        Ok(pages)
    }
}

/// Plain-text dump with pages separated by form feeds.
pub struct TextSource {
    path: PathBuf,
}

impl PageSource for TextSource {
    fn pages(&self) -> Result<Vec<Page>, ExtractError> {
        let raw = std::fs::read_to_string(&self.path)
            .map_err(|e| ExtractError::io(&self.path, e))?;
        Ok(split_pages(&raw))
    }
}

pub fn split_pages(raw: &str) -> Vec<Page> {
    raw.split('\x0C')
        .enumerate()
        .map(|(idx, text)| Page {
            number: idx + 1,
            text: (!text.trim().is_empty()).then(|| text.to_string()),
        })
        .collect()
}

/// Picks the extractor by file extension.
pub fn open(path: &Path) -> Result<Box<dyn PageSource>, ExtractError> {
    if !path.exists() {
        return Err(ExtractError::NotFound(path.to_path_buf()));
    }
    let is_pdf = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
    let path = path.to_path_buf();
    if is_pdf {
        Ok(Box::new(PdfSource { path }))
    } else {
        Ok(Box::new(TextSource { path }))
    }
}

/// Trimmed, non-empty lines of one page.
pub fn page_lines(raw: &str) -> Vec<String> {
    raw.replace("\r\n", "\n")
        .split('\n')
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect()
}

/// All lines of the book in document order.
pub fn book_lines(pages: &[Page]) -> Vec<String> {
    pages.iter().flat_map(Page::lines).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_are_trimmed_and_blank_free() {
        let lines = page_lines("  Title, January 1 \r\n\r\n  body  \n\n");
        assert_eq!(lines, vec!["Title, January 1", "body"]);
    }

    #[test]
    fn form_feed_pages_keep_numbering() {
        let pages = split_pages("one\ntwo\x0C   \x0Cthree");
        assert_eq!(pages.len(), 3);
        assert!(pages[1].text.is_none());
        assert_eq!(pages[2].number, 3);
        assert_eq!(book_lines(&pages), vec!["one", "two", "three"]);
    }

    #[test]
    fn missing_file_is_reported() {
        let err = open(Path::new("tests/fixtures/nope.pdf")).err().unwrap();
        assert!(err.is_missing_input());
    }

    #[test]
    fn text_fixture_opens_as_text() {
        let src = open(Path::new("tests/fixtures/sample_book.txt")).unwrap();
        let pages = src.pages().unwrap();
        assert!(pages.len() >= 4);
        assert!(pages[0].char_len() > 0);
    }
}
