pub mod assembler;
pub mod chapters;
pub mod header;
pub mod noise;
pub mod verse;

use crate::settings::{BookConfig, Limits};
use crate::source::{book_lines, Page};
use assembler::{Segmentation, Segmenter};

/// Initial pass: pages → lines → dated records.
pub fn segment_book(book: &BookConfig, limits: &Limits, pages: &[Page]) -> Segmentation {
    let lines = book_lines(pages);
    Segmenter::for_book(book, limits).segment(&lines)
}
