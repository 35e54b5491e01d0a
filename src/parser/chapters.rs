use std::sync::LazyLock;

use regex::Regex;
use tracing::info;

use crate::model::Chapter;
use crate::source::Page;

static CHAPTER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:Chap\.|Chapter)\s+(\d+)").unwrap());
static DOTTED_PAGE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\.\s*\d+$").unwrap());
static SPACED_PAGE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+\d+$").unwrap());
static PAGE_LINE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^\d+\s*$").unwrap());
static CONTENTS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^Contents\s+[ivx]+$").unwrap());
static HYPHEN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\w+)-\n(\w+)").unwrap());
static FOOTNOTE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[\d+\]").unwrap());

const MIN_CHAPTER_CHARS: usize = 200;

/// Splits a chapter-organised book into numbered chapters. Text before the
/// first chapter header is kept as a "Preface" numbered 0.
pub fn split_chapters(pages: &[Page], skip_pages: usize, running_header: Option<&str>) -> Vec<Chapter> {
    let mut chapters = Vec::new();
    let mut current = Chapter {
        number: 0,
        title: "Preface".to_string(),
        content: String::new(),
    };

    for page in pages.iter().skip(skip_pages) {
        let lines = page.lines();
        let mut idx = 0;
        while idx < lines.len() {
            let line = &lines[idx];
            idx += 1;

            let header = CHAPTER_RE.captures(line).and_then(|caps| {
                let rest = &line[caps.get(0)?.end()..];
                let number = caps[1].parse::<u32>().ok()?;
                (!is_toc_line(rest)).then_some((number, rest))
            });
            let Some((number, rest)) = header else {
                current.content.push_str(line);
                current.content.push('\n');
                continue;
            };
            // Repeats and backward jumps are cross-references.
            if number <= current.number {
                continue;
            }

            let rest = rest.trim_matches(|c: char| matches!(c, ' ' | '.' | ':' | '-' | '—' | '–'));
            let title = if rest.chars().count() > 3 {
                rest.to_string()
            } else if let Some(next) = lines.get(idx) {
                idx += 1;
                next.clone()
            } else {
                format!("Chapter {}", number)
            };

            info!("Chapter {}: {} (page {})", number, title, page.number);
            let previous = std::mem::replace(
                &mut current,
                Chapter {
                    number,
                    title,
                    content: String::new(),
                },
            );
            push_chapter(&mut chapters, previous, running_header);
        }
    }
    push_chapter(&mut chapters, current, running_header);
    chapters
}

fn push_chapter(chapters: &mut Vec<Chapter>, mut chapter: Chapter, running_header: Option<&str>) {
    if chapter.content.chars().count() > MIN_CHAPTER_CHARS {
        chapter.content = clean_content(&chapter.content, running_header);
        chapters.push(chapter);
    }
}

/// Text after a chapter header that ends in a page number, as in a table
/// of contents.
pub fn is_toc_line(line: &str) -> bool {
    DOTTED_PAGE_RE.is_match(line) || (SPACED_PAGE_RE.is_match(line) && line.chars().count() < 70)
}

pub fn clean_content(text: &str, running_header: Option<&str>) -> String {
    let text = PAGE_LINE_RE.replace_all(text, "");
    let text = match running_header.filter(|h| !h.is_empty()) {
        Some(header) => text.replace(header, ""),
        None => text.into_owned(),
    };
    let text = CONTENTS_RE.replace_all(&text, "");
    let text = HYPHEN_RE.replace_all(&text, "$1$2");
    let text = FOOTNOTE_RE.replace_all(&text, "");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
