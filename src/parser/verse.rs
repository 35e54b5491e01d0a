use std::sync::LazyLock;

use regex::Regex;

/// "Psalm 119:105." / "1 Peter 5:7" at the end of a line.
static REFERENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^.*?(\d?\s?[A-Za-z]+\s\d+:\d+(?:-\d+)?)\.?$").unwrap());

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerseSplit {
    pub verse: String,
    pub verse_ref: String,
    pub content: String,
}

/// Splits a reading's lines at the first scripture reference found within
/// `window` lines. Without one, everything is content.
pub fn split_verse(buffer: &[String], window: usize) -> VerseSplit {
    let found = buffer.iter().take(window).enumerate().find_map(|(idx, line)| {
        let caps = REFERENCE_RE.captures(line)?;
        Some((idx, caps.get(1)?.as_str().trim().to_string()))
    });

    match found {
        Some((idx, verse_ref)) => VerseSplit {
            verse: buffer[..=idx].join(" "),
            verse_ref,
            content: buffer[idx + 1..].join("\n"),
        },
        None => VerseSplit {
            content: buffer.join("\n"),
            ..Default::default()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn reference_splits_verse_from_content() {
        let buf = lines(&[
            "God so loved the world",
            "John 3:16.",
            "Reflect on this today.",
            "And tomorrow.",
        ]);
        let split = split_verse(&buf, 20);
        assert_eq!(split.verse, "God so loved the world John 3:16.");
        assert_eq!(split.verse_ref, "John 3:16");
        assert_eq!(split.content, "Reflect on this today.\nAnd tomorrow.");
    }

    #[test]
    fn numbered_book_and_range() {
        let buf = lines(&["Casting all your care upon him. 1 Peter 5:7-8", "Body"]);
        let split = split_verse(&buf, 20);
        assert_eq!(split.verse_ref, "1 Peter 5:7-8");
        assert_eq!(split.content, "Body");
    }

    #[test]
    fn reference_ending_a_prose_line() {
        let buf = lines(&["and in the night his song shall be with me. Psalm 42:8.", "Body"]);
        let split = split_verse(&buf, 12);
        assert_eq!(split.verse_ref, "Psalm 42:8");
        assert_eq!(split.verse, "and in the night his song shall be with me. Psalm 42:8.");
        assert_eq!(split.content, "Body");
    }

    #[test]
    fn reference_outside_window_stays_in_content() {
        let buf = lines(&["one", "two", "three", "Psalm 23:1."]);
        let split = split_verse(&buf, 3);
        assert!(split.verse.is_empty());
        assert!(split.verse_ref.is_empty());
        assert_eq!(split.content, "one\ntwo\nthree\nPsalm 23:1.");
    }

    #[test]
    fn mid_line_reference_is_not_a_verse() {
        let buf = lines(&["As John 3:16 says, love gives."]);
        let split = split_verse(&buf, 20);
        assert!(split.verse_ref.is_empty());
    }

    #[test]
    fn empty_buffer() {
        assert_eq!(split_verse(&[], 20), VerseSplit::default());
    }
}
