use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::calendar;
use crate::error::ExtractError;

/// (month, day) uniqueness key for one reading within a book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DateKey {
    pub month: u32,
    pub day: u32,
}

impl DateKey {
    pub fn new(month: u32, day: u32) -> Option<Self> {
        calendar::is_valid(month, day).then_some(DateKey { month, day })
    }

    pub fn month_name(&self) -> &'static str {
        calendar::month_name(self.month).unwrap_or("?")
    }

    pub fn month_abbrev(&self) -> &'static str {
        calendar::month_abbrev(self.month).unwrap_or("?")
    }

    pub fn day_text(&self) -> String {
        self.day.to_string()
    }

    /// Record id, e.g. `fh_01_07`.
    pub fn record_id(&self, prefix: &str) -> String {
        format!("{}_{:02}_{:02}", prefix, self.month, self.day)
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.month_name(), self.day)
    }
}

/// Accepts `2/17`, `February 17` and `Feb 17`.
impl FromStr for DateKey {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ExtractError::InvalidDate(s.to_string());
        let trimmed = s.trim();
        let (month, day) = if let Some((m, d)) = trimmed.split_once('/') {
            let month = m.trim().parse::<u32>().map_err(|_| invalid())?;
            (month, d.trim())
        } else {
            let (m, d) = trimmed.rsplit_once(char::is_whitespace).ok_or_else(invalid)?;
            (calendar::parse_month(m).ok_or_else(invalid)?, d.trim())
        };
        let day = day.parse::<u32>().map_err(|_| invalid())?;
        DateKey::new(month, day).ok_or_else(invalid)
    }
}

/// One dated devotional reading, serialized as-is into the book JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub month: u32,
    pub day: u32,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub verse: String,
    #[serde(default)]
    pub verse_ref: String,
    #[serde(default)]
    pub content: String,
}

impl Record {
    pub fn open(prefix: &str, key: DateKey, title: String) -> Self {
        Record {
            id: key.record_id(prefix),
            month: key.month,
            day: key.day,
            title,
            verse: String::new(),
            verse_ref: String::new(),
            content: String::new(),
        }
    }

    pub fn key(&self) -> DateKey {
        DateKey {
            month: self.month,
            day: self.day,
        }
    }

    pub fn is_blank(&self, min_chars: usize) -> bool {
        self.content.trim().chars().count() < min_chars
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub number: u32,
    pub title: String,
    pub content: String,
}

/// Chapter-organised book, written as `{ "title": ..., "chapters": [...] }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterBook {
    pub title: String,
    pub chapters: Vec<Chapter>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_date_forms() {
        let expected = DateKey { month: 2, day: 17 };
        assert_eq!("2/17".parse::<DateKey>().unwrap(), expected);
        assert_eq!("February 17".parse::<DateKey>().unwrap(), expected);
        assert_eq!("feb 17".parse::<DateKey>().unwrap(), expected);
        assert!("February 30".parse::<DateKey>().is_err());
        assert!("17".parse::<DateKey>().is_err());
    }

    #[test]
    fn record_id_is_zero_padded() {
        let key = DateKey::new(3, 5).unwrap();
        assert_eq!(key.record_id("hb"), "hb_03_05");
        assert_eq!(key.to_string(), "March 5");
    }

    #[test]
    fn record_json_field_names() {
        let mut r = Record::open("fh", DateKey::new(1, 1).unwrap(), "The Gift".into());
        r.verse_ref = "John 3:16".into();
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["id"], "fh_01_01");
        assert_eq!(v["verse_ref"], "John 3:16");
        assert_eq!(v["content"], "");
    }

    #[test]
    fn blank_threshold_counts_chars() {
        let mut r = Record::open("fh", DateKey::new(1, 2).unwrap(), String::new());
        r.content = "short".into();
        assert!(r.is_blank(10));
        assert!(!r.is_blank(5));
    }
}
