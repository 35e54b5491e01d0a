use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use config::Config;
use serde::Deserialize;

use crate::model::DateKey;

pub const DEFAULT_CONFIG: &str = "devo.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub pdf_dir: PathBuf,
    pub json_dir: PathBuf,
    pub download_base: String,
    pub limits: Limits,
    pub books: Vec<BookConfig>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            pdf_dir: PathBuf::from("pdf_downloads"),
            json_dir: PathBuf::from("json_output"),
            download_base: "https://media4.egwwritings.org/pdf".to_string(),
            limits: Limits::default(),
            books: Vec::new(),
        }
    }
}

/// Header-plausibility and scan-window thresholds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Limits {
    pub header_max_chars: usize,
    pub forced_max_chars: usize,
    pub rescue_max_chars: usize,
    pub lookback_lines: usize,
    pub verse_window: usize,
    pub rescue_verse_window: usize,
    pub header_zone: usize,
    pub min_page_chars: usize,
    pub blank_content_chars: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            header_max_chars: 140,
            forced_max_chars: 120,
            rescue_max_chars: 150,
            lookback_lines: 3,
            verse_window: 20,
            rescue_verse_window: 12,
            header_zone: 15,
            min_page_chars: 500,
            blank_content_chars: 100,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatedTitle {
    pub month: u32,
    pub day: u32,
    pub title: String,
}

impl DatedTitle {
    pub fn key(&self) -> Option<DateKey> {
        DateKey::new(self.month, self.day)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BookConfig {
    pub code: String,
    pub title: Option<String>,
    pub running_headers: Vec<String>,
    /// Exact title replacements for dates the anchor regex finds.
    pub title_overrides: Vec<DatedTitle>,
    /// Headers forced by month/day substring match.
    pub forced_headers: Vec<DatedTitle>,
    pub has_leap_day: bool,
    /// Excluded from missing-date reports.
    pub skip_check: bool,
    pub pdf: Option<PathBuf>,
    pub json: Option<PathBuf>,
    pub url: Option<String>,
}

impl BookConfig {
    pub fn named(code: &str) -> Self {
        BookConfig {
            code: code.to_uppercase(),
            ..Default::default()
        }
    }

    /// Lowercase code used in record ids and file names.
    pub fn prefix(&self) -> String {
        self.code.to_lowercase()
    }

    pub fn label(&self) -> String {
        match &self.title {
            Some(t) => format!("{} ({})", self.code, t),
            None => self.code.clone(),
        }
    }

    pub fn pdf_path(&self, settings: &Settings) -> PathBuf {
        self.pdf
            .clone()
            .unwrap_or_else(|| settings.pdf_dir.join(format!("en_{}.pdf", self.code)))
    }

    pub fn json_path(&self, settings: &Settings) -> PathBuf {
        self.json
            .clone()
            .unwrap_or_else(|| settings.json_dir.join(format!("{}.json", self.prefix())))
    }

    pub fn download_url(&self, settings: &Settings) -> String {
        self.url.clone().unwrap_or_else(|| {
            format!(
                "{}/en_{}.pdf",
                settings.download_base.trim_end_matches('/'),
                self.code
            )
        })
    }

    pub fn overrides(&self) -> HashMap<DateKey, String> {
        self.title_overrides
            .iter()
            .filter_map(|o| Some((o.key()?, o.title.clone())))
            .collect()
    }
}

impl Settings {
    /// Optional TOML file layered under `DEVO_*` environment variables.
    /// Nested keys use `__`, as in `DEVO_LIMITS__VERSE_WINDOW`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG));
        let env = config::Environment::with_prefix("DEVO")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true);
        let settings = Config::builder()
            .add_source(config::File::from(file).required(path.is_some()))
            .add_source(env)
            .build()
            .with_context(|| format!("Failed to load settings from {:?}", file))?;
        settings
            .try_deserialize()
            .with_context(|| format!("Invalid settings in {:?}", file))
    }

    /// Configured book, or a bare config for an unknown code.
    pub fn book(&self, code: &str) -> BookConfig {
        self.books
            .iter()
            .find(|b| b.code.eq_ignore_ascii_case(code))
            .cloned()
            .unwrap_or_else(|| BookConfig::named(code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_without_file() {
        let s = Settings::default();
        assert_eq!(s.limits.header_max_chars, 140);
        assert_eq!(s.limits.verse_window, 20);
        let book = s.book("fh");
        assert_eq!(book.code, "FH");
        assert_eq!(book.pdf_path(&s), PathBuf::from("pdf_downloads/en_FH.pdf"));
        assert_eq!(book.json_path(&s), PathBuf::from("json_output/fh.json"));
        assert_eq!(
            book.download_url(&s),
            "https://media4.egwwritings.org/pdf/en_FH.pdf"
        );
    }

    #[test]
    fn loads_books_from_toml() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
json_dir = "out"

[limits]
blank_content_chars = 40

[[books]]
code = "HB"
title = "Homeward Bound"
running_headers = ["The Upward Look"]
forced_headers = [{{ month = 3, day = 15, title = "Holiness Is . . . !" }}]
"#
        )
        .unwrap();

        let s = Settings::load(Some(file.path())).unwrap();
        assert_eq!(s.json_dir, PathBuf::from("out"));
        assert_eq!(s.limits.blank_content_chars, 40);
        assert_eq!(s.limits.header_zone, 15);

        let hb = s.book("hb");
        assert_eq!(hb.label(), "HB (Homeward Bound)");
        assert_eq!(hb.running_headers, vec!["The Upward Look".to_string()]);
        assert_eq!(hb.forced_headers[0].key(), DateKey::new(3, 15));
        assert_eq!(hb.json_path(&s), PathBuf::from("out/hb.json"));
    }

    #[test]
    fn environment_overrides_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "download_base = \"https://file.example/pdf\"").unwrap();

        // No other test reads these two keys back from a load.
        std::env::set_var("DEVO_DOWNLOAD_BASE", "https://mirror.example/pdf");
        std::env::set_var("DEVO_LIMITS__LOOKBACK_LINES", "7");
        let loaded = Settings::load(Some(file.path()));
        std::env::remove_var("DEVO_DOWNLOAD_BASE");
        std::env::remove_var("DEVO_LIMITS__LOOKBACK_LINES");

        let s = loaded.unwrap();
        assert_eq!(s.download_base, "https://mirror.example/pdf");
        assert_eq!(s.limits.lookback_lines, 7);
        assert_eq!(s.limits.verse_window, 20);
        assert_eq!(
            s.book("fh").download_url(&s),
            "https://mirror.example/pdf/en_FH.pdf"
        );
    }
}
