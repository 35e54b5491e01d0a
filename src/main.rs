mod calendar;
mod diagnose;
mod error;
mod fetch;
mod model;
mod parser;
mod reconcile;
mod settings;
mod source;
mod store;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use itertools::Itertools;
use tracing::warn;

use error::ExtractError;
use model::{ChapterBook, DateKey};
use reconcile::Rescue;
use settings::{BookConfig, Settings};

#[derive(Parser)]
#[command(name = "devo_extract", about = "Devotional book PDF to dated JSON readings")]
struct Cli {
    /// Settings file (default: devo.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Segment book PDFs into one JSON record per calendar date
    Convert {
        /// Book codes (e.g. FH HB)
        codes: Vec<String>,
        /// Every configured book
        #[arg(long)]
        all: bool,
        /// Override the PDF (or form-feed text dump) path; single book only
        #[arg(long)]
        input: Option<PathBuf>,
        /// Override the JSON output path; single book only
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Report dates with no reading
    Missing {
        /// Book codes (default: every JSON file in the output directory)
        codes: Vec<String>,
    },
    /// Rescan the PDF for missing dates and patch the JSON in place
    Repair {
        code: String,
        /// Only these dates (e.g. "2/17" or "February 17")
        #[arg(short, long = "date")]
        dates: Vec<String>,
        /// Also refill readings with almost no content
        #[arg(long)]
        blank: bool,
    },
    /// Show pages that mention a date, for dates repair cannot find
    Diagnose {
        code: String,
        #[arg(short, long = "date", required = true)]
        dates: Vec<String>,
    },
    /// Split a chapter-organised book into numbered chapters
    Chapters {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
        #[arg(long)]
        title: String,
        /// Front-matter pages to ignore
        #[arg(long, default_value = "0")]
        skip_pages: usize,
        /// Repeated page header to strip from chapter text
        #[arg(long)]
        running_header: Option<String>,
    },
    /// Download book PDFs that are not present yet
    Fetch {
        codes: Vec<String>,
        #[arg(long)]
        all: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;

    let result = match cli.command {
        Commands::Convert {
            codes,
            all,
            input,
            output,
        } => {
            let books = select_books(&settings, codes, all)?;
            if books.len() > 1 && (input.is_some() || output.is_some()) {
                bail!("--input/--output need exactly one book");
            }
            for book in &books {
                let run = convert_book(&settings, book, input.as_deref(), output.as_deref());
                skip_missing(book, run)?;
            }
            Ok(())
        }
        Commands::Missing { codes } => {
            let codes = if codes.is_empty() {
                json_codes(&settings.json_dir)?
            } else {
                codes
            };
            if codes.is_empty() {
                println!("No JSON files in {:?}. Run 'convert' first.", settings.json_dir);
                return Ok(());
            }
            for code in codes {
                let book = settings.book(&code);
                if book.skip_check {
                    println!("[Skip] {}: excluded from checks", book.label());
                    continue;
                }
                skip_missing(&book, report_missing(&settings, &book))?;
            }
            Ok(())
        }
        Commands::Repair { code, dates, blank } => {
            let book = settings.book(&code);
            let dates = parse_dates(&dates)?;
            skip_missing(&book, repair_book(&settings, &book, dates, blank))
        }
        Commands::Diagnose { code, dates } => {
            let book = settings.book(&code);
            let dates = parse_dates(&dates)?;
            skip_missing(&book, diagnose_book(&settings, &book, &dates))
        }
        Commands::Chapters {
            input,
            output,
            title,
            skip_pages,
            running_header,
        } => {
            let pages = source::open(&input)?.pages()?;
            let chapters = parser::chapters::split_chapters(&pages, skip_pages, running_header.as_deref());
            if chapters.is_empty() {
                println!("No chapters found in {:?}", input);
                return Ok(());
            }
            let count = chapters.len();
            store::save_pretty(&output, &ChapterBook { title, chapters })?;
            println!("Saved {} chapters to {:?}", count, output);
            Ok(())
        }
        Commands::Fetch { codes, all } => {
            let books = select_books(&settings, codes, all)?;
            let mut failed = 0;
            for book in &books {
                let url = book.download_url(&settings);
                match fetch::download(&url, &book.pdf_path(&settings)) {
                    Ok(true) => println!("[Done] {}", book.label()),
                    Ok(false) => println!("[Have] {}", book.label()),
                    Err(e) => {
                        println!("[Fail] {}: {}", book.label(), e);
                        failed += 1;
                    }
                }
            }
            if failed > 0 {
                bail!("{} of {} downloads failed", failed, books.len());
            }
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

// ── Commands ──

fn convert_book(
    settings: &Settings,
    book: &BookConfig,
    input: Option<&Path>,
    output: Option<&Path>,
) -> Result<()> {
    let pdf = input.map_or_else(|| book.pdf_path(settings), Path::to_path_buf);
    let json = output.map_or_else(|| book.json_path(settings), Path::to_path_buf);

    println!("Converting {} from {:?}...", book.label(), pdf);
    let pages = source::open(&pdf)?.pages()?;
    let seg = parser::segment_book(book, &settings.limits, &pages);
    store::save_records(&json, &seg.records)?;

    let missing = reconcile::missing_dates(&seg.records, book.has_leap_day);
    let by_strategy = seg
        .stats
        .headers
        .iter()
        .map(|(strategy, n)| format!("{} {}", n, strategy))
        .join(", ");
    println!(
        "Saved {} readings to {:?} ({}; {} lines, {} noise, {} preamble, {} repeated headers)",
        seg.records.len(),
        json,
        if by_strategy.is_empty() { "no headers".to_string() } else { by_strategy },
        seg.stats.lines,
        seg.stats.noise,
        seg.stats.preamble,
        seg.stats.duplicates,
    );
    if !missing.is_empty() {
        println!("{} dates missing. Run 'repair {}'.", missing.len(), book.code);
    }
    Ok(())
}

fn report_missing(settings: &Settings, book: &BookConfig) -> Result<()> {
    let records = store::load_records(&book.json_path(settings))?;
    let missing = reconcile::missing_dates(&records, book.has_leap_day);
    if missing.is_empty() {
        println!("{}: complete ({} readings)", book.label(), records.len());
        return Ok(());
    }

    println!(
        "{}: {} readings, {} missing: {}",
        book.label(),
        records.len(),
        missing.len(),
        missing.iter().join(", ")
    );
    println!("  forced_headers = [");
    for key in &missing {
        println!("    {{ month = {}, day = {}, title = \"\" }},", key.month, key.day);
    }
    println!("  ]");
    Ok(())
}

fn repair_book(
    settings: &Settings,
    book: &BookConfig,
    dates: Vec<DateKey>,
    blank: bool,
) -> Result<()> {
    let json = book.json_path(settings);
    let mut records = store::load_records(&json)?;
    let targets: BTreeSet<DateKey> = if dates.is_empty() {
        reconcile::repair_targets(&records, book, &settings.limits, blank)
    } else {
        dates.into_iter().collect()
    };
    if targets.is_empty() {
        println!("{}: nothing to repair", book.label());
        return Ok(());
    }

    println!("Repairing {}: looking for {} dates...", book.label(), targets.len());
    let pages = source::open(&book.pdf_path(settings))?.pages()?;
    let report = reconcile::repair(&mut records, book, &settings.limits, &pages, &targets);

    if report.recovered.is_empty() {
        println!("Nothing recovered; {:?} left unchanged", json);
    } else {
        let bak = store::backup(&json).with_context(|| format!("Backup of {:?} failed", json))?;
        store::save_records(&json, &records)?;
        println!(
            "Recovered {} of {} dates ({} updated, {} inserted, {}); backup at {:?}",
            report.recovered.len(),
            report.targets,
            report.counts.updated,
            report.counts.inserted,
            strategy_counts(&report.recovered),
            bak,
        );
        for rescue in &report.recovered {
            println!("  {} <- page {} ({}): {}", rescue.key, rescue.page, rescue.strategy, rescue.title);
        }
    }
    if !report.still_missing.is_empty() {
        println!("Still missing: {}", report.still_missing.iter().join(", "));
        println!("Try 'diagnose {} --date <DATE>' or add forced_headers.", book.code);
    }
    Ok(())
}

fn diagnose_book(settings: &Settings, book: &BookConfig, dates: &[DateKey]) -> Result<()> {
    let pages = source::open(&book.pdf_path(settings))?.pages()?;
    for key in dates {
        let found = diagnose::candidates(&pages, *key);
        if found.is_empty() {
            println!("{}: no page mentions this date", key);
            continue;
        }
        for candidate in found {
            println!("{} on page {}:", key, candidate.page);
            for line in &candidate.sample {
                println!("  | {}", line);
            }
        }
    }
    Ok(())
}

// ── Helpers ──

fn select_books(settings: &Settings, codes: Vec<String>, all: bool) -> Result<Vec<BookConfig>> {
    if all {
        return Ok(settings.books.clone());
    }
    if codes.is_empty() {
        bail!("Give at least one book code or --all");
    }
    Ok(codes.iter().map(|c| settings.book(c)).collect())
}

/// A missing input skips that book; anything else aborts the run.
fn skip_missing(book: &BookConfig, run: Result<()>) -> Result<()> {
    match run {
        Err(e) if e.downcast_ref::<ExtractError>().is_some_and(ExtractError::is_missing_input) => {
            println!("[Skip] {}: {}", book.label(), e);
            Ok(())
        }
        other => other,
    }
}

fn parse_dates(raw: &[String]) -> Result<Vec<DateKey>> {
    raw.iter()
        .map(|d| d.parse::<DateKey>().map_err(anyhow::Error::from))
        .collect()
}

/// Book codes of the JSON files already written.
fn json_codes(dir: &Path) -> Result<Vec<String>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let entries = std::fs::read_dir(dir).with_context(|| format!("Failed to list {:?}", dir))?;
    let mut codes: Vec<String> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|x| x == "json"))
        .filter(|p| {
            let ok = store::holds_records(p);
            if !ok {
                warn!("Skipping {:?}: not a list of dated readings", p);
            }
            ok
        })
        .filter_map(|p| p.file_stem()?.to_str().map(str::to_uppercase))
        .collect();
    codes.sort();
    Ok(codes)
}

fn strategy_counts(found: &[Rescue]) -> String {
    found
        .iter()
        .map(|r| r.strategy)
        .counts()
        .into_iter()
        .sorted()
        .map(|(s, n)| format!("{} {}", n, s))
        .join(", ")
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else {
        format!("{}m {}s", secs / 60, secs % 60)
    }
}
