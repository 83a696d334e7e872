//! Metadata sidecar written next to the output document.
//!
//! The document itself stays a single strict JSON value; when and how it was
//! produced is recorded in `<stem>.meta.json` instead:
//!
//! ```json
//! {
//!   "generated_at": "2026-10-19T08:00:00Z",
//!   "mode": "issues",
//!   "source": "neovim/neovim",
//!   "keywords": ["crash", "segfault"],
//!   "document": "/home/me/issues.json",
//!   "pages_fetched": 4,
//!   "pages_skipped": 1,
//!   "items_fetched": 400,
//!   "items_written": 12,
//!   "duplicates_skipped": 0,
//!   "termination": { "reason": "stopped" }
//! }
//! ```

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::crawl::{CrawlError, CrawlReport};
use crate::paginator::Termination;

#[derive(Serialize)]
struct Sidecar<'a> {
    generated_at: String,
    mode: &'a str,
    source: &'a str,
    keywords: &'a [String],
    document: &'a Path,
    pages_fetched: u32,
    pages_skipped: u32,
    items_fetched: u64,
    items_written: u64,
    duplicates_skipped: u64,
    termination: &'a Termination,
}

/// Path of the sidecar for a given document path.
pub fn sidecar_path(document: &Path) -> PathBuf {
    document.with_extension("meta.json")
}

/// Write the sidecar for `report` and return its path.
pub fn write_sidecar(
    report: &CrawlReport,
    keywords: &[String],
    generated_at: DateTime<Utc>,
) -> Result<PathBuf, CrawlError> {
    let sidecar = Sidecar {
        generated_at: generated_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        mode: report.mode,
        source: &report.source,
        keywords,
        document: &report.output,
        pages_fetched: report.pages_fetched,
        pages_skipped: report.pages_skipped,
        items_fetched: report.items_fetched,
        items_written: report.items_written,
        duplicates_skipped: report.duplicates_skipped,
        termination: &report.termination,
    };
    let path = sidecar_path(&report.output);
    let json = serde_json::to_string_pretty(&sidecar)?;
    std::fs::write(&path, json)?;
    tracing::debug!(path = %path.display(), "Wrote metadata sidecar");
    Ok(path)
}
