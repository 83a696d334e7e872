//! Crawl progress reporting.
//!
//! Reports observable progress while a crawl runs so users see which page is
//! being read, how many items were kept, and when the document is done.
//! Progress is emitted on **stderr** so stdout remains parseable for scripts.
//!
//! The reporter is handed to the orchestrator at construction; the core never
//! writes to stderr directly.

use std::io::Write;

/// A single progress event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CrawlProgressEvent {
    /// A page was fetched and classified.
    Page {
        page: u32,
        fetched: u64,
        kept: u64,
        skipped: bool,
    },
    /// A page lay entirely before the recency window; no further pages are read.
    OutOfWindow { page: u32, fetched: u64, kept: u64 },
    /// The crawl finished and the document was closed.
    Finished { pages: u32, written: u64 },
}

/// Reports crawl progress. Implementations write to stderr (human or JSON).
pub trait CrawlProgressReporter: Send + Sync {
    /// Emit a progress event. Called from the crawl loop.
    fn report(&self, event: CrawlProgressEvent);
}

/// Human-friendly progress on stderr: "harvest  page 3  1,234 kept / 300 fetched".
pub struct StderrProgress;

impl CrawlProgressReporter for StderrProgress {
    fn report(&self, event: CrawlProgressEvent) {
        let line = match &event {
            CrawlProgressEvent::Page {
                page,
                fetched,
                kept,
                skipped,
            } => {
                let note = if *skipped { "  (no keyword on page)" } else { "" };
                format!(
                    "harvest  page {}  {} kept / {} fetched{}\n",
                    page,
                    format_number(*kept),
                    format_number(*fetched),
                    note
                )
            }
            CrawlProgressEvent::OutOfWindow {
                page,
                fetched,
                kept,
            } => format!(
                "harvest  page {}  {} kept / {} fetched  (older than window, stopping)\n",
                page,
                format_number(*kept),
                format_number(*fetched)
            ),
            CrawlProgressEvent::Finished { pages, written } => format!(
                "harvest  done  {} items from {} pages\n",
                format_number(*written),
                pages
            ),
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl CrawlProgressReporter for JsonProgress {
    fn report(&self, event: CrawlProgressEvent) {
        let obj = match &event {
            CrawlProgressEvent::Page {
                page,
                fetched,
                kept,
                skipped,
            } => serde_json::json!({
                "event": "progress",
                "phase": "page",
                "page": page,
                "fetched": fetched,
                "kept": kept,
                "skipped": skipped
            }),
            CrawlProgressEvent::OutOfWindow {
                page,
                fetched,
                kept,
            } => serde_json::json!({
                "event": "progress",
                "phase": "out_of_window",
                "page": page,
                "fetched": fetched,
                "kept": kept
            }),
            CrawlProgressEvent::Finished { pages, written } => serde_json::json!({
                "event": "progress",
                "phase": "finished",
                "pages": pages,
                "written": written
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl CrawlProgressReporter for NoProgress {
    fn report(&self, _event: CrawlProgressEvent) {}
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    for (i, c) in s.chars().enumerate() {
        if i > 0 && (s.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    /// Build a reporter for this mode.
    pub fn reporter(&self) -> Box<dyn CrawlProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
