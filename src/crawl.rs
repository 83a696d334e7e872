//! Crawl orchestration.
//!
//! Coordinates the full flow for one invocation:
//! URL → [`locator`](crate::locator) → credential check → [`Paginator`] →
//! relevance filter → [`Deduplicator`] → [`StreamingArrayWriter`] →
//! optional metadata sidecar.
//!
//! # Modes
//!
//! | Mode | Listing | Filter | Document |
//! |------|---------|--------|----------|
//! | [`CrawlMode::Issues`] | repository issues, newest first | keywords + recency window | `[ {number,title,body,url}, ... ]` |
//! | [`CrawlMode::Conversation`] | comments of one pull request | none (dedup only) | `{"responses": [ {id,type,author,timestamp,content}, ... ]}` |
//!
//! # Failure policy
//!
//! Input errors ([`CrawlError::InvalidReference`],
//! [`CrawlError::MissingCredential`]) are raised before the output file is
//! touched. A failed page fetch ends pagination but the document is still
//! closed and the crawl reports success with
//! [`Termination::TransportFailure`]. Output I/O and serialization errors are
//! fatal.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::Config;
use crate::dedup::Deduplicator;
use crate::filter::{aggregate_page_text, item_matches, page_may_contain_match, RecencyWindow};
use crate::github::{GitHubSource, Listing};
use crate::locator;
use crate::metadata;
use crate::models::{CommentRecord, IssueRecord, KeywordSet, RawComment, RawIssue, SourceReference};
use crate::paginator::{FetchError, PageSource, Paginator, Termination};
use crate::progress::{CrawlProgressEvent, CrawlProgressReporter};
use crate::writer::StreamingArrayWriter;

/// Object key wrapping the comment array in conversation mode.
pub const CONVERSATION_ENVELOPE: &str = "responses";

#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("{0}")]
    InvalidReference(String),
    #[error("missing credential: environment variable {0} is not set")]
    MissingCredential(String),
    #[error("failed to set up page source: {0}")]
    Source(#[from] FetchError),
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("output error: {0}")]
    Io(#[from] std::io::Error),
}

impl CrawlError {
    pub fn code(&self) -> &'static str {
        match self {
            CrawlError::InvalidReference(_) => "invalid_reference",
            CrawlError::MissingCredential(_) => "missing_credential",
            CrawlError::Source(_) => "source_error",
            CrawlError::Serialization(_) => "serialization_failure",
            CrawlError::Io(_) => "io_error",
        }
    }

    /// `true` for errors raised before any network call or file write.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            CrawlError::InvalidReference(_) | CrawlError::MissingCredential(_)
        )
    }

    /// Structured error result reported in place of a document:
    /// `{"error": {"code": "...", "message": "..."}}`.
    pub fn payload(&self) -> Value {
        serde_json::json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
            }
        })
    }
}

/// The two crawl behaviors, selected once per invocation.
#[derive(Debug, Clone)]
pub enum CrawlMode {
    Issues { keywords: KeywordSet },
    Conversation,
}

impl CrawlMode {
    pub fn name(&self) -> &'static str {
        match self {
            CrawlMode::Issues { .. } => "issues",
            CrawlMode::Conversation => "conversation",
        }
    }

    /// Resolve the URL for this mode.
    pub fn locate(&self, url: &str) -> Result<SourceReference, CrawlError> {
        match self {
            CrawlMode::Issues { .. } => locator::parse_repo_url(url),
            CrawlMode::Conversation => locator::parse_thread_url(url),
        }
    }

    fn listing(&self, reference: &SourceReference) -> Result<Listing, CrawlError> {
        match self {
            CrawlMode::Issues { .. } => Ok(Listing::Issues {
                owner: reference.owner.clone(),
                repo: reference.repo.clone(),
            }),
            CrawlMode::Conversation => {
                let number = reference.thread_number.ok_or_else(|| {
                    CrawlError::InvalidReference(format!(
                        "No pull request number in reference {}",
                        reference
                    ))
                })?;
                Ok(Listing::Comments {
                    owner: reference.owner.clone(),
                    repo: reference.repo.clone(),
                    number,
                })
            }
        }
    }

    fn keywords(&self) -> Vec<String> {
        match self {
            CrawlMode::Issues { keywords } => keywords.terms().to_vec(),
            CrawlMode::Conversation => Vec::new(),
        }
    }
}

/// Summary of a finished crawl.
#[derive(Debug, Clone, Serialize)]
pub struct CrawlReport {
    pub mode: &'static str,
    pub source: String,
    pub output: PathBuf,
    pub pages_fetched: u32,
    pub pages_skipped: u32,
    pub items_fetched: u64,
    pub items_written: u64,
    pub duplicates_skipped: u64,
    pub termination: Termination,
    pub metadata: Option<PathBuf>,
}

impl CrawlReport {
    /// `true` when pagination ended on a failed fetch and the document may
    /// be missing items.
    pub fn is_partial(&self) -> bool {
        self.termination.is_failure()
    }
}

#[derive(Default)]
struct Counters {
    pages_skipped: u32,
    items_fetched: u64,
}

/// Runs crawls against the configured API.
pub struct Crawler<'a> {
    config: &'a Config,
    progress: &'a dyn CrawlProgressReporter,
    started_at: DateTime<Utc>,
}

impl<'a> Crawler<'a> {
    pub fn new(config: &'a Config, progress: &'a dyn CrawlProgressReporter) -> Self {
        Self {
            config,
            progress,
            started_at: Utc::now(),
        }
    }

    /// Anchor the recency window at `started_at` instead of now.
    pub fn with_start(mut self, started_at: DateTime<Utc>) -> Self {
        self.started_at = started_at;
        self
    }

    /// Validate inputs, then crawl the GitHub API into `output`.
    pub async fn run(
        &self,
        url: &str,
        mode: &CrawlMode,
        output: &Path,
    ) -> Result<CrawlReport, CrawlError> {
        let reference = match mode.locate(url) {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(url, error = %e, "Rejected source URL");
                return Err(e);
            }
        };

        let token = match self.config.token() {
            Some(t) => t,
            None => {
                tracing::error!(var = %self.config.api.token_env, "Credential missing in environment");
                return Err(CrawlError::MissingCredential(self.config.api.token_env.clone()));
            }
        };

        let source = GitHubSource::new(&self.config.api, token, mode.listing(&reference)?)?;
        self.run_with_source(&reference, mode, &source, output).await
    }

    /// Crawl `source` into `output`. Inputs are assumed validated.
    pub async fn run_with_source(
        &self,
        reference: &SourceReference,
        mode: &CrawlMode,
        source: &dyn PageSource,
        output: &Path,
    ) -> Result<CrawlReport, CrawlError> {
        tracing::info!(mode = mode.name(), source = %reference, "Starting crawl");

        let chunk_size = self.config.crawl.chunk_size;
        let mut paginator =
            Paginator::new(source, self.config.api.per_page).with_max_pages(self.config.api.page_limit());
        let mut dedup = Deduplicator::new();
        let mut counters = Counters::default();

        let (written, path) = match mode {
            CrawlMode::Issues { keywords } => {
                let (mut writer, path) = StreamingArrayWriter::create(output, chunk_size, None)?;
                self.crawl_issues(keywords, &mut paginator, &mut dedup, &mut writer, &mut counters)
                    .await?;
                let (_, written) = writer.finish()?;
                (written, path)
            }
            CrawlMode::Conversation => {
                let (mut writer, path) =
                    StreamingArrayWriter::create(output, chunk_size, Some(CONVERSATION_ENVELOPE))?;
                self.crawl_conversation(&mut paginator, &mut dedup, &mut writer, &mut counters)
                    .await?;
                let (_, written) = writer.finish()?;
                (written, path)
            }
        };

        let termination = paginator
            .termination()
            .cloned()
            .unwrap_or(Termination::Stopped);
        if let Termination::TransportFailure(reason) = &termination {
            tracing::error!(
                reason = %reason,
                written,
                "Pagination aborted by a failed fetch; document holds a partial result"
            );
        }

        let mut report = CrawlReport {
            mode: mode.name(),
            source: reference.to_string(),
            output: path,
            pages_fetched: paginator.pages_fetched(),
            pages_skipped: counters.pages_skipped,
            items_fetched: counters.items_fetched,
            items_written: written,
            duplicates_skipped: dedup.discarded(),
            termination,
            metadata: None,
        };

        if self.config.crawl.write_metadata {
            let sidecar = metadata::write_sidecar(&report, &mode.keywords(), self.started_at)?;
            report.metadata = Some(sidecar);
        }

        self.progress.report(CrawlProgressEvent::Finished {
            pages: report.pages_fetched,
            written: report.items_written,
        });
        tracing::info!(
            mode = report.mode,
            written = report.items_written,
            pages = report.pages_fetched,
            duplicates = report.duplicates_skipped,
            output = %report.output.display(),
            "Finished crawl"
        );
        Ok(report)
    }

    async fn crawl_issues<W: std::io::Write>(
        &self,
        keywords: &KeywordSet,
        paginator: &mut Paginator<'_>,
        dedup: &mut Deduplicator,
        writer: &mut StreamingArrayWriter<IssueRecord, W>,
        counters: &mut Counters,
    ) -> Result<(), CrawlError> {
        if keywords.is_empty() {
            tracing::warn!("Keyword set is empty; no issue can match");
        }
        let include_prs = self.config.crawl.include_pull_requests;
        let window = RecencyWindow::new(self.started_at, self.config.crawl.recency_days);
        tracing::debug!(cutoff = %window.cutoff(), "Recency window");

        while let Some(page) = paginator.next_page().await {
            let issues: Vec<RawIssue> = decode_items(page.number, page.items);
            counters.items_fetched += issues.len() as u64;

            if window.page_entirely_older(&issues) {
                tracing::info!(page = page.number, "Page is older than the recency window; stopping");
                paginator.stop();
                self.progress.report(CrawlProgressEvent::OutOfWindow {
                    page: page.number,
                    fetched: counters.items_fetched,
                    kept: writer.accepted(),
                });
                break;
            }

            let text = aggregate_page_text(&issues, include_prs);
            if !page_may_contain_match(&text, keywords) {
                tracing::debug!(page = page.number, "No keyword on page; skipping");
                counters.pages_skipped += 1;
                self.report_page(page.number, counters, writer.accepted(), true);
                continue;
            }

            for raw in &issues {
                if raw.is_pull_request() && !include_prs {
                    continue;
                }
                if !item_matches(raw.title(), raw.body(), keywords) {
                    continue;
                }
                if !window.contains(raw.created_at()) {
                    continue;
                }
                let record = IssueRecord::from_raw(raw);
                if dedup.admit(&record) {
                    writer.push(record)?;
                }
            }
            self.report_page(page.number, counters, writer.accepted(), false);
        }
        Ok(())
    }

    async fn crawl_conversation<W: std::io::Write>(
        &self,
        paginator: &mut Paginator<'_>,
        dedup: &mut Deduplicator,
        writer: &mut StreamingArrayWriter<CommentRecord, W>,
        counters: &mut Counters,
    ) -> Result<(), CrawlError> {
        while let Some(page) = paginator.next_page().await {
            let comments: Vec<RawComment> = decode_items(page.number, page.items);
            counters.items_fetched += comments.len() as u64;

            for raw in &comments {
                let Some(record) = CommentRecord::from_raw(raw) else {
                    continue;
                };
                if dedup.admit(&record) {
                    writer.push(record)?;
                }
            }
            self.report_page(page.number, counters, writer.accepted(), false);
        }
        Ok(())
    }

    fn report_page(&self, page: u32, counters: &Counters, kept: u64, skipped: bool) {
        self.progress.report(CrawlProgressEvent::Page {
            page,
            fetched: counters.items_fetched,
            kept,
            skipped,
        });
    }
}

/// Decode each page entry into `T`, dropping (and logging) entries that do
/// not have the expected shape.
fn decode_items<T: DeserializeOwned>(page: u32, items: Vec<Value>) -> Vec<T> {
    let mut out = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<T>(item) {
            Ok(v) => out.push(v),
            Err(e) => tracing::warn!(page, index, error = %e, "Skipping malformed item"),
        }
    }
    out
}
