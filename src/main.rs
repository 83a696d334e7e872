//! # Thread Harvest CLI (`harvest`)
//!
//! The `harvest` binary collects a source URL, keywords and an output
//! location, runs one crawl, and reports the outcome.
//!
//! ## Usage
//!
//! ```bash
//! harvest --config ./config/harvest.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `harvest issues <url>` | Keep recent issues mentioning any keyword |
//! | `harvest conversation <url>` | Collect every comment of one pull request |
//! | `harvest check <url>` | Show how a URL resolves and whether a token is set |
//!
//! ## Exit status
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0 | Document written (possibly partial, see stderr) |
//! | 1 | Unexpected failure (config, I/O, serialization) |
//! | 2 | Invalid URL or missing credential; error payload on stdout, no file written |

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use thread_harvest::check;
use thread_harvest::config::{self, Config};
use thread_harvest::crawl::{CrawlError, CrawlMode, CrawlReport, Crawler};
use thread_harvest::models::KeywordSet;
use thread_harvest::progress::ProgressMode;
use thread_harvest::telemetry;

/// Thread Harvest: keyword- and recency-filtered GitHub issue and
/// pull-request conversation harvesting.
#[derive(Parser)]
#[command(
    name = "harvest",
    about = "Thread Harvest: stream filtered GitHub issues and PR conversations to JSON",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). Built-in defaults apply when the
    /// file does not exist.
    #[arg(long, global = true, default_value = "./config/harvest.toml")]
    config: PathBuf,

    /// Progress output on stderr. Defaults to `human` on a TTY, else `off`.
    #[arg(long, global = true, value_enum)]
    progress: Option<ProgressMode>,

    /// Emit log lines as JSON.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Harvest recent issues that mention any keyword.
    ///
    /// The URL must point at a listing page, e.g.
    /// `https://github.com/OWNER/REPO/issues`.
    Issues {
        /// Repository issues URL.
        url: String,

        /// A keyword to match (case-insensitive). Repeatable.
        #[arg(short = 'k', long = "keyword")]
        keywords: Vec<String>,

        /// File with keywords, comma- or newline-separated; `#` comments.
        #[arg(long)]
        keywords_file: Option<PathBuf>,

        /// Output document path; `.json` is appended if missing.
        #[arg(short, long, default_value = "issues")]
        output: PathBuf,
    },

    /// Harvest every comment of one pull request.
    Conversation {
        /// Pull request URL, e.g. `https://github.com/OWNER/REPO/pull/123`.
        url: String,

        /// Output document path; `.json` is appended if missing.
        #[arg(short, long, default_value = "fixes")]
        output: PathBuf,
    },

    /// Show how a URL resolves and whether a credential is available.
    Check {
        url: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let cfg = config::load_or_default(&cli.config)?;
    telemetry::init_tracing(
        &cfg.log.level,
        cli.log_json || cfg.log.json,
        cfg.log.file.as_deref(),
    )?;

    let progress = cli.progress.unwrap_or_else(ProgressMode::default_for_tty);

    let (url, mode, output) = match cli.command {
        Commands::Check { url } => {
            check::run_check(&cfg, &url)?;
            return Ok(ExitCode::SUCCESS);
        }
        Commands::Issues {
            url,
            keywords,
            keywords_file,
            output,
        } => {
            let keywords = collect_keywords(keywords, keywords_file.as_deref())?;
            (url, CrawlMode::Issues { keywords }, output)
        }
        Commands::Conversation { url, output } => (url, CrawlMode::Conversation, output),
    };

    crawl(&cfg, progress, &url, &mode, &output).await
}

async fn crawl(
    cfg: &Config,
    progress: ProgressMode,
    url: &str,
    mode: &CrawlMode,
    output: &Path,
) -> anyhow::Result<ExitCode> {
    let reporter = progress.reporter();
    let crawler = Crawler::new(cfg, reporter.as_ref());

    match crawler.run(url, mode, output).await {
        Ok(report) => {
            print_summary(&report);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) if e.is_input_error() => {
            println!("{}", serde_json::to_string_pretty(&e.payload())?);
            Ok(ExitCode::from(2))
        }
        Err(e @ CrawlError::Io(_)) => {
            Err(e).with_context(|| format!("Failed writing {}", output.display()))
        }
        Err(e) => Err(e.into()),
    }
}

fn collect_keywords(flags: Vec<String>, file: Option<&Path>) -> anyhow::Result<KeywordSet> {
    let mut keywords = KeywordSet::new(flags);
    if let Some(path) = file {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read keywords file: {}", path.display()))?;
        keywords.extend(KeywordSet::parse_list(&text));
    }
    Ok(keywords)
}

fn print_summary(report: &CrawlReport) {
    println!("harvest {} {}", report.mode, report.source);
    println!("  pages fetched: {}", report.pages_fetched);
    if report.mode == "issues" {
        println!("  pages skipped: {}", report.pages_skipped);
    }
    println!("  items fetched: {}", report.items_fetched);
    println!("  items written: {}", report.items_written);
    println!("  duplicates skipped: {}", report.duplicates_skipped);
    println!("  output: {}", report.output.display());
    if let Some(meta) = &report.metadata {
        println!("  metadata: {}", meta.display());
    }
    if report.is_partial() {
        println!("partial (a page fetch failed, see log)");
    } else {
        println!("ok");
    }
}
