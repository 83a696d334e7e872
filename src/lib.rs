//! # Thread Harvest
//!
//! Keyword- and recency-filtered harvesting of GitHub issues and
//! pull-request conversations into streamed JSON documents.
//!
//! Thread Harvest pages through the GitHub REST API one page at a time,
//! skips whole pages that cannot contain a keyword, filters the rest item by
//! item, drops duplicates across the entire crawl, and writes survivors to a
//! JSON array in fixed-size chunks so the result set is never held in memory.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────┐   ┌──────────┐   ┌─────────┐   ┌──────────┐
//! │ Locator  │──▶│ Paginator │──▶│  Filter  │──▶│ Dedup   │──▶│  Writer  │
//! │ URL→ref  │   │ GitHub API│   │page/item │   │ seen set│   │ [ ... ]  │
//! └──────────┘   └───────────┘   └──────────┘   └─────────┘   └──────────┘
//!                        ▲                                          │
//!                        └──────────── Crawler (crawl) ─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! export GITHUB_TOKEN=ghp_...
//! harvest issues https://github.com/neovim/neovim/issues -k crash -k segfault -o ~/Desktop/issues
//! harvest conversation https://github.com/neovim/neovim/pull/12345 -o ~/Desktop/fixes
//! harvest check https://github.com/neovim/neovim/issues
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`locator`] | URL → repository/thread reference |
//! | [`filter`] | Page-level and item-level relevance gates, recency window |
//! | [`dedup`] | Crawl-wide deduplication |
//! | [`paginator`] | Page-by-page traversal and termination rules |
//! | [`github`] | GitHub REST API page source |
//! | [`writer`] | Streaming JSON array writer |
//! | [`crawl`] | Crawl orchestration for both modes |
//! | [`metadata`] | Metadata sidecar file |
//! | [`progress`] | Progress reporting on stderr |
//! | [`telemetry`] | Tracing subscriber setup |
//! | [`check`] | Offline URL/credential/config check |

pub mod check;
pub mod config;
pub mod crawl;
pub mod dedup;
pub mod filter;
pub mod github;
pub mod locator;
pub mod metadata;
pub mod models;
pub mod paginator;
pub mod progress;
pub mod telemetry;
pub mod writer;
