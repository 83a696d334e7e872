//! Source locator: turns a user-supplied GitHub URL into a [`SourceReference`].
//!
//! Accepted shapes:
//!
//! | URL | Mode | Result |
//! |-----|------|--------|
//! | `https://github.com/OWNER/REPO/issues` | issues | `OWNER/REPO` |
//! | `https://github.com/OWNER/REPO/pulls` | issues | `OWNER/REPO` |
//! | `https://github.com/OWNER/REPO/pull/42` | conversation | `OWNER/REPO#42` |
//! | `https://github.com/OWNER/REPO/pull/42/files` | conversation | `OWNER/REPO#42` |
//!
//! Parsing is purely syntactic; no network call is made.

use regex::Regex;
use std::sync::LazyLock;

use crate::crawl::CrawlError;
use crate::models::SourceReference;

/// Final path segments that identify a listing page.
pub const PAGE_KINDS: [&str; 3] = ["issues", "pulls", "pull"];

/// Minimum number of `/`-separated segments, counting the scheme and the
/// empty segment after `//`.
const MIN_SEGMENTS: usize = 5;

fn segments(url: &str) -> Vec<&str> {
    url.trim().trim_matches('/').split('/').collect()
}

/// Parse an issue/pull listing URL into `(owner, repo)`.
///
/// The URL must have at least five segments and end in one of
/// [`PAGE_KINDS`].
pub fn parse_repo_url(url: &str) -> Result<SourceReference, CrawlError> {
    let parts = segments(url);
    let n = parts.len();
    if n < MIN_SEGMENTS || !PAGE_KINDS.contains(&parts[n - 1]) {
        return Err(CrawlError::InvalidReference(format!(
            "Not a valid GitHub issues/pulls URL: {}",
            url.trim()
        )));
    }
    reference_from(parts[n - 3], parts[n - 2], url)
}

static PULL_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/pull/(\d+)").unwrap());

/// Extract the pull-request number from the first `/pull/<digits>` match.
///
/// Returns `Ok(None)` when the URL carries no number; a digit run that does
/// not fit in a `u64` is an invalid reference.
pub fn parse_pull_number(url: &str) -> Result<Option<u64>, CrawlError> {
    let Some(caps) = PULL_NUMBER.captures(url) else {
        return Ok(None);
    };
    caps[1].parse::<u64>().map(Some).map_err(|_| {
        CrawlError::InvalidReference(format!("PR number out of range in URL: {}", url.trim()))
    })
}

/// Parse a pull-request conversation URL into `(owner, repo, number)`.
///
/// Accepts anything [`parse_repo_url`] accepts, and additionally canonical
/// pull-request URLs where `pull/<n>` is followed by a number and an
/// optional tab name. A missing thread number is an error.
pub fn parse_thread_url(url: &str) -> Result<SourceReference, CrawlError> {
    let number = parse_pull_number(url)?.ok_or_else(|| {
        CrawlError::InvalidReference(format!(
            "Could not extract PR number from URL: {}",
            url.trim()
        ))
    })?;

    let mut reference = match parse_repo_url(url) {
        Ok(r) => r,
        Err(_) => {
            let parts = segments(url);
            let pull_at = parts
                .iter()
                .rposition(|s| *s == "pull")
                .filter(|&i| i >= 2 && parts.len() >= MIN_SEGMENTS)
                .ok_or_else(|| {
                    CrawlError::InvalidReference(format!(
                        "Not a valid GitHub pull request URL: {}",
                        url.trim()
                    ))
                })?;
            reference_from(parts[pull_at - 2], parts[pull_at - 1], url)?
        }
    };
    reference.thread_number = Some(number);
    Ok(reference)
}

fn reference_from(owner: &str, repo: &str, url: &str) -> Result<SourceReference, CrawlError> {
    if owner.is_empty() || repo.is_empty() {
        return Err(CrawlError::InvalidReference(format!(
            "Empty owner or repository in URL: {}",
            url.trim()
        )));
    }
    Ok(SourceReference {
        owner: owner.to_string(),
        repo: repo.to_string(),
        thread_number: None,
    })
}
