//! Relevance filtering.
//!
//! Two keyword gates and a recency window, all pure:
//!
//! - [`page_may_contain_match`] looks at the concatenated, lowercased text of
//!   a whole page. If it returns `false` no item on that page can pass
//!   [`item_matches`], so the page is skipped without per-item work.
//! - [`item_matches`] checks a single item's title and body.
//! - [`RecencyWindow`] keeps items created within a trailing window of the
//!   crawl start.

use chrono::{DateTime, Duration, Utc};

use crate::models::{KeywordSet, RawIssue};

/// `true` iff any keyword is a substring of `aggregated_lowercase`.
///
/// The text must already be lowercased (see [`aggregate_page_text`]).
pub fn page_may_contain_match(aggregated_lowercase: &str, keywords: &KeywordSet) -> bool {
    keywords
        .terms()
        .iter()
        .any(|k| aggregated_lowercase.contains(k.as_str()))
}

/// `true` iff any keyword is a case-insensitive substring of `title` or `body`.
pub fn item_matches(title: &str, body: &str, keywords: &KeywordSet) -> bool {
    let title = title.to_lowercase();
    let body = body.to_lowercase();
    keywords
        .terms()
        .iter()
        .any(|k| title.contains(k.as_str()) || body.contains(k.as_str()))
}

/// Concatenate the title and body of every candidate item on a page,
/// lowercased. Pull requests are left out unless `include_pull_requests`.
///
/// Items are separated by a newline so a keyword cannot match across the
/// boundary between two items.
pub fn aggregate_page_text(items: &[RawIssue], include_pull_requests: bool) -> String {
    let mut text = String::new();
    for item in items {
        if item.is_pull_request() && !include_pull_requests {
            continue;
        }
        text.push_str(item.title());
        text.push('\n');
        text.push_str(item.body());
        text.push('\n');
    }
    text.to_lowercase()
}

/// Trailing time window anchored at the crawl start.
#[derive(Debug, Clone, Copy)]
pub struct RecencyWindow {
    cutoff: DateTime<Utc>,
}

impl RecencyWindow {
    pub fn new(started_at: DateTime<Utc>, days: u32) -> Self {
        Self {
            cutoff: started_at - Duration::days(i64::from(days)),
        }
    }

    pub fn cutoff(&self) -> DateTime<Utc> {
        self.cutoff
    }

    /// Undated items are never inside the window.
    pub fn contains(&self, created_at: Option<DateTime<Utc>>) -> bool {
        matches!(created_at, Some(ts) if ts >= self.cutoff)
    }

    /// `true` when no item on the page falls inside the window.
    ///
    /// An empty page is not "entirely old"; end of data is handled by the
    /// paginator.
    pub fn page_entirely_older(&self, items: &[RawIssue]) -> bool {
        !items.is_empty() && items.iter().all(|i| !self.contains(i.created_at()))
    }
}
