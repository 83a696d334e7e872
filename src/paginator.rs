//! Page-by-page traversal of a remote listing.
//!
//! The [`Paginator`] is a two-state machine (`Fetching` → `Done`). Each call
//! to [`Paginator::next_page`] requests one page from a [`PageSource`] and
//! either yields it or moves to `Done`, recording why in [`Termination`].
//!
//! # Termination rules
//!
//! | Response | Yielded? | Next state | Termination |
//! |----------|----------|------------|-------------|
//! | transport error / non-200 | no | `Done` | [`Termination::TransportFailure`] |
//! | body is not an array | no | `Done` | [`Termination::MalformedPage`] |
//! | empty array | no | `Done` | [`Termination::EndOfData`] |
//! | fewer than `per_page` items | yes | `Done` | [`Termination::ShortPage`] |
//! | exactly `per_page` items | yes | `Fetching` | - |
//!
//! Pages are fetched strictly one after another; the caller finishes with
//! page N before asking for page N+1.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Failure to fetch one page.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("unexpected status {status}: {message}")]
    Status { status: u16, message: String },
}

/// A remote paginated listing.
///
/// Implemented by [`GitHubSource`](crate::github::GitHubSource) for the real
/// API; tests provide in-memory implementations.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch page `page` (1-based) with `per_page` entries and return the
    /// decoded JSON body.
    async fn fetch_page(&self, page: u32, per_page: u32) -> Result<Value, FetchError>;

    /// Short label used in log lines.
    fn describe(&self) -> String;
}

/// One fetched page.
#[derive(Debug)]
pub struct Page {
    pub number: u32,
    pub items: Vec<Value>,
    /// `true` when this page was shorter than requested and nothing follows.
    pub is_last: bool,
}

/// Why pagination ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "reason", content = "detail")]
pub enum Termination {
    EndOfData,
    ShortPage,
    MalformedPage,
    TransportFailure(String),
    Stopped,
    PageLimit,
}

impl Termination {
    /// `true` when the crawl lost data because a fetch failed.
    pub fn is_failure(&self) -> bool {
        matches!(self, Termination::TransportFailure(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum State {
    Fetching,
    Done(Termination),
}

pub struct Paginator<'a> {
    source: &'a dyn PageSource,
    per_page: u32,
    max_pages: Option<u32>,
    page: u32,
    fetched: u32,
    state: State,
}

impl<'a> Paginator<'a> {
    pub fn new(source: &'a dyn PageSource, per_page: u32) -> Self {
        Self {
            source,
            per_page,
            max_pages: None,
            page: 1,
            fetched: 0,
            state: State::Fetching,
        }
    }

    /// Stop after `max_pages` pages have been yielded.
    pub fn with_max_pages(mut self, max_pages: Option<u32>) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Fetch and return the next page, or `None` once done.
    pub async fn next_page(&mut self) -> Option<Page> {
        if self.state != State::Fetching {
            return None;
        }
        if let Some(max) = self.max_pages {
            if self.fetched >= max {
                tracing::info!(max_pages = max, "Page limit reached");
                self.state = State::Done(Termination::PageLimit);
                return None;
            }
        }

        let number = self.page;
        tracing::info!(page = number, source = %self.source.describe(), "Requesting page");

        let body = match self.source.fetch_page(number, self.per_page).await {
            Ok(body) => body,
            Err(e) => {
                tracing::error!(page = number, error = %e, "Failed to fetch page");
                self.state = State::Done(Termination::TransportFailure(e.to_string()));
                return None;
            }
        };

        let items = match body {
            Value::Array(items) => items,
            other => {
                tracing::warn!(page = number, kind = json_kind(&other), "Page body is not a list");
                self.state = State::Done(Termination::MalformedPage);
                return None;
            }
        };

        if items.is_empty() {
            tracing::info!(page = number, "No more items found");
            self.state = State::Done(Termination::EndOfData);
            return None;
        }

        self.fetched += 1;
        let is_last = items.len() < self.per_page as usize;
        if is_last {
            tracing::info!(page = number, count = items.len(), "Last page reached");
            self.state = State::Done(Termination::ShortPage);
        } else {
            self.page += 1;
        }

        Some(Page {
            number,
            items,
            is_last,
        })
    }

    /// Stop paginating; subsequent calls to [`next_page`](Self::next_page)
    /// return `None`. Has no effect once already done.
    pub fn stop(&mut self) {
        if self.state == State::Fetching {
            self.state = State::Done(Termination::Stopped);
        }
    }

    pub fn is_done(&self) -> bool {
        self.state != State::Fetching
    }

    pub fn termination(&self) -> Option<&Termination> {
        match &self.state {
            State::Done(t) => Some(t),
            State::Fetching => None,
        }
    }

    /// Number of non-empty pages yielded so far.
    pub fn pages_fetched(&self) -> u32 {
        self.fetched
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    /// Replays a fixed list of responses and records requested page numbers.
    struct Scripted {
        responses: Mutex<Vec<Result<Value, FetchError>>>,
        requested: Mutex<Vec<u32>>,
    }

    impl Scripted {
        fn new(mut responses: Vec<Result<Value, FetchError>>) -> Self {
            responses.reverse();
            Self {
                responses: Mutex::new(responses),
                requested: Mutex::new(Vec::new()),
            }
        }

        fn requested(&self) -> Vec<u32> {
            self.requested.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PageSource for Scripted {
        async fn fetch_page(&self, page: u32, _per_page: u32) -> Result<Value, FetchError> {
            self.requested.lock().unwrap().push(page);
            self.responses
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Ok(json!([])))
        }

        fn describe(&self) -> String {
            "scripted".to_string()
        }
    }

    fn page_of(n: usize) -> Value {
        Value::Array((0..n).map(|i| json!({ "i": i })).collect())
    }

    #[tokio::test]
    async fn full_pages_continue_until_empty() {
        let src = Scripted::new(vec![Ok(page_of(3)), Ok(page_of(3)), Ok(json!([]))]);
        let mut p = Paginator::new(&src, 3);
        assert_eq!(p.next_page().await.unwrap().number, 1);
        assert_eq!(p.next_page().await.unwrap().number, 2);
        assert!(p.next_page().await.is_none());
        assert_eq!(p.termination(), Some(&Termination::EndOfData));
        assert_eq!(src.requested(), vec![1, 2, 3]);
        assert_eq!(p.pages_fetched(), 2);
    }

    #[tokio::test]
    async fn short_page_is_yielded_and_ends_without_extra_request() {
        let src = Scripted::new(vec![Ok(page_of(3)), Ok(page_of(1))]);
        let mut p = Paginator::new(&src, 3);
        assert!(!p.next_page().await.unwrap().is_last);
        let last = p.next_page().await.unwrap();
        assert!(last.is_last);
        assert_eq!(last.items.len(), 1);
        assert!(p.next_page().await.is_none());
        assert_eq!(p.termination(), Some(&Termination::ShortPage));
        assert_eq!(src.requested(), vec![1, 2]);
    }

    #[tokio::test]
    async fn non_array_body_is_end_of_data() {
        let src = Scripted::new(vec![Ok(json!({ "message": "Not Found" }))]);
        let mut p = Paginator::new(&src, 100);
        assert!(p.next_page().await.is_none());
        assert_eq!(p.termination(), Some(&Termination::MalformedPage));
        assert!(!p.termination().unwrap().is_failure());
    }

    #[tokio::test]
    async fn transport_failure_ends_pagination() {
        let src = Scripted::new(vec![
            Ok(page_of(2)),
            Err(FetchError::Status {
                status: 502,
                message: "bad gateway".to_string(),
            }),
        ]);
        let mut p = Paginator::new(&src, 2);
        assert!(p.next_page().await.is_some());
        assert!(p.next_page().await.is_none());
        assert!(p.termination().unwrap().is_failure());
        assert!(p.next_page().await.is_none());
        assert_eq!(src.requested(), vec![1, 2]);
    }

    #[tokio::test]
    async fn stop_prevents_further_requests() {
        let src = Scripted::new(vec![Ok(page_of(2)), Ok(page_of(2))]);
        let mut p = Paginator::new(&src, 2);
        assert!(p.next_page().await.is_some());
        p.stop();
        assert!(p.next_page().await.is_none());
        assert_eq!(p.termination(), Some(&Termination::Stopped));
        assert_eq!(src.requested(), vec![1]);
    }

    #[tokio::test]
    async fn page_limit_caps_crawl() {
        let src = Scripted::new(vec![Ok(page_of(2)), Ok(page_of(2)), Ok(page_of(2))]);
        let mut p = Paginator::new(&src, 2).with_max_pages(Some(2));
        assert!(p.next_page().await.is_some());
        assert!(p.next_page().await.is_some());
        assert!(p.next_page().await.is_none());
        assert_eq!(p.termination(), Some(&Termination::PageLimit));
        assert_eq!(src.requested(), vec![1, 2]);
    }
}
