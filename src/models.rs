//! Core data models used throughout the harvester.
//!
//! Raw API items are deserialized into narrow projections ([`RawIssue`],
//! [`RawComment`]) that carry only the fields the pipeline reads. Items that
//! survive filtering are projected once more into the records that are
//! actually persisted ([`IssueRecord`], [`CommentRecord`]).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A repository (and optionally a pull-request thread) parsed from a URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceReference {
    pub owner: String,
    pub repo: String,
    pub thread_number: Option<u64>,
}

impl fmt::Display for SourceReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.thread_number {
            Some(n) => write!(f, "{}/{}#{}", self.owner, self.repo, n),
            None => write!(f, "{}/{}", self.owner, self.repo),
        }
    }
}

/// The fields of a GitHub issue listing entry the pipeline needs.
///
/// Pull requests appear in the issue listing too; they are recognised by
/// the presence of a `pull_request` object.
#[derive(Debug, Clone, Deserialize)]
pub struct RawIssue {
    pub number: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub pull_request: Option<serde_json::Value>,
}

impl RawIssue {
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }

    /// Creation instant, or `None` when absent or not RFC 3339.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.created_at.as_deref()?;
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or("")
    }

    pub fn body(&self) -> &str {
        self.body.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawUser {
    #[serde(default)]
    pub login: Option<String>,
}

/// The fields of an issue/pull-request comment the pipeline needs.
#[derive(Debug, Clone, Deserialize)]
pub struct RawComment {
    #[serde(default)]
    pub user: Option<RawUser>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Persisted projection of an issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRecord {
    pub number: u64,
    pub title: String,
    pub body: String,
    pub url: String,
}

impl IssueRecord {
    pub fn from_raw(raw: &RawIssue) -> Self {
        Self {
            number: raw.number,
            title: raw.title().to_string(),
            body: raw.body().to_string(),
            url: raw.html_url.clone().unwrap_or_default(),
        }
    }
}

/// Persisted projection of a conversation comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentRecord {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: String,
    pub author: String,
    pub timestamp: String,
    pub content: String,
}

impl CommentRecord {
    pub const KIND: &'static str = "comment";

    /// Project a raw comment. Returns `None` for comments without content.
    pub fn from_raw(raw: &RawComment) -> Option<Self> {
        let content = raw.body.as_deref().unwrap_or("");
        if content.is_empty() {
            return None;
        }
        let author = raw
            .user
            .as_ref()
            .and_then(|u| u.login.clone())
            .unwrap_or_else(|| "Unknown".to_string());
        Some(Self {
            id: Uuid::new_v4(),
            kind: Self::KIND.to_string(),
            author,
            timestamp: raw.created_at.clone().unwrap_or_default(),
            content: content.to_string(),
        })
    }
}

/// Ordered, deduplicated, lowercased search terms.
///
/// Built once per crawl and only read afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordSet {
    terms: Vec<String>,
}

impl KeywordSet {
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out: Vec<String> = Vec::new();
        for term in terms {
            let t = term.as_ref().trim().to_lowercase();
            if t.is_empty() || out.contains(&t) {
                continue;
            }
            out.push(t);
        }
        Self { terms: out }
    }

    /// Parse a keyword list: one or more comma-separated terms per line,
    /// `#` starts a comment line.
    pub fn parse_list(text: &str) -> Self {
        Self::new(
            text.lines()
                .map(str::trim)
                .filter(|l| !l.starts_with('#'))
                .flat_map(|l| l.split(',')),
        )
    }

    /// Append terms from `other` that are not present yet.
    pub fn extend(&mut self, other: KeywordSet) {
        for t in other.terms {
            if !self.terms.contains(&t) {
                self.terms.push(t);
            }
        }
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }
}
