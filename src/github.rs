//! GitHub REST API page source.
//!
//! Two listings are supported:
//!
//! | Listing | Endpoint | Extra query |
//! |---------|----------|-------------|
//! | [`Listing::Issues`] | `GET /repos/{owner}/{repo}/issues` | `state=all&sort=created&direction=desc` |
//! | [`Listing::Comments`] | `GET /repos/{owner}/{repo}/issues/{n}/comments` | - |
//!
//! Pull-request conversation comments live under the issues endpoint on
//! GitHub; review comments on the diff are not fetched.
//!
//! Every request carries `Authorization: Bearer <token>`, the GitHub JSON
//! media type and a `User-Agent`, and is bounded by the configured timeout.
//! Anything other than `200 OK` is reported as [`FetchError::Status`]. A
//! `200 OK` whose body is not JSON comes back as `Value::Null`, which the
//! paginator treats as a malformed page.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;

use crate::config::ApiConfig;
use crate::paginator::{FetchError, PageSource};

const ACCEPT: &str = "application/vnd.github+json";
const USER_AGENT: &str = concat!("thread-harvest/", env!("CARGO_PKG_VERSION"));

/// Which paginated listing to read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Listing {
    Issues { owner: String, repo: String },
    Comments { owner: String, repo: String, number: u64 },
}

pub struct GitHubSource {
    client: reqwest::Client,
    base_url: String,
    token: String,
    listing: Listing,
}

impl GitHubSource {
    pub fn new(api: &ApiConfig, token: String, listing: Listing) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(api.timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: api.base_url.trim_end_matches('/').to_string(),
            token,
            listing,
        })
    }

    fn endpoint(&self) -> String {
        match &self.listing {
            Listing::Issues { owner, repo } => {
                format!("{}/repos/{}/{}/issues", self.base_url, owner, repo)
            }
            Listing::Comments {
                owner,
                repo,
                number,
            } => format!(
                "{}/repos/{}/{}/issues/{}/comments",
                self.base_url, owner, repo, number
            ),
        }
    }

    fn query(&self, page: u32, per_page: u32) -> Vec<(&'static str, String)> {
        let mut params = vec![("page", page.to_string()), ("per_page", per_page.to_string())];
        if let Listing::Issues { .. } = self.listing {
            params.push(("state", "all".to_string()));
            params.push(("sort", "created".to_string()));
            params.push(("direction", "desc".to_string()));
        }
        params
    }
}

#[async_trait]
impl PageSource for GitHubSource {
    async fn fetch_page(&self, page: u32, per_page: u32) -> Result<Value, FetchError> {
        let resp = self
            .client
            .get(self.endpoint())
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, ACCEPT)
            .query(&self.query(page, per_page))
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = resp.status();
        if status != StatusCode::OK {
            let message = resp.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let text = resp
            .text()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        // An unparseable 200 body is a malformed page, not a transport failure.
        Ok(serde_json::from_str(&text).unwrap_or_else(|e| {
            tracing::warn!(page, error = %e, "Response body is not JSON");
            Value::Null
        }))
    }

    fn describe(&self) -> String {
        match &self.listing {
            Listing::Issues { owner, repo } => format!("issues of {}/{}", owner, repo),
            Listing::Comments {
                owner,
                repo,
                number,
            } => format!("comments of {}/{}#{}", owner, repo, number),
        }
    }
}
