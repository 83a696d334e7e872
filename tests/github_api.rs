//! Crawls against a local mock of the GitHub REST API.
//!
//! Proves the real HTTP source sends the bearer token and paging parameters,
//! and that the crawler handles status codes the way the pipeline expects.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use thread_harvest::config::Config;
use thread_harvest::crawl::{CrawlMode, Crawler};
use thread_harvest::models::KeywordSet;
use thread_harvest::paginator::Termination;
use thread_harvest::progress::NoProgress;

const TOKEN: &str = "test-token-123";

#[derive(Default)]
struct MockGitHub {
    issues: Vec<Value>,
    comments: Vec<Value>,
    fail_from_page: Option<u32>,
    garbage_from_page: Option<u32>,
    requests: Mutex<Vec<String>>,
}

type Shared = Arc<MockGitHub>;

fn slice(items: &[Value], q: &HashMap<String, String>) -> Vec<Value> {
    let page: usize = q.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
    let per_page: usize = q.get("per_page").and_then(|p| p.parse().ok()).unwrap_or(30);
    items
        .iter()
        .skip((page - 1) * per_page)
        .take(per_page)
        .cloned()
        .collect()
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {}", TOKEN))
        .unwrap_or(false)
}

async fn list_issues(
    State(mock): State<Shared>,
    Path((owner, repo)): Path<(String, String)>,
    Query(q): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    mock.requests.lock().unwrap().push(format!(
        "issues {}/{} page={} state={}",
        owner,
        repo,
        q.get("page").cloned().unwrap_or_default(),
        q.get("state").cloned().unwrap_or_default()
    ));
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "message": "Bad credentials" })))
            .into_response();
    }
    let page: u32 = q.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
    if mock.fail_from_page.is_some_and(|f| page >= f) {
        return (StatusCode::BAD_GATEWAY, "upstream unavailable").into_response();
    }
    if mock.garbage_from_page.is_some_and(|g| page >= g) {
        return (StatusCode::OK, "<html>rate limited</html>").into_response();
    }
    Json(Value::Array(slice(&mock.issues, &q))).into_response()
}

async fn list_comments(
    State(mock): State<Shared>,
    Path((owner, repo, number)): Path<(String, String, u64)>,
    Query(q): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    mock.requests.lock().unwrap().push(format!(
        "comments {}/{}#{} page={}",
        owner,
        repo,
        number,
        q.get("page").cloned().unwrap_or_default()
    ));
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(Value::Array(slice(&mock.comments, &q))).into_response()
}

async fn start_mock(mock: MockGitHub) -> (String, Shared) {
    let shared = Arc::new(mock);
    let app = Router::new()
        .route("/repos/{owner}/{repo}/issues", get(list_issues))
        .route(
            "/repos/{owner}/{repo}/issues/{number}/comments",
            get(list_comments),
        )
        .with_state(shared.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), shared)
}

fn config_for(base_url: &str, token_env: &str, token: Option<&str>) -> Config {
    let mut cfg = Config::minimal();
    cfg.api.base_url = base_url.to_string();
    cfg.api.per_page = 10;
    cfg.api.timeout_secs = 5;
    cfg.api.token_env = token_env.to_string();
    match token {
        Some(t) => std::env::set_var(token_env, t),
        None => std::env::remove_var(token_env),
    }
    cfg
}

fn issue(number: u64, title: &str) -> Value {
    json!({
        "number": number,
        "title": title,
        "body": "",
        "html_url": format!("https://github.com/acme/widgets/issues/{}", number),
        "created_at": (Utc::now() - Duration::days(2)).to_rfc3339(),
    })
}

#[tokio::test]
async fn issues_are_paged_with_bearer_token() {
    let issues: Vec<Value> = (1..=25)
        .rev()
        .map(|n| {
            let title = if n % 5 == 0 { "Crash on save" } else { "Polish" };
            issue(n, title)
        })
        .collect();
    let (base, mock) = start_mock(MockGitHub {
        issues,
        ..Default::default()
    })
    .await;
    let cfg = config_for(&base, "THREAD_HARVEST_IT_TOKEN_ISSUES", Some(TOKEN));
    let tmp = TempDir::new().unwrap();
    let progress = NoProgress;

    let report = Crawler::new(&cfg, &progress)
        .run(
            "https://github.com/acme/widgets/issues",
            &CrawlMode::Issues {
                keywords: KeywordSet::new(["crash"]),
            },
            &tmp.path().join("issues"),
        )
        .await
        .unwrap();

    let doc: Vec<Value> =
        serde_json::from_str(&std::fs::read_to_string(&report.output).unwrap()).unwrap();
    let numbers: Vec<u64> = doc.iter().map(|v| v["number"].as_u64().unwrap()).collect();
    assert_eq!(numbers, vec![25, 20, 15, 10, 5]);
    assert_eq!(report.termination, Termination::ShortPage);

    let requests = mock.requests.lock().unwrap().clone();
    assert_eq!(
        requests,
        vec![
            "issues acme/widgets page=1 state=all",
            "issues acme/widgets page=2 state=all",
            "issues acme/widgets page=3 state=all",
        ]
    );
}

#[tokio::test]
async fn rejected_credential_yields_empty_but_valid_document() {
    let (base, _mock) = start_mock(MockGitHub {
        issues: vec![issue(1, "Crash")],
        ..Default::default()
    })
    .await;
    let cfg = config_for(&base, "THREAD_HARVEST_IT_TOKEN_WRONG", Some("wrong-token"));
    let tmp = TempDir::new().unwrap();
    let progress = NoProgress;

    let report = Crawler::new(&cfg, &progress)
        .run(
            "https://github.com/acme/widgets/issues",
            &CrawlMode::Issues {
                keywords: KeywordSet::new(["crash"]),
            },
            &tmp.path().join("denied"),
        )
        .await
        .unwrap();

    assert!(report.is_partial());
    match &report.termination {
        Termination::TransportFailure(reason) => assert!(reason.contains("401"), "{}", reason),
        other => panic!("unexpected termination {:?}", other),
    }
    assert_eq!(std::fs::read_to_string(&report.output).unwrap(), "[]\n");
}

#[tokio::test]
async fn server_error_mid_crawl_keeps_earlier_pages() {
    let issues: Vec<Value> = (1..=30).rev().map(|n| issue(n, "Crash")).collect();
    let (base, _mock) = start_mock(MockGitHub {
        issues,
        fail_from_page: Some(2),
        ..Default::default()
    })
    .await;
    let cfg = config_for(&base, "THREAD_HARVEST_IT_TOKEN_502", Some(TOKEN));
    let tmp = TempDir::new().unwrap();
    let progress = NoProgress;

    let report = Crawler::new(&cfg, &progress)
        .run(
            "https://github.com/acme/widgets/issues/",
            &CrawlMode::Issues {
                keywords: KeywordSet::new(["crash"]),
            },
            &tmp.path().join("partial"),
        )
        .await
        .unwrap();

    let doc: Vec<Value> =
        serde_json::from_str(&std::fs::read_to_string(&report.output).unwrap()).unwrap();
    assert_eq!(doc.len(), 10);
    assert!(report.is_partial());
}

#[tokio::test]
async fn non_json_body_ends_crawl_as_malformed_page() {
    let issues: Vec<Value> = (1..=30).rev().map(|n| issue(n, "Crash")).collect();
    let (base, _mock) = start_mock(MockGitHub {
        issues,
        garbage_from_page: Some(2),
        ..Default::default()
    })
    .await;
    let cfg = config_for(&base, "THREAD_HARVEST_IT_TOKEN_HTML", Some(TOKEN));
    let tmp = TempDir::new().unwrap();
    let progress = NoProgress;

    let report = Crawler::new(&cfg, &progress)
        .run(
            "https://github.com/acme/widgets/issues",
            &CrawlMode::Issues {
                keywords: KeywordSet::new(["crash"]),
            },
            &tmp.path().join("html"),
        )
        .await
        .unwrap();

    assert_eq!(report.termination, Termination::MalformedPage);
    assert!(!report.is_partial());
    let doc: Vec<Value> =
        serde_json::from_str(&std::fs::read_to_string(&report.output).unwrap()).unwrap();
    assert_eq!(doc.len(), 10);
}

#[tokio::test]
async fn conversation_reads_pull_request_comments() {
    let comments: Vec<Value> = (0..12)
        .map(|i| {
            json!({
                "user": { "login": format!("user{}", i % 3) },
                "body": format!("comment {}", i),
                "created_at": format!("2026-10-01T10:{:02}:00Z", i),
            })
        })
        .collect();
    let (base, mock) = start_mock(MockGitHub {
        comments,
        ..Default::default()
    })
    .await;
    let cfg = config_for(&base, "THREAD_HARVEST_IT_TOKEN_CONV", Some(TOKEN));
    let tmp = TempDir::new().unwrap();
    let progress = NoProgress;

    let report = Crawler::new(&cfg, &progress)
        .run(
            "https://github.com/acme/widgets/pull/77",
            &CrawlMode::Conversation,
            &tmp.path().join("fixes"),
        )
        .await
        .unwrap();

    let doc: Value = serde_json::from_str(&std::fs::read_to_string(&report.output).unwrap()).unwrap();
    let responses = doc["responses"].as_array().unwrap();
    assert_eq!(responses.len(), 12);
    assert_eq!(responses[11]["content"], "comment 11");
    assert_eq!(report.source, "acme/widgets#77");

    let requests = mock.requests.lock().unwrap().clone();
    assert_eq!(
        requests,
        vec!["comments acme/widgets#77 page=1", "comments acme/widgets#77 page=2"]
    );
}
