use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub crawl: CrawlConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_token_env")]
    pub token_env: String,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// 0 means no limit.
    #[serde(default)]
    pub max_pages: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token_env: default_token_env(),
            per_page: default_per_page(),
            timeout_secs: default_timeout_secs(),
            max_pages: 0,
        }
    }
}

impl ApiConfig {
    pub fn page_limit(&self) -> Option<u32> {
        (self.max_pages > 0).then_some(self.max_pages)
    }
}

fn default_base_url() -> String {
    "https://api.github.com".to_string()
}
fn default_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}
fn default_per_page() -> u32 {
    100
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct CrawlConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_recency_days")]
    pub recency_days: u32,
    #[serde(default)]
    pub include_pull_requests: bool,
    #[serde(default = "default_true")]
    pub write_metadata: bool,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            recency_days: default_recency_days(),
            include_pull_requests: false,
            write_metadata: true,
        }
    }
}

fn default_chunk_size() -> usize {
    50
}
fn default_recency_days() -> u32 {
    90
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogConfig {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub file: Option<PathBuf>,
    #[serde(default)]
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            file: None,
            json: false,
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

impl Config {
    /// Built-in defaults, used when no config file exists.
    pub fn minimal() -> Self {
        Self::default()
    }

    /// Read the bearer token from the configured environment variable.
    /// Empty values count as missing.
    pub fn token(&self) -> Option<String> {
        std::env::var(&self.api.token_env)
            .ok()
            .filter(|t| !t.trim().is_empty())
    }
}

/// Load `path`, falling back to [`Config::minimal`] when the file does not
/// exist. A file that exists but fails to parse or validate is an error.
pub fn load_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        tracing::debug!(path = %path.display(), "Config file not found, using defaults");
        Ok(Config::minimal())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

/// Upper bound on items buffered before a flush.
pub const MAX_CHUNK_SIZE: usize = 10_000;

fn validate(config: &Config) -> Result<()> {
    if !(1..=100).contains(&config.api.per_page) {
        anyhow::bail!("api.per_page must be in [1, 100]");
    }
    if config.api.timeout_secs == 0 {
        anyhow::bail!("api.timeout_secs must be > 0");
    }
    if config.api.token_env.trim().is_empty() {
        anyhow::bail!("api.token_env must not be empty");
    }
    if !config.api.base_url.starts_with("http://") && !config.api.base_url.starts_with("https://") {
        anyhow::bail!(
            "api.base_url must be an http(s) URL, got '{}'",
            config.api.base_url
        );
    }
    if !(1..=MAX_CHUNK_SIZE).contains(&config.crawl.chunk_size) {
        anyhow::bail!("crawl.chunk_size must be in [1, {}]", MAX_CHUNK_SIZE);
    }
    if config.crawl.recency_days == 0 {
        anyhow::bail!("crawl.recency_days must be > 0");
    }
    match config.log.level.to_ascii_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        other => anyhow::bail!(
            "Unknown log level: '{}'. Must be trace, debug, info, warn, or error.",
            other
        ),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(content: &str) -> (tempfile::TempDir, PathBuf) {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("harvest.toml");
        std::fs::write(&path, content).unwrap();
        (tmp, path)
    }

    #[test]
    fn empty_file_uses_defaults() {
        let (_tmp, path) = write_config("");
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.api.per_page, 100);
        assert_eq!(cfg.api.base_url, "https://api.github.com");
        assert_eq!(cfg.crawl.chunk_size, 50);
        assert_eq!(cfg.crawl.recency_days, 90);
        assert!(cfg.crawl.write_metadata);
        assert_eq!(cfg.api.page_limit(), None);
    }

    #[test]
    fn overrides_are_applied() {
        let (_tmp, path) = write_config(
            r#"
[api]
base_url = "http://127.0.0.1:9999"
per_page = 30
max_pages = 4

[crawl]
chunk_size = 5
include_pull_requests = true

[log]
level = "debug"
file = "harvest.log"
"#,
        );
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.api.per_page, 30);
        assert_eq!(cfg.api.page_limit(), Some(4));
        assert_eq!(cfg.crawl.chunk_size, 5);
        assert!(cfg.crawl.include_pull_requests);
        assert_eq!(cfg.log.file, Some(PathBuf::from("harvest.log")));
    }

    #[test]
    fn rejects_invalid_values() {
        for bad in [
            "[api]\nper_page = 0",
            "[api]\nper_page = 101",
            "[api]\nbase_url = \"ftp://example.com\"",
            "[crawl]\nchunk_size = 0",
            "[crawl]\nchunk_size = 10001",
            "[crawl]\nchunk_size = 1000000000000000000",
            "[crawl]\nrecency_days = 0",
            "[log]\nlevel = \"loud\"",
        ] {
            let (_tmp, path) = write_config(bad);
            assert!(load_config(&path).is_err(), "accepted: {}", bad);
        }
    }

    #[test]
    fn accepts_largest_chunk_size() {
        let (_tmp, path) = write_config("[crawl]\nchunk_size = 10000");
        assert_eq!(load_config(&path).unwrap().crawl.chunk_size, MAX_CHUNK_SIZE);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let tmp = tempfile::TempDir::new().unwrap();
        let cfg = load_or_default(&tmp.path().join("nope.toml")).unwrap();
        assert_eq!(cfg.api.token_env, "GITHUB_TOKEN");
    }
}
