use anyhow::Result;

use crate::config::Config;
use crate::locator;

/// Print how a URL would be resolved in each mode, whether the credential is
/// present, and the effective crawl settings. Makes no network calls.
pub fn run_check(config: &Config, url: &str) -> Result<()> {
    let issues = match locator::parse_repo_url(url) {
        Ok(r) => format!("OK ({})", r),
        Err(e) => format!("INVALID ({})", e),
    };
    let conversation = match locator::parse_thread_url(url) {
        Ok(r) => format!("OK ({})", r),
        Err(e) => format!("INVALID ({})", e),
    };
    let credential = if config.token().is_some() {
        "present"
    } else {
        "MISSING"
    };

    println!("{:<16} {}", "MODE", "REFERENCE");
    println!("{:<16} {}", "issues", issues);
    println!("{:<16} {}", "conversation", conversation);
    println!();
    println!("{:<16} {} ({})", "credential", credential, config.api.token_env);
    println!("{:<16} {}", "api", config.api.base_url);
    println!("{:<16} {}", "per_page", config.api.per_page);
    println!("{:<16} {}", "chunk_size", config.crawl.chunk_size);
    println!("{:<16} {} days", "recency", config.crawl.recency_days);

    Ok(())
}
