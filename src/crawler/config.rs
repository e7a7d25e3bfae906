//! # Crawler Configuration Module
//!
//! Configuration for the documentation crawler: page budget, per-fetch
//! timeout, politeness delay, retry policy, link keywords and the URL guard.
//! A builder is provided for fluent configuration.
//!
//! ## Defaults
//!
//! - `max_pages`: 8 (clamped to 1..=10)
//! - `timeout`: 10 seconds
//! - `politeness_delay_ms`: 500
//! - `max_attempts`: 3, exponential backoff starting at 250 ms
//! - `max_links_per_page`: 20

use std::time::Duration;

use super::url_safety::UrlGuard;

/// Hard upper bound on the page budget of one crawl
pub const MAX_PAGE_BUDGET: usize = 10;

/// Keywords a link must mention (in its URL or text) to be followed
pub const DEFAULT_KEYWORDS: &[&str] = &[
    "deploy",
    "deployment",
    "silent",
    "install",
    "installation",
    "installing",
    "unattended",
    "enterprise",
    "intune",
    "sccm",
    "configmgr",
    "msi",
    "command-line",
    "commandline",
    "cli",
    "switches",
    "parameters",
    "admin",
    "administrator",
    "setup",
    "guide",
    "docs",
    "documentation",
    "gpo",
];

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Configuration for the crawler
#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    /// Maximum number of pages to collect
    pub max_pages: usize,

    /// Connect and read timeout for a single fetch
    pub timeout: Duration,

    /// Delay in milliseconds between consecutive fetches of one crawl
    pub politeness_delay_ms: u64,

    /// Attempts per page on transient network errors
    pub max_attempts: u32,

    /// Base backoff in milliseconds, doubled after every failed attempt
    pub retry_backoff_ms: u64,

    /// User agent to use for requests
    pub user_agent: String,

    /// Keywords for link relevance
    pub keyword_allowlist: Vec<String>,

    /// Maximum number of links followed from a single page
    pub max_links_per_page: usize,

    /// Safety check applied to every URL before it is requested
    pub url_guard: UrlGuard,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_pages: 8,
            timeout: Duration::from_secs(10),
            politeness_delay_ms: 500,
            max_attempts: 3,
            retry_backoff_ms: 250,
            user_agent: BROWSER_USER_AGENT.to_string(),
            keyword_allowlist: DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            max_links_per_page: 20,
            url_guard: UrlGuard::default(),
        }
    }
}

/// Builder for CrawlerConfig
#[derive(Debug, Default)]
pub struct CrawlerConfigBuilder {
    config: CrawlerConfig,
}

impl CrawlerConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: CrawlerConfig::default(),
        }
    }

    /// Set the page budget; values outside 1..=10 are clamped
    pub fn max_pages(mut self, max_pages: usize) -> Self {
        self.config.max_pages = max_pages.clamp(1, MAX_PAGE_BUDGET);
        self
    }

    /// Set the per-fetch timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the delay in milliseconds between consecutive fetches
    pub fn politeness_delay_ms(mut self, politeness_delay_ms: u64) -> Self {
        self.config.politeness_delay_ms = politeness_delay_ms;
        self
    }

    /// Set the number of attempts per page (at least one)
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.config.max_attempts = max_attempts.max(1);
        self
    }

    /// Set the base retry backoff in milliseconds
    pub fn retry_backoff_ms(mut self, retry_backoff_ms: u64) -> Self {
        self.config.retry_backoff_ms = retry_backoff_ms;
        self
    }

    /// Set the user agent to use for requests
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Replace the link keyword allowlist
    pub fn keyword_allowlist(mut self, keyword_allowlist: Vec<String>) -> Self {
        self.config.keyword_allowlist = keyword_allowlist;
        self
    }

    /// Set the maximum number of links followed from one page
    pub fn max_links_per_page(mut self, max_links_per_page: usize) -> Self {
        self.config.max_links_per_page = max_links_per_page;
        self
    }

    /// Set the URL guard
    pub fn url_guard(mut self, url_guard: UrlGuard) -> Self {
        self.config.url_guard = url_guard;
        self
    }

    /// Build the configuration
    pub fn build(self) -> CrawlerConfig {
        self.config
    }
}

impl CrawlerConfig {
    /// Create a new builder
    pub fn builder() -> CrawlerConfigBuilder {
        CrawlerConfigBuilder::new()
    }

    /// Get the politeness delay as a Duration
    pub fn politeness_delay(&self) -> Duration {
        Duration::from_millis(self.politeness_delay_ms)
    }

    /// Backoff before retry number `attempt` (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
        Duration::from_millis(self.retry_backoff_ms.saturating_mul(factor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CrawlerConfig::default();
        assert_eq!(config.max_pages, 8);
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.politeness_delay(), Duration::from_millis(500));
        assert_eq!(config.max_attempts, 3);
        assert!(config.user_agent.starts_with("Mozilla/5.0"));
        assert!(config.keyword_allowlist.iter().any(|k| k == "intune"));
    }

    #[test]
    fn test_max_pages_is_clamped() {
        assert_eq!(CrawlerConfig::builder().max_pages(0).build().max_pages, 1);
        assert_eq!(CrawlerConfig::builder().max_pages(50).build().max_pages, 10);
        assert_eq!(CrawlerConfig::builder().max_pages(5).build().max_pages, 5);
    }

    #[test]
    fn test_backoff_doubles() {
        let config = CrawlerConfig::builder().retry_backoff_ms(100).build();
        assert_eq!(config.backoff(1), Duration::from_millis(100));
        assert_eq!(config.backoff(2), Duration::from_millis(200));
        assert_eq!(config.backoff(3), Duration::from_millis(400));
    }
}
