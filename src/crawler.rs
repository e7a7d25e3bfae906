//! # Documentation Crawler Module
//!
//! This module explores a small, bounded set of same-origin vendor pages
//! looking for documented silent-install switches. It is the first stage of
//! an analysis: its output feeds the extractor, which harvests command
//! candidates from every collected page.
//!
//! ## Key Components
//!
//! - `CrawlerConfig`: page budget, timeouts, politeness delay, keywords
//! - `UrlGuard` / `validate`: the URL safety boundary, run before every request
//! - `Fetcher`: HTML retrieval with timeout, retry/backoff and content-type gating
//! - `discover_links`: same-origin, keyword-relevant link expansion
//! - `Crawler`: breadth-first traversal composing the fetcher and discoverer
//!
//! ## Behaviour
//!
//! - Fetches are sequential and separated by a fixed politeness delay
//! - A failed page is skipped, never fatal to the crawl
//! - The page budget bounds both the page count and total wall-clock time
//! - Only server-delivered HTML is read; client-side rendering is not executed

mod config;
pub(crate) mod content_extraction;
mod error;
mod fetcher;
mod links;
mod scheduler;
mod url_safety;

pub use config::{CrawlerConfig, CrawlerConfigBuilder, DEFAULT_KEYWORDS, MAX_PAGE_BUDGET};
pub use content_extraction::{page_title, visible_text};
pub use error::{CrawlError, FetchError};
pub use fetcher::Fetcher;
pub use links::discover_links;
pub use scheduler::Crawler;
pub use url_safety::{UrlGuard, UrlRejection, inspect, validate};

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Input of one crawl invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTarget {
    /// URL the traversal starts from
    pub start_url: String,

    /// Upper bound on the number of pages collected
    pub max_pages: usize,

    /// Lowercased keywords a link must mention to be followed
    pub keyword_allowlist: BTreeSet<String>,
}

impl CrawlTarget {
    /// Build a target for `start_url` using the budget and keywords of `config`
    pub fn new(start_url: impl Into<String>, config: &CrawlerConfig) -> Self {
        Self {
            start_url: start_url.into(),
            max_pages: config.max_pages,
            keyword_allowlist: config
                .keyword_allowlist
                .iter()
                .map(|k| k.to_lowercase())
                .collect(),
        }
    }
}

/// A fetched HTML page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawledPage {
    /// Final URL of the page
    pub url: String,

    /// HTML as delivered by the server
    pub raw_html: String,

    /// Visible text of the page (scripts and styles removed)
    pub extracted_text: String,
}

impl CrawledPage {
    /// Create a page from raw HTML, deriving its visible text
    pub fn from_html(url: impl Into<String>, raw_html: impl Into<String>) -> Self {
        let raw_html = raw_html.into();
        let extracted_text = visible_text(&raw_html);
        Self {
            url: url.into(),
            raw_html,
            extracted_text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crawled_page_from_html() {
        let page = CrawledPage::from_html(
            "https://vendor.example/docs",
            "<html><head><style>p{}</style></head><body><p>Run setup.exe /S</p><script>var x = 1;</script></body></html>",
        );

        assert_eq!(page.url, "https://vendor.example/docs");
        assert!(page.extracted_text.contains("Run setup.exe /S"));
        assert!(!page.extracted_text.contains("var x"));
        assert!(!page.extracted_text.contains("p{}"));
    }

    #[test]
    fn test_crawl_target_lowercases_keywords() {
        let config = CrawlerConfig::builder()
            .keyword_allowlist(vec!["Deploy".to_string(), "INTUNE".to_string()])
            .max_pages(3)
            .build();
        let target = CrawlTarget::new("https://vendor.example/", &config);

        assert_eq!(target.max_pages, 3);
        assert!(target.keyword_allowlist.contains("deploy"));
        assert!(target.keyword_allowlist.contains("intune"));
    }
}
