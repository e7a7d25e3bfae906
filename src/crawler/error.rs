//! Error types for the crawler module

use crate::error::Error as CrateError;
use thiserror::Error;

/// Error type for crawler operations
#[derive(Debug, Error)]
pub enum CrawlError {
    /// The HTTP client could not be built
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

impl From<CrawlError> for CrateError {
    fn from(err: CrawlError) -> Self {
        CrateError::Crawl(err.to_string())
    }
}

/// Why a single page could not be collected
///
/// These never abort a crawl; the fetcher logs them and skips the page.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The URL guard refused the URL
    #[error("Unsafe URL: {0}")]
    Unsafe(#[from] super::url_safety::UrlRejection),

    /// Connection, timeout or other transport failure
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    /// The server answered with a non-success status
    #[error("HTTP status {0}")]
    Status(u16),

    /// The response is not an HTML document
    #[error("Not HTML: {0}")]
    NotHtml(String),
}

impl FetchError {
    /// Whether another attempt might succeed
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Network(e) => {
                e.is_timeout() || e.is_connect() || e.is_request() || e.is_body()
            }
            _ => false,
        }
    }
}
