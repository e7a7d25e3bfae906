//! Error types for the switchscout crate

use thiserror::Error;

/// Result type for switchscout operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for switchscout operations
///
/// Only conditions that stop an analysis outright live here. Per-page fetch
/// failures and malformed pages are recovered inside the crawler and the
/// extractor, and "no evidence found" is a low-confidence success rather
/// than an error.
#[derive(Debug, Error)]
pub enum Error {
    /// A start or installer URL was rejected before any network access
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl {
        /// The offending URL as supplied by the caller
        url: String,
        /// Human-readable rejection reason
        reason: String,
    },

    /// No filename was supplied and none could be derived from the installer URL
    #[error("Missing installer filename: {0}")]
    MissingFilename(String),

    /// The start page could not be fetched even once
    #[error("No pages reachable from {url}")]
    NoPagesReachable {
        /// The start URL of the crawl
        url: String,
    },

    /// The caller cancelled the analysis before any page was collected
    #[error("Analysis cancelled")]
    Cancelled,

    /// The crawler could not be set up
    #[error("Crawl error: {0}")]
    Crawl(String),
}

impl Error {
    /// HTTP status a transport wrapper should answer with for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Error::InvalidUrl { .. } | Error::MissingFilename(_) => 400,
            Error::NoPagesReachable { .. } => 502,
            Error::Cancelled => 504,
            Error::Crawl(_) => 500,
        }
    }
}
