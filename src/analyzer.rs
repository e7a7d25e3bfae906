//! # Analysis Entry Point
//!
//! [`Analyzer::analyze`] is the one operation callers use: validate the
//! inputs, crawl the vendor documentation when the installer kind needs it,
//! and build the recommendation.
//!
//! An `Analyzer` holds no per-request state, so one instance can serve many
//! concurrent analyses.

use percent_encoding::percent_decode_str;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};
use url::Url;

use crate::builder::{build, classify};
use crate::crawler::{CrawlTarget, CrawledPage, Crawler, CrawlerConfig};
use crate::error::{Error, Result};
use crate::recommendation::{InstallerKind, PackagingRecommendation};

/// Runs complete analyses
#[derive(Debug, Clone)]
pub struct Analyzer {
    crawler: Crawler,
}

impl Analyzer {
    /// Create an analyzer with the given crawler configuration
    pub fn new(config: CrawlerConfig) -> Result<Self> {
        Ok(Self {
            crawler: Crawler::new(config)?,
        })
    }

    /// The crawler configuration in use
    pub fn config(&self) -> &CrawlerConfig {
        self.crawler.config()
    }

    /// Analyze one installer found on `page_url`
    ///
    /// # Arguments
    ///
    /// * `page_url` - The page the installer was found on; the crawl starts here
    /// * `installer_url` - The installer download URL (may be empty)
    /// * `filename` - The installer filename; derived from `installer_url`
    ///   when empty
    pub async fn analyze(
        &self,
        page_url: &str,
        installer_url: &str,
        filename: &str,
    ) -> Result<PackagingRecommendation> {
        self.analyze_with_cancel(page_url, installer_url, filename, &CancellationToken::new())
            .await
    }

    /// Analyze one installer, stopping the crawl early when `cancel` fires
    ///
    /// Pages collected before cancellation are still used. If none were,
    /// the analysis fails with [`Error::Cancelled`].
    #[instrument(skip(self, cancel))]
    pub async fn analyze_with_cancel(
        &self,
        page_url: &str,
        installer_url: &str,
        filename: &str,
        cancel: &CancellationToken,
    ) -> Result<PackagingRecommendation> {
        let page_url = page_url.trim();
        let installer_url = installer_url.trim();

        self.check_url(page_url)?;
        if !installer_url.is_empty() {
            self.check_url(installer_url)?;
        }
        let filename = resolve_filename(filename, installer_url)?;

        let kind = classify(&filename);
        info!("Analyzing {} ({}) from {}", filename, kind, page_url);

        let pages = if kind == InstallerKind::Exe {
            self.crawl(page_url, cancel).await?
        } else {
            Vec::new()
        };

        Ok(build(&filename, installer_url, &pages))
    }

    /// Crawl the documentation starting at `page_url`
    pub async fn crawl(&self, page_url: &str, cancel: &CancellationToken) -> Result<Vec<CrawledPage>> {
        let target = CrawlTarget::new(page_url, self.config());
        let pages = self.crawler.crawl_with_cancel(&target, cancel).await;

        if pages.is_empty() {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            warn!("Start page {} could not be fetched", page_url);
            return Err(Error::NoPagesReachable {
                url: page_url.to_string(),
            });
        }
        Ok(pages)
    }

    fn check_url(&self, url: &str) -> Result<()> {
        self.config()
            .url_guard
            .check(url)
            .map(|_| ())
            .map_err(|reason| Error::InvalidUrl {
                url: url.to_string(),
                reason: reason.to_string(),
            })
    }
}

/// The supplied filename, or the percent-decoded last path segment of
/// `installer_url`
pub fn resolve_filename(filename: &str, installer_url: &str) -> Result<String> {
    let filename = filename.trim();
    if !filename.is_empty() {
        return Ok(filename.to_string());
    }

    Url::parse(installer_url)
        .ok()
        .and_then(|url| {
            url.path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .map(|segment| {
            let decoded = percent_decode_str(&segment).decode_utf8_lossy();
            decoded.rsplit(['/', '\\']).next().unwrap_or_default().trim().to_string()
        })
        .filter(|segment| !segment.is_empty())
        .ok_or_else(|| {
            Error::MissingFilename(format!(
                "no filename given and none in installer URL '{}'",
                installer_url
            ))
        })
}
