//! Breadth-first crawl scheduler

use std::collections::{HashSet, VecDeque};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::crawler::error::CrawlError;
use crate::crawler::fetcher::Fetcher;
use crate::crawler::links::discover_links;
use crate::crawler::{CrawlTarget, CrawledPage, CrawlerConfig};

/// Sequential, budget-bounded documentation crawler
///
/// One crawl owns its visited set and queue; nothing is shared between
/// crawls, so independent analyses can run concurrently on clones of the
/// same `Crawler`.
#[derive(Debug, Clone)]
pub struct Crawler {
    fetcher: Fetcher,
    config: CrawlerConfig,
}

#[derive(Debug, Default)]
struct CrawlStats {
    fetched: usize,
    failed: usize,
    rejected: usize,
}

impl Crawler {
    /// Create a crawler from the given configuration
    pub fn new(config: CrawlerConfig) -> Result<Self, CrawlError> {
        let fetcher = Fetcher::new(config.clone())?;
        Ok(Self { fetcher, config })
    }

    /// The configuration this crawler was built with
    pub fn config(&self) -> &CrawlerConfig {
        &self.config
    }

    /// Crawl `target` to completion
    pub async fn crawl(&self, target: &CrawlTarget) -> Vec<CrawledPage> {
        self.crawl_with_cancel(target, &CancellationToken::new()).await
    }

    /// Crawl `target`, stopping early when `cancel` fires
    ///
    /// Pages are fetched one at a time, separated by the politeness delay.
    /// A URL is marked visited when it is dequeued, before its links are
    /// expanded, so cyclic link graphs are never reprocessed. Whatever was
    /// collected is returned, including on cancellation.
    #[instrument(skip(self, target, cancel), fields(start_url = %target.start_url, max_pages = target.max_pages))]
    pub async fn crawl_with_cancel(
        &self,
        target: &CrawlTarget,
        cancel: &CancellationToken,
    ) -> Vec<CrawledPage> {
        info!("Starting crawl for {}", target.start_url);

        let mut pages = Vec::new();
        let mut stats = CrawlStats::default();

        let origin_hostname = match Url::parse(&target.start_url) {
            Ok(url) => url.host_str().unwrap_or_default().to_lowercase(),
            Err(e) => {
                warn!("Invalid start URL {}: {}", target.start_url, e);
                return pages;
            }
        };

        let mut queue = VecDeque::from([target.start_url.clone()]);
        let mut queued: HashSet<String> = HashSet::from([target.start_url.clone()]);
        let mut visited: HashSet<String> = HashSet::new();
        let mut first_request = true;

        while pages.len() < target.max_pages && !cancel.is_cancelled() {
            let Some(url) = queue.pop_front() else {
                break;
            };
            queued.remove(&url);
            if !visited.insert(url.clone()) {
                continue;
            }

            if let Err(reason) = self.config.url_guard.check(&url) {
                warn!("Refusing to fetch {}: {}", url, reason);
                stats.rejected += 1;
                continue;
            }

            if !first_request {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(self.config.politeness_delay()) => {}
                }
            }
            first_request = false;

            let fetched = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                page = self.fetcher.fetch(&url) => page,
            };

            let Some(page) = fetched else {
                stats.failed += 1;
                continue;
            };
            stats.fetched += 1;
            debug!("Fetched {} ({} bytes)", page.url, page.raw_html.len());

            // Redirects can land on a URL we already hold
            visited.insert(page.url.clone());

            if pages.len() + 1 < target.max_pages {
                let links = discover_links(
                    &page,
                    &origin_hostname,
                    &target.keyword_allowlist,
                    self.config.max_links_per_page,
                );
                for link in links {
                    if !visited.contains(&link) && queued.insert(link.clone()) {
                        queue.push_back(link);
                    }
                }
            }

            pages.push(page);
        }

        if cancel.is_cancelled() {
            info!("Crawl cancelled after {} pages", pages.len());
        }
        info!(
            "Crawl finished: {} fetched, {} failed, {} rejected",
            stats.fetched, stats.failed, stats.rejected
        );
        pages
    }
}
