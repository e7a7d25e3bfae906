//! HTML page fetcher with timeout, retry and content-type gating

use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use reqwest::Client;
use tracing::{debug, instrument, warn};

use crate::crawler::error::{CrawlError, FetchError};
use crate::crawler::{CrawledPage, CrawlerConfig};

const MAX_REDIRECTS: usize = 5;

/// Fetches HTML pages for the crawler
///
/// Every failure path ends in `None` from [`Fetcher::fetch`], so the caller
/// can skip a bad page without aborting the traversal. Transient network
/// errors are retried with exponential backoff; HTTP error statuses and
/// non-HTML responses are final after one attempt.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    config: CrawlerConfig,
}

impl Fetcher {
    /// Create a fetcher from the crawler configuration
    ///
    /// Redirects are followed at most five times and every hop is checked
    /// against the configured URL guard.
    pub fn new(config: CrawlerConfig) -> Result<Self, CrawlError> {
        let guard = config.url_guard.clone();
        let redirect_policy = Policy::custom(move |attempt| {
            if attempt.previous().len() >= MAX_REDIRECTS {
                attempt.error("too many redirects")
            } else if guard.permits(attempt.url().as_str()) {
                attempt.follow()
            } else {
                attempt.stop()
            }
        });

        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .connect_timeout(config.timeout)
            .redirect(redirect_policy)
            .build()?;

        Ok(Self { client, config })
    }

    /// Fetch `url`, returning `None` on any failure
    #[instrument(skip(self), level = "debug")]
    pub async fn fetch(&self, url: &str) -> Option<CrawledPage> {
        match self.fetch_page(url).await {
            Ok(page) => Some(page),
            Err(FetchError::NotHtml(content_type)) => {
                debug!("Skipping non-HTML response from {}: {}", url, content_type);
                None
            }
            Err(e) => {
                warn!("Failed to fetch {}: {}", url, e);
                None
            }
        }
    }

    /// Fetch `url`, retrying transient network failures
    pub async fn fetch_page(&self, url: &str) -> Result<CrawledPage, FetchError> {
        self.config.url_guard.check(url)?;

        let mut attempt = 1;
        loop {
            match self.fetch_once(url).await {
                Err(e) if e.is_transient() && attempt < self.config.max_attempts => {
                    let delay = self.config.backoff(attempt);
                    debug!(
                        "Transient error fetching {} (attempt {}/{}): {}. Retrying in {} ms",
                        url,
                        attempt,
                        self.config.max_attempts,
                        e,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    async fn fetch_once(&self, url: &str) -> Result<CrawledPage, FetchError> {
        let response = self
            .client
            .get(url)
            .header("Accept", "text/html,application/xhtml+xml;q=0.9,*/*;q=0.5")
            .header("Accept-Language", "en-US,en;q=0.8")
            .send()
            .await
            .map_err(FetchError::Network)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("")
            .to_lowercase();
        if !is_html(&content_type) {
            return Err(FetchError::NotHtml(content_type));
        }

        let final_url = response.url().to_string();
        let html = response.text().await.map_err(FetchError::Network)?;

        Ok(CrawledPage::from_html(final_url, html))
    }
}

fn is_html(content_type: &str) -> bool {
    let mime = content_type.split(';').next().unwrap_or("").trim();
    mime == "text/html" || mime == "application/xhtml+xml"
}
