//! Link discovery for graph expansion

use std::collections::{BTreeSet, HashSet};

use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

use crate::crawler::CrawledPage;
use crate::crawler::content_extraction::collapse_whitespace;

/// Path suffixes that are never documentation pages
const BINARY_EXTENSIONS: &[&str] = &[
    ".exe", ".msi", ".msix", ".zip", ".7z", ".rar", ".gz", ".tgz", ".bz2", ".xz", ".cab", ".iso",
    ".dmg", ".pkg", ".pdf", ".png", ".jpg", ".jpeg", ".gif", ".svg", ".webp", ".ico", ".mp4",
    ".css", ".js",
];

/// Discover links on `page` worth following
///
/// A link is kept when it resolves to an http(s) URL on `origin_hostname`
/// and either its URL or its visible text contains one of the keywords
/// (case-insensitive). Fragments are dropped, duplicates removed, and the
/// result keeps document order up to `max_links` entries.
///
/// # Arguments
///
/// * `page` - The freshly fetched page
/// * `origin_hostname` - Hostname of the crawl's start URL
/// * `keyword_allowlist` - Lowercased relevance keywords
/// * `max_links` - Maximum number of links returned
pub fn discover_links(
    page: &CrawledPage,
    origin_hostname: &str,
    keyword_allowlist: &BTreeSet<String>,
    max_links: usize,
) -> Vec<String> {
    let Ok(base) = Url::parse(&page.url) else {
        debug!("Cannot resolve links against invalid page URL {}", page.url);
        return Vec::new();
    };
    let Ok(anchor_selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let origin_hostname = origin_hostname.to_lowercase();
    let document = Html::parse_document(&page.raw_html);
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for anchor in document.select(&anchor_selector) {
        if links.len() >= max_links {
            break;
        }
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let Ok(mut resolved) = base.join(href.trim()) else {
            continue;
        };
        resolved.set_fragment(None);

        if !matches!(resolved.scheme(), "http" | "https") {
            continue;
        }
        if resolved.host_str().map(str::to_lowercase).as_deref() != Some(origin_hostname.as_str()) {
            continue;
        }

        let path = resolved.path().to_lowercase();
        if BINARY_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
            continue;
        }

        let url_text = resolved.as_str().to_lowercase();
        let url_text = url_text
            .split_once("://")
            .and_then(|(_, rest)| rest.split_once('/'))
            .map(|(_, path_and_query)| path_and_query)
            .unwrap_or("");
        let link_text = collapse_whitespace(&anchor.text().collect::<String>()).to_lowercase();
        let relevant = keyword_allowlist
            .iter()
            .any(|keyword| url_text.contains(keyword.as_str()) || link_text.contains(keyword.as_str()));
        if !relevant {
            continue;
        }

        let link = resolved.to_string();
        if seen.insert(link.clone()) {
            links.push(link);
        }
    }

    links
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keywords(words: &[&str]) -> BTreeSet<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_filters_by_origin_and_keyword() {
        let page = CrawledPage::from_html(
            "https://vendor.example/products/app/",
            r##"<html><body>
                <a href="../../support/deploy.html">Admin guide</a>
                <a href="/blog/news">Latest news</a>
                <a href="/kb/1234">Silent installation options</a>
                <a href="https://other.example/deploy">Partner deployment</a>
                <a href="ftp://vendor.example/deploy">FTP mirror</a>
                <a href="mailto:it@vendor.example">Email deploy team</a>
                <a href="/downloads/setup.exe">Download installer</a>
                <a href="/support/deploy.html#switches">Switches</a>
            </body></html>"##,
        );

        let links = discover_links(&page, "vendor.example", &keywords(&["deploy", "silent"]), 20);

        assert_eq!(
            links,
            vec![
                "https://vendor.example/support/deploy.html".to_string(),
                "https://vendor.example/kb/1234".to_string(),
            ]
        );
    }

    #[test]
    fn test_keyword_matching_is_case_insensitive() {
        let page = CrawledPage::from_html(
            "https://vendor.example/",
            r#"<a href="/Docs/INTUNE-Packaging">Packaging</a><a href="/x">ENTERPRISE Rollout</a>"#,
        );

        let links = discover_links(&page, "vendor.example", &keywords(&["intune", "enterprise"]), 20);
        assert_eq!(links.len(), 2);
    }

    #[test]
    fn test_respects_link_cap() {
        let anchors: String = (0..30)
            .map(|i| format!(r#"<a href="/deploy/{i}">Deploy {i}</a>"#))
            .collect();
        let page = CrawledPage::from_html("https://vendor.example/", anchors);

        let links = discover_links(&page, "vendor.example", &keywords(&["deploy"]), 20);
        assert_eq!(links.len(), 20);
        assert_eq!(links[0], "https://vendor.example/deploy/0");
        assert_eq!(links[19], "https://vendor.example/deploy/19");
    }

    #[test]
    fn test_host_portion_does_not_count_as_keyword() {
        let page = CrawledPage::from_html(
            "https://install.vendor.example/",
            r#"<a href="/pricing">Pricing</a>"#,
        );

        let links = discover_links(&page, "install.vendor.example", &keywords(&["install"]), 20);
        assert!(links.is_empty());
    }
}
