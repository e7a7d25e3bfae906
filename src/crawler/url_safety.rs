//! URL safety checks run before any network access
//!
//! Rules, in order: the URL must parse, its scheme must be exactly `http` or
//! `https`, and its host must not equal or start with a loopback, link-local
//! or private-network literal. Hosts are compared after the `url` crate has
//! normalized them, so alternate IPv4 spellings (`0x7f.1`, `2130706433`)
//! are caught as well.

use std::fmt;
use url::Url;

const BLOCKED_HOST_PREFIXES: &[&str] = &[
    "localhost",
    "127.0.0.1",
    "0.0.0.0",
    "::1",
    "169.254.",
    "10.",
    "172.16.",
    "172.17.",
    "172.18.",
    "172.19.",
    "172.20.",
    "172.21.",
    "172.22.",
    "172.23.",
    "172.24.",
    "172.25.",
    "172.26.",
    "172.27.",
    "172.28.",
    "172.29.",
    "172.30.",
    "172.31.",
    "192.168.",
];

/// Reason a URL was refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlRejection {
    /// The URL did not parse
    Malformed(String),
    /// Scheme other than http/https
    Scheme(String),
    /// The URL has no host
    MissingHost,
    /// Host is loopback, link-local or private
    BlockedHost(String),
}

impl fmt::Display for UrlRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UrlRejection::Malformed(e) => write!(f, "URL could not be parsed: {e}"),
            UrlRejection::Scheme(s) => write!(f, "scheme '{s}' is not allowed (http/https only)"),
            UrlRejection::MissingHost => f.write_str("URL has no host"),
            UrlRejection::BlockedHost(h) => write!(f, "host '{h}' is local or private"),
        }
    }
}

impl std::error::Error for UrlRejection {}

/// Parse `url` and apply the safety rules
pub fn inspect(url: &str) -> Result<Url, UrlRejection> {
    let parsed = Url::parse(url.trim()).map_err(|e| UrlRejection::Malformed(e.to_string()))?;

    let scheme = parsed.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(UrlRejection::Scheme(scheme.to_string()));
    }

    let host = parsed.host_str().ok_or(UrlRejection::MissingHost)?;
    let host = host.trim_start_matches('[').trim_end_matches(']').to_lowercase();
    if host.is_empty() {
        return Err(UrlRejection::MissingHost);
    }
    if BLOCKED_HOST_PREFIXES
        .iter()
        .any(|blocked| host == *blocked || host.starts_with(blocked))
    {
        return Err(UrlRejection::BlockedHost(host));
    }

    Ok(parsed)
}

/// Whether `url` may be requested. Never panics on malformed input.
pub fn validate(url: &str) -> bool {
    inspect(url).is_ok()
}

/// The safety check used by the crawler, with an explicit host override
///
/// Hosts in the allowlist bypass only the blocked-host rule; the scheme rule
/// still applies. The list is empty unless the operator opts in, e.g. to
/// crawl a documentation mirror on the local network.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlGuard {
    allowed_hosts: Vec<String>,
}

impl UrlGuard {
    /// Allow an otherwise blocked host
    pub fn allow_host(mut self, host: impl Into<String>) -> Self {
        self.allowed_hosts.push(host.into().to_lowercase());
        self
    }

    /// Check `url`, returning the parsed URL on success
    pub fn check(&self, url: &str) -> Result<Url, UrlRejection> {
        match inspect(url) {
            Err(UrlRejection::BlockedHost(host)) => {
                if self.allowed_hosts.iter().any(|allowed| *allowed == host) {
                    Url::parse(url.trim()).map_err(|e| UrlRejection::Malformed(e.to_string()))
                } else {
                    Err(UrlRejection::BlockedHost(host))
                }
            }
            other => other,
        }
    }

    /// Whether `url` may be requested
    pub fn permits(&self, url: &str) -> bool {
        self.check(url).is_ok()
    }
}
