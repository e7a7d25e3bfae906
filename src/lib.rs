//! # switchscout - Silent-Install Metadata for Windows Installers
//!
//! This crate derives the metadata an IT packaging engineer needs to deploy
//! a Windows installer unattended: the silent install command, the
//! uninstall command, a detection rule and how far each can be trusted.
//! It combines filename heuristics with a small, safe crawl of the vendor's
//! documentation looking for explicitly documented command-line switches.
//!
//! ## Features
//!
//! - URL safety validation before any network access
//! - Bounded, same-origin, keyword-guided documentation crawling
//! - A versioned pattern library for commands, paths, GUIDs and versions
//! - Confidence ranking with a clearly flagged fallback when nothing is found
//! - Cancellation of in-flight crawls
//!
//! ## Example
//!
//! ```rust,no_run
//! use switchscout::{Analyzer, CrawlerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let analyzer = Analyzer::new(CrawlerConfig::default())?;
//!
//!     let recommendation = analyzer
//!         .analyze(
//!             "https://vendor.example/download",
//!             "https://vendor.example/files/tool-setup.exe",
//!             "tool-setup.exe",
//!         )
//!         .await?;
//!
//!     println!("{}", recommendation.silent_install_command);
//!     for warning in &recommendation.warnings {
//!         println!("warning: {}", warning);
//!     }
//!     Ok(())
//! }
//! ```

mod error;

pub mod analyzer;
pub mod builder;
pub mod crawler;
pub mod extractor;
pub mod ranker;
pub mod recommendation;

pub use analyzer::{Analyzer, resolve_filename};
pub use builder::{build, classify};
pub use crawler::{CrawlTarget, CrawledPage, Crawler, CrawlerConfig, validate};
pub use error::{Error, Result};
pub use extractor::{CommandCandidate, CommandRole, extract, extract_versions};
pub use ranker::{RankOutcome, rank};
pub use recommendation::{
    Confidence, ConfidenceBreakdown, DetectionRule, InstallerKind, PackagingRecommendation,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
}
