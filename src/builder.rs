//! # Packaging Result Builder
//!
//! Classifies the installer by extension and turns crawled pages into one
//! [`PackagingRecommendation`]. MSI packages get the standard Windows
//! Installer command without needing documentation, EXE installers go
//! through extraction and ranking, archives get extraction guidance and
//! anything else is flagged for manual investigation.

use std::collections::BTreeSet;

use chrono::Utc;
use tracing::{info, instrument};

use crate::crawler::CrawledPage;
use crate::extractor::patterns::PATTERN_LIBRARY_VERSION;
use crate::extractor::{extract, extract_versions};
use crate::ranker::{self, RankOutcome, Selection};
use crate::recommendation::{
    Confidence, InstallerKind, MANUAL_INVESTIGATION, PackagingRecommendation,
};

/// Extensions that identify a kind, compound ones first
const EXTENSION_TABLE: &[(&str, InstallerKind)] = &[
    (".tar.gz", InstallerKind::Archive),
    (".tar.bz2", InstallerKind::Archive),
    (".tar.xz", InstallerKind::Archive),
    (".msi", InstallerKind::Msi),
    (".exe", InstallerKind::Exe),
    (".zip", InstallerKind::Archive),
    (".7z", InstallerKind::Archive),
    (".rar", InstallerKind::Archive),
    (".tgz", InstallerKind::Archive),
    (".gz", InstallerKind::Archive),
    (".cab", InstallerKind::Archive),
];

/// Classify an installer by its filename extension (case-insensitive)
pub fn classify(filename: &str) -> InstallerKind {
    let lower = filename.trim().to_lowercase();
    EXTENSION_TABLE
        .iter()
        .find(|(ext, _)| lower.ends_with(ext))
        .map(|(_, kind)| *kind)
        .unwrap_or(InstallerKind::Unknown)
}

/// Build the recommendation for one installer
///
/// # Arguments
///
/// * `filename` - The installer's filename
/// * `installer_url` - Where the installer is downloaded from (may be empty)
/// * `pages` - Crawled documentation pages; the first is the start page
#[instrument(skip(pages), fields(pages = pages.len()))]
pub fn build(filename: &str, installer_url: &str, pages: &[CrawledPage]) -> PackagingRecommendation {
    let kind = classify(filename);
    let outcome = match kind {
        InstallerKind::Msi => build_msi(filename, pages),
        InstallerKind::Exe => build_exe(filename, pages),
        InstallerKind::Archive => build_archive(),
        InstallerKind::Unknown => build_unknown(filename),
    };

    let mut source_pages = outcome.source_pages.clone();
    if let Some(start) = pages.first() {
        if kind == InstallerKind::Exe || !source_pages.is_empty() {
            source_pages.insert(start.url.clone());
        }
    }

    let detected_versions = detected_versions(pages, &source_pages);

    let confidence_breakdown = outcome.breakdown();
    let mut notes = outcome.notes;
    notes.extend(kind_notes(kind).iter().map(|note| note.to_string()));

    info!(
        "Recommendation for {} ({}): confidence {}",
        filename, kind, outcome.confidence
    );

    PackagingRecommendation {
        filename: filename.to_string(),
        installer_url: installer_url.to_string(),
        installer_kind: kind,
        confidence_breakdown,
        silent_install_command: outcome.best_install,
        uninstall_command: outcome.best_uninstall,
        detection_rule: outcome.detection_rule,
        confidence: outcome.confidence,
        warnings: outcome.warnings,
        source_pages,
        notes,
        detected_versions,
        pattern_library_version: PATTERN_LIBRARY_VERSION,
        generated_at: Utc::now(),
    }
}

fn candidates_of(filename: &str, pages: &[CrawledPage]) -> Vec<crate::extractor::CommandCandidate> {
    pages.iter().flat_map(|page| extract(page, filename)).collect()
}

/// Standard install command; uninstall and detection still use any
/// documented ProductCode
fn build_msi(filename: &str, pages: &[CrawledPage]) -> RankOutcome {
    let candidates = ranker::dedupe(&candidates_of(filename, pages));

    let install = Selection {
        value: format!("msiexec /i {} /qn /norestart", ranker::quote(filename)),
        confidence: Confidence::High,
        warnings: Vec::new(),
        notes: Vec::new(),
        source: None,
    };
    let uninstall = ranker::select_uninstall(&candidates, filename, InstallerKind::Msi);
    let detection = ranker::synthesize_detection(&candidates, filename, InstallerKind::Msi);

    ranker::combine(install, uninstall, detection)
}

fn build_exe(filename: &str, pages: &[CrawledPage]) -> RankOutcome {
    ranker::rank(&candidates_of(filename, pages), filename, InstallerKind::Exe)
}

fn build_archive() -> RankOutcome {
    let mut outcome = ranker::rank(&[], "", InstallerKind::Archive);
    outcome.notes.extend(
        [
            "Archives cannot be deployed directly: extract the archive first",
            "Re-run the analysis on the installer (.msi or .exe) found inside",
        ]
        .map(String::from),
    );
    outcome
}

fn build_unknown(filename: &str) -> RankOutcome {
    let install = Selection {
        value: MANUAL_INVESTIGATION.to_string(),
        confidence: Confidence::Low,
        warnings: vec![format!(
            "Cannot determine the installer type of {}; manual investigation required",
            filename
        )],
        notes: Vec::new(),
        source: None,
    };
    let uninstall = ranker::fallback_uninstall(filename, InstallerKind::Unknown);
    let detection = ranker::heuristic_detection(filename);
    ranker::combine(install, uninstall, detection)
}

fn kind_notes(kind: InstallerKind) -> &'static [&'static str] {
    match kind {
        InstallerKind::Msi => &[
            "/qn gives a fully silent install; /norestart suppresses the automatic reboot",
            "Always test before deployment",
        ],
        InstallerKind::Exe => &[
            "EXE switches depend on the installer framework (NSIS: /S, Inno Setup: /VERYSILENT, InstallShield: /s)",
            "Always test before deployment",
        ],
        InstallerKind::Archive => &[],
        InstallerKind::Unknown => &["Check the vendor documentation for deployment instructions"],
    }
}

/// Versions mentioned on the pages that contributed to the answer
fn detected_versions(pages: &[CrawledPage], source_pages: &BTreeSet<String>) -> Vec<String> {
    let mut versions = Vec::new();
    let contributing = pages.iter().filter(|p| source_pages.contains(&p.url));
    for page in contributing {
        for version in extract_versions(page) {
            if !versions.contains(&version) {
                versions.push(version);
            }
        }
    }
    versions
}
