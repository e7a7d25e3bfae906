//! # Confidence Ranker & Detection-Rule Synthesizer
//!
//! Merges the candidates harvested from every crawled page, picks the best
//! install and uninstall commands, derives a detection rule and scores how
//! far each part can be trusted. When the documentation yields nothing
//! usable a fixed per-kind fallback is returned, always with a warning
//! naming it.
//!
//! ## Install selection, in order of preference
//!
//! 1. A command naming the installer filename with a silent switch (HIGH)
//! 2. Any command with a silent switch, applied to the filename (MEDIUM)
//! 3. Any command without a silent switch (MEDIUM if the filename matches,
//!    otherwise LOW)
//! 4. The fallback table (LOW)
//!
//! Overall confidence is the weaker of install and detection confidence.

pub mod naming;

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::extractor::patterns::PatternFamily;
use crate::extractor::{CommandCandidate, CommandRole, tokenize};
use crate::recommendation::{
    Confidence, ConfidenceBreakdown, DetectionRule, InstallerKind, MANUAL_INVESTIGATION,
    NOT_APPLICABLE, PRODUCT_CODE_PLACEHOLDER,
};
pub use naming::infer_app_name;

/// Registry hive used for uninstall-key detection rules
pub const UNINSTALL_HIVE: &str = "HKLM";

/// Parent key of per-product uninstall entries
pub const UNINSTALL_KEY_ROOT: &str = r"SOFTWARE\Microsoft\Windows\CurrentVersion\Uninstall";

/// Switches that make msiexec run without UI
const MSI_QUIET_SWITCHES: &[&str] = &["/qn", "/quiet", "/passive", "/qb", "/qb-", "/qn+"];

/// msiexec action switches; never copied into a retargeted command
const MSI_ACTION_SWITCHES: &[&str] = &["/i", "-i", "/package", "-package", "/x", "-x", "/uninstall"];

/// Result of ranking one installer's candidates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankOutcome {
    pub best_install: String,
    pub best_uninstall: String,
    pub detection_rule: DetectionRule,
    pub install_confidence: Confidence,
    pub uninstall_confidence: Confidence,
    pub detection_confidence: Confidence,
    /// Weaker of install and detection confidence
    pub confidence: Confidence,
    pub warnings: Vec<String>,
    pub notes: Vec<String>,
    /// Pages whose candidates were used in the answer
    pub source_pages: BTreeSet<String>,
}

impl RankOutcome {
    /// Per-part confidence
    pub fn breakdown(&self) -> ConfidenceBreakdown {
        ConfidenceBreakdown {
            install: self.install_confidence,
            uninstall: self.uninstall_confidence,
            detection: self.detection_confidence,
        }
    }
}

/// One selected part of the answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection<T> {
    pub value: T,
    pub confidence: Confidence,
    pub warnings: Vec<String>,
    pub notes: Vec<String>,
    pub source: Option<String>,
}

impl<T> Selection<T> {
    fn new(value: T, confidence: Confidence) -> Self {
        Self {
            value,
            confidence,
            warnings: Vec::new(),
            notes: Vec::new(),
            source: None,
        }
    }

    fn from_page(mut self, candidate: &CommandCandidate) -> Self {
        self.source = Some(candidate.source_page_url.clone());
        self
    }

    fn warn(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    fn note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }
}

/// Rank `candidates` for an installer
///
/// # Arguments
///
/// * `candidates` - Candidates from every crawled page, in crawl order
/// * `installer_filename` - The installer's filename
/// * `installer_kind` - The installer's classification
///
/// # Returns
///
/// The selected commands and detection rule with their confidence. Every
/// field is populated even when `candidates` is empty.
#[instrument(skip(candidates), fields(candidates = candidates.len()))]
pub fn rank(
    candidates: &[CommandCandidate],
    installer_filename: &str,
    installer_kind: InstallerKind,
) -> RankOutcome {
    let candidates = dedupe(candidates);

    let install = select_install(&candidates, installer_filename, installer_kind);
    let uninstall = select_uninstall(&candidates, installer_filename, installer_kind);
    let detection = synthesize_detection(&candidates, installer_filename, installer_kind);

    debug!(
        "Ranked {} unique candidates: install {}, uninstall {}, detection {}",
        candidates.len(),
        install.confidence,
        uninstall.confidence,
        detection.confidence
    );

    combine(install, uninstall, detection)
}

/// Assemble the outcome from the three selected parts
pub fn combine(
    install: Selection<String>,
    uninstall: Selection<String>,
    detection: Selection<DetectionRule>,
) -> RankOutcome {
    let mut warnings = Vec::new();
    let mut notes = Vec::new();
    let mut source_pages = BTreeSet::new();

    for (part_warnings, part_notes, source) in [
        (install.warnings, install.notes, install.source),
        (uninstall.warnings, uninstall.notes, uninstall.source),
        (detection.warnings, detection.notes, detection.source),
    ] {
        for warning in part_warnings {
            if !warnings.contains(&warning) {
                warnings.push(warning);
            }
        }
        for note in part_notes {
            if !notes.contains(&note) {
                notes.push(note);
            }
        }
        source_pages.extend(source);
    }

    RankOutcome {
        best_install: install.value,
        best_uninstall: uninstall.value,
        detection_rule: detection.value,
        install_confidence: install.confidence,
        uninstall_confidence: uninstall.confidence,
        detection_confidence: detection.confidence,
        confidence: install.confidence.min(detection.confidence),
        warnings,
        notes,
        source_pages,
    }
}

/// Merge candidates with equal normalized text, keeping the first seen
pub fn dedupe(candidates: &[CommandCandidate]) -> Vec<CommandCandidate> {
    let mut seen = HashSet::new();
    candidates
        .iter()
        .filter(|candidate| seen.insert(candidate.normalized_text()))
        .cloned()
        .collect()
}

/// Last component of a possibly quoted Windows path
fn file_name_of(path: &str) -> &str {
    path.trim_matches('"')
        .rsplit(['\\', '/'])
        .next()
        .unwrap_or_default()
}

/// Whether some token of the candidate names exactly the installer file
fn mentions_filename(candidate: &CommandCandidate, filename: &str) -> bool {
    let filename = filename.trim();
    !filename.is_empty()
        && tokenize(&candidate.raw_text)
            .iter()
            .any(|token| file_name_of(token).eq_ignore_ascii_case(filename))
}

/// Quote a filename for a generated command line
///
/// Windows filenames cannot contain `"`, so any that appear are dropped
/// rather than allowed to end the quoted section early.
pub(crate) fn quote(filename: &str) -> String {
    format!("\"{}\"", filename.trim().replace('"', ""))
}

/// Whether a candidate's command style can drive an installer of `kind`
fn suits_kind(candidate: &CommandCandidate, kind: InstallerKind) -> bool {
    match kind {
        InstallerKind::Exe => !matches!(
            candidate.family,
            PatternFamily::MsiInstall | PatternFamily::MsiUninstall
        ),
        InstallerKind::Msi => !matches!(
            candidate.family,
            PatternFamily::ExeCommand | PatternFamily::ExeUninstall
        ),
        InstallerKind::Archive | InstallerKind::Unknown => true,
    }
}

/// Apply a candidate's switches to the installer being analyzed
fn retarget(candidate: &CommandCandidate, filename: &str, kind: InstallerKind) -> String {
    let switches: Vec<&str> = candidate
        .switches
        .iter()
        .map(String::as_str)
        .filter(|s| !MSI_ACTION_SWITCHES.iter().any(|a| a.eq_ignore_ascii_case(s)))
        .collect();

    let prefix = if kind == InstallerKind::Msi {
        format!("msiexec /i {}", quote(filename))
    } else {
        quote(filename)
    };

    if switches.is_empty() {
        prefix
    } else {
        format!("{} {}", prefix, switches.join(" "))
    }
}

/// Choose the silent install command
pub fn select_install(
    candidates: &[CommandCandidate],
    filename: &str,
    kind: InstallerKind,
) -> Selection<String> {
    if kind == InstallerKind::Archive {
        return not_applicable();
    }

    let commands: Vec<&CommandCandidate> = candidates
        .iter()
        .filter(|c| c.is_command() && c.inferred_role != CommandRole::Uninstall)
        .filter(|c| suits_kind(c, kind))
        .collect();

    if let Some(best) = commands
        .iter()
        .find(|c| c.has_silent_switch() && mentions_filename(c, filename))
    {
        return Selection::new(best.raw_text.clone(), Confidence::High).from_page(best);
    }

    let silent = commands
        .iter()
        .filter(|c| c.has_silent_switch())
        .min_by_key(|c| c.inferred_role != CommandRole::Install);
    if let Some(best) = silent {
        return Selection::new(retarget(best, filename, kind), Confidence::Medium)
            .from_page(best)
            .warn(format!(
                "Silent switches were documented but the filename not explicitly mentioned (filename not confirmed); verify they apply to {}",
                filename
            ));
    }

    if let Some(best) = commands.iter().find(|c| c.family != PatternFamily::SwitchOnly) {
        let confidence = if mentions_filename(best, filename) {
            Confidence::Medium
        } else {
            Confidence::Low
        };
        return Selection::new(best.raw_text.clone(), confidence)
            .from_page(best)
            .warn("Install command found but silent switches not confirmed");
    }

    fallback_install(filename, kind)
}

fn not_applicable<T: From<&'static str>>() -> Selection<T> {
    Selection::new(T::from(NOT_APPLICABLE), Confidence::NotApplicable)
}

/// The fixed per-kind install command used when nothing was documented
pub fn fallback_install(filename: &str, kind: InstallerKind) -> Selection<String> {
    match kind {
        InstallerKind::Msi => Selection::new(
            format!("msiexec /i {} /qn /norestart", quote(filename)),
            Confidence::Low,
        )
        .warn("No documented install command found; using the standard Windows Installer switches /qn /norestart"),
        InstallerKind::Exe => Selection::new(format!("{} /S", quote(filename)), Confidence::Low)
            .warn("No documented silent switches found; falling back to /S. If that fails, try the documented alternatives /SILENT, /VERYSILENT or /quiet"),
        InstallerKind::Unknown => Selection::new(MANUAL_INVESTIGATION.to_string(), Confidence::Low)
            .warn("Installer type could not be determined from the filename; no install command is suggested"),
        InstallerKind::Archive => not_applicable(),
    }
}

/// ProductCode GUIDs mentioned by uninstall-role candidates, first seen first
fn uninstall_product_codes(candidates: &[CommandCandidate]) -> Vec<(&CommandCandidate, &str)> {
    candidates
        .iter()
        .filter(|c| c.inferred_role == CommandRole::Uninstall)
        .flat_map(|c| c.product_codes.iter().map(move |code| (c, code.as_str())))
        .collect()
}

fn has_msi_quiet_switch(candidate: &CommandCandidate) -> bool {
    candidate
        .switches
        .iter()
        .any(|s| MSI_QUIET_SWITCHES.iter().any(|q| q.eq_ignore_ascii_case(s)))
}

/// Choose the silent uninstall command
pub fn select_uninstall(
    candidates: &[CommandCandidate],
    filename: &str,
    kind: InstallerKind,
) -> Selection<String> {
    if kind == InstallerKind::Archive {
        return not_applicable();
    }

    if kind == InstallerKind::Msi {
        if let Some((candidate, code)) = uninstall_product_codes(candidates).first() {
            let verbatim = candidate.family == PatternFamily::MsiUninstall
                && has_msi_quiet_switch(candidate);
            let command = if verbatim {
                candidate.raw_text.clone()
            } else {
                format!("msiexec /x {} /qn /norestart", code)
            };
            return Selection::new(command, Confidence::High).from_page(candidate);
        }
    }

    let commands: Vec<&CommandCandidate> = candidates
        .iter()
        .filter(|c| {
            c.is_command()
                && c.family != PatternFamily::SwitchOnly
                && c.inferred_role == CommandRole::Uninstall
        })
        .collect();

    if let Some(best) = commands.iter().find(|c| c.has_silent_switch()) {
        return Selection::new(best.raw_text.clone(), Confidence::Medium).from_page(best);
    }
    if let Some(best) = commands.first() {
        return Selection::new(best.raw_text.clone(), Confidence::Low)
            .from_page(best)
            .warn("Uninstall command found but silent switches not confirmed");
    }

    fallback_uninstall(filename, kind)
}

/// The fixed per-kind uninstall command used when nothing was documented
pub fn fallback_uninstall(filename: &str, kind: InstallerKind) -> Selection<String> {
    match kind {
        InstallerKind::Msi => Selection::new(
            format!("msiexec /x {} /qn /norestart", PRODUCT_CODE_PLACEHOLDER),
            Confidence::Medium,
        )
        .warn(format!(
            "Replace {} with the real ProductCode before deploying. Read it from the MSI Property table (e.g. with Orca or Get-AppLockerFileInformation) or from HKLM\\{} after a test install",
            PRODUCT_CODE_PLACEHOLDER, UNINSTALL_KEY_ROOT
        )),
        InstallerKind::Exe => {
            let app = infer_app_name(filename);
            Selection::new(
                format!("\"%ProgramFiles%\\{}\\uninstall.exe\" /S", app),
                Confidence::Low,
            )
            .warn("No documented uninstall command found; the uninstaller path is a guess. Check the UninstallString under the registry Uninstall key after a test install")
        }
        InstallerKind::Unknown => Selection::new(MANUAL_INVESTIGATION.to_string(), Confidence::Low)
            .warn("No uninstall command is suggested for an unrecognized installer type"),
        InstallerKind::Archive => not_applicable(),
    }
}

/// Paths the installer itself is run from, lowercased
///
/// These are download or staging locations, not where the application
/// ends up, so they never become detection rules.
fn installer_locations(candidates: &[CommandCandidate]) -> HashSet<String> {
    candidates
        .iter()
        .filter(|c| c.is_command() && c.inferred_role == CommandRole::Install)
        .filter_map(|c| c.target.as_ref())
        .map(|target| target.to_lowercase())
        .collect()
}

/// Pick the most useful documented path: a non-uninstaller executable first
fn documented_path<'a>(
    candidates: &'a [CommandCandidate],
    filename: &str,
) -> Option<(&'a CommandCandidate, &'a str)> {
    let installer_paths = installer_locations(candidates);
    let filename = filename.trim();
    let is_installer = |p: &str| {
        installer_paths.contains(&p.to_lowercase())
            || (!filename.is_empty() && file_name_of(p).eq_ignore_ascii_case(filename))
    };

    let paths: Vec<(&CommandCandidate, &str)> = candidates
        .iter()
        .flat_map(|c| c.file_paths.iter().map(move |p| (c, p.as_str())))
        .filter(|(_, p)| !is_installer(p))
        .collect();

    let is_exe = |p: &str| p.to_lowercase().ends_with(".exe");
    let is_uninstaller = |p: &str| {
        let lower = p.to_lowercase();
        lower.contains("unins") || lower.contains("remove")
    };

    paths
        .iter()
        .find(|(_, p)| is_exe(p) && !is_uninstaller(p))
        .or_else(|| paths.iter().find(|(_, p)| is_exe(p)))
        .or_else(|| paths.first())
        .copied()
}

/// Derive the detection rule
pub fn synthesize_detection(
    candidates: &[CommandCandidate],
    filename: &str,
    kind: InstallerKind,
) -> Selection<DetectionRule> {
    match kind {
        InstallerKind::Archive => {
            Selection::new(DetectionRule::ArchiveGuidance, Confidence::NotApplicable)
        }
        InstallerKind::Msi => match uninstall_product_codes(candidates).first() {
            Some((candidate, code)) => Selection::new(
                DetectionRule::MsiProductCode {
                    product_code: Some(code.to_string()),
                },
                Confidence::High,
            )
            .from_page(candidate),
            None => Selection::new(
                DetectionRule::MsiProductCode { product_code: None },
                Confidence::High,
            )
            .note("Intune and ConfigMgr read the ProductCode from the MSI itself when the detection rule is created"),
        },
        InstallerKind::Exe | InstallerKind::Unknown => {
            if let Some((candidate, path)) = documented_path(candidates, filename) {
                return Selection::new(
                    DetectionRule::FilePath {
                        path: path.to_string(),
                        heuristic: false,
                    },
                    Confidence::High,
                )
                .from_page(candidate);
            }

            let guid = uninstall_product_codes(candidates).into_iter().next().or_else(|| {
                candidates
                    .iter()
                    .flat_map(|c| c.product_codes.iter().map(move |code| (c, code.as_str())))
                    .next()
            });
            if let Some((candidate, code)) = guid {
                return Selection::new(
                    DetectionRule::RegistryKey {
                        hive: UNINSTALL_HIVE.to_string(),
                        key_path: format!("{}\\{}", UNINSTALL_KEY_ROOT, code),
                    },
                    Confidence::Medium,
                )
                .from_page(candidate);
            }

            heuristic_detection(filename)
        }
    }
}

/// A file-path rule built from the inferred application name
pub fn heuristic_detection(filename: &str) -> Selection<DetectionRule> {
    let app = infer_app_name(filename);
    let path = format!("%ProgramFiles%\\{app}\\{app}.exe");
    Selection::new(
        DetectionRule::FilePath {
            path: path.clone(),
            heuristic: true,
        },
        Confidence::Medium,
    )
    .warn(format!(
        "Detection rule is heuristic: {} was not found in the documentation. Confirm the install location after a test install",
        path
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::CrawledPage;
    use crate::extractor::extract;

    fn candidates_from(url: &str, html: &str, filename: &str) -> Vec<CommandCandidate> {
        extract(&CrawledPage::from_html(url, html), filename)
    }

    #[test]
    fn test_fallback_is_complete_for_every_kind() {
        for kind in [InstallerKind::Msi, InstallerKind::Exe, InstallerKind::Unknown] {
            let outcome = rank(&[], "tool-setup-1.0.bin", kind);

            assert!(!outcome.best_install.is_empty(), "{kind}");
            assert!(!outcome.best_uninstall.is_empty(), "{kind}");
            assert_eq!(outcome.confidence, Confidence::Low, "{kind}");
            assert!(!outcome.warnings.is_empty(), "{kind}");
            assert!(outcome.source_pages.is_empty());
        }

        let archive = rank(&[], "bundle.zip", InstallerKind::Archive);
        assert_eq!(archive.best_install, NOT_APPLICABLE);
        assert_eq!(archive.best_uninstall, NOT_APPLICABLE);
        assert_eq!(archive.detection_rule, DetectionRule::ArchiveGuidance);
        assert_eq!(archive.confidence, Confidence::NotApplicable);
    }

    #[test]
    fn test_fallback_commands() {
        let exe = rank(&[], "widget-2.0-setup.exe", InstallerKind::Exe);
        assert_eq!(exe.best_install, r#""widget-2.0-setup.exe" /S"#);
        assert!(exe.warnings.iter().any(|w| w.contains("/VERYSILENT")));
        assert_eq!(
            exe.detection_rule,
            DetectionRule::FilePath {
                path: r"%ProgramFiles%\Widget\Widget.exe".to_string(),
                heuristic: true,
            }
        );
        assert!(exe.warnings.iter().any(|w| w.contains("heuristic")));

        let msi = rank(&[], "agent.msi", InstallerKind::Msi);
        assert_eq!(msi.best_install, r#"msiexec /i "agent.msi" /qn /norestart"#);
        assert_eq!(msi.best_uninstall, "msiexec /x {PRODUCT-CODE-GOES-HERE} /qn /norestart");
        assert!(msi.warnings.iter().any(|w| w.contains("ProductCode")));
        assert_eq!(msi.detection_rule, DetectionRule::MsiProductCode { product_code: None });
        assert!(msi.notes.iter().any(|n| n.contains("Intune")));

        let unknown = rank(&[], "payload.bin", InstallerKind::Unknown);
        assert_eq!(unknown.best_install, MANUAL_INVESTIGATION);
        assert_eq!(unknown.best_uninstall, MANUAL_INVESTIGATION);
    }

    #[test]
    fn test_exact_filename_with_silent_switch_is_high() {
        let candidates = candidates_from(
            "https://vendor.example/docs/deploy",
            r#"<pre>"setup-app.exe" /VERYSILENT /NORESTART</pre>"#,
            "setup-app.exe",
        );

        let outcome = rank(&candidates, "setup-app.exe", InstallerKind::Exe);

        assert_eq!(outcome.best_install, r#""setup-app.exe" /VERYSILENT /NORESTART"#);
        assert_eq!(outcome.install_confidence, Confidence::High);
        // No documented path, so detection is heuristic and caps the overall value
        assert!(outcome.detection_rule.is_heuristic());
        assert_eq!(outcome.confidence, Confidence::Medium);
        assert!(!outcome.warnings.iter().any(|w| w.contains("filename not confirmed")));
        assert!(outcome.source_pages.contains("https://vendor.example/docs/deploy"));
    }

    #[test]
    fn test_documented_path_keeps_high_confidence() {
        let candidates = candidates_from(
            "https://vendor.example/docs/deploy",
            r#"<pre>"setup-app.exe" /VERYSILENT /NORESTART</pre>
               <p>Files are installed to C:\Program Files\VendorApp\app.exe</p>"#,
            "setup-app.exe",
        );

        let outcome = rank(&candidates, "setup-app.exe", InstallerKind::Exe);

        assert_eq!(
            outcome.detection_rule,
            DetectionRule::FilePath {
                path: r"C:\Program Files\VendorApp\app.exe".to_string(),
                heuristic: false,
            }
        );
        assert_eq!(outcome.confidence, Confidence::High);
    }

    #[test]
    fn test_unconfirmed_filename_is_medium() {
        let candidates = candidates_from(
            "https://vendor.example/other-tool",
            r#"<pre>"setup-app.exe" /VERYSILENT /NORESTART</pre>"#,
            "other.exe",
        );

        let outcome = rank(&candidates, "other.exe", InstallerKind::Exe);

        assert_eq!(outcome.best_install, r#""other.exe" /VERYSILENT /NORESTART"#);
        assert_eq!(outcome.install_confidence, Confidence::Medium);
        assert_eq!(outcome.confidence, Confidence::Medium);
        assert!(outcome.warnings.iter().any(|w| w.contains("filename not confirmed")));
    }

    #[test]
    fn test_switch_only_candidate_is_applied_to_filename() {
        let candidates = candidates_from(
            "https://vendor.example/kb/silent",
            "<p>The installer supports /S /SILENT for unattended setups.</p>",
            "tool-setup.exe",
        );

        let outcome = rank(&candidates, "tool-setup.exe", InstallerKind::Exe);

        assert_eq!(outcome.best_install, r#""tool-setup.exe" /S /SILENT"#);
        assert_eq!(outcome.install_confidence, Confidence::Medium);
    }

    #[test]
    fn test_command_without_silent_switch() {
        let candidates = candidates_from(
            "https://vendor.example/kb/1",
            "<pre>tool-setup.exe /norestart /log=install.txt</pre>",
            "tool-setup.exe",
        );

        let outcome = rank(&candidates, "tool-setup.exe", InstallerKind::Exe);

        assert_eq!(outcome.best_install, "tool-setup.exe /norestart /log=install.txt");
        assert_eq!(outcome.install_confidence, Confidence::Medium);
        assert!(outcome
            .warnings
            .iter()
            .any(|w| w.contains("silent switches not confirmed")));

        let outcome = rank(&candidates, "other.exe", InstallerKind::Exe);
        assert_eq!(outcome.install_confidence, Confidence::Low);
    }

    #[test]
    fn test_guid_uninstall_is_kept_verbatim_for_msi() {
        let candidates = candidates_from(
            "https://vendor.example/docs/uninstall",
            "<p>To uninstall: <code>msiexec /x {A1B2C3D4-0000-1111-2222-333344445555} /qn</code></p>",
            "agent.msi",
        );

        let outcome = rank(&candidates, "agent.msi", InstallerKind::Msi);

        assert_eq!(
            outcome.best_uninstall,
            "msiexec /x {A1B2C3D4-0000-1111-2222-333344445555} /qn"
        );
        assert_eq!(
            outcome.detection_rule,
            DetectionRule::MsiProductCode {
                product_code: Some("{A1B2C3D4-0000-1111-2222-333344445555}".to_string()),
            }
        );
        assert_eq!(outcome.uninstall_confidence, Confidence::High);
    }

    #[test]
    fn test_guid_without_quiet_switch_is_rewritten() {
        let candidates = candidates_from(
            "https://vendor.example/docs/uninstall",
            "<p>To remove the agent use ProductCode {A1B2C3D4-0000-1111-2222-333344445555}.</p>",
            "agent.msi",
        );

        let outcome = rank(&candidates, "agent.msi", InstallerKind::Msi);

        assert_eq!(
            outcome.best_uninstall,
            "msiexec /x {A1B2C3D4-0000-1111-2222-333344445555} /qn /norestart"
        );
    }

    #[test]
    fn test_exe_guid_becomes_registry_rule() {
        let candidates = candidates_from(
            "https://vendor.example/docs/uninstall",
            "<p>To uninstall, run <code>msiexec /x {0F1E2D3C-4B5A-6978-8796-A5B4C3D2E1F0} /quiet</code></p>",
            "suite-setup.exe",
        );

        let outcome = rank(&candidates, "suite-setup.exe", InstallerKind::Exe);

        assert_eq!(
            outcome.best_uninstall,
            "msiexec /x {0F1E2D3C-4B5A-6978-8796-A5B4C3D2E1F0} /quiet"
        );
        assert_eq!(outcome.uninstall_confidence, Confidence::Medium);
        assert_eq!(
            outcome.detection_rule,
            DetectionRule::RegistryKey {
                hive: "HKLM".to_string(),
                key_path: r"SOFTWARE\Microsoft\Windows\CurrentVersion\Uninstall\{0F1E2D3C-4B5A-6978-8796-A5B4C3D2E1F0}".to_string(),
            }
        );
        assert_eq!(outcome.detection_confidence, Confidence::Medium);
    }

    #[test]
    fn test_msi_command_is_not_borrowed_for_exe() {
        let candidates = candidates_from(
            "https://vendor.example/docs/deploy",
            r#"<pre>msiexec /i "Client.msi" /qn /norestart</pre><pre>client-setup.exe /S</pre>"#,
            "Client-Setup-x64.exe",
        );

        let outcome = rank(&candidates, "Client-Setup-x64.exe", InstallerKind::Exe);

        assert_eq!(outcome.best_install, r#""Client-Setup-x64.exe" /S"#);
        assert_eq!(outcome.install_confidence, Confidence::Medium);
        assert!(!outcome.best_install.contains("msiexec"));
    }

    #[test]
    fn test_msi_only_docs_fall_back_for_exe() {
        let candidates = candidates_from(
            "https://vendor.example/docs/deploy",
            r#"<pre>msiexec /i "Client.msi" /qn /norestart</pre>"#,
            "client-setup.exe",
        );

        let outcome = rank(&candidates, "client-setup.exe", InstallerKind::Exe);

        assert_eq!(outcome.best_install, r#""client-setup.exe" /S"#);
        assert_eq!(outcome.install_confidence, Confidence::Low);
    }

    #[test]
    fn test_substring_of_other_executable_is_not_a_filename_match() {
        let candidates = candidates_from("https://vendor.example/kb/2", "<pre>myapp.exe /S</pre>", "app.exe");

        let outcome = rank(&candidates, "app.exe", InstallerKind::Exe);

        assert_eq!(outcome.best_install, r#""app.exe" /S"#);
        assert_eq!(outcome.install_confidence, Confidence::Medium);
        assert!(outcome.warnings.iter().any(|w| w.contains("filename not confirmed")));
    }

    #[test]
    fn test_installer_behind_quoted_path_is_high() {
        let candidates = candidates_from(
            "https://vendor.example/docs/deploy",
            r#"<pre>"%TEMP%\setup-app.exe" /VERYSILENT /NORESTART</pre>"#,
            "setup-app.exe",
        );

        let outcome = rank(&candidates, "setup-app.exe", InstallerKind::Exe);

        assert_eq!(
            outcome.best_install,
            r#""%TEMP%\setup-app.exe" /VERYSILENT /NORESTART"#
        );
        assert_eq!(outcome.install_confidence, Confidence::High);
        // The staging path of the installer is not where the app lands
        assert!(outcome.detection_rule.is_heuristic());
    }

    #[test]
    fn test_installer_location_is_not_a_detection_rule() {
        let candidates = candidates_from(
            "https://vendor.example/docs/deploy",
            r"<pre>C:\Installers\vendor-setup.exe /S</pre>",
            "vendor-tool.exe",
        );

        let outcome = rank(&candidates, "vendor-tool.exe", InstallerKind::Exe);

        assert!(outcome.detection_rule.is_heuristic());
        assert_eq!(outcome.detection_confidence, Confidence::Medium);

        let candidates = candidates_from(
            "https://vendor.example/docs/deploy",
            r"<p>Download to C:\Temp\vendor-tool.exe first.</p>",
            "vendor-tool.exe",
        );
        let outcome = rank(&candidates, "vendor-tool.exe", InstallerKind::Exe);
        assert!(outcome.detection_rule.is_heuristic());
    }

    #[test]
    fn test_quotes_in_filename_are_dropped() {
        let outcome = rank(&[], r#"evil" & calc.exe"#, InstallerKind::Exe);
        assert_eq!(outcome.best_install, r#""evil & calc.exe" /S"#);
        assert!(!outcome.best_uninstall.contains(r#"Evil""#));

        let msi = rank(&[], r#"a"b.msi"#, InstallerKind::Msi);
        assert_eq!(msi.best_install, r#"msiexec /i "ab.msi" /qn /norestart"#);
    }

    #[test]
    fn test_dedupe_keeps_first_source() {
        let first = candidates_from("https://vendor.example/a", "<pre>app.exe /S</pre>", "app.exe");
        let second = candidates_from("https://vendor.example/b", "<pre>APP.EXE   /s</pre>", "app.exe");
        let all: Vec<_> = first.into_iter().chain(second).collect();

        let unique = dedupe(&all);

        assert_eq!(unique.len(), 1);
        assert_eq!(unique[0].source_page_url, "https://vendor.example/a");
    }
}
