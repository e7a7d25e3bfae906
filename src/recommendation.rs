//! # Packaging Data Model
//!
//! Types shared by the extractor, the ranker and the result builder: the
//! installer classification, the closed confidence scale, detection rules
//! and the final per-installer recommendation.
//!
//! Confidence is produced only by the ranker and the builder. Callers get a
//! single enum and never have to interpret strings.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Sentinel command for installers that cannot be deployed directly (archives)
pub const NOT_APPLICABLE: &str = "N/A";

/// Sentinel command when no command can responsibly be suggested
pub const MANUAL_INVESTIGATION: &str = "MANUAL INVESTIGATION REQUIRED";

/// Placeholder ProductCode used when an MSI uninstall GUID is unknown
pub const PRODUCT_CODE_PLACEHOLDER: &str = "{PRODUCT-CODE-GOES-HERE}";

/// Installer classification derived from the filename extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InstallerKind {
    /// Windows Installer package
    #[serde(rename = "MSI")]
    Msi,
    /// Executable installer (NSIS, Inno Setup, InstallShield, ...)
    #[serde(rename = "EXE")]
    Exe,
    /// Compressed archive that must be extracted first
    #[serde(rename = "ARCHIVE")]
    Archive,
    /// Anything else
    #[serde(rename = "UNKNOWN")]
    Unknown,
}

impl fmt::Display for InstallerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            InstallerKind::Msi => "MSI",
            InstallerKind::Exe => "EXE",
            InstallerKind::Archive => "ARCHIVE",
            InstallerKind::Unknown => "UNKNOWN",
        };
        f.write_str(label)
    }
}

/// Qualitative trust level attached to a derived command or rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Confidence {
    #[serde(rename = "HIGH")]
    High,
    #[serde(rename = "MEDIUM")]
    Medium,
    #[serde(rename = "LOW")]
    Low,
    #[serde(rename = "NotApplicable")]
    NotApplicable,
}

impl Confidence {
    fn rank(self) -> Option<u8> {
        match self {
            Confidence::High => Some(3),
            Confidence::Medium => Some(2),
            Confidence::Low => Some(1),
            Confidence::NotApplicable => None,
        }
    }

    /// The weaker of two confidence levels.
    ///
    /// `NotApplicable` absorbs everything: a recommendation with any
    /// not-applicable part is not applicable as a whole.
    pub fn min(self, other: Confidence) -> Confidence {
        match (self.rank(), other.rank()) {
            (Some(a), Some(b)) => {
                if a <= b {
                    self
                } else {
                    other
                }
            }
            _ => Confidence::NotApplicable,
        }
    }

    /// Whether this level is at least `other` (never true for `NotApplicable`)
    pub fn at_least(self, other: Confidence) -> bool {
        match (self.rank(), other.rank()) {
            (Some(a), Some(b)) => a >= b,
            _ => false,
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Confidence::High => "HIGH",
            Confidence::Medium => "MEDIUM",
            Confidence::Low => "LOW",
            Confidence::NotApplicable => "NotApplicable",
        };
        f.write_str(label)
    }
}

/// Condition a deployment tool evaluates after install to confirm success
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DetectionRule {
    /// Windows Installer ProductCode; `None` when the deployment tool should
    /// read it from the MSI itself
    #[serde(rename_all = "camelCase")]
    MsiProductCode { product_code: Option<String> },

    /// File existence check. `heuristic` marks a path built without
    /// documentary evidence.
    #[serde(rename_all = "camelCase")]
    FilePath { path: String, heuristic: bool },

    /// Registry key existence check
    #[serde(rename_all = "camelCase")]
    RegistryKey { hive: String, key_path: String },

    /// Archives are extracted and re-classified instead of detected
    ArchiveGuidance,
}

impl DetectionRule {
    /// Whether the rule was synthesized without documentary evidence
    pub fn is_heuristic(&self) -> bool {
        matches!(self, DetectionRule::FilePath { heuristic: true, .. })
    }
}

impl fmt::Display for DetectionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectionRule::MsiProductCode {
                product_code: Some(code),
            } => write!(f, "MSI ProductCode {code}"),
            DetectionRule::MsiProductCode { product_code: None } => {
                f.write_str("MSI ProductCode (read from the MSI by the deployment tool)")
            }
            DetectionRule::FilePath { path, heuristic } => {
                if *heuristic {
                    write!(f, "File exists: {path} (heuristic)")
                } else {
                    write!(f, "File exists: {path}")
                }
            }
            DetectionRule::RegistryKey { hive, key_path } => {
                write!(f, "Registry key exists: {hive}\\{key_path}")
            }
            DetectionRule::ArchiveGuidance => f.write_str("Extract the archive and re-classify"),
        }
    }
}

/// Per-part confidence behind the overall value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfidenceBreakdown {
    pub install: Confidence,
    pub uninstall: Confidence,
    pub detection: Confidence,
}

/// Final silent-install recommendation for one installer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackagingRecommendation {
    pub filename: String,
    pub installer_url: String,
    pub installer_kind: InstallerKind,
    pub silent_install_command: String,
    pub uninstall_command: String,
    pub detection_rule: DetectionRule,
    pub confidence: Confidence,
    pub confidence_breakdown: ConfidenceBreakdown,
    pub warnings: Vec<String>,
    pub source_pages: BTreeSet<String>,
    pub notes: Vec<String>,
    pub detected_versions: Vec<String>,
    /// Version of the pattern library the candidates were extracted with
    pub pattern_library_version: u32,
    pub generated_at: chrono::DateTime<chrono::Utc>,
}

impl PackagingRecommendation {
    /// Whether the recommendation rests on a guessed detection rule or
    /// placeholder ProductCode
    pub fn needs_review(&self) -> bool {
        self.detection_rule.is_heuristic()
            || self.uninstall_command.contains(PRODUCT_CODE_PLACEHOLDER)
            || self.silent_install_command == MANUAL_INVESTIGATION
    }

    /// Whether the installer can be deployed as is
    pub fn is_deployable(&self) -> bool {
        self.silent_install_command != NOT_APPLICABLE
            && self.silent_install_command != MANUAL_INVESTIGATION
            && !matches!(self.detection_rule, DetectionRule::ArchiveGuidance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_min() {
        assert_eq!(Confidence::High.min(Confidence::Medium), Confidence::Medium);
        assert_eq!(Confidence::Low.min(Confidence::High), Confidence::Low);
        assert_eq!(Confidence::High.min(Confidence::High), Confidence::High);
        assert_eq!(
            Confidence::High.min(Confidence::NotApplicable),
            Confidence::NotApplicable
        );
    }

    #[test]
    fn test_confidence_at_least() {
        assert!(Confidence::High.at_least(Confidence::Medium));
        assert!(Confidence::Medium.at_least(Confidence::Medium));
        assert!(!Confidence::Low.at_least(Confidence::Medium));
        assert!(!Confidence::NotApplicable.at_least(Confidence::Low));
    }

    #[test]
    fn test_detection_rule_serialization() {
        let rule = DetectionRule::MsiProductCode {
            product_code: Some("{A1B2C3D4-0000-1111-2222-333344445555}".to_string()),
        };
        let json = serde_json::to_value(&rule).unwrap();
        assert_eq!(json["kind"], "msiProductCode");
        assert_eq!(json["productCode"], "{A1B2C3D4-0000-1111-2222-333344445555}");

        let rule = DetectionRule::FilePath {
            path: "%ProgramFiles%\\App\\App.exe".to_string(),
            heuristic: true,
        };
        let json = serde_json::to_value(&rule).unwrap();
        assert_eq!(json["kind"], "filePath");
        assert_eq!(json["heuristic"], true);
        assert!(rule.is_heuristic());

        let json = serde_json::to_value(DetectionRule::ArchiveGuidance).unwrap();
        assert_eq!(json["kind"], "archiveGuidance");
    }

    #[test]
    fn test_enum_labels() {
        assert_eq!(serde_json::to_value(Confidence::NotApplicable).unwrap(), "NotApplicable");
        assert_eq!(serde_json::to_value(Confidence::High).unwrap(), "HIGH");
        assert_eq!(serde_json::to_value(InstallerKind::Archive).unwrap(), "ARCHIVE");
        assert_eq!(InstallerKind::Msi.to_string(), "MSI");
    }
}
