//! # Pattern Library
//!
//! The named regular expressions the extractor runs over documentation
//! text. Each entry carries an example fixture and the text it must
//! capture, so the library can be extended for new vendor formats and
//! checked without touching the extractor or the ranker.
//!
//! Patterns are applied in library order. Within one block of text a match
//! overlapping an earlier accepted match is dropped, so the more specific
//! command patterns come first.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Bumped whenever a pattern is added, removed or changed
pub const PATTERN_LIBRARY_VERSION: u32 = 2;

/// Silent switches the ranker accepts as proof of an unattended install
pub const SILENT_SWITCHES: &[&str] = &[
    "/s",
    "/silent",
    "/verysilent",
    "/quiet",
    "/qn",
    "/passive",
    "--silent",
];

/// What a pattern recognizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PatternFamily {
    /// `msiexec /i <package> ...`
    MsiInstall,
    /// `msiexec /x <ProductCode|package> ...`
    MsiUninstall,
    /// An uninstaller executable with switches
    ExeUninstall,
    /// Any executable with switches
    ExeCommand,
    /// Silent switches documented without an executable
    SwitchOnly,
    /// A `{8-4-4-4-12}` GUID
    ProductCode,
    /// `X:\...` or `%EnvVar%\...`
    WindowsPath,
}

impl PatternFamily {
    /// Whether matches of this family are command lines
    pub fn is_command(self) -> bool {
        matches!(
            self,
            PatternFamily::MsiInstall
                | PatternFamily::MsiUninstall
                | PatternFamily::ExeUninstall
                | PatternFamily::ExeCommand
                | PatternFamily::SwitchOnly
        )
    }
}

/// A named pattern with its example fixture
#[derive(Debug)]
pub struct PatternDef {
    pub name: &'static str,
    pub family: PatternFamily,
    pub source: &'static str,
    /// Text the pattern is expected to find in...
    pub example: &'static str,
    /// ...and exactly what it should capture there
    pub expected: &'static str,
}

/// The static pattern library, in application order
pub static PATTERN_LIBRARY: &[PatternDef] = &[
    PatternDef {
        name: "msi-uninstall",
        family: PatternFamily::MsiUninstall,
        source: r#"(?i)\bmsiexec(?:\.exe)?[ \t]+[/-](?:x|uninstall)[ \t]*(?:"[^"\r\n]+"|\{[0-9a-f-]{36}\}|[^\s"<>]+)(?:[ \t]+(?:[/-][a-z0-9_+!-]+|[a-z_][a-z0-9_]*=(?:"[^"\r\n]*"|[^\s"<>]+)))*"#,
        example: "To remove it, run msiexec /x {A1B2C3D4-0000-1111-2222-333344445555} /qn as admin.",
        expected: "msiexec /x {A1B2C3D4-0000-1111-2222-333344445555} /qn",
    },
    PatternDef {
        name: "msi-install",
        family: PatternFamily::MsiInstall,
        source: r#"(?i)\bmsiexec(?:\.exe)?(?:[ \t]+(?:[/-][a-z0-9_+!-]+|[a-z_][a-z0-9_]*=(?:"[^"\r\n]*"|[^\s"<>]+)))*?[ \t]+[/-](?:i|package)[ \t]+(?:"[^"\r\n]+"|[^\s"<>]+)(?:[ \t]+(?:[/-][a-z0-9_+!-]+|[a-z_][a-z0-9_]*=(?:"[^"\r\n]*"|[^\s"<>]+)))*"#,
        example: r#"Deploy with: msiexec /i "AppClient-x64.msi" ALLUSERS=1 /qn /norestart and reboot later"#,
        expected: r#"msiexec /i "AppClient-x64.msi" ALLUSERS=1 /qn /norestart"#,
    },
    PatternDef {
        name: "exe-uninstall",
        family: PatternFamily::ExeUninstall,
        source: r#"(?i)(?:"[^"\r\n]*(?:unins|remove)[^"\r\n]*\.exe"|[a-z0-9_.()%\\:-]*(?:unins|remove)[a-z0-9_.()-]*\.exe)(?:[ \t]+(?:/|--?)[a-z0-9_=:.%"\\+!-]+)+"#,
        example: r#"Uninstall: "C:\Program Files\App\unins000.exe" /VERYSILENT /SUPPRESSMSGBOXES"#,
        expected: r#""C:\Program Files\App\unins000.exe" /VERYSILENT /SUPPRESSMSGBOXES"#,
    },
    PatternDef {
        name: "exe-command",
        family: PatternFamily::ExeCommand,
        source: r#"(?i)(?:"[^"\r\n]*\.exe"|[a-z0-9_.()%\\:-]+\.exe)(?:[ \t]+(?:/|--?)[a-z0-9_=:.%"\\+!-]+)+"#,
        example: r#"Run "setup-app.exe" /VERYSILENT /NORESTART from an elevated prompt"#,
        expected: r#""setup-app.exe" /VERYSILENT /NORESTART"#,
    },
    PatternDef {
        name: "switch-only",
        family: PatternFamily::SwitchOnly,
        source: r#"(?im)(?:^|[\s(\[>:,;"'`])((?:/VERYSILENT|/SILENT|/S|/quiet|/qn|/passive|--silent)\b(?:[ \t]+(?:/|--)[a-z0-9_=:.%"\\+!-]+)*)"#,
        example: "The installer accepts /S /SILENT for unattended setups.",
        expected: "/S /SILENT",
    },
    PatternDef {
        name: "product-code",
        family: PatternFamily::ProductCode,
        source: r"(?i)\{[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}\}",
        example: "ProductCode: {0F1E2D3C-4B5A-6978-8796-A5B4C3D2E1F0}",
        expected: "{0F1E2D3C-4B5A-6978-8796-A5B4C3D2E1F0}",
    },
    PatternDef {
        name: "windows-path",
        family: PatternFamily::WindowsPath,
        source: r#"(?i)"((?:[a-z]:|%[a-z0-9_()]+%)\\[^"\r\n]*)"|((?:[a-z]:|%[a-z0-9_()]+%)\\(?:Program Files(?: \(x86\))?\\)?(?:[^\\/:*?"<>|\s]+\\)*[^\\/:*?"<>|\s]*)"#,
        example: r"The application is installed to C:\Program Files\Vendor\App\app.exe by default.",
        expected: r"C:\Program Files\Vendor\App\app.exe",
    },
];

/// A pattern ready to run
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    pub name: String,
    pub family: PatternFamily,
    pub regex: Regex,
}

impl CompiledPattern {
    fn from_def(def: &PatternDef) -> Option<Self> {
        match Regex::new(def.source) {
            Ok(regex) => Some(Self {
                name: def.name.to_string(),
                family: def.family,
                regex,
            }),
            Err(e) => {
                warn!("Pattern '{}' failed to compile: {}", def.name, e);
                None
            }
        }
    }

    /// A pattern for one specific installer filename followed by switches
    ///
    /// The filename must start a token, optionally behind a directory path,
    /// and a quoted form must close its quote right after the filename.
    pub fn for_installer(filename: &str) -> Option<Self> {
        let filename = filename.trim();
        if filename.is_empty() {
            return None;
        }
        let name = regex::escape(filename);
        let source = format!(
            r#"(?i)(?:^|[\s'(=>/])((?:"(?:[^"\r\n]*\\)?{name}"|(?:[a-z0-9_.%:()\\-]*\\)?{name})(?:[ \t]+(?:/|--?)[a-z0-9_=:.%"\\+!-]+)+)"#
        );
        match Regex::new(&source) {
            Ok(regex) => Some(Self {
                name: "installer-filename".to_string(),
                family: PatternFamily::ExeCommand,
                regex,
            }),
            Err(e) => {
                warn!("Installer filename pattern for '{}' failed to compile: {}", filename, e);
                None
            }
        }
    }

    /// Spans and captured text of every match in `text`
    ///
    /// The captured text is the first participating capture group, or the
    /// whole match for patterns without groups.
    pub fn find_all<'t>(&self, text: &'t str) -> Vec<(usize, usize, &'t str)> {
        self.regex
            .captures_iter(text)
            .filter_map(|caps| {
                let m = caps.iter().skip(1).flatten().next().or_else(|| caps.get(0))?;
                Some((m.start(), m.end(), m.as_str()))
            })
            .collect()
    }
}

/// The library with an installer-specific pattern slotted in before the
/// generic executable pattern
pub fn patterns_for(installer_filename_hint: &str) -> Vec<CompiledPattern> {
    let mut patterns: Vec<CompiledPattern> = COMPILED_LIBRARY.to_vec();
    if let Some(installer) = CompiledPattern::for_installer(installer_filename_hint) {
        let position = patterns
            .iter()
            .position(|p| p.family == PatternFamily::ExeCommand)
            .unwrap_or(patterns.len());
        patterns.insert(position, installer);
    }
    patterns
}

lazy_static! {
    /// The compiled static library
    pub static ref COMPILED_LIBRARY: Vec<CompiledPattern> = PATTERN_LIBRARY
        .iter()
        .filter_map(CompiledPattern::from_def)
        .collect();

    pub(crate) static ref GUID_RE: Option<Regex> =
        Regex::new(r"(?i)\{[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}\}").ok();

    pub(crate) static ref VERSION_RE: Option<Regex> =
        Regex::new(r"(?i)\bv?\d+\.\d+(?:\.\d+){0,2}\b").ok();

    pub(crate) static ref ROLE_RE: Option<Regex> =
        Regex::new(r"(?i)\b(?:(uninstall\w*|remov\w*)|(install\w*|setup|deploy\w*))\b").ok();
}

/// Whether `token` is one of the recognized silent switches
pub fn is_silent_switch(token: &str) -> bool {
    let token = token.trim_matches(|c| c == '"' || c == '\'');
    SILENT_SWITCHES
        .iter()
        .any(|switch| switch.eq_ignore_ascii_case(token))
}
