//! # Command and Path Extractor
//!
//! Harvests install/uninstall command lines, Windows paths, ProductCode
//! GUIDs and version strings from crawled documentation pages. Text is read
//! in priority order: `<code>`/`<pre>` blocks, then paragraph and list
//! text, then the whole visible page. Every match of the pattern library
//! becomes one [`CommandCandidate`] tagged with its source page and a role
//! inferred from nearby keywords.
//!
//! Extraction is a pure function of the page: running it twice on the same
//! page gives the same candidates in the same order. A page that cannot be
//! read yields no candidates; it never fails the analysis.

pub mod patterns;

use std::collections::{BTreeSet, HashSet};

use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::crawler::CrawledPage;
use crate::crawler::content_extraction::{collapse_whitespace, visible_text_of};
use crate::recommendation::InstallerKind;
use patterns::{CompiledPattern, GUID_RE, PatternFamily, ROLE_RE, VERSION_RE, patterns_for};

/// Characters of preceding text inspected when inferring a role
const ROLE_CONTEXT_CHARS: usize = 80;

/// Maximum number of version strings kept per page
const MAX_VERSIONS: usize = 10;

const CODE_SELECTOR: &str = "pre, code";
const PROSE_SELECTOR: &str = "p, li, td, dd, dt, blockquote, h1, h2, h3, h4, h5, h6";
const HEADING_SELECTOR: &str = "h1, h2, h3, h4, h5, h6";
const VERSION_LABEL_SELECTOR: &str = r#"[class*="version"], [id*="version"]"#;

/// Error type for extraction; never escapes [`extract`]
#[derive(Debug, Error)]
pub enum ExtractError {
    /// A selector could not be parsed
    #[error("HTML parsing error: {0}")]
    HtmlParse(String),
}

/// What a command appears to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandRole {
    Install,
    Uninstall,
    Other,
}

/// One pattern match on one page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandCandidate {
    /// The matched text, trimmed
    pub raw_text: String,

    /// Installer kind implied by the match
    pub installer_kind: InstallerKind,

    /// Role inferred from the match and the text before it
    pub inferred_role: CommandRole,

    /// Argument tokens in order (for msiexec, everything but the package)
    pub switches: Vec<String>,

    /// Windows paths mentioned in the match
    pub file_paths: BTreeSet<String>,

    /// GUIDs mentioned in the match
    pub product_codes: BTreeSet<String>,

    /// Executable or package the command runs, unquoted
    pub target: Option<String>,

    /// Family of the pattern that produced the match
    pub family: PatternFamily,

    /// Name of the pattern that produced the match
    pub pattern: String,

    /// Page the match was found on
    pub source_page_url: String,
}

impl CommandCandidate {
    /// Whether the candidate is a command line (as opposed to a path or GUID)
    pub fn is_command(&self) -> bool {
        self.family.is_command()
    }

    /// Whether any argument is a recognized silent switch
    pub fn has_silent_switch(&self) -> bool {
        self.switches.iter().any(|s| patterns::is_silent_switch(s))
    }

    /// Lowercased, whitespace-collapsed text used for deduplication
    pub fn normalized_text(&self) -> String {
        normalize(&self.raw_text)
    }
}

/// Lowercase, trim and collapse whitespace
pub fn normalize(text: &str) -> String {
    collapse_whitespace(text).to_lowercase()
}

/// Extract command candidates from `page`
///
/// # Arguments
///
/// * `page` - The crawled page
/// * `installer_filename_hint` - Filename of the installer being analyzed,
///   used to recognize it even when it does not look like `name.exe`
///
/// # Returns
///
/// Candidates in priority order, deduplicated within the page
#[instrument(skip(page), fields(url = %page.url))]
pub fn extract(page: &CrawledPage, installer_filename_hint: &str) -> Vec<CommandCandidate> {
    match try_extract(page, installer_filename_hint) {
        Ok(candidates) => {
            debug!("Extracted {} candidates", candidates.len());
            candidates
        }
        Err(e) => {
            warn!("Skipping unreadable page {}: {}", page.url, e);
            Vec::new()
        }
    }
}

fn try_extract(
    page: &CrawledPage,
    installer_filename_hint: &str,
) -> Result<Vec<CommandCandidate>, ExtractError> {
    let blocks = text_blocks(page)?;
    let patterns = patterns_for(installer_filename_hint);

    let mut seen = HashSet::new();
    let mut candidates = Vec::new();
    for block in &blocks {
        for candidate in scan_block(block, &patterns, &page.url) {
            if seen.insert(candidate.normalized_text()) {
                candidates.push(candidate);
            }
        }
    }
    Ok(candidates)
}

fn selector(css: &str) -> Result<Selector, ExtractError> {
    Selector::parse(css).map_err(|e| ExtractError::HtmlParse(format!("selector '{}': {}", css, e)))
}

/// Blocks of text in priority order
fn text_blocks(page: &CrawledPage) -> Result<Vec<String>, ExtractError> {
    let mut blocks = Vec::new();

    if !page.raw_html.trim().is_empty() {
        let document = Html::parse_document(&page.raw_html);

        // Code keeps its line structure; switches never span lines
        for element in document.select(&selector(CODE_SELECTOR)?) {
            let text = element.text().collect::<String>();
            blocks.extend(
                text.lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(str::to_string),
            );
        }
        for element in document.select(&selector(PROSE_SELECTOR)?) {
            let text = visible_text_of(element);
            if !text.is_empty() {
                blocks.push(text);
            }
        }
    }

    if !page.extracted_text.trim().is_empty() {
        blocks.push(page.extracted_text.clone());
    }
    Ok(blocks)
}

fn scan_block(block: &str, patterns: &[CompiledPattern], page_url: &str) -> Vec<CommandCandidate> {
    let mut claimed: Vec<(usize, usize)> = Vec::new();
    let mut found = Vec::new();

    for pattern in patterns {
        for (start, end, text) in pattern.find_all(block) {
            if claimed.iter().any(|&(s, e)| start < e && s < end) {
                continue;
            }
            let Some(candidate) = build_candidate(block, start, text, pattern, page_url) else {
                continue;
            };
            claimed.push((start, end));
            found.push((start, candidate));
        }
    }

    found.sort_by_key(|(start, _)| *start);
    found.into_iter().map(|(_, candidate)| candidate).collect()
}

fn build_candidate(
    block: &str,
    start: usize,
    text: &str,
    pattern: &CompiledPattern,
    page_url: &str,
) -> Option<CommandCandidate> {
    let family = pattern.family;
    let raw_text = match family {
        PatternFamily::WindowsPath => trim_path(text),
        _ => text.trim().to_string(),
    };
    if raw_text.is_empty() || (family == PatternFamily::WindowsPath && raw_text.len() < 4) {
        return None;
    }

    let tokens = tokenize(&raw_text);
    let (target, switches) = split_command(family, &tokens);

    let installer_kind = match family {
        PatternFamily::MsiInstall | PatternFamily::MsiUninstall => InstallerKind::Msi,
        PatternFamily::ExeCommand | PatternFamily::ExeUninstall => InstallerKind::Exe,
        _ => InstallerKind::Unknown,
    };

    let mut file_paths = BTreeSet::new();
    if family == PatternFamily::WindowsPath {
        file_paths.insert(raw_text.clone());
    } else if let Some(path_pattern) = patterns::COMPILED_LIBRARY
        .iter()
        .find(|p| p.family == PatternFamily::WindowsPath)
    {
        for (_, _, path) in path_pattern.find_all(&raw_text) {
            let path = trim_path(path);
            if path.len() >= 4 {
                file_paths.insert(path);
            }
        }
    }

    let product_codes = GUID_RE
        .as_ref()
        .map(|re| {
            re.find_iter(&raw_text)
                .map(|m| m.as_str().to_uppercase())
                .collect()
        })
        .unwrap_or_default();

    let context_start = floor_char_boundary(block, start.saturating_sub(ROLE_CONTEXT_CHARS));
    let context = &block[context_start..start];

    Some(CommandCandidate {
        inferred_role: infer_role(family, &raw_text, context),
        raw_text,
        installer_kind,
        switches,
        file_paths,
        product_codes,
        target,
        family,
        pattern: pattern.name.clone(),
        source_page_url: page_url.to_string(),
    })
}

fn floor_char_boundary(text: &str, mut index: usize) -> usize {
    while index > 0 && !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

fn trim_path(path: &str) -> String {
    path.trim()
        .trim_matches('"')
        .trim_end_matches(['.', ',', ';', ':', ')'])
        .to_string()
}

/// Split a command line into tokens, keeping quoted sections together
pub fn tokenize(command: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in command.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

fn split_command(family: PatternFamily, tokens: &[String]) -> (Option<String>, Vec<String>) {
    let unquote = |token: &String| token.trim_matches('"').to_string();

    match family {
        PatternFamily::MsiInstall | PatternFamily::MsiUninstall => {
            let mut target = None;
            let mut switches = Vec::new();
            let mut iter = tokens.iter().skip(1);
            while let Some(token) = iter.next() {
                let lower = token.to_lowercase();
                let is_action = matches!(
                    lower.as_str(),
                    "/i" | "-i" | "/package" | "-package" | "/x" | "-x" | "/uninstall" | "-uninstall"
                );
                switches.push(token.clone());
                if is_action && target.is_none() {
                    target = iter.next().map(unquote);
                }
            }
            (target, switches)
        }
        PatternFamily::ExeCommand | PatternFamily::ExeUninstall => {
            let target = tokens.first().map(unquote);
            (target, tokens.iter().skip(1).cloned().collect())
        }
        PatternFamily::SwitchOnly => (None, tokens.to_vec()),
        PatternFamily::ProductCode | PatternFamily::WindowsPath => (None, Vec::new()),
    }
}

/// Infer the role of a match from its own text, then from the words before it
fn infer_role(family: PatternFamily, raw_text: &str, context: &str) -> CommandRole {
    match family {
        PatternFamily::MsiUninstall | PatternFamily::ExeUninstall => return CommandRole::Uninstall,
        PatternFamily::MsiInstall => return CommandRole::Install,
        _ => {}
    }

    let Some(role_re) = ROLE_RE.as_ref() else {
        return CommandRole::Other;
    };
    let role_of = |text: &str| {
        role_re.captures_iter(text).last().map(|caps| {
            if caps.get(1).is_some() {
                CommandRole::Uninstall
            } else {
                CommandRole::Install
            }
        })
    };

    let lower = raw_text.to_lowercase();
    if lower.contains("/x ") || lower.contains("/uninstall") {
        return CommandRole::Uninstall;
    }
    role_of(raw_text)
        .or_else(|| role_of(context))
        .unwrap_or(CommandRole::Other)
}

/// Version strings mentioned on `page`
///
/// Headings are read first, then elements whose class or id mentions
/// "version", then the whole visible text. The first ten distinct matches
/// are kept.
pub fn extract_versions(page: &CrawledPage) -> Vec<String> {
    let Some(version_re) = VERSION_RE.as_ref() else {
        return Vec::new();
    };

    let mut sources = Vec::new();
    if !page.raw_html.trim().is_empty() {
        let document = Html::parse_document(&page.raw_html);
        for css in [HEADING_SELECTOR, VERSION_LABEL_SELECTOR] {
            let Ok(sel) = selector(css) else {
                continue;
            };
            sources.extend(document.select(&sel).map(visible_text_of));
        }
    }
    sources.push(page.extracted_text.clone());

    let mut versions = Vec::new();
    for source in &sources {
        for m in version_re.find_iter(source) {
            let version = m.as_str().to_string();
            if !versions.contains(&version) {
                versions.push(version);
                if versions.len() == MAX_VERSIONS {
                    return versions;
                }
            }
        }
    }
    versions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(html: &str) -> CrawledPage {
        CrawledPage::from_html("https://vendor.example/docs/deploy", html)
    }

    #[test]
    fn test_extracts_exe_command_from_code_block() {
        let page = page(
            r#"<html><body>
                <h2>Silent installation</h2>
                <p>To install silently, run:</p>
                <pre><code>"setup-app.exe" /VERYSILENT /NORESTART</code></pre>
            </body></html>"#,
        );

        let candidates = extract(&page, "setup-app.exe");
        let first = &candidates[0];

        assert_eq!(first.raw_text, r#""setup-app.exe" /VERYSILENT /NORESTART"#);
        assert_eq!(first.target.as_deref(), Some("setup-app.exe"));
        assert_eq!(first.switches, vec!["/VERYSILENT", "/NORESTART"]);
        assert_eq!(first.installer_kind, InstallerKind::Exe);
        assert_eq!(first.inferred_role, CommandRole::Install);
        assert_eq!(first.source_page_url, "https://vendor.example/docs/deploy");
        assert!(first.has_silent_switch());
    }

    #[test]
    fn test_installer_behind_quoted_path_keeps_its_switches() {
        let page = page(r#"<pre>"%TEMP%\setup-app.exe" /VERYSILENT /NORESTART</pre>"#);

        let candidates = extract(&page, "setup-app.exe");
        let first = &candidates[0];

        assert_eq!(first.raw_text, r#""%TEMP%\setup-app.exe" /VERYSILENT /NORESTART"#);
        assert_eq!(first.pattern, "installer-filename");
        assert_eq!(first.target.as_deref(), Some(r"%TEMP%\setup-app.exe"));
        assert_eq!(first.switches, vec!["/VERYSILENT", "/NORESTART"]);
        assert!(first.has_silent_switch());
    }

    #[test]
    fn test_longer_executable_name_is_not_the_installer() {
        let page = page("<pre>myapp.exe /S</pre>");

        let candidates = extract(&page, "app.exe");

        assert_eq!(candidates[0].raw_text, "myapp.exe /S");
        assert_eq!(candidates[0].pattern, "exe-command");
        assert_eq!(candidates[0].target.as_deref(), Some("myapp.exe"));
    }

    #[test]
    fn test_extracts_msi_uninstall_with_guid() {
        let page = page(
            "<p>Remove it with <code>msiexec /x {A1B2C3D4-0000-1111-2222-333344445555} /qn</code></p>",
        );

        let candidates = extract(&page, "app.msi");
        let uninstall = candidates
            .iter()
            .find(|c| c.inferred_role == CommandRole::Uninstall)
            .unwrap();

        assert_eq!(
            uninstall.raw_text,
            "msiexec /x {A1B2C3D4-0000-1111-2222-333344445555} /qn"
        );
        assert_eq!(uninstall.installer_kind, InstallerKind::Msi);
        assert!(uninstall
            .product_codes
            .contains("{A1B2C3D4-0000-1111-2222-333344445555}"));
        assert_eq!(
            uninstall.target.as_deref(),
            Some("{A1B2C3D4-0000-1111-2222-333344445555}")
        );
        // The GUID inside the command is not reported a second time
        assert!(!candidates.iter().any(|c| c.family == PatternFamily::ProductCode));
    }

    #[test]
    fn test_extracts_msi_install() {
        let page = page(r#"<pre>msiexec /i "Client.msi" /qn /norestart</pre>"#);

        let candidates = extract(&page, "Client.msi");
        let install = &candidates[0];

        assert_eq!(install.family, PatternFamily::MsiInstall);
        assert_eq!(install.target.as_deref(), Some("Client.msi"));
        assert_eq!(install.switches, vec!["/i", "/qn", "/norestart"]);
        assert_eq!(install.inferred_role, CommandRole::Install);
    }

    #[test]
    fn test_extracts_switch_only_and_paths() {
        let page = page(
            r#"<ul>
                <li>Silent switches: /S /SILENT</li>
                <li>The program is installed to C:\Program Files\Vendor\Tool\tool.exe.</li>
            </ul>"#,
        );

        let candidates = extract(&page, "tool-setup.exe");

        let switches = candidates
            .iter()
            .find(|c| c.family == PatternFamily::SwitchOnly)
            .unwrap();
        assert_eq!(switches.raw_text, "/S /SILENT");
        assert!(switches.has_silent_switch());

        let path = candidates
            .iter()
            .find(|c| c.family == PatternFamily::WindowsPath)
            .unwrap();
        assert!(path.file_paths.contains(r"C:\Program Files\Vendor\Tool\tool.exe"));
    }

    #[test]
    fn test_role_inference_from_context() {
        let page = page(
            "<p>To uninstall the product, run: cleanup.exe /S</p><p>For setup, use tool.exe /quiet</p>",
        );

        let candidates = extract(&page, "tool.exe");
        let cleanup = candidates.iter().find(|c| c.raw_text == "cleanup.exe /S").unwrap();
        let tool = candidates.iter().find(|c| c.raw_text == "tool.exe /quiet").unwrap();

        assert_eq!(cleanup.inferred_role, CommandRole::Uninstall);
        assert_eq!(tool.inferred_role, CommandRole::Install);
    }

    #[test]
    fn test_exe_uninstaller_is_uninstall_role() {
        let page = page(r#"<code>"%ProgramFiles%\Vendor\uninstall.exe" /S</code>"#);

        let candidates = extract(&page, "vendor-setup.exe");
        assert_eq!(candidates[0].family, PatternFamily::ExeUninstall);
        assert_eq!(candidates[0].inferred_role, CommandRole::Uninstall);
        assert!(candidates[0].file_paths.contains(r"%ProgramFiles%\Vendor\uninstall.exe"));
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let page = page(
            r#"<h1>App 4.2.1</h1><pre>app-setup.exe /S
msiexec /x {A1B2C3D4-0000-1111-2222-333344445555} /qn</pre><p>Installs into C:\Apps\App\app.exe</p>"#,
        );

        assert_eq!(extract(&page, "app-setup.exe"), extract(&page, "app-setup.exe"));
    }

    #[test]
    fn test_duplicates_within_page_are_dropped() {
        let page = page("<pre>setup.exe /S</pre><p>Run setup.exe /S</p>");

        let candidates = extract(&page, "setup.exe");
        let count = candidates
            .iter()
            .filter(|c| c.normalized_text() == "setup.exe /s")
            .count();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_empty_and_malformed_pages_yield_nothing_or_partial() {
        assert!(extract(&CrawledPage::from_html("https://vendor.example/", ""), "a.exe").is_empty());

        let broken = page("<div><p>Use <b>setup.exe /S</div></p></b>");
        let candidates = extract(&broken, "setup.exe");
        assert!(candidates.iter().any(|c| c.raw_text == "setup.exe /S"));
    }

    #[test]
    fn test_extract_versions() {
        let page = page(
            r#"<h1>Release 3.2.1</h1>
               <span class="product-version">v3.2.0</span>
               <p>Older builds: 2.9, 3.2.1, 1.0.0.15</p>"#,
        );

        assert_eq!(extract_versions(&page), vec!["3.2.1", "v3.2.0", "2.9", "1.0.0.15"]);
    }

    #[test]
    fn test_extract_versions_keeps_first_ten() {
        let body: String = (1..=15).map(|i| format!("<p>1.{i}</p>")).collect();
        let versions = extract_versions(&page(&body));
        assert_eq!(versions.len(), 10);
        assert_eq!(versions[0], "1.1");
    }

    #[test]
    fn test_tokenize_keeps_quotes_together() {
        assert_eq!(
            tokenize(r#""C:\Program Files\App\setup.exe" /S /D="C:\My App""#),
            vec![r#""C:\Program Files\App\setup.exe""#, "/S", r#"/D="C:\My App""#]
        );
    }
}
