//! Application-name inference from installer filenames

use lazy_static::lazy_static;
use regex::Regex;

const DEFAULT_APP_NAME: &str = "Application";

const ARCH_MARKERS: &[&str] = &["x64", "x86", "win32", "win64", "amd64", "arm64", "64bit", "32bit"];

const INSTALLER_WORDS: &[&str] = &["setup", "install", "installer"];

lazy_static! {
    static ref VERSION_TOKEN: Option<Regex> = Regex::new(r"(?i)^v?\d+(?:\.\d+)*[a-z]?$").ok();
}

/// Guess a human-friendly application name from an installer filename
///
/// Version numbers, architecture markers and the words setup/install(er)
/// are dropped and the remaining words are title-cased, so
/// `vlc-3.0.20-win64-setup.exe` becomes `Vlc`. Falls back to
/// `Application` when nothing is left.
pub fn infer_app_name(filename: &str) -> String {
    let base = filename.trim().rsplit(['/', '\\']).next().unwrap_or_default();
    let stem = base
        .rsplit_once('.')
        .filter(|(stem, ext)| !stem.is_empty() && !ext.chars().all(|c| c.is_ascii_digit()))
        .map(|(stem, _)| stem)
        .unwrap_or(base);

    let words: Vec<String> = stem
        .split(|c: char| matches!(c, '-' | '_' | '.' | '"') || c.is_whitespace())
        .filter(|word| !word.is_empty())
        .filter(|word| !is_noise(word))
        .map(title_case)
        .collect();

    if words.is_empty() {
        DEFAULT_APP_NAME.to_string()
    } else {
        words.join(" ")
    }
}

fn is_noise(word: &str) -> bool {
    let lower = word.to_lowercase();
    if ARCH_MARKERS.contains(&lower.as_str()) || INSTALLER_WORDS.contains(&lower.as_str()) {
        return true;
    }
    VERSION_TOKEN.as_ref().is_some_and(|re| re.is_match(word))
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
