//! Utility functions for ddl-registry
//!
//! This module provides common file and text helpers used throughout the project.

use crate::error::{RegistryError, Result};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

static WEBSITE_CONTENT_WRAPPER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<WebsiteContent_[^>]*>(.*?)</WebsiteContent_[^>]*>").unwrap()
});
static WEBSITE_CONTENT_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</?WebsiteContent_[^>]*>").unwrap());
static ANY_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Get file extension from path
pub fn get_file_extension<P: AsRef<Path>>(path: P) -> Option<String> {
    path.as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
}

/// Check if a file looks like a SQL dump
pub fn is_sql_file<P: AsRef<Path>>(path: P) -> bool {
    match get_file_extension(path) {
        Some(ext) => matches!(ext.as_str(), "sql" | "ddl" | "txt"),
        None => false,
    }
}

/// Read a text file, replacing undecodable bytes instead of failing
pub fn read_text_lossy<P: AsRef<Path>>(path: P) -> Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            log::warn!("Input is not valid UTF-8, replacing undecodable bytes");
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    })
}

/// Format file size in human readable format
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    const THRESHOLD: f64 = 1024.0;

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= THRESHOLD && unit_index < UNITS.len() - 1 {
        size /= THRESHOLD;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

/// Size of a file on disk, 0 if it cannot be read
pub fn file_size<P: AsRef<Path>>(path: P) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

/// Validate and normalize file path
pub fn normalize_path<P: AsRef<Path>>(path: P) -> Result<std::path::PathBuf> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(RegistryError::MissingFile(path.display().to_string()));
    }

    path.canonicalize().map_err(RegistryError::Io)
}

/// Create directory if it doesn't exist
pub fn ensure_directory<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();

    if !path.exists() {
        std::fs::create_dir_all(path).map_err(RegistryError::Io)?;
    }

    Ok(())
}

/// RFC 3339 timestamp recorded alongside built artifacts
pub fn get_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Clean a page title or URL scraped from a web export.
///
/// Unwraps `<WebsiteContent_*>...</WebsiteContent_*>` wrappers, drops any other
/// tags, collapses whitespace and truncates to `maxlen` characters. Values that
/// end up empty or look like bare URLs return `""` so they are never mistaken
/// for table names.
pub fn sanitize_page_field(s: &str, maxlen: usize) -> String {
    let s = WEBSITE_CONTENT_WRAPPER.replace_all(s, "$1");
    let s = WEBSITE_CONTENT_TAG.replace_all(&s, "");
    let s = ANY_TAG.replace_all(&s, "");
    let s = WHITESPACE.replace_all(&s, " ");
    let s = s.trim();

    let lower = s.to_lowercase();
    if s.is_empty() || lower.starts_with("http://") || lower.starts_with("https://") {
        return String::new();
    }

    s.chars().take(maxlen).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{NamedTempFile, tempdir};

    #[test]
    fn test_file_extension() {
        assert_eq!(get_file_extension("dump.sql"), Some("sql".to_string()));
        assert_eq!(get_file_extension("dump.SQL"), Some("sql".to_string()));
        assert_eq!(get_file_extension("dump"), None);
        assert_eq!(get_file_extension("dump.sql.gz"), Some("gz".to_string()));
    }

    #[test]
    fn test_sql_file_detection() {
        assert!(is_sql_file("schema.sql"));
        assert!(is_sql_file("export.DDL"));
        assert!(!is_sql_file("registry.db"));
        assert!(!is_sql_file("Makefile"));
    }

    #[test]
    fn test_file_size_formatting() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(512), "512 B");
        assert_eq!(format_file_size(1024), "1.0 KB");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(1048576), "1.0 MB");
    }

    #[test]
    fn test_normalize_path() {
        let temp_file = NamedTempFile::new().unwrap();
        let normalized = normalize_path(temp_file.path()).unwrap();
        assert!(normalized.is_absolute());

        let missing = normalize_path("/definitely/not/here.sql");
        assert!(matches!(missing, Err(RegistryError::MissingFile(_))));
    }

    #[test]
    fn test_ensure_directory() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        ensure_directory(&nested).unwrap();
        assert!(nested.is_dir());
        ensure_directory(&nested).unwrap();
    }

    #[test]
    fn test_read_text_lossy() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.sql");
        std::fs::write(&path, b"abc\xffdef").unwrap();
        assert_eq!(read_text_lossy(&path).unwrap(), "abc\u{FFFD}def");
    }

    #[test]
    fn test_timestamp() {
        let timestamp = get_timestamp();
        assert!(chrono::DateTime::parse_from_rfc3339(&timestamp).is_ok());
    }

    #[test]
    fn test_sanitize_wrapped_content() {
        let raw = "<WebsiteContent_M123>  Policy   Summary </WebsiteContent_M123>";
        assert_eq!(sanitize_page_field(raw, 200), "Policy Summary");
    }

    #[test]
    fn test_sanitize_stray_tags() {
        assert_eq!(
            sanitize_page_field("<WebsiteContent_x>Claims <b>list</b>", 200),
            "Claims list"
        );
    }

    #[test]
    fn test_sanitize_urls_and_empty() {
        assert_eq!(sanitize_page_field("https://example.com/page", 200), "");
        assert_eq!(sanitize_page_field("<p> </p>", 200), "");
        assert_eq!(sanitize_page_field("", 200), "");
    }

    #[test]
    fn test_sanitize_truncates_on_chars() {
        assert_eq!(sanitize_page_field("ééééé", 3), "ééé");
    }
}
