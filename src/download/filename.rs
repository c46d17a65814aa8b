//! Filename derivation for downloaded files
//!
//! Names come from the last path segment of the URL. They are sanitized so a
//! file can never be written outside the destination directory.

use crate::url::NormalizedUrl;
use sha2::{Digest, Sha256};

/// Longest filename written, in characters
pub const MAX_FILENAME_LEN: usize = 200;

/// Derives the on-disk filename for `url`
///
/// The last path segment is used as-is (percent-encoding included). When it is
/// empty, a name is synthesized from a hash of the URL itself, so the same URL
/// always maps to the same file.
///
/// # Examples
///
/// ```
/// use sumi_harvest::download::derive_filename;
/// use sumi_harvest::url::NormalizedUrl;
///
/// let url = NormalizedUrl::parse("https://example.test/docs/a.pdf?v=2").unwrap();
/// assert_eq!(derive_filename(&url), "a.pdf");
/// ```
pub fn derive_filename(url: &NormalizedUrl) -> String {
    let basename = url
        .as_url()
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or_default();

    let sanitized = sanitize_filename(basename);
    if sanitized.is_empty() || sanitized == "." {
        hashed_filename(url)
    } else {
        sanitized
    }
}

fn hashed_filename(url: &NormalizedUrl) -> String {
    let digest = Sha256::digest(url.as_str().as_bytes());
    format!("file_{}.download", &hex::encode(digest)[..8])
}

/// Makes `name` safe to join onto the destination directory
///
/// Path separators and `..` sequences become `_`. Names longer than
/// [`MAX_FILENAME_LEN`] characters are shortened, keeping the extension.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned = name.replace(['/', '\\'], "_").replace("..", "_");

    if cleaned.chars().count() <= MAX_FILENAME_LEN {
        return cleaned;
    }

    let (stem, ext) = match cleaned.rfind('.') {
        Some(dot) if dot > 0 => cleaned.split_at(dot),
        _ => (cleaned.as_str(), ""),
    };

    let ext_len = ext.chars().count();
    if ext_len >= MAX_FILENAME_LEN {
        return cleaned.chars().take(MAX_FILENAME_LEN).collect();
    }

    let mut truncated: String = stem.chars().take(MAX_FILENAME_LEN - ext_len).collect();
    truncated.push_str(ext);
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> NormalizedUrl {
        NormalizedUrl::parse(s).unwrap()
    }

    #[test]
    fn test_basename_from_path() {
        assert_eq!(derive_filename(&url("https://example.test/a/b/report.pdf")), "report.pdf");
        assert_eq!(derive_filename(&url("https://example.test/x.zip#frag")), "x.zip");
    }

    #[test]
    fn test_empty_basename_uses_url_hash() {
        let name = derive_filename(&url("https://example.test/files/"));
        assert!(name.starts_with("file_"));
        assert!(name.ends_with(".download"));
        assert_eq!(name.len(), "file_".len() + 8 + ".download".len());

        // Stable for the same URL, different for another
        assert_eq!(name, derive_filename(&url("https://example.test/files/")));
        assert_ne!(name, derive_filename(&url("https://example.test/other/")));
    }

    #[test]
    fn test_sanitize_strips_traversal() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "____etc_passwd");
        assert_eq!(sanitize_filename("a\\b.pdf"), "a_b.pdf");
        assert_eq!(sanitize_filename("..."), "_.");
        assert!(!sanitize_filename("x/../y").contains(".."));
    }

    #[test]
    fn test_sanitize_truncates_keeping_extension() {
        let long = format!("{}.pdf", "a".repeat(300));
        let sanitized = sanitize_filename(&long);
        assert_eq!(sanitized.chars().count(), MAX_FILENAME_LEN);
        assert!(sanitized.ends_with(".pdf"));
    }

    #[test]
    fn test_sanitize_truncates_multibyte_safely() {
        let long = format!("{}.jpg", "é".repeat(250));
        let sanitized = sanitize_filename(&long);
        assert_eq!(sanitized.chars().count(), MAX_FILENAME_LEN);
        assert!(sanitized.ends_with(".jpg"));
    }

    #[test]
    fn test_sanitize_without_extension() {
        let long = "b".repeat(250);
        assert_eq!(sanitize_filename(&long).len(), MAX_FILENAME_LEN);
        assert_eq!(sanitize_filename("plain"), "plain");
    }
}
