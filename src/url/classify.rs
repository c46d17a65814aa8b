//! File-type classification of discovered links
//!
//! A link is a file candidate when its path ends with one of the configured
//! extensions. When a Content-Type is available for it, the type is checked
//! against the extension, but only the primary family (`image`, `application`,
//! ...) can cause a rejection.

use crate::url::NormalizedUrl;

/// Classifies links by file extension
#[derive(Debug, Clone)]
pub struct FileClassifier {
    file_types: Vec<String>,
}

/// Result of comparing a Content-Type with the extension it was found under
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileCheck {
    /// Content-Type matches the expected type exactly
    Match,
    /// No Content-Type, or no expectation for this extension
    Unknown,
    /// Same family, different subtype; accepted and logged
    Mismatch { expected: String, actual: String },
    /// Different family altogether; rejected
    Rejected { expected: String, actual: String },
}

impl FileCheck {
    pub fn accepts(&self) -> bool {
        !matches!(self, Self::Rejected { .. })
    }
}

impl FileClassifier {
    /// Creates a classifier for lowercase, dot-prefixed extensions
    pub fn new(file_types: &[String]) -> Self {
        Self {
            file_types: file_types.iter().map(|t| t.to_lowercase()).collect(),
        }
    }

    pub fn file_types(&self) -> &[String] {
        &self.file_types
    }

    /// Returns the configured extension the URL path ends with, if any
    ///
    /// The query string is not part of the match, so `report.pdf?dl=1` counts as
    /// a `.pdf`. When several extensions match, the longest one wins.
    pub fn matching_type(&self, url: &NormalizedUrl) -> Option<&str> {
        let path = url.path().to_lowercase();
        self.file_types
            .iter()
            .filter(|ext| path.ends_with(ext.as_str()))
            .max_by_key(|ext| ext.len())
            .map(String::as_str)
    }

    pub fn is_file(&self, url: &NormalizedUrl) -> bool {
        self.matching_type(url).is_some()
    }
}

/// Expected MIME type for the extensions we know about
pub fn expected_mime(ext: &str) -> Option<&'static str> {
    match ext {
        ".pdf" => Some("application/pdf"),
        ".png" => Some("image/png"),
        ".jpg" | ".jpeg" => Some("image/jpeg"),
        ".gif" => Some("image/gif"),
        ".zip" => Some("application/zip"),
        ".doc" => Some("application/msword"),
        ".docx" => {
            Some("application/vnd.openxmlformats-officedocument.wordprocessingml.document")
        }
        _ => None,
    }
}

/// Compares a Content-Type header value with the type expected for `ext`
///
/// Parameters such as `; charset=utf-8` are ignored.
pub fn check_content_type(ext: &str, content_type: Option<&str>) -> FileCheck {
    let Some(expected) = expected_mime(ext) else {
        return FileCheck::Unknown;
    };

    let actual = match content_type {
        Some(ct) => ct
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_lowercase(),
        None => return FileCheck::Unknown,
    };

    if actual.is_empty() {
        return FileCheck::Unknown;
    }

    if actual == expected {
        return FileCheck::Match;
    }

    let expected_family = expected.split('/').next().unwrap_or_default();
    let actual_family = actual.split('/').next().unwrap_or_default();

    if expected_family == actual_family {
        FileCheck::Mismatch {
            expected: expected.to_string(),
            actual,
        }
    } else {
        FileCheck::Rejected {
            expected: expected.to_string(),
            actual,
        }
    }
}
