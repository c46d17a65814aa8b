//! Output module for presenting harvest results
//!
//! This module handles:
//! - Writing the found-files report grouped by extension
//! - Printing crawl and download summaries to the console

mod report;
mod summary;

pub use report::{default_report_name, format_report, write_report};
pub use summary::{
    format_download_summary, format_summary, print_download_summary, print_summary,
};

use crate::url::{FileClassifier, NormalizedUrl};
use std::collections::BTreeSet;
use thiserror::Error;

/// Errors that can occur while writing output
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Groups files by configured extension, in configuration order
///
/// Each URL lands in the group of the extension its path ends with; URLs are
/// sorted within a group and empty groups are left out.
pub fn group_by_type<'a>(
    files: &'a BTreeSet<NormalizedUrl>,
    file_types: &[String],
) -> Vec<(String, Vec<&'a NormalizedUrl>)> {
    let classifier = FileClassifier::new(file_types);

    classifier
        .file_types()
        .iter()
        .map(|ext| {
            let group: Vec<&NormalizedUrl> = files
                .iter()
                .filter(|url| classifier.matching_type(url) == Some(ext.as_str()))
                .collect();
            (ext.clone(), group)
        })
        .filter(|(_, group)| !group.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_by_type() {
        let files: BTreeSet<NormalizedUrl> = [
            "https://example.test/b.pdf",
            "https://example.test/a.pdf",
            "https://example.test/pic.JPG",
            "https://example.test/pic.jpeg",
        ]
        .iter()
        .map(|s| NormalizedUrl::parse(s).unwrap())
        .collect();

        let types = vec![".jpg".to_string(), ".pdf".to_string(), ".zip".to_string(), ".jpeg".to_string()];
        let groups = group_by_type(&files, &types);

        let names: Vec<&str> = groups.iter().map(|(ext, _)| ext.as_str()).collect();
        assert_eq!(names, vec![".jpg", ".pdf", ".jpeg"]);

        let pdfs: Vec<&str> = groups[1].1.iter().map(|u| u.as_str()).collect();
        assert_eq!(pdfs, vec!["https://example.test/a.pdf", "https://example.test/b.pdf"]);
    }
}
