//! Found-files report
//!
//! Plain text, one section per extension:
//!
//! ```text
//! Found Files List
//! ======================================================================
//! Search completed: 2024-05-01 14:03:11
//! Total files found: 2
//! ======================================================================
//!
//!
//! .PDF files (2):
//! ----------------------------------------------------------------------
//! https://example.test/a.pdf
//! https://example.test/b.pdf
//! ```

use crate::output::{group_by_type, OutputResult};
use crate::url::NormalizedUrl;
use chrono::{DateTime, Local};
use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

const RULE_WIDTH: usize = 70;

/// Default report path: `found_files_<domain>_<YYYYmmdd_HHMMSS>.txt`
pub fn default_report_name(domain: &str, now: DateTime<Local>) -> PathBuf {
    PathBuf::from(format!(
        "found_files_{}_{}.txt",
        domain,
        now.format("%Y%m%d_%H%M%S")
    ))
}

/// Renders the report text
///
/// # Arguments
///
/// * `files` - The discovered files
/// * `file_types` - Configured extensions, which fix the section order
/// * `completed_at` - Timestamp written in the header
pub fn format_report(
    files: &BTreeSet<NormalizedUrl>,
    file_types: &[String],
    completed_at: DateTime<Local>,
) -> String {
    let mut out = String::new();
    let rule = "=".repeat(RULE_WIDTH);

    let _ = writeln!(out, "Found Files List");
    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(
        out,
        "Search completed: {}",
        completed_at.format("%Y-%m-%d %H:%M:%S")
    );
    let _ = writeln!(out, "Total files found: {}", files.len());
    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out);

    for (ext, group) in group_by_type(files, file_types) {
        let _ = writeln!(out, "\n{} files ({}):", ext.to_uppercase(), group.len());
        let _ = writeln!(out, "{}", "-".repeat(RULE_WIDTH));
        for url in group {
            let _ = writeln!(out, "{}", url);
        }
    }

    out
}

/// Writes the report to `path`
pub fn write_report(
    path: &Path,
    files: &BTreeSet<NormalizedUrl>,
    file_types: &[String],
) -> OutputResult<()> {
    let report = format_report(files, file_types, Local::now());
    std::fs::write(path, report)?;
    tracing::info!("Saved file list to {}", path.display());
    Ok(())
}
