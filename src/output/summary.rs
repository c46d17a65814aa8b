//! Console summaries for the crawl and download phases

use crate::crawler::CrawlResult;
use crate::download::DownloadReport;
use crate::output::group_by_type;
use std::fmt::Write as _;

/// URLs listed per extension before the rest is elided
const PREVIEW_LIMIT: usize = 3;

/// Renders the crawl summary: totals, then a short preview per extension
pub fn format_summary(result: &CrawlResult, file_types: &[String]) -> String {
    let mut out = String::new();
    let rule = "=".repeat(70);

    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out, "SEARCH RESULTS SUMMARY");
    let _ = writeln!(out, "{}", rule);
    if result.is_partial() {
        let _ = writeln!(out, "Stopped early: {}", result.stop_reason);
    }
    let _ = writeln!(
        out,
        "Checked {} pages in {:.1}s ({} errors, {} skipped)",
        result.stats.pages_checked,
        result.elapsed.as_secs_f64(),
        result.stats.errors,
        result.stats.skipped
    );
    let _ = writeln!(out, "Total unique files found: {}", result.files.len());

    if result.files.is_empty() {
        let _ = writeln!(out, "No files found.");
        return out;
    }

    for (ext, group) in group_by_type(&result.files, file_types) {
        let _ = writeln!(out, "\n{}: {} files", ext.to_uppercase(), group.len());
        for url in group.iter().take(PREVIEW_LIMIT) {
            let _ = writeln!(out, "   {}", url);
        }
        if group.len() > PREVIEW_LIMIT {
            let _ = writeln!(out, "   ... and {} more", group.len() - PREVIEW_LIMIT);
        }
    }

    out
}

/// Prints the crawl summary to stdout
pub fn print_summary(result: &CrawlResult, file_types: &[String]) {
    println!("\n{}", format_summary(result, file_types));
}

/// Renders the download totals
pub fn format_download_summary(report: &DownloadReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Download complete!");
    let _ = writeln!(out, "   Successful: {}", report.successful);
    if report.already_present > 0 {
        let _ = writeln!(out, "   Already present: {}", report.already_present);
    }
    let _ = writeln!(out, "   Failed: {}", report.failed);
    if report.is_partial() {
        let _ = writeln!(out, "   Not started (interrupted): {}", report.not_started);
    }
    let _ = writeln!(out, "   Bytes written: {}", report.total_bytes);
    out
}

/// Prints the download totals to stdout
pub fn print_download_summary(report: &DownloadReport) {
    println!("\n{}", format_download_summary(report));
}
