//! Download module - retrieves discovered files into a local directory
//!
//! The downloader receives a copy of the discovered-file set once the crawl is
//! over and never touches crawl state.

mod downloader;
mod filename;

pub use downloader::{DownloadError, DownloadOutcome, DownloadReport, Downloader, SizeCheck};
pub use filename::{derive_filename, sanitize_filename, MAX_FILENAME_LEN};

use std::path::PathBuf;

/// Default destination directory for a site: `downloads_<domain>`
pub fn default_download_dir(domain: &str) -> PathBuf {
    PathBuf::from(format!("downloads_{}", domain))
}
