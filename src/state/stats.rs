use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Run counters shared by all crawl tasks
///
/// Counters only ever increase during a run. Each one is an independent atomic, so
/// a [`StatsSnapshot`] taken while tasks are running may mix slightly different
/// instants; snapshots taken after a run are exact.
#[derive(Debug, Default)]
pub struct CrawlStats {
    pages_checked: AtomicU64,
    files_found: AtomicU64,
    errors: AtomicU64,
    skipped: AtomicU64,
    dropped: AtomicU64,
}

/// Point-in-time copy of [`CrawlStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Claimed entries that reached a terminal state
    pub pages_checked: u64,
    /// Distinct files added to the discovered set
    pub files_found: u64,
    /// Failed fetches and timed-out tasks
    pub errors: u64,
    /// Claimed entries skipped for depth, policy or content type
    pub skipped: u64,
    /// Frontier entries discarded by queue truncation
    pub dropped: u64,
}

impl CrawlStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_page_checked(&self) {
        self.pages_checked.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_file_found(&self) {
        self.files_found.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skip(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self, count: u64) {
        self.dropped.fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            pages_checked: self.pages_checked.load(Ordering::Relaxed),
            files_found: self.files_found.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} pages | {} files | {} errors | {} skipped",
            self.pages_checked, self.files_found, self.errors, self.skipped
        )
    }
}
