//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `PageState`: the state machine each frontier entry moves through
//! - `CrawlStats`: run counters shared by all crawl tasks

mod page_state;
mod stats;

// Re-export main types
pub use page_state::{PageState, SkipReason};
pub use stats::{CrawlStats, StatsSnapshot};
