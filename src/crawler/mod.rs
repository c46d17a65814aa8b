//! Crawler module - the concurrent crawl engine and its building blocks
//!
//! # Components
//!
//! - `engine`: batch orchestration, link classification, termination
//! - `frontier`: bounded work queue with the exactly-once visited set
//! - `rate_limiter`: minimum interval between outbound requests
//! - `fetcher`: HTTP client construction and page fetching
//! - `parser`: anchor extraction from HTML

mod engine;
mod fetcher;
mod frontier;
mod parser;
mod rate_limiter;

pub use engine::{CrawlEngine, CrawlResult, RoundSummary, ShutdownHandle, StopReason};
pub use fetcher::{build_http_client, fetch_page, probe_content_type, FetchResult};
pub use frontier::{Claim, Frontier, FrontierEntry, PushSummary};
pub use parser::extract_anchors;
pub use rate_limiter::RateLimiter;
