//! Crawl engine - main crawl orchestration logic
//!
//! This module contains the crawl loop that coordinates all aspects of a
//! single-site harvest:
//! - Seeding the frontier and loading the site's robots.txt
//! - Dispatching bounded batches of fetch-and-extract tasks
//! - Classifying extracted links into files and pages
//! - Stopping on an empty frontier, the page ceiling or an interrupt

use crate::config::Config;
use crate::crawler::fetcher::{build_http_client, fetch_page, probe_content_type, FetchResult};
use crate::crawler::frontier::{Claim, Frontier, FrontierEntry};
use crate::crawler::parser::extract_anchors;
use crate::crawler::rate_limiter::RateLimiter;
use crate::robots::PolicyGate;
use crate::state::{CrawlStats, PageState, SkipReason, StatsSnapshot};
use crate::url::{check_content_type, is_same_site, normalize, FileCheck, FileClassifier, NormalizedUrl};
use crate::HarvestError;
use reqwest::Client;
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use url::Url;

/// Why a crawl ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Frontier drained with nothing in flight
    Exhausted,
    /// Page ceiling reached
    PageLimit,
    /// Stopped through a [`ShutdownHandle`]
    Interrupted,
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exhausted => "frontier exhausted",
            Self::PageLimit => "page limit reached",
            Self::Interrupted => "interrupted",
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cooperative stop signal for a running crawl
///
/// Once triggered, the engine dispatches no further batches. Tasks already
/// dispatched run to completion or time out.
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandle(Arc<AtomicBool>);

impl ShutdownHandle {
    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Final (or partial) result of a crawl
#[derive(Debug, Clone)]
pub struct CrawlResult {
    /// Copy of the discovered-file set, sorted
    pub files: BTreeSet<NormalizedUrl>,
    pub stats: StatsSnapshot,
    pub elapsed: Duration,
    pub stop_reason: StopReason,
    /// Size of the visited set
    pub pages_claimed: usize,
    /// Entries still waiting in the frontier when the crawl stopped
    pub queued_remaining: usize,
}

impl CrawlResult {
    pub fn is_partial(&self) -> bool {
        self.stop_reason != StopReason::Exhausted
    }
}

/// What one dispatched batch did
#[derive(Debug, Clone, Default)]
pub struct RoundSummary {
    /// Terminal state of every entry in the batch, in completion order
    pub outcomes: Vec<(FrontierEntry, PageState)>,
    /// New frontier entries accepted after the batch drained
    pub enqueued: usize,
    /// Frontier entries lost to queue truncation
    pub dropped: usize,
}

impl RoundSummary {
    pub fn dispatched(&self) -> usize {
        self.outcomes.len()
    }
}

/// Request spacing for the crawl: the configured delay, raised to the site's
/// Crawl-delay when that is longer, but never above `cap`
fn effective_delay(configured: Duration, crawl_delay: Option<Duration>, cap: Duration) -> Duration {
    let Some(mut crawl_delay) = crawl_delay else {
        return configured;
    };

    if crawl_delay > cap {
        tracing::warn!(
            "robots.txt asks for a Crawl-delay of {:?}, capping it at {:?}",
            crawl_delay,
            cap
        );
        crawl_delay = cap;
    }

    if crawl_delay > configured {
        tracing::info!("Honoring Crawl-delay of {:?}", crawl_delay);
        crawl_delay
    } else {
        configured
    }
}

/// Shared state every crawl task works against
struct TaskContext {
    seed: NormalizedUrl,
    client: Client,
    frontier: Frontier,
    discovered: Mutex<HashSet<NormalizedUrl>>,
    stats: CrawlStats,
    gate: PolicyGate,
    limiter: RateLimiter,
    classifier: FileClassifier,
    max_depth: u32,
    request_timeout: Duration,
    task_timeout: Duration,
    verify_content_type: bool,
}

struct TaskOutcome {
    entry: FrontierEntry,
    state: PageState,
    children: Vec<FrontierEntry>,
}

/// Single-site crawl engine
pub struct CrawlEngine {
    ctx: Arc<TaskContext>,
    workers: usize,
    progress_interval: u64,
    shutdown: ShutdownHandle,
}

impl CrawlEngine {
    /// Creates an engine for `seed` with its own HTTP client
    ///
    /// # Arguments
    ///
    /// * `seed` - The page the crawl starts from; also defines the site
    /// * `config` - The harvester configuration
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlEngine)` - Engine ready to run, robots.txt already loaded
    /// * `Err(HarvestError)` - The HTTP client could not be built
    pub async fn new(seed: NormalizedUrl, config: &Config) -> Result<Self, HarvestError> {
        let client = build_http_client(&config.user_agent)?;
        Ok(Self::with_client(seed, config, client).await)
    }

    /// Creates an engine that sends its requests through `client`
    pub async fn with_client(seed: NormalizedUrl, config: &Config, client: Client) -> Self {
        let crawler = &config.crawler;
        let request_timeout = Duration::from_secs(crawler.request_timeout_secs);

        let gate = if crawler.respect_robots {
            PolicyGate::setup(&client, seed.as_url(), request_timeout).await
        } else {
            tracing::info!("robots.txt checks disabled");
            PolicyGate::allow_all()
        };

        let delay = effective_delay(
            Duration::from_millis(crawler.request_delay_ms),
            gate.crawl_delay(),
            Duration::from_secs(crawler.max_crawl_delay_secs),
        );

        let frontier = Frontier::new(crawler.max_queue_size, crawler.max_pages);
        frontier.push(FrontierEntry::new(seed.clone(), 0));

        let ctx = TaskContext {
            seed,
            client,
            frontier,
            discovered: Mutex::new(HashSet::new()),
            stats: CrawlStats::new(),
            gate,
            limiter: RateLimiter::new(delay),
            classifier: FileClassifier::new(&config.file_types),
            max_depth: crawler.max_depth,
            request_timeout,
            task_timeout: Duration::from_secs(crawler.task_timeout_secs),
            verify_content_type: crawler.verify_content_type,
        };

        Self {
            ctx: Arc::new(ctx),
            workers: crawler.workers.max(1),
            progress_interval: crawler.progress_interval.max(1),
            shutdown: ShutdownHandle::default(),
        }
    }

    /// Handle that stops this engine from another task
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Runs the crawl until the frontier drains, the page ceiling is hit or
    /// shutdown is requested
    pub async fn run(&mut self) -> CrawlResult {
        let start = Instant::now();
        tracing::info!("Starting crawl of {}", self.ctx.seed);

        let mut next_progress = self.progress_interval;

        let stop_reason = loop {
            if self.shutdown.is_triggered() {
                tracing::warn!("Shutdown requested, stopping crawl");
                break StopReason::Interrupted;
            }

            if self.ctx.frontier.limit_reached() {
                tracing::info!("Reached page limit, stopping crawl");
                break StopReason::PageLimit;
            }

            if self.run_round().await.is_none() {
                break StopReason::Exhausted;
            }

            let checked = self.ctx.stats.snapshot().pages_checked;
            if checked >= next_progress {
                self.log_progress(start.elapsed());
                next_progress = (checked / self.progress_interval + 1) * self.progress_interval;
            }
        };

        let result = CrawlResult {
            files: self.discovered(),
            stats: self.ctx.stats.snapshot(),
            elapsed: start.elapsed(),
            stop_reason,
            pages_claimed: self.ctx.frontier.visited_count(),
            queued_remaining: self.ctx.frontier.len(),
        };

        tracing::info!(
            "Crawl finished ({}): {} in {:.1?}",
            result.stop_reason,
            result.stats,
            result.elapsed
        );

        result
    }

    /// Dispatches one batch from the frontier and waits for all of it
    ///
    /// At most twice the worker count is taken per batch, with at most `workers`
    /// of those fetching at any moment. Links found by the batch are pushed to
    /// the frontier only after every task in it has finished.
    ///
    /// Returns `None` when the frontier is empty.
    pub async fn run_round(&mut self) -> Option<RoundSummary> {
        let batch = self.ctx.frontier.pop_batch(self.workers * 2);
        if batch.is_empty() {
            return None;
        }

        tracing::debug!("Dispatching batch of {} entries", batch.len());

        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut tasks = JoinSet::new();

        for entry in batch {
            let ctx = Arc::clone(&self.ctx);
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                process_entry(ctx, entry).await
            });
        }

        let mut summary = RoundSummary::default();
        let mut children = Vec::new();

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => {
                    children.extend(outcome.children);
                    summary.outcomes.push((outcome.entry, outcome.state));
                }
                Err(e) => {
                    tracing::error!("Crawl task failed: {}", e);
                    self.ctx.stats.record_error();
                }
            }
        }

        let pushed = self.ctx.frontier.extend(children);
        if pushed.dropped > 0 {
            self.ctx.stats.record_dropped(pushed.dropped as u64);
        }
        summary.enqueued = pushed.enqueued;
        summary.dropped = pushed.dropped;

        Some(summary)
    }

    fn log_progress(&self, elapsed: Duration) {
        let stats = self.ctx.stats.snapshot();
        let rate = stats.pages_checked as f64 / elapsed.as_secs_f64().max(f64::EPSILON);
        tracing::info!(
            "Progress: {} pages checked, {} files found, {} queued, {} errors, {:.2} pages/sec",
            stats.pages_checked,
            stats.files_found,
            self.ctx.frontier.len(),
            stats.errors,
            rate
        );
    }

    /// Copy of the files discovered so far
    pub fn discovered(&self) -> BTreeSet<NormalizedUrl> {
        self.ctx.discovered().iter().cloned().collect()
    }

    /// Copy of the entries waiting in the frontier, oldest first
    pub fn frontier_snapshot(&self) -> Vec<FrontierEntry> {
        self.ctx.frontier.snapshot()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.ctx.stats.snapshot()
    }

    pub fn visited_count(&self) -> usize {
        self.ctx.frontier.visited_count()
    }

    /// Effective delay between page requests
    pub fn request_delay(&self) -> Duration {
        self.ctx.limiter.delay()
    }
}

impl TaskContext {
    fn discovered(&self) -> MutexGuard<'_, HashSet<NormalizedUrl>> {
        self.discovered.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds a file to the discovered set, probing its Content-Type first when
    /// verification is on
    async fn record_file(&self, url: NormalizedUrl, ext: &str) {
        let known = self.discovered().contains(&url);
        if known {
            return;
        }

        // Files under a disallowed path are recorded on their extension alone
        if self.verify_content_type && self.gate.can_fetch(&url) {
            self.limiter.wait().await;
            let content_type =
                probe_content_type(&self.client, url.as_url(), self.request_timeout).await;

            match check_content_type(ext, content_type.as_deref()) {
                FileCheck::Rejected { expected, actual } => {
                    tracing::warn!(
                        "Rejecting {}: expected {}, server reports {}",
                        url,
                        expected,
                        actual
                    );
                    return;
                }
                FileCheck::Mismatch { expected, actual } => {
                    tracing::warn!(
                        "Content-Type mismatch for {}: expected {}, got {}",
                        url,
                        expected,
                        actual
                    );
                }
                FileCheck::Match | FileCheck::Unknown => {}
            }
        }

        let inserted = self.discovered().insert(url.clone());
        if inserted {
            self.stats.record_file_found();
            tracing::info!("FOUND: {}", url);
        }
    }

    /// Sorts the links of a fetched page into files and pages
    ///
    /// Files are recorded right away; pages come back as frontier entries one
    /// level deeper. Off-site links and pages past the depth limit are dropped.
    async fn classify_links(
        &self,
        entry: &FrontierEntry,
        base: &Url,
        hrefs: Vec<String>,
    ) -> Vec<FrontierEntry> {
        let mut seen = HashSet::new();
        let mut children = Vec::new();

        for href in hrefs {
            let Some(url) = normalize(&href, base) else {
                continue;
            };

            if !seen.insert(url.clone()) {
                continue;
            }

            if !is_same_site(self.seed.as_url(), url.as_url()) {
                tracing::trace!("Skipping off-site link {}", url);
                continue;
            }

            if let Some(ext) = self.classifier.matching_type(&url) {
                let ext = ext.to_string();
                self.record_file(url, &ext).await;
            } else if entry.depth < self.max_depth && !self.frontier.is_visited(&url) {
                children.push(entry.child(url));
            }
        }

        children
    }
}

/// Takes one frontier entry through the page state machine
async fn process_entry(ctx: Arc<TaskContext>, entry: FrontierEntry) -> TaskOutcome {
    match ctx.frontier.try_claim(&entry.url) {
        Claim::Won => {}
        Claim::AlreadyVisited => {
            tracing::trace!("{} already claimed", entry.url);
            return TaskOutcome::terminal(entry, PageState::Skipped(SkipReason::Duplicate));
        }
        Claim::LimitReached => {
            return TaskOutcome::terminal(entry, PageState::Skipped(SkipReason::PageLimit));
        }
    }

    let outcome = if entry.depth > ctx.max_depth {
        tracing::debug!("Skipping {} at depth {}", entry.url, entry.depth);
        TaskOutcome::terminal(entry, PageState::Skipped(SkipReason::Depth))
    } else if !ctx.gate.can_fetch(&entry.url) {
        tracing::info!("URL {} disallowed by robots.txt", entry.url);
        TaskOutcome::terminal(entry, PageState::Skipped(SkipReason::Policy))
    } else {
        ctx.limiter.wait().await;
        match tokio::time::timeout(ctx.task_timeout, fetch_and_extract(&ctx, &entry.url)).await {
            Ok(PageFetch::Page { base, hrefs }) => {
                let children = ctx.classify_links(&entry, &base, hrefs).await;
                TaskOutcome {
                    entry,
                    state: PageState::LinksExtracted,
                    children,
                }
            }
            Ok(PageFetch::NotHtml) => {
                TaskOutcome::terminal(entry, PageState::Skipped(SkipReason::NotHtml))
            }
            Ok(PageFetch::Failed) => TaskOutcome::terminal(entry, PageState::Failed),
            Err(_) => {
                tracing::error!("Timed out processing {}", entry.url);
                TaskOutcome::terminal(entry, PageState::Failed)
            }
        }
    };

    let from = match outcome.state {
        PageState::Skipped(SkipReason::Depth | SkipReason::Policy) => PageState::Claimed,
        _ => PageState::Fetching,
    };
    debug_assert!(from.can_transition_to(outcome.state));
    tracing::trace!("{}: {} -> {}", outcome.entry.url, from, outcome.state);

    ctx.stats.record_page_checked();
    match outcome.state {
        PageState::Failed => ctx.stats.record_error(),
        PageState::Skipped(_) => ctx.stats.record_skip(),
        _ => {}
    }

    outcome
}

enum PageFetch {
    Page { base: Url, hrefs: Vec<String> },
    NotHtml,
    Failed,
}

/// Fetches a page and pulls out its anchors
async fn fetch_and_extract(ctx: &TaskContext, url: &NormalizedUrl) -> PageFetch {
    match fetch_page(&ctx.client, url.as_url(), ctx.request_timeout).await {
        FetchResult::Success {
            final_url, body, ..
        } => {
            let hrefs = extract_anchors(&body);
            tracing::debug!("Extracted {} links from {}", hrefs.len(), url);
            PageFetch::Page {
                base: final_url,
                hrefs,
            }
        }
        FetchResult::ContentMismatch { content_type } => {
            tracing::debug!("Skipping {}: not HTML ({})", url, content_type);
            PageFetch::NotHtml
        }
        FetchResult::HttpError { status_code } => {
            tracing::error!("Error fetching {}: HTTP {}", url, status_code);
            PageFetch::Failed
        }
        FetchResult::NetworkError { error, .. } => {
            tracing::error!("Error fetching {}: {}", url, error);
            PageFetch::Failed
        }
    }
}

impl TaskOutcome {
    fn terminal(entry: FrontierEntry, state: PageState) -> Self {
        Self {
            entry,
            state,
            children: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn offline_config() -> Config {
        let mut config = Config::default();
        config.crawler.respect_robots = false;
        config.crawler.request_delay_ms = 0;
        config
    }

    #[test]
    fn test_shutdown_handle_is_shared() {
        let handle = ShutdownHandle::default();
        let clone = handle.clone();
        assert!(!handle.is_triggered());
        clone.trigger();
        assert!(handle.is_triggered());
    }

    #[test]
    fn test_stop_reason_display() {
        assert_eq!(StopReason::Exhausted.to_string(), "frontier exhausted");
        assert_eq!(StopReason::PageLimit.to_string(), "page limit reached");
        assert_eq!(StopReason::Interrupted.to_string(), "interrupted");
    }

    #[tokio::test]
    async fn test_seed_is_queued_at_depth_zero() {
        let seed = NormalizedUrl::parse("https://example.test/").unwrap();
        let engine = CrawlEngine::new(seed.clone(), &offline_config()).await.unwrap();

        assert_eq!(engine.frontier_snapshot(), vec![FrontierEntry::new(seed, 0)]);
        assert_eq!(engine.visited_count(), 0);
        assert!(engine.discovered().is_empty());
    }

    #[tokio::test]
    async fn test_interrupted_before_start_fetches_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let seed = NormalizedUrl::parse(&format!("{}/", server.uri())).unwrap();
        let mut engine = CrawlEngine::new(seed, &offline_config()).await.unwrap();
        engine.shutdown_handle().trigger();

        let result = engine.run().await;
        assert_eq!(result.stop_reason, StopReason::Interrupted);
        assert!(result.is_partial());
        assert_eq!(result.queued_remaining, 1);
        assert_eq!(result.stats.pages_checked, 0);
    }

    #[tokio::test]
    async fn test_crawl_delay_raises_request_delay() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(wiremock::matchers::path("/robots.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nCrawl-delay: 2"))
            .mount(&server)
            .await;

        let mut config = Config::default();
        config.crawler.request_delay_ms = 100;
        let seed = NormalizedUrl::parse(&format!("{}/", server.uri())).unwrap();
        let engine = CrawlEngine::new(seed, &config).await.unwrap();

        assert_eq!(engine.request_delay(), Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_huge_crawl_delay_is_capped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(wiremock::matchers::path("/robots.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nCrawl-delay: 86400"))
            .mount(&server)
            .await;

        let mut config = Config::default();
        config.crawler.max_crawl_delay_secs = 5;
        let seed = NormalizedUrl::parse(&format!("{}/", server.uri())).unwrap();
        let engine = CrawlEngine::new(seed, &config).await.unwrap();

        assert_eq!(engine.request_delay(), Duration::from_secs(5));
    }

    #[test]
    fn test_effective_delay() {
        let ms = Duration::from_millis;
        let cap = Duration::from_secs(30);
        assert_eq!(effective_delay(ms(100), None, cap), ms(100));
        assert_eq!(effective_delay(ms(100), Some(ms(50)), cap), ms(100));
        assert_eq!(effective_delay(ms(100), Some(ms(2000)), cap), ms(2000));
        assert_eq!(effective_delay(ms(100), Some(Duration::from_secs(86_400)), cap), cap);
        // The cap only limits Crawl-delay, never the configured spacing
        assert_eq!(
            effective_delay(Duration::from_secs(60), Some(Duration::from_secs(90)), cap),
            Duration::from_secs(60)
        );
    }
}
