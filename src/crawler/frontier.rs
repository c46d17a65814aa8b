//! Bounded FIFO frontier with an exactly-once visited set
//!
//! The frontier holds `(url, depth)` entries waiting to be fetched. The visited
//! set records every URL that has been claimed for fetching; a URL can be claimed
//! once per run. Both live behind one mutex so that claiming and the page-ceiling
//! check see the same state.

use crate::url::NormalizedUrl;
use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A URL waiting to be crawled, with its distance from the seed
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FrontierEntry {
    pub url: NormalizedUrl,
    pub depth: u32,
}

impl FrontierEntry {
    pub fn new(url: NormalizedUrl, depth: u32) -> Self {
        Self { url, depth }
    }

    /// Entry for a link found on this entry's page
    pub fn child(&self, url: NormalizedUrl) -> Self {
        Self {
            url,
            depth: self.depth + 1,
        }
    }
}

/// Outcome of [`Frontier::try_claim`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    /// The caller owns the URL and may fetch it
    Won,
    /// Someone else claimed it first
    AlreadyVisited,
    /// The page ceiling has been reached
    LimitReached,
}

/// What happened to a batch of pushed entries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PushSummary {
    pub enqueued: usize,
    pub already_visited: usize,
    /// Oldest queued entries discarded to stay under the queue cap
    pub dropped: usize,
}

#[derive(Debug, Default)]
struct Inner {
    queue: VecDeque<FrontierEntry>,
    visited: HashSet<NormalizedUrl>,
}

/// Thread-safe work queue plus visited set
#[derive(Debug)]
pub struct Frontier {
    inner: Mutex<Inner>,
    max_queue_size: usize,
    max_pages: usize,
}

impl Frontier {
    /// Creates an empty frontier
    ///
    /// # Arguments
    ///
    /// * `max_queue_size` - Queue length above which the oldest entries are dropped
    /// * `max_pages` - Maximum number of URLs that may ever be claimed
    pub fn new(max_queue_size: usize, max_pages: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            max_queue_size,
            max_pages,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Every critical section leaves the state consistent, so a poisoned lock
        // is still safe to use.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Atomically claims `url` for fetching
    ///
    /// Exactly one caller ever gets [`Claim::Won`] for a given URL. Once
    /// `max_pages` URLs have been claimed every further claim is refused.
    pub fn try_claim(&self, url: &NormalizedUrl) -> Claim {
        let mut inner = self.lock();
        if inner.visited.contains(url) {
            return Claim::AlreadyVisited;
        }
        if inner.visited.len() >= self.max_pages {
            return Claim::LimitReached;
        }
        inner.visited.insert(url.clone());
        Claim::Won
    }

    pub fn is_visited(&self, url: &NormalizedUrl) -> bool {
        self.lock().visited.contains(url)
    }

    /// Appends one entry
    pub fn push(&self, entry: FrontierEntry) -> PushSummary {
        self.extend(std::iter::once(entry))
    }

    /// Appends entries in order, skipping URLs that are already claimed
    ///
    /// Only claims at push time are filtered. A queued URL can still be claimed
    /// later through a duplicate entry; that copy ends as a duplicate skip when
    /// popped. When the queue grows past its cap the oldest entries are dropped.
    pub fn extend<I>(&self, entries: I) -> PushSummary
    where
        I: IntoIterator<Item = FrontierEntry>,
    {
        let mut summary = PushSummary::default();
        let mut inner = self.lock();

        for entry in entries {
            if inner.visited.contains(&entry.url) {
                summary.already_visited += 1;
                continue;
            }
            inner.queue.push_back(entry);
            summary.enqueued += 1;
        }

        while inner.queue.len() > self.max_queue_size {
            inner.queue.pop_front();
            summary.dropped += 1;
        }

        if summary.dropped > 0 {
            tracing::warn!(
                "Frontier exceeded {} entries, dropped {} oldest",
                self.max_queue_size,
                summary.dropped
            );
        }

        summary
    }

    /// Removes the oldest entry; `None` means the frontier is drained
    pub fn pop(&self) -> Option<FrontierEntry> {
        self.lock().queue.pop_front()
    }

    /// Removes up to `n` entries in FIFO order
    pub fn pop_batch(&self, n: usize) -> Vec<FrontierEntry> {
        let mut inner = self.lock();
        let take = n.min(inner.queue.len());
        inner.queue.drain(..take).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().queue.is_empty()
    }

    /// Number of URLs claimed so far
    pub fn visited_count(&self) -> usize {
        self.lock().visited.len()
    }

    /// True once the page ceiling has been reached
    pub fn limit_reached(&self) -> bool {
        self.visited_count() >= self.max_pages
    }

    /// Copy of the queued entries, oldest first
    pub fn snapshot(&self) -> Vec<FrontierEntry> {
        self.lock().queue.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn url(path: &str) -> NormalizedUrl {
        NormalizedUrl::parse(&format!("https://example.test{}", path)).unwrap()
    }

    #[test]
    fn test_claim_is_exactly_once() {
        let frontier = Frontier::new(10, 10);
        assert_eq!(frontier.try_claim(&url("/a")), Claim::Won);
        assert_eq!(frontier.try_claim(&url("/a")), Claim::AlreadyVisited);
        assert!(frontier.is_visited(&url("/a")));
        assert_eq!(frontier.visited_count(), 1);
    }

    #[test]
    fn test_claim_respects_page_limit() {
        let frontier = Frontier::new(10, 2);
        assert_eq!(frontier.try_claim(&url("/a")), Claim::Won);
        assert_eq!(frontier.try_claim(&url("/b")), Claim::Won);
        assert!(frontier.limit_reached());
        assert_eq!(frontier.try_claim(&url("/c")), Claim::LimitReached);
        // A URL already claimed is still reported as such
        assert_eq!(frontier.try_claim(&url("/a")), Claim::AlreadyVisited);
    }

    #[test]
    fn test_fifo_order() {
        let frontier = Frontier::new(10, 10);
        frontier.push(FrontierEntry::new(url("/1"), 0));
        frontier.push(FrontierEntry::new(url("/2"), 1));
        frontier.push(FrontierEntry::new(url("/3"), 1));

        assert_eq!(frontier.pop().unwrap().url, url("/1"));
        let batch = frontier.pop_batch(5);
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].url, url("/2"));
        assert_eq!(batch[1].url, url("/3"));
        assert!(frontier.pop().is_none());
        assert!(frontier.is_empty());
    }

    #[test]
    fn test_push_skips_visited() {
        let frontier = Frontier::new(10, 10);
        frontier.try_claim(&url("/seen"));
        let summary = frontier.extend(vec![
            FrontierEntry::new(url("/seen"), 1),
            FrontierEntry::new(url("/new"), 1),
        ]);
        assert_eq!(summary.enqueued, 1);
        assert_eq!(summary.already_visited, 1);
        assert_eq!(frontier.len(), 1);
    }

    #[test]
    fn test_overflow_drops_oldest() {
        let frontier = Frontier::new(3, 100);
        frontier.extend((1..=3).map(|i| FrontierEntry::new(url(&format!("/{}", i)), 1)));
        let summary = frontier.extend((4..=5).map(|i| FrontierEntry::new(url(&format!("/{}", i)), 1)));

        assert_eq!(summary.enqueued, 2);
        assert_eq!(summary.dropped, 2);
        let remaining: Vec<_> = frontier.snapshot().into_iter().map(|e| e.url).collect();
        assert_eq!(remaining, vec![url("/3"), url("/4"), url("/5")]);
    }

    #[test]
    fn test_queued_duplicate_is_claimed_once() {
        let frontier = Frontier::new(10, 10);
        frontier.extend(vec![
            FrontierEntry::new(url("/twice"), 1),
            FrontierEntry::new(url("/twice"), 1),
        ]);
        assert_eq!(frontier.len(), 2);

        let first = frontier.pop().unwrap();
        assert_eq!(frontier.try_claim(&first.url), Claim::Won);

        // The copy still queued now refers to a claimed URL
        let second = frontier.pop().unwrap();
        assert_eq!(frontier.try_claim(&second.url), Claim::AlreadyVisited);
    }

    #[test]
    fn test_child_depth() {
        let parent = FrontierEntry::new(url("/"), 2);
        let child = parent.child(url("/next"));
        assert_eq!(child.depth, 3);
        assert_eq!(child.url, url("/next"));
    }

    #[tokio::test]
    async fn test_concurrent_claims_have_one_winner_per_url() {
        let frontier = Arc::new(Frontier::new(1000, 1000));
        let mut handles = Vec::new();

        for _ in 0..16 {
            let frontier = Arc::clone(&frontier);
            handles.push(tokio::spawn(async move {
                (0..50)
                    .filter(|i| frontier.try_claim(&url(&format!("/p{}", i))) == Claim::Won)
                    .count()
            }));
        }

        let mut wins = 0;
        for handle in handles {
            wins += handle.await.unwrap();
        }
        assert_eq!(wins, 50);
        assert_eq!(frontier.visited_count(), 50);
    }
}
