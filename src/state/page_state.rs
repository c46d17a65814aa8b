/// Page state definitions for tracking crawl progress
///
/// Every frontier entry moves through these states exactly once per claim:
/// `Queued -> Claimed -> Fetching -> {LinksExtracted | Skipped | Failed}`, with
/// `Claimed -> Skipped` short-cuts for depth and policy.
use std::fmt;

/// Why an entry ended without links being extracted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// Another task already claimed the URL
    Duplicate,
    /// Depth is beyond the configured maximum
    Depth,
    /// robots.txt disallows the URL
    Policy,
    /// Response was not HTML
    NotHtml,
    /// The page ceiling was reached before the entry could be claimed
    PageLimit,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Duplicate => "duplicate",
            Self::Depth => "depth",
            Self::Policy => "policy",
            Self::NotHtml => "not_html",
            Self::PageLimit => "page_limit",
        }
    }
}

/// Represents the current state of a frontier entry in the crawl process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageState {
    // ===== Active States =====
    /// Entry is waiting in the frontier
    Queued,

    /// Entry won the claim and is owned by one task
    Claimed,

    /// Request for the entry is in flight
    Fetching,

    // ===== Terminal States =====
    /// Page was fetched and its anchors classified
    LinksExtracted,

    /// Entry was dropped without error
    Skipped(SkipReason),

    /// Transport error, non-2xx status or task timeout
    Failed,
}

impl PageState {
    /// Returns true if this is a terminal state (no further processing needed)
    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }

    /// Returns true if this is an active state (entry may still be processed)
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Queued | Self::Claimed | Self::Fetching)
    }

    /// Returns true if this represents a successful completion
    pub fn is_success(&self) -> bool {
        matches!(self, Self::LinksExtracted)
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Failed)
    }

    /// Whether the entry consumed a claim in the visited set
    ///
    /// Everything but a lost claim race or a page-limit refusal did.
    pub fn was_claimed(&self) -> bool {
        !matches!(
            self,
            Self::Queued | Self::Skipped(SkipReason::Duplicate) | Self::Skipped(SkipReason::PageLimit)
        )
    }

    /// Checks whether moving from `self` to `next` follows the state machine
    pub fn can_transition_to(&self, next: PageState) -> bool {
        use PageState::*;
        match (self, next) {
            (Queued, Claimed) => true,
            (Queued, Skipped(SkipReason::Duplicate | SkipReason::PageLimit)) => true,
            (Claimed, Fetching) => true,
            (Claimed, Skipped(SkipReason::Depth | SkipReason::Policy)) => true,
            (Fetching, LinksExtracted | Failed) => true,
            (Fetching, Skipped(SkipReason::NotHtml)) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Claimed => "claimed",
            Self::Fetching => "fetching",
            Self::LinksExtracted => "links_extracted",
            Self::Skipped(reason) => match reason {
                SkipReason::Duplicate => "skipped(duplicate)",
                SkipReason::Depth => "skipped(depth)",
                SkipReason::Policy => "skipped(policy)",
                SkipReason::NotHtml => "skipped(not_html)",
                SkipReason::PageLimit => "skipped(page_limit)",
            },
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_terminal() {
        assert!(!PageState::Queued.is_terminal());
        assert!(!PageState::Claimed.is_terminal());
        assert!(!PageState::Fetching.is_terminal());

        assert!(PageState::LinksExtracted.is_terminal());
        assert!(PageState::Skipped(SkipReason::Policy).is_terminal());
        assert!(PageState::Failed.is_terminal());
    }

    #[test]
    fn test_success_skip_error() {
        assert!(PageState::LinksExtracted.is_success());
        assert!(PageState::Skipped(SkipReason::Depth).is_skipped());
        assert!(PageState::Failed.is_error());
        assert!(!PageState::Skipped(SkipReason::NotHtml).is_error());
    }

    #[test]
    fn test_valid_transitions() {
        assert!(PageState::Queued.can_transition_to(PageState::Claimed));
        assert!(PageState::Claimed.can_transition_to(PageState::Skipped(SkipReason::Depth)));
        assert!(PageState::Claimed.can_transition_to(PageState::Fetching));
        assert!(PageState::Fetching.can_transition_to(PageState::Failed));
        assert!(PageState::Fetching.can_transition_to(PageState::Skipped(SkipReason::NotHtml)));
    }

    #[test]
    fn test_invalid_transitions() {
        // Depth and policy are decided before any request goes out
        assert!(!PageState::Fetching.can_transition_to(PageState::Skipped(SkipReason::Depth)));
        assert!(!PageState::Queued.can_transition_to(PageState::Fetching));
        assert!(!PageState::LinksExtracted.can_transition_to(PageState::Queued));
        assert!(!PageState::Failed.can_transition_to(PageState::Fetching));
    }

    #[test]
    fn test_was_claimed() {
        assert!(PageState::LinksExtracted.was_claimed());
        assert!(PageState::Skipped(SkipReason::Depth).was_claimed());
        assert!(!PageState::Skipped(SkipReason::Duplicate).was_claimed());
        assert!(!PageState::Skipped(SkipReason::PageLimit).was_claimed());
    }

    #[test]
    fn test_display() {
        assert_eq!(PageState::LinksExtracted.to_string(), "links_extracted");
        assert_eq!(
            PageState::Skipped(SkipReason::Policy).to_string(),
            "skipped(policy)"
        );
        assert_eq!(SkipReason::NotHtml.as_str(), "not_html");
    }
}
