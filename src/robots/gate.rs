use crate::robots::{fetch_robots, ParsedRobots};
use crate::url::{site_root, NormalizedUrl};
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// User agent token the crawl-policy document is consulted for
pub const POLICY_AGENT: &str = "*";

/// Crawl-permission gate for a single site
///
/// The site's robots.txt is fetched once, when the gate is set up. A gate with no
/// loaded policy allows everything.
#[derive(Debug, Clone, Default)]
pub struct PolicyGate {
    robots: Option<ParsedRobots>,
}

impl PolicyGate {
    /// Fetches and parses the site's robots.txt
    ///
    /// Any failure to obtain the document degrades to "allow all" with a warning;
    /// setting up the gate never fails the crawl.
    pub async fn setup(client: &Client, site: &Url, timeout: Duration) -> Self {
        match fetch_robots(client, site, timeout).await {
            Ok(robots) => {
                tracing::info!("Loaded robots.txt from {}/robots.txt", site_root(site));
                Self::from_robots(robots)
            }
            Err(e) => {
                tracing::warn!("Could not load robots.txt: {}", e);
                Self::allow_all()
            }
        }
    }

    /// A gate that consults no policy
    pub fn allow_all() -> Self {
        Self { robots: None }
    }

    pub fn from_robots(robots: ParsedRobots) -> Self {
        Self {
            robots: Some(robots),
        }
    }

    /// Whether a policy document was loaded
    pub fn is_loaded(&self) -> bool {
        self.robots.is_some()
    }

    /// Checks whether `url` may be fetched by the wildcard user agent
    pub fn can_fetch(&self, url: &NormalizedUrl) -> bool {
        self.robots
            .as_ref()
            .map_or(true, |robots| robots.is_allowed(url.as_str(), POLICY_AGENT))
    }

    /// Crawl-delay declared for the wildcard user agent, if any
    pub fn crawl_delay(&self) -> Option<Duration> {
        self.robots
            .as_ref()
            .and_then(|robots| robots.crawl_delay(POLICY_AGENT))
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> NormalizedUrl {
        NormalizedUrl::parse(s).unwrap()
    }

    #[test]
    fn test_no_policy_allows_everything() {
        let gate = PolicyGate::allow_all();
        assert!(!gate.is_loaded());
        assert!(gate.can_fetch(&url("https://example.test/private/x")));
        assert_eq!(gate.crawl_delay(), None);
    }

    #[test]
    fn test_policy_blocks_disallowed_paths() {
        let gate = PolicyGate::from_robots(ParsedRobots::from_content(
            "User-agent: *\nDisallow: /private/\nCrawl-delay: 1.5",
        ));
        assert!(gate.is_loaded());
        assert!(gate.can_fetch(&url("https://example.test/")));
        assert!(!gate.can_fetch(&url("https://example.test/private/index.html")));
        assert_eq!(gate.crawl_delay(), Some(Duration::from_millis(1500)));
    }
}
