use serde::Deserialize;

/// Extensions searched for when none are given
pub const DEFAULT_FILE_TYPES: &[&str] = &[
    ".pdf", ".png", ".jpg", ".jpeg", ".gif", ".doc", ".docx", ".zip",
];

/// Hard upper bound on the crawl depth, whatever the caller asks for
pub const MAX_DEPTH_LIMIT: u32 = 5;

/// Main configuration structure for Sumi-Harvest
///
/// Every table and key is optional in the TOML file; missing values fall back to
/// the defaults below.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub download: DownloadConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,

    /// File extensions to collect, stored lowercase with a leading dot
    pub file_types: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            crawler: CrawlerConfig::default(),
            download: DownloadConfig::default(),
            user_agent: UserAgentConfig::default(),
            file_types: DEFAULT_FILE_TYPES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Maximum link depth from the seed page (seed is depth 0)
    pub max_depth: u32,

    /// Ceiling on the number of URLs claimed for fetching in one run
    pub max_pages: usize,

    /// Frontier length above which the oldest entries are dropped
    pub max_queue_size: usize,

    /// Number of concurrent page fetches
    pub workers: usize,

    /// Minimum time between two page requests (milliseconds)
    pub request_delay_ms: u64,

    /// Timeout for a single page request (seconds)
    pub request_timeout_secs: u64,

    /// Upper bound on a whole fetch-and-extract task (seconds)
    pub task_timeout_secs: u64,

    /// Whether robots.txt is consulted
    pub respect_robots: bool,

    /// Largest robots.txt Crawl-delay honored (seconds); longer ones are capped
    pub max_crawl_delay_secs: u64,

    /// Whether discovered files are probed with HEAD to cross-check their Content-Type
    pub verify_content_type: bool,

    /// Emit a progress line every N checked pages
    pub progress_interval: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            max_pages: 500,
            max_queue_size: 1000,
            workers: 5,
            request_delay_ms: 100,
            request_timeout_secs: 10,
            task_timeout_secs: 15,
            respect_robots: true,
            max_crawl_delay_secs: 30,
            verify_content_type: false,
            progress_interval: 10,
        }
    }
}

/// Downloader configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct DownloadConfig {
    /// Number of concurrent downloads
    pub workers: usize,

    /// Minimum time between two download requests (milliseconds)
    pub request_delay_ms: u64,

    /// Largest file accepted, in bytes
    pub max_file_size: u64,

    /// Timeout for the size probe (seconds)
    pub probe_timeout_secs: u64,

    /// Longest silence tolerated while waiting for the response headers or
    /// the next body chunk (seconds); a slow but steady transfer never trips it
    pub transfer_timeout_secs: u64,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            workers: 3,
            request_delay_ms: 200,
            max_file_size: 100 * 1024 * 1024,
            probe_timeout_secs: 10,
            transfer_timeout_secs: 30,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct UserAgentConfig {
    /// Name of the crawler
    pub crawler_name: String,

    /// Version of the crawler
    pub crawler_version: String,

    /// URL with information about the crawler
    pub contact_url: Option<String>,

    /// Email address for crawler-related contact
    pub contact_email: Option<String>,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "SumiHarvest".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: None,
            contact_email: None,
        }
    }
}

impl UserAgentConfig {
    /// Formats the User-Agent header value
    ///
    /// `Name/Version (+ContactURL; ContactEmail)`, with the parenthesised part
    /// reduced to whatever contact details are configured.
    pub fn header_value(&self) -> String {
        let contact: Vec<String> = [
            self.contact_url.as_ref().map(|u| format!("+{}", u)),
            self.contact_email.clone(),
        ]
        .into_iter()
        .flatten()
        .collect();

        if contact.is_empty() {
            format!("{}/{}", self.crawler_name, self.crawler_version)
        } else {
            format!(
                "{}/{} ({})",
                self.crawler_name,
                self.crawler_version,
                contact.join("; ")
            )
        }
    }
}

/// Parses a comma-separated extension list such as `"pdf, .PNG,zip"`
///
/// Entries are trimmed, lowercased and given a leading dot; empty entries are
/// dropped. An input with no usable entry yields [`DEFAULT_FILE_TYPES`].
pub fn parse_file_types(input: &str) -> Vec<String> {
    let mut types: Vec<String> = Vec::new();
    for raw in input.split(',') {
        let ext = raw.trim().trim_start_matches('.').to_lowercase();
        if ext.is_empty() {
            continue;
        }
        let ext = format!(".{}", ext);
        if !types.contains(&ext) {
            types.push(ext);
        }
    }

    if types.is_empty() {
        DEFAULT_FILE_TYPES.iter().map(|s| s.to_string()).collect()
    } else {
        types
    }
}

/// Clamps a requested depth to [`MAX_DEPTH_LIMIT`]
pub fn clamp_depth(depth: u32) -> u32 {
    depth.min(MAX_DEPTH_LIMIT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_file_types() {
        assert_eq!(
            parse_file_types("pdf, .PNG,zip"),
            vec![".pdf".to_string(), ".png".to_string(), ".zip".to_string()]
        );
    }

    #[test]
    fn test_parse_file_types_dedups_and_skips_empty() {
        assert_eq!(
            parse_file_types("pdf,,PDF, "),
            vec![".pdf".to_string()]
        );
    }

    #[test]
    fn test_parse_file_types_empty_gives_defaults() {
        assert_eq!(parse_file_types("  ").len(), DEFAULT_FILE_TYPES.len());
        assert_eq!(parse_file_types(",,")[0], ".pdf");
    }

    #[test]
    fn test_clamp_depth() {
        assert_eq!(clamp_depth(2), 2);
        assert_eq!(clamp_depth(5), 5);
        assert_eq!(clamp_depth(12), 5);
    }

    #[test]
    fn test_user_agent_header_value() {
        let mut ua = UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0".to_string(),
            contact_url: None,
            contact_email: None,
        };
        assert_eq!(ua.header_value(), "TestBot/1.0");

        ua.contact_url = Some("https://example.com/bot".to_string());
        ua.contact_email = Some("bot@example.com".to_string());
        assert_eq!(
            ua.header_value(),
            "TestBot/1.0 (+https://example.com/bot; bot@example.com)"
        );
    }

    #[test]
    fn test_defaults_match_documented_limits() {
        let config = Config::default();
        assert_eq!(config.crawler.max_depth, 3);
        assert_eq!(config.crawler.max_pages, 500);
        assert_eq!(config.crawler.max_queue_size, 1000);
        assert_eq!(config.download.max_file_size, 100 * 1024 * 1024);
        assert_eq!(config.crawler.max_crawl_delay_secs, 30);
        assert!(config.download.workers < config.crawler.workers);
    }
}
