//! Configuration module for Sumi-Harvest
//!
//! Defaults are compiled in; an optional TOML file can override any of them, and
//! the command line overrides the file.
//!
//! # Example
//!
//! ```no_run
//! use sumi_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Crawler will use max depth: {}", config.crawler.max_depth);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    clamp_depth, parse_file_types, Config, CrawlerConfig, DownloadConfig, UserAgentConfig,
    DEFAULT_FILE_TYPES, MAX_DEPTH_LIMIT,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::{validate, validate_seed_url};
