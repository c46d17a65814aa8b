//! Robots.txt handling module
//!
//! This module fetches and parses a site's robots.txt and wraps it in a
//! [`PolicyGate`] that answers yes/no per URL.

mod gate;
mod parser;

pub use gate::{PolicyGate, POLICY_AGENT};
pub use parser::ParsedRobots;

use crate::url::site_root;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Failure to obtain a robots.txt document
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("request for {url} failed: {source}")]
    Request { url: String, source: reqwest::Error },

    #[error("could not read body of {url}: {source}")]
    Body { url: String, source: reqwest::Error },
}

/// Fetches robots.txt for the site `site` belongs to
///
/// # Status handling
///
/// | Response | Result |
/// |----------|--------|
/// | 2xx | parsed body |
/// | 401, 403 | disallow all |
/// | any other status | allow all |
/// | transport error | `Err(PolicyError)` |
pub async fn fetch_robots(
    client: &Client,
    site: &Url,
    timeout: Duration,
) -> Result<ParsedRobots, PolicyError> {
    let robots_url = format!("{}/robots.txt", site_root(site));
    tracing::debug!("Fetching {}", robots_url);

    let response = client
        .get(&robots_url)
        .timeout(timeout)
        .send()
        .await
        .map_err(|source| PolicyError::Request {
            url: robots_url.clone(),
            source,
        })?;

    let status = response.status();
    if status.is_success() {
        let body = response.text().await.map_err(|source| PolicyError::Body {
            url: robots_url.clone(),
            source,
        })?;
        return Ok(ParsedRobots::from_content(&body));
    }

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        tracing::info!("robots.txt answered {}, treating site as disallowed", status);
        return Ok(ParsedRobots::disallow_all());
    }

    tracing::debug!("robots.txt answered {}, allowing all", status);
    Ok(ParsedRobots::allow_all())
}
