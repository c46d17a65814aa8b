use crate::config::types::{
    Config, CrawlerConfig, DownloadConfig, UserAgentConfig, MAX_DEPTH_LIMIT,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_download_config(&config.download, &config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_file_types(&config.file_types)?;
    Ok(())
}

/// Validates a seed URL before any network work starts
///
/// The seed must be an absolute `http://` or `https://` URL with a host.
pub fn validate_seed_url(seed: &str) -> Result<Url, ConfigError> {
    let seed = seed.trim();
    if !(seed.starts_with("http://") || seed.starts_with("https://")) {
        return Err(ConfigError::InvalidUrl(format!(
            "Seed URL '{}' must start with http:// or https://",
            seed
        )));
    }

    let url = Url::parse(seed)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", seed, e)))?;

    if url.host_str().map_or(true, str::is_empty) {
        return Err(ConfigError::InvalidUrl(format!(
            "Seed URL '{}' has no host",
            seed
        )));
    }

    Ok(url)
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_depth > MAX_DEPTH_LIMIT {
        return Err(ConfigError::Validation(format!(
            "max_depth must be at most {}, got {}",
            MAX_DEPTH_LIMIT, config.max_depth
        )));
    }

    if config.workers < 1 || config.workers > 100 {
        return Err(ConfigError::Validation(format!(
            "crawler workers must be between 1 and 100, got {}",
            config.workers
        )));
    }

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(
            "max_pages must be >= 1".to_string(),
        ));
    }

    if config.max_queue_size < 1 {
        return Err(ConfigError::Validation(
            "max_queue_size must be >= 1".to_string(),
        ));
    }

    if config.request_timeout_secs < 1 || config.task_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeouts must be >= 1s, got request={}s task={}s",
            config.request_timeout_secs, config.task_timeout_secs
        )));
    }

    if config.progress_interval < 1 {
        return Err(ConfigError::Validation(
            "progress_interval must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates downloader configuration
fn validate_download_config(
    config: &DownloadConfig,
    crawler: &CrawlerConfig,
) -> Result<(), ConfigError> {
    if config.workers < 1 {
        return Err(ConfigError::Validation(
            "download workers must be >= 1".to_string(),
        ));
    }

    if config.workers > crawler.workers {
        return Err(ConfigError::Validation(format!(
            "download workers ({}) must not exceed crawler workers ({})",
            config.workers, crawler.workers
        )));
    }

    if config.max_file_size < 1 {
        return Err(ConfigError::Validation(
            "max_file_size must be >= 1 byte".to_string(),
        ));
    }

    if config.probe_timeout_secs < 1 || config.transfer_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "download timeouts must be >= 1s, got probe={}s transfer={}s",
            config.probe_timeout_secs, config.transfer_timeout_secs
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    if let Some(contact_url) = &config.contact_url {
        Url::parse(contact_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;
    }

    if let Some(email) = &config.contact_email {
        validate_email(email)?;
    }

    Ok(())
}

/// Validates the extension list
fn validate_file_types(file_types: &[String]) -> Result<(), ConfigError> {
    if file_types.is_empty() {
        return Err(ConfigError::Validation(
            "file_types cannot be empty".to_string(),
        ));
    }

    for ext in file_types {
        let Some(body) = ext.strip_prefix('.') else {
            return Err(ConfigError::Validation(format!(
                "file type '{}' must start with '.'",
                ext
            )));
        };

        if body.is_empty() || !body.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ConfigError::Validation(format!(
                "file type '{}' must be a dot followed by letters or digits",
                ext
            )));
        }

        if body.chars().any(|c| c.is_ascii_uppercase()) {
            return Err(ConfigError::Validation(format!(
                "file type '{}' must be lowercase",
                ext
            )));
        }
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    // Basic email format check: must contain @ and have text on both sides
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    let local = parts[0];
    let domain = parts[1];

    if local.is_empty() || domain.is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
