use crate::config::types::{Config, CrawlerConfig, OutputConfig, SiteEntry, UserAgentConfig};
use crate::url::normalize_base_url;
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    validate_sites(&config.sites)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_concurrent_tasks < 1 || config.max_concurrent_tasks > 100 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_tasks must be between 1 and 100, got {}",
            config.max_concurrent_tasks
        )));
    }

    if config.fetch_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "fetch_timeout_secs must be >= 1, got {}",
            config.fetch_timeout_secs
        )));
    }

    if config.single_page_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "single_page_timeout_secs must be >= 1, got {}",
            config.single_page_timeout_secs
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate bot name: non-empty, alphanumeric + hyphens only
    if config.bot_name.is_empty() {
        return Err(ConfigError::Validation(
            "bot_name cannot be empty".to_string(),
        ));
    }

    if !config
        .bot_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "bot_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.bot_name
        )));
    }

    // Validate info URL
    Url::parse(&config.info_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid info_url: {}", e)))?;

    // Validate referrer
    Url::parse(&config.referrer)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid referrer: {}", e)))?;

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates the configured site list
///
/// Every site URL must normalize cleanly, since the crawler and the
/// search engine both key storage rows on the normalized form.
fn validate_sites(sites: &[SiteEntry]) -> Result<(), ConfigError> {
    if sites.is_empty() {
        return Err(ConfigError::Validation(
            "at least one [[sites]] entry is required".to_string(),
        ));
    }

    for site in sites {
        normalize_base_url(&site.url).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid site url '{}': {}", site.url, e))
        })?;

        if site.name.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "site '{}' has an empty name",
                site.url
            )));
        }
    }

    Ok(())
}
