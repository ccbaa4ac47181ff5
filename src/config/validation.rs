use crate::config::types::{Config, CredentialsConfig, HarvestConfig, OutputConfig, SiteConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_harvest_config(&config.harvest)?;
    validate_site_config(&config.site)?;
    validate_credentials_config(&config.credentials)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates harvest engine settings
fn validate_harvest_config(config: &HarvestConfig) -> Result<(), ConfigError> {
    if config.max_concurrent_fetches < 1 || config.max_concurrent_fetches > 256 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_fetches must be between 1 and 256, got {}",
            config.max_concurrent_fetches
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.retry_attempts < 1 || config.retry_attempts > 20 {
        return Err(ConfigError::Validation(format!(
            "retry_attempts must be between 1 and 20, got {}",
            config.retry_attempts
        )));
    }

    if config.max_pages < 1 || config.max_pages > 100 {
        return Err(ConfigError::Validation(format!(
            "max_pages must be between 1 and 100, got {}",
            config.max_pages
        )));
    }

    Ok(())
}

/// Validates the target site settings
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url must use http or https, got '{}'",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url '{}' has no host",
            config.base_url
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates credential names (values may be env references and are resolved later)
fn validate_credentials_config(config: &CredentialsConfig) -> Result<(), ConfigError> {
    for name in config.cookies.keys() {
        if name.is_empty() || name.contains(|c: char| c == '=' || c == ';' || c.is_whitespace())
        {
            return Err(ConfigError::Validation(format!(
                "Invalid cookie name '{}'",
                name
            )));
        }
    }

    for name in config.headers.keys() {
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(ConfigError::InvalidHeader(format!(
                "Header name '{}' must be non-empty ASCII letters, digits or '-'",
                name
            )));
        }
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if config.cache_dir.is_empty() {
        return Err(ConfigError::Validation(
            "cache_dir cannot be empty".to_string(),
        ));
    }

    if config.aggregate_dir.is_empty() {
        return Err(ConfigError::Validation(
            "aggregate_dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}
