use crate::config::types::{Config, CrawlerConfig, DelayConfig, RetryConfig};
use crate::url::ExclusionRule;
use crate::ConfigError;
use url::Url;

/// Largest worker pool either queue may be given
const MAX_WORKERS: usize = 64;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_target_url(&config.target.url)?;
    validate_crawler_config(&config.crawler)?;
    validate_delay_config(&config.delay)?;
    validate_retry_config(&config.retry)?;
    validate_exclusions(&config.exclude)?;

    if config.output.directory.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }

    if config.resume.enabled && config.resume.state_file.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "resume is enabled but state_file is empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates the crawl root
fn validate_target_url(target: &str) -> Result<(), ConfigError> {
    let url = Url::parse(target)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid target url '{}': {}", target, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "Target url '{}' must use http or https",
            target
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "Target url '{}' has no host",
            target
        )));
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    // max_depth >= 0 is always true for u32, so no check needed

    if config.max_files < 1 {
        return Err(ConfigError::Validation(format!(
            "max_files must be >= 1, got {}",
            config.max_files
        )));
    }

    for (name, value) in [
        ("crawl_workers", config.crawl_workers),
        ("resource_workers", config.resource_workers),
    ] {
        if value < 1 || value > MAX_WORKERS {
            return Err(ConfigError::Validation(format!(
                "{} must be between 1 and {}, got {}",
                name, MAX_WORKERS, value
            )));
        }
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.request_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_delay_config(config: &DelayConfig) -> Result<(), ConfigError> {
    if let DelayConfig::Random { min_ms, max_ms } = config {
        if min_ms > max_ms {
            return Err(ConfigError::Validation(format!(
                "random delay min_ms ({}) is greater than max_ms ({})",
                min_ms, max_ms
            )));
        }
    }
    Ok(())
}

/// Validates retry/backoff parameters
fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "max_attempts must be >= 1, got {}",
            config.max_attempts
        )));
    }

    if !config.backoff_multiplier.is_finite() || config.backoff_multiplier < 1.0 {
        return Err(ConfigError::Validation(format!(
            "backoff_multiplier must be a finite number >= 1.0, got {}",
            config.backoff_multiplier
        )));
    }

    if config.max_delay_ms < config.base_delay_ms {
        return Err(ConfigError::Validation(format!(
            "max_delay_ms ({}) is smaller than base_delay_ms ({})",
            config.max_delay_ms, config.base_delay_ms
        )));
    }

    Ok(())
}

/// Compiles every exclusion rule once so bad patterns fail before the crawl
fn validate_exclusions(rules: &[String]) -> Result<(), ConfigError> {
    for rule in rules {
        ExclusionRule::parse(rule)?;
    }
    Ok(())
}
