use crate::config::types::{
    Config, PageConfig, PaginationConfig, PoolConfig, TargetConfig, UserAgentConfig,
    MAX_POOL_SIZE,
};
use crate::url::UrlTemplate;
use crate::ConfigError;
use scraper::Selector;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_target_config(&config.target)?;
    validate_pagination_config(&config.pagination)?;
    validate_page_config(&config.page)?;
    validate_pool_config(&config.pool)?;
    validate_user_agent_config(&config.user_agent)?;
    Ok(())
}

/// Validates the URL template
fn validate_target_config(config: &TargetConfig) -> Result<(), ConfigError> {
    UrlTemplate::parse(&config.url_template)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid url-template: {}", e)))?;
    Ok(())
}

/// Validates the offset range
fn validate_pagination_config(config: &PaginationConfig) -> Result<(), ConfigError> {
    if config.step < 1 {
        return Err(ConfigError::Validation(format!(
            "step must be >= 1, got {}",
            config.step
        )));
    }

    if config.start_min > config.start_max {
        return Err(ConfigError::Validation(format!(
            "start-min ({}) must not exceed start-max ({})",
            config.start_min, config.start_max
        )));
    }

    if config.start_max.checked_add(config.step).is_none() {
        return Err(ConfigError::Validation(format!(
            "start-max ({}) + step ({}) overflows",
            config.start_max, config.step
        )));
    }

    Ok(())
}

/// Validates per-page fetch behavior
fn validate_page_config(config: &PageConfig) -> Result<(), ConfigError> {
    if config.retry_budget < 1 {
        return Err(ConfigError::Validation(
            "retry-budget must be >= 1".to_string(),
        ));
    }

    if config.load_timeout_ms < 1 {
        return Err(ConfigError::Validation(
            "load-timeout-ms must be >= 1".to_string(),
        ));
    }

    if config.interaction_timeout_ms < 1 {
        return Err(ConfigError::Validation(
            "interaction-timeout-ms must be >= 1".to_string(),
        ));
    }

    validate_selector("content-selector", &config.content_selector)?;
    validate_selector("reload-selector", &config.reload_selector)?;

    Ok(())
}

/// Validates worker pool sizing
fn validate_pool_config(config: &PoolConfig) -> Result<(), ConfigError> {
    if config.per_core < 1 {
        return Err(ConfigError::Validation(format!(
            "per-core must be >= 1, got {}",
            config.per_core
        )));
    }

    validate_pool_size(config.resolved_size())
}

/// Validates a resolved pool size, including CLI overrides
pub fn validate_pool_size(size: usize) -> Result<(), ConfigError> {
    if size < 1 || size > MAX_POOL_SIZE {
        return Err(ConfigError::Validation(format!(
            "pool size must be between 1 and {}, got {}",
            MAX_POOL_SIZE, size
        )));
    }
    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler-name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "crawler-name must contain only alphanumeric characters, hyphens and underscores, got '{}'",
            config.crawler_name
        )));
    }

    Ok(())
}

fn validate_selector(key: &str, selector: &str) -> Result<(), ConfigError> {
    if selector.trim().is_empty() {
        return Err(ConfigError::InvalidSelector(format!("{} cannot be empty", key)));
    }

    Selector::parse(selector)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidSelector(format!("{} '{}': {:?}", key, selector, e)))
}
