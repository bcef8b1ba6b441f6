use crate::api::SEARCH_TYPE_KEY;
use crate::config::types::{
    CaptchaConfig, Config, HttpConfig, OutputConfig, SearchConfig, MAX_OFFERS_BATCH_SIZE,
};
use crate::ConfigError;
use reqwest::header::{HeaderName, HeaderValue};
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_search_config(&config.search)?;
    validate_http_config(&config.http)?;
    validate_captcha_config(&config.captcha)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates search settings and the filter map
fn validate_search_config(config: &SearchConfig) -> Result<(), ConfigError> {
    if config.search_type.trim().is_empty() {
        return Err(ConfigError::Validation(
            "search_type cannot be empty".to_string(),
        ));
    }

    if !config.max_cell_size_meters.is_finite() || config.max_cell_size_meters <= 0.0 {
        return Err(ConfigError::Validation(format!(
            "max_cell_size_meters must be a positive number, got {}",
            config.max_cell_size_meters
        )));
    }

    validate_workers("max_workers_collect_ids", config.max_workers_collect_ids)?;
    validate_workers(
        "max_workers_collect_offers",
        config.max_workers_collect_offers,
    )?;

    if config.offers_batch_size < 1 || config.offers_batch_size > MAX_OFFERS_BATCH_SIZE {
        return Err(ConfigError::Validation(format!(
            "offers_batch_size must be between 1 and {}, got {}",
            MAX_OFFERS_BATCH_SIZE, config.offers_batch_size
        )));
    }

    for key in config.query.keys() {
        if key.is_empty() {
            return Err(ConfigError::Validation(
                "search query keys cannot be empty".to_string(),
            ));
        }
        if key == SEARCH_TYPE_KEY {
            return Err(ConfigError::Validation(format!(
                "search query key '{}' is reserved, use search_type instead",
                SEARCH_TYPE_KEY
            )));
        }
    }

    Ok(())
}

fn validate_workers(name: &str, value: usize) -> Result<(), ConfigError> {
    if !(1..=100).contains(&value) {
        return Err(ConfigError::Validation(format!(
            "{} must be between 1 and 100, got {}",
            name, value
        )));
    }
    Ok(())
}

/// Validates HTTP session settings
fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    validate_http_url("base_url", &config.base_url)?;

    if config.user_agent.is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "http timeout_secs must be > 0".to_string(),
        ));
    }

    for (name, value) in &config.headers {
        HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ConfigError::InvalidHeader(format!("'{}': {}", name, e)))?;
        HeaderValue::from_str(value)
            .map_err(|e| ConfigError::InvalidHeader(format!("'{}' value: {}", name, e)))?;
    }

    Ok(())
}

/// Validates captcha service settings
fn validate_captcha_config(config: &CaptchaConfig) -> Result<(), ConfigError> {
    if config.api_key.trim().is_empty() {
        return Err(ConfigError::Validation(
            "captcha api_key cannot be empty".to_string(),
        ));
    }

    validate_http_url("captcha service_url", &config.service_url)?;

    if config.poll_interval_secs < 1 {
        return Err(ConfigError::Validation(
            "captcha poll_interval_secs must be >= 1".to_string(),
        ));
    }

    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "captcha timeout_secs must be > 0".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.offers_path.is_empty() {
        return Err(ConfigError::Validation(
            "offers_path cannot be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_http_url(name: &str, value: &str) -> Result<(), ConfigError> {
    let url =
        Url::parse(value).map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", name, e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} must use http or https, got '{}'",
            name, value
        )));
    }

    Ok(())
}
