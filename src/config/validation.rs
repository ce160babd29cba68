use super::models::Config;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("api.base_url '{0}' must be an absolute http:// or https:// URL")]
    InvalidBaseUrl(String),

    #[error("Duration must be positive: {field}")]
    ZeroDuration { field: String },

    #[error(
        "polling.stats_interval ({stats}) must not be shorter than polling.status_interval ({status})"
    )]
    StatsFasterThanStatus { stats: String, status: String },

    #[error("api.user_agent must not be empty")]
    EmptyUserAgent,
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_api(config)?;
    validate_polling(config)?;
    Ok(())
}

fn validate_api(config: &Config) -> Result<(), ValidationError> {
    let base_url = &config.api.base_url;
    let parsed = reqwest::Url::parse(base_url)
        .map_err(|_| ValidationError::InvalidBaseUrl(base_url.clone()))?;

    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(ValidationError::InvalidBaseUrl(base_url.clone()));
    }

    if config.api.user_agent.trim().is_empty() {
        return Err(ValidationError::EmptyUserAgent);
    }

    for (field, value) in [
        ("api.connect_timeout", config.api.connect_timeout),
        ("api.request_timeout", config.api.request_timeout),
    ] {
        if value.is_zero() {
            return Err(ValidationError::ZeroDuration {
                field: field.to_string(),
            });
        }
    }

    Ok(())
}

/// Status and stats cadences are independent; stats must not outpace status
fn validate_polling(config: &Config) -> Result<(), ValidationError> {
    let polling = &config.polling;

    for (field, value) in [
        ("polling.status_interval", polling.status_interval),
        ("polling.stats_interval", polling.stats_interval),
    ] {
        if value.is_zero() {
            return Err(ValidationError::ZeroDuration {
                field: field.to_string(),
            });
        }
    }

    if polling.stats_interval < polling.status_interval {
        return Err(ValidationError::StatsFasterThanStatus {
            stats: polling.stats_interval.to_string(),
            status: polling.status_interval.to_string(),
        });
    }

    Ok(())
}
