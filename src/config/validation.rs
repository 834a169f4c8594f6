use super::models::{Config, TransferMode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("HTTP timeout must be positive: {field} = {value}")]
    InvalidTimeout { field: &'static str, value: u64 },

    #[error("HTTP user agent must not be empty")]
    EmptyUserAgent,

    #[error("Dispatch queue label must not be empty")]
    EmptyDispatchLabel,

    #[error("max_in_memory_bytes must be positive when transfer mode is 'auto'")]
    InvalidInMemoryThreshold,
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_dispatch(config)?;
    validate_http(config)?;
    validate_transfer(config)?;
    Ok(())
}

fn validate_dispatch(config: &Config) -> Result<(), ValidationError> {
    if config.dispatch.label.trim().is_empty() {
        return Err(ValidationError::EmptyDispatchLabel);
    }
    Ok(())
}

fn validate_http(config: &Config) -> Result<(), ValidationError> {
    let http = &config.http;

    if http.connect_timeout_secs == 0 {
        return Err(ValidationError::InvalidTimeout {
            field: "connect_timeout_secs",
            value: http.connect_timeout_secs,
        });
    }
    if http.request_timeout_secs == 0 {
        return Err(ValidationError::InvalidTimeout {
            field: "request_timeout_secs",
            value: http.request_timeout_secs,
        });
    }
    if http.user_agent.trim().is_empty() {
        return Err(ValidationError::EmptyUserAgent);
    }

    Ok(())
}

fn validate_transfer(config: &Config) -> Result<(), ValidationError> {
    if config.transfer.mode == TransferMode::Auto && config.transfer.max_in_memory_bytes.as_u64() == 0 {
        return Err(ValidationError::InvalidInMemoryThreshold);
    }
    Ok(())
}
