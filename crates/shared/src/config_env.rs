use std::env;

use url::Url;

use crate::config::ConfigError;

pub(crate) fn parse_u32_env(key: &str, default: u32) -> Result<u32, ConfigError> {
    match optional_trimmed_env(key) {
        Some(raw) => raw
            .parse::<u32>()
            .map_err(|_| ConfigError::ParseInt(key.to_string())),
        None => Ok(default),
    }
}

pub(crate) fn parse_u64_env(key: &str, default: u64) -> Result<u64, ConfigError> {
    match optional_trimmed_env(key) {
        Some(raw) => raw
            .parse::<u64>()
            .map_err(|_| ConfigError::ParseInt(key.to_string())),
        None => Ok(default),
    }
}

pub(crate) fn parse_f64_env(key: &str, default: f64) -> Result<f64, ConfigError> {
    match optional_trimmed_env(key) {
        Some(raw) => raw
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .ok_or_else(|| ConfigError::ParseFloat(key.to_string())),
        None => Ok(default),
    }
}

pub(crate) fn parse_http_url_env(key: &str, default: &str) -> Result<String, ConfigError> {
    let raw = optional_trimmed_env(key).unwrap_or_else(|| default.to_string());
    let parsed = Url::parse(&raw).map_err(|_| {
        ConfigError::InvalidConfiguration(format!("{key} must be a valid URL, got '{raw}'"))
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidConfiguration(format!(
            "{key} must start with http:// or https://"
        )));
    }

    Ok(raw.trim_end_matches('/').to_string())
}

pub(crate) fn optional_trimmed_env(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
