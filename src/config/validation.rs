//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses, URLs and value ranges
//! - Compile invalidation group patterns before they are needed
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: EdgeConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use regex::Regex;
use thiserror::Error;
use url::Url;

use crate::config::schema::EdgeConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

pub fn validate_config(config: &EdgeConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if config.manifests.dir.is_empty() {
        errors.push(ValidationError::new("manifests.dir", "must not be empty"));
    }

    if config.origin.region.is_empty() {
        errors.push(ValidationError::new("origin.region", "must not be empty"));
    }
    if config.origin.domain_name.is_empty() {
        errors.push(ValidationError::new("origin.domain_name", "must not be empty"));
    }

    check_http_url(&mut errors, "render.upstream_url", &config.render.upstream_url);
    if config.render.max_attempts == 0 {
        errors.push(ValidationError::new("render.max_attempts", "must be at least 1"));
    }
    if config.render.timeout_secs == 0 {
        errors.push(ValidationError::new("render.timeout_secs", "must be greater than 0"));
    }
    if config.render.base_delay_ms > config.render.max_delay_ms {
        errors.push(ValidationError::new(
            "render.base_delay_ms",
            "must not exceed render.max_delay_ms",
        ));
    }

    let regeneration = &config.regeneration;
    if regeneration.dedup_window_secs == 0 {
        errors.push(ValidationError::new("regeneration.dedup_window_secs", "must be greater than 0"));
    }
    if regeneration.send_rate_per_sec == 0 {
        errors.push(ValidationError::new("regeneration.send_rate_per_sec", "must be greater than 0"));
    }
    if regeneration.burst == 0 {
        errors.push(ValidationError::new("regeneration.burst", "must be greater than 0"));
    }
    if regeneration.channel_capacity == 0 {
        errors.push(ValidationError::new("regeneration.channel_capacity", "must be greater than 0"));
    }
    if regeneration.queue_name.as_deref() == Some("") {
        errors.push(ValidationError::new("regeneration.queue_name", "must not be empty when set"));
    }

    for (i, group) in config.invalidation.groups.iter().enumerate() {
        let field = |name: &str| format!("invalidation.groups[{i}].{name}");

        if let Err(e) = Regex::new(&group.regex) {
            errors.push(ValidationError::new(field("regex"), e.to_string()));
        }
        if group.max_access_number == 0 {
            errors.push(ValidationError::new(field("maxAccessNumber"), "must be greater than 0"));
        }
        if !group.invalidation_path.starts_with('/') {
            errors.push(ValidationError::new(field("invalidationPath"), "must start with '/'"));
        }
    }
    if let Some(url) = &config.invalidation.webhook_url {
        check_http_url(&mut errors, "invalidation.webhook_url", url);
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }

    let observability = &config.observability;
    if !LOG_LEVELS.contains(&observability.log_level.as_str()) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("'{}' is not one of {}", observability.log_level, LOG_LEVELS.join(", ")),
        ));
    }
    if observability.metrics_enabled && observability.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_http_url(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    match Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => errors.push(ValidationError::new(
            field,
            format!("unsupported scheme '{}'", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new(field, e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invalidation::InvalidationGroupConfig;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&EdgeConfig::default()), Ok(()));
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = EdgeConfig::default();
        config.listener.bind_address = "nowhere".into();
        config.render.upstream_url = "ftp://render".into();
        config.render.max_attempts = 0;
        config.invalidation.groups.push(InvalidationGroupConfig {
            regex: "(".into(),
            invalidation_path: "blog".into(),
            max_access_number: 0,
        });

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "listener.bind_address",
                "render.upstream_url",
                "render.max_attempts",
                "invalidation.groups[0].regex",
                "invalidation.groups[0].maxAccessNumber",
                "invalidation.groups[0].invalidationPath",
            ]
        );
    }

    #[test]
    fn test_metrics_address_checked_only_when_enabled() {
        let mut config = EdgeConfig::default();
        config.observability.metrics_address = "bad".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert!(validate_config(&config).is_err());
    }
}
