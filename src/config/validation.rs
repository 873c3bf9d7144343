//! Configuration validation.
//!
//! Serde handles the syntactic side (including address parsing); this module
//! checks value ranges and URLs. All errors are collected, not just the first.

use std::fmt;

use crate::config::schema::MrvConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    /// What is wrong with it.
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &MrvConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_http_url(&mut errors, "network.rpc_url", &config.network.rpc_url);
    for url in &config.network.failover_urls {
        check_http_url(&mut errors, "network.failover_urls", url);
    }
    check_http_url(&mut errors, "network.explorer_url", &config.network.explorer_url);

    if config.network.chain_id == 0 {
        errors.push(ValidationError::new("network.chain_id", "must be non-zero"));
    }

    if config.contracts.carbon_credit.is_zero() {
        errors.push(ValidationError::new(
            "contracts.carbon_credit",
            "must not be the zero address",
        ));
    }
    if config.contracts.plantation_registry.is_zero() {
        errors.push(ValidationError::new(
            "contracts.plantation_registry",
            "must not be the zero address",
        ));
    }
    if config.contracts.carbon_credit == config.contracts.plantation_registry {
        errors.push(ValidationError::new(
            "contracts.plantation_registry",
            "must differ from contracts.carbon_credit",
        ));
    }

    if config.blockchain.rpc_timeout_secs == 0 {
        errors.push(ValidationError::new("blockchain.rpc_timeout_secs", "must be > 0"));
    }
    if config.blockchain.confirmation_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "blockchain.confirmation_timeout_secs",
            "must be > 0",
        ));
    }
    if config.blockchain.confirmation_poll_ms == 0 {
        errors.push(ValidationError::new("blockchain.confirmation_poll_ms", "must be > 0"));
    }

    if config.history.transaction_limit == 0 {
        errors.push(ValidationError::new("history.transaction_limit", "must be > 0"));
    }
    if config.history.feed_capacity == 0 {
        errors.push(ValidationError::new("history.feed_capacity", "must be > 0"));
    }
    if config.history.feed_poll_interval_ms == 0 {
        errors.push(ValidationError::new("history.feed_poll_interval_ms", "must be > 0"));
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("unknown level '{}'", config.observability.log_level),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_http_url(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    match url::Url::parse(value) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
        Ok(url) => errors.push(ValidationError::new(
            field,
            format!("unsupported scheme '{}' in '{}'", url.scheme(), value),
        )),
        Err(e) => errors.push(ValidationError::new(field, format!("invalid URL '{}': {}", value, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::Address;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&MrvConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = MrvConfig::default();
        config.network.rpc_url = "not a url".to_string();
        config.contracts.carbon_credit = Address::ZERO;
        config.history.feed_capacity = 0;
        config.observability.log_level = "loud".to_string();

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert!(fields.contains(&"network.rpc_url"));
        assert!(fields.contains(&"contracts.carbon_credit"));
        assert!(fields.contains(&"history.feed_capacity"));
        assert!(fields.contains(&"observability.log_level"));
    }

    #[test]
    fn test_rejects_websocket_scheme() {
        let mut config = MrvConfig::default();
        config.network.rpc_url = "ws://localhost:8546".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("unsupported scheme"));
    }

    #[test]
    fn test_placeholder_mrv_address_is_allowed() {
        let config = MrvConfig::default();
        assert!(config.contracts.mrv.is_zero());
        assert!(validate_config(&config).is_ok());
    }
}
