// SPDX-FileCopyrightText: 2026 Shopbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use crate::diagnostic::ConfigError;
use crate::model::ShopbotConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every failure instead of stopping at the first one.
pub fn validate_config(config: &ShopbotConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    if let Some(path) = &config.storage.catalog_path
        && path.trim().is_empty()
    {
        fail("storage.catalog_path must not be empty when set".to_string());
    }

    if config.agent.history_limit == 0 {
        fail("agent.history_limit must be at least 1".to_string());
    }

    if config.dispatch.max_workers == 0 {
        fail("dispatch.max_workers must be at least 1".to_string());
    }

    if config.dispatch.shutdown_timeout_secs == 0 {
        fail("dispatch.shutdown_timeout_secs must be at least 1".to_string());
    }

    if config.openai.max_tokens == 0 {
        fail("openai.max_tokens must be at least 1".to_string());
    }

    let temperature = config.openai.temperature;
    if !(0.0..=2.0).contains(&temperature) {
        fail(format!(
            "openai.temperature must be between 0 and 2, got {temperature}"
        ));
    }

    if config.openai.timeout_secs == 0 {
        fail("openai.timeout_secs must be at least 1".to_string());
    }

    let base_url = config.openai.base_url.trim();
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        fail(format!(
            "openai.base_url `{base_url}` must start with http:// or https://"
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&ShopbotConfig::default()).is_ok());
    }

    #[test]
    fn collects_every_failure() {
        let mut config = ShopbotConfig::default();
        config.storage.database_path = "  ".into();
        config.dispatch.max_workers = 0;
        config.openai.temperature = 3.5;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("temperature"))
        ));
    }

    #[test]
    fn rejects_non_http_base_url() {
        let mut config = ShopbotConfig::default();
        config.openai.base_url = "ftp://example.com".into();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
    }
}
