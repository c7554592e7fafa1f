// SPDX-FileCopyrightText: 2026 Shopbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resolution of the two secrets the service cannot start without.

use shopbot_core::ShopbotError;

use crate::model::ShopbotConfig;

/// Environment variable consulted when `telegram.bot_token` is unset.
pub const TELEGRAM_TOKEN_ENV: &str = "TELEGRAM_TOKEN";

/// Environment variable consulted when `openai.api_key` is unset.
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Secrets resolved from config or the conventional environment variables.
#[derive(Clone)]
pub struct Credentials {
    pub telegram_token: String,
    pub openai_api_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("telegram_token", &"[REDACTED]")
            .field("openai_api_key", &"[REDACTED]")
            .finish()
    }
}

impl Credentials {
    /// Resolves both secrets. A missing one is a fatal [`ShopbotError::Config`].
    pub fn resolve(config: &ShopbotConfig) -> Result<Self, ShopbotError> {
        Ok(Self {
            telegram_token: resolve_secret(
                config.telegram.bot_token.as_deref(),
                "telegram.bot_token",
                TELEGRAM_TOKEN_ENV,
            )?,
            openai_api_key: resolve_secret(
                config.openai.api_key.as_deref(),
                "openai.api_key",
                OPENAI_API_KEY_ENV,
            )?,
        })
    }
}

/// Returns the configured value, else the env var, else an error naming both.
pub fn resolve_secret(
    configured: Option<&str>,
    key: &str,
    env_var: &str,
) -> Result<String, ShopbotError> {
    configured
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .or_else(|| {
            std::env::var(env_var)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        })
        .ok_or_else(|| {
            ShopbotError::Config(format!("{key} is not set and {env_var} is empty or missing"))
        })
}
