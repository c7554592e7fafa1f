// SPDX-FileCopyrightText: 2026 Shopbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./shopbot.toml` > `~/.config/shopbot/shopbot.toml` >
//! `/etc/shopbot/shopbot.toml` with environment variable overrides via `SHOPBOT_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::ShopbotConfig;

/// Top-level sections, used to turn `SHOPBOT_<SECTION>_<KEY>` into `section.key`.
const SECTIONS: &[&str] = &["agent", "dispatch", "telegram", "openai", "storage"];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/shopbot/shopbot.toml` (system-wide)
/// 3. `~/.config/shopbot/shopbot.toml` (user XDG config)
/// 4. `./shopbot.toml` (local directory)
/// 5. `SHOPBOT_*` environment variables
pub fn load_config() -> Result<ShopbotConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<ShopbotConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ShopbotConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<ShopbotConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ShopbotConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for config loading, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(ShopbotConfig::default()))
        .merge(Toml::file("/etc/shopbot/shopbot.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("shopbot/shopbot.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("shopbot.toml"))
        .merge(env_provider())
}

/// Environment provider with explicit section mapping.
///
/// `Env::split("_")` would turn `SHOPBOT_OPENAI_API_KEY` into `openai.api.key`;
/// only the first segment names the section.
fn env_provider() -> Env {
    Env::prefixed("SHOPBOT_").map(|key| {
        let key_str = key.as_str();
        SECTIONS
            .iter()
            .find_map(|section| {
                key_str
                    .strip_prefix(section)
                    .and_then(|rest| rest.strip_prefix('_'))
                    .map(|rest| format!("{section}.{rest}"))
            })
            .unwrap_or_else(|| key_str.to_string())
            .into()
    })
}
