// SPDX-FileCopyrightText: 2026 Shopbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Shopbot sales assistant.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup.

use serde::{Deserialize, Serialize};
use shopbot_core::Language;

/// Top-level Shopbot configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ShopbotConfig {
    /// Assistant identity and conversation settings.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Worker pool and runtime settings.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Telegram bot settings.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Chat-completion provider settings.
    #[serde(default)]
    pub openai: OpenAiConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Assistant identity and conversation configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name used in logs.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Language used when detection fails and nothing is stored for the user.
    #[serde(default)]
    pub default_language: Language,

    /// Number of past messages included in each completion request.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
            default_language: Language::default(),
            history_limit: default_history_limit(),
        }
    }
}

fn default_agent_name() -> String {
    "shopbot".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_history_limit() -> usize {
    10
}

/// Tokio runtime flavor the binary starts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeFlavor {
    /// Work-stealing thread pool.
    #[default]
    MultiThread,
    /// Single-threaded cooperative event loop.
    CurrentThread,
}

/// Worker pool configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DispatchConfig {
    #[serde(default)]
    pub runtime: RuntimeFlavor,

    /// Maximum number of events handled concurrently.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Seconds to wait for in-flight events on shutdown.
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            runtime: RuntimeFlavor::default(),
            max_workers: default_max_workers(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
        }
    }
}

fn default_max_workers() -> usize {
    20
}

fn default_shutdown_timeout_secs() -> u64 {
    30
}

/// Telegram bot configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    /// Telegram Bot API token. Falls back to `TELEGRAM_TOKEN` when unset.
    #[serde(default)]
    pub bot_token: Option<String>,
}

/// OpenAI-compatible completion endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OpenAiConfig {
    /// API key. Falls back to `OPENAI_API_KEY` when unset.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Base URL up to and including the version segment.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Cap on generated tokens per reply.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Upper bound on a single completion call, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_max_tokens() -> u32 {
    500
}

fn default_temperature() -> f32 {
    0.7
}

fn default_timeout_secs() -> u64 {
    60
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Separate product database. `None` reads products from `database_path`.
    #[serde(default)]
    pub catalog_path: Option<String>,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            catalog_path: None,
            wal_mode: default_wal_mode(),
        }
    }
}

impl StorageConfig {
    /// Path the catalog reads from.
    pub fn catalog_database(&self) -> &str {
        self.catalog_path.as_deref().unwrap_or(&self.database_path)
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("shopbot").join("shopbot.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("shopbot.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}
