// SPDX-FileCopyrightText: 2026 Shopbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the Shopbot pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Telegram user identifier. Every per-user record is keyed by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Chat identifier on the transport side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(pub i64);

impl std::fmt::Display for ChatId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Supported conversation languages.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Ru,
    #[default]
    En,
}

impl Language {
    /// Two-letter code stored in the database.
    pub fn code(self) -> &'static str {
        match self {
            Self::Ru => "ru",
            Self::En => "en",
        }
    }
}

/// Author role of a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A role/content pair as sent to the completion provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }
}

/// A persisted conversation message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    pub id: i64,
    pub user_id: UserId,
    pub role: Role,
    pub content: String,
    /// ISO 8601 / RFC 3339 timestamp.
    pub created_at: String,
}

impl From<StoredMessage> for ChatMessage {
    fn from(m: StoredMessage) -> Self {
        ChatMessage {
            role: m.role,
            content: m.content,
        }
    }
}

/// A known chat user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub display_name: Option<String>,
    pub language: Option<Language>,
    pub created_at: String,
}

/// A catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub name: String,
    pub description: String,
    pub unit_price: f64,
}

/// A confirmed purchase.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub order_id: i64,
    pub user_id: UserId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_cost: f64,
    pub total_cost: f64,
    pub created_at: String,
}

// --- Provider types ---

/// A request to the completion provider.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Token usage reported by the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// A completed response from the provider.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub id: String,
    pub content: String,
    pub model: String,
    pub usage: TokenUsage,
}

// --- Channel types ---

/// The author of an inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub id: UserId,
    pub display_name: Option<String>,
}

/// A text message received from the chat transport.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub message_id: i32,
    pub chat_id: ChatId,
    pub sender: Sender,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl InboundMessage {
    /// Whether the text is the `/start` command (optionally addressed to a bot).
    pub fn is_start_command(&self) -> bool {
        self.text
            .split_whitespace()
            .next()
            .map(|cmd| cmd == "/start" || cmd.starts_with("/start@"))
            .unwrap_or(false)
    }
}

/// A button press on an inline keyboard.
#[derive(Debug, Clone)]
pub struct CallbackEvent {
    /// Opaque handle the transport uses to answer the query.
    pub callback_id: String,
    pub chat_id: ChatId,
    pub from_user: UserId,
    pub data: String,
}

/// Everything the transport can deliver to the dispatcher.
#[derive(Debug, Clone)]
pub enum InboundEvent {
    Message(InboundMessage),
    Callback(CallbackEvent),
}

impl InboundEvent {
    /// The user the event belongs to, used for per-user serialization.
    pub fn user_id(&self) -> UserId {
        match self {
            Self::Message(m) => m.sender.id,
            Self::Callback(c) => c.from_user,
        }
    }
}

/// A single inline action button attached to an outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineAction {
    pub label: String,
    pub data: String,
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the type of adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Channel,
    Provider,
    Storage,
}
