// SPDX-FileCopyrightText: 2026 Shopbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Shopbot sales assistant.
//!
//! This crate provides the trait definitions, error type, and common types
//! shared by the storage, provider, transport, and pipeline crates.

pub mod error;
pub mod traits;
pub mod types;

pub use error::ShopbotError;
pub use types::{
    AdapterType, CallbackEvent, ChatId, ChatMessage, CompletionRequest, CompletionResponse,
    HealthStatus, InboundEvent, InboundMessage, InlineAction, Language, Order, Product, Role,
    Sender, StoredMessage, TokenUsage, User, UserId,
};

pub use traits::{
    Catalog, ChannelAdapter, ConversationStore, OrderLedger, PluginAdapter, ProviderAdapter,
    StorageAdapter, UserDirectory,
};
