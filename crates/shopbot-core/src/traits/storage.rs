// SPDX-FileCopyrightText: 2026 Shopbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage traits: backend lifecycle plus the per-concern stores the
//! pipeline depends on.

use async_trait::async_trait;

use crate::error::ShopbotError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ChatMessage, Language, Product, Role, StoredMessage, User, UserId};

/// Adapter for storage and persistence backends.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Initializes the storage backend (migrations, connection, etc.).
    async fn initialize(&self) -> Result<(), ShopbotError>;

    /// Closes the storage backend, flushing pending writes and releasing connections.
    async fn close(&self) -> Result<(), ShopbotError>;
}

/// Append-only per-user conversation history.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Persists one message. Blank content is rejected with
    /// [`ShopbotError::InvalidInput`].
    async fn append(
        &self,
        user_id: UserId,
        role: Role,
        content: &str,
    ) -> Result<StoredMessage, ShopbotError>;

    /// Returns at most `limit` of the user's most recent messages, oldest first.
    async fn recent(&self, user_id: UserId, limit: usize)
    -> Result<Vec<ChatMessage>, ShopbotError>;
}

/// Registry of known users and their language preference.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn exists(&self, user_id: UserId) -> Result<bool, ShopbotError>;

    /// Registers a new user. Fails with [`ShopbotError::Conflict`] if the id is taken.
    async fn create(
        &self,
        user_id: UserId,
        display_name: Option<&str>,
    ) -> Result<(), ShopbotError>;

    async fn get(&self, user_id: UserId) -> Result<Option<User>, ShopbotError>;

    async fn set_language(&self, user_id: UserId, language: Language)
    -> Result<(), ShopbotError>;

    async fn get_language(&self, user_id: UserId) -> Result<Option<Language>, ShopbotError>;
}

/// Read-only product lookup.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Exact-name lookup. Unknown names are `Ok(None)`.
    async fn find(&self, name: &str) -> Result<Option<Product>, ShopbotError>;
}

/// Append-only order book.
#[async_trait]
pub trait OrderLedger: Send + Sync {
    /// Records an order and returns the store-assigned order id.
    async fn record(
        &self,
        user_id: UserId,
        product_name: &str,
        quantity: u32,
        unit_cost: f64,
    ) -> Result<i64, ShopbotError>;
}
