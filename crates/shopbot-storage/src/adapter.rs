// SPDX-FileCopyrightText: 2026 Shopbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the storage traits.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use shopbot_config::model::StorageConfig;
use shopbot_core::{
    AdapterType, ChatMessage, ConversationStore, HealthStatus, Language, Order, OrderLedger,
    PluginAdapter, Role, ShopbotError, StorageAdapter, StoredMessage, User, UserDirectory,
    UserId,
};

use crate::database::Database;
use crate::queries;

/// SQLite-backed conversation store, user directory and order ledger.
///
/// The database is opened on the first call to [`StorageAdapter::initialize`];
/// every other operation fails until then.
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a new SqliteStorage with the given configuration.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Returns the underlying Database, or an error if not initialized.
    pub fn db(&self) -> Result<&Database, ShopbotError> {
        self.db.get().ok_or_else(|| ShopbotError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }

    /// All orders placed by a user.
    pub async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>, ShopbotError> {
        queries::orders::for_user(self.db()?, user_id).await
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, ShopbotError> {
        self.db()?
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ShopbotError> {
        if let Some(db) = self.db.get() {
            db.checkpoint().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), ShopbotError> {
        let db = Database::open_with_wal(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| ShopbotError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), ShopbotError> {
        self.db()?.checkpoint().await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

#[async_trait]
impl ConversationStore for SqliteStorage {
    async fn append(
        &self,
        user_id: UserId,
        role: Role,
        content: &str,
    ) -> Result<StoredMessage, ShopbotError> {
        queries::history::append(self.db()?, user_id, role, content).await
    }

    async fn recent(
        &self,
        user_id: UserId,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, ShopbotError> {
        let stored = queries::history::recent(self.db()?, user_id, limit).await?;
        Ok(stored.into_iter().map(ChatMessage::from).collect())
    }
}

#[async_trait]
impl UserDirectory for SqliteStorage {
    async fn exists(&self, user_id: UserId) -> Result<bool, ShopbotError> {
        queries::users::exists(self.db()?, user_id).await
    }

    async fn create(
        &self,
        user_id: UserId,
        display_name: Option<&str>,
    ) -> Result<(), ShopbotError> {
        queries::users::create(self.db()?, user_id, display_name).await
    }

    async fn get(&self, user_id: UserId) -> Result<Option<User>, ShopbotError> {
        queries::users::get(self.db()?, user_id).await
    }

    async fn set_language(
        &self,
        user_id: UserId,
        language: Language,
    ) -> Result<(), ShopbotError> {
        queries::users::set_language(self.db()?, user_id, language).await
    }

    async fn get_language(&self, user_id: UserId) -> Result<Option<Language>, ShopbotError> {
        queries::users::get_language(self.db()?, user_id).await
    }
}

#[async_trait]
impl OrderLedger for SqliteStorage {
    async fn record(
        &self,
        user_id: UserId,
        product_name: &str,
        quantity: u32,
        unit_cost: f64,
    ) -> Result<i64, ShopbotError> {
        queries::orders::record(self.db()?, user_id, product_name, quantity, unit_cost).await
    }
}
