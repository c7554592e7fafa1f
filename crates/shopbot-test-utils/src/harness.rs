// SPDX-FileCopyrightText: 2026 Shopbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` wires the real pipeline and purchase desk to a temp SQLite
//! database, a seeded catalog, a [`MockProvider`] and a [`MockChannel`].

use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};
use std::time::Duration;

use shopbot_agent::{MessagePipeline, PipelineSettings, PipelineStep, PurchaseDesk, PurchaseOutcome};
use shopbot_config::ShopbotConfig;
use shopbot_config::model::StorageConfig;
use shopbot_core::{
    CallbackEvent, ChatId, InboundMessage, Product, Sender, ShopbotError, StorageAdapter, UserId,
};
use shopbot_storage::{SqliteCatalog, SqliteStorage};

use crate::mock_channel::MockChannel;
use crate::mock_provider::MockProvider;

/// Builder for [`TestHarness`].
pub struct TestHarnessBuilder {
    responses: Vec<String>,
    products: Vec<Product>,
    provider_delay: Option<Duration>,
    completion_timeout: Option<Duration>,
    history_limit: Option<usize>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            responses: Vec::new(),
            products: Vec::new(),
            provider_delay: None,
            completion_timeout: None,
            history_limit: None,
        }
    }

    /// Replies the mock provider returns, in order.
    pub fn with_mock_responses(mut self, responses: Vec<String>) -> Self {
        self.responses = responses;
        self
    }

    /// Products seeded into the catalog.
    pub fn with_products(mut self, products: Vec<Product>) -> Self {
        self.products = products;
        self
    }

    /// Makes every completion call take `delay`.
    pub fn with_provider_delay(mut self, delay: Duration) -> Self {
        self.provider_delay = Some(delay);
        self
    }

    pub fn with_completion_timeout(mut self, timeout: Duration) -> Self {
        self.completion_timeout = Some(timeout);
        self
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = Some(limit);
        self
    }

    pub async fn build(self) -> Result<TestHarness, ShopbotError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| ShopbotError::Storage { source: e.into() })?;
        let db_path = temp_dir
            .path()
            .join("shopbot.db")
            .to_string_lossy()
            .into_owned();

        let mut config = ShopbotConfig {
            storage: StorageConfig {
                database_path: db_path.clone(),
                catalog_path: None,
                wal_mode: true,
            },
            ..ShopbotConfig::default()
        };
        if let Some(limit) = self.history_limit {
            config.agent.history_limit = limit;
        }

        let storage = Arc::new(SqliteStorage::new(config.storage.clone()));
        storage.initialize().await?;

        let catalog = Arc::new(SqliteCatalog::open(config.storage.catalog_database()).await?);
        for product in &self.products {
            catalog.upsert(product).await?;
        }

        let mut provider = MockProvider::with_responses(self.responses);
        if let Some(delay) = self.provider_delay {
            provider = provider.with_delay(delay);
        }
        let provider = Arc::new(provider);
        let channel = Arc::new(MockChannel::new());

        let mut settings = PipelineSettings::from_config(&config);
        if let Some(timeout) = self.completion_timeout {
            settings.completion_timeout = timeout;
        }

        let pipeline = Arc::new(MessagePipeline::new(
            storage.clone(),
            storage.clone(),
            catalog.clone(),
            provider.clone(),
            channel.clone(),
            settings,
        ));
        let purchases = Arc::new(PurchaseDesk::new(
            catalog.clone(),
            storage.clone(),
            storage.clone(),
            channel.clone(),
            config.agent.default_language,
        ));

        Ok(TestHarness {
            provider,
            channel,
            storage,
            catalog,
            pipeline,
            purchases,
            config,
            next_message_id: AtomicI32::new(1),
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with mock adapters and temp storage.
pub struct TestHarness {
    pub provider: Arc<MockProvider>,
    pub channel: Arc<MockChannel>,
    /// SQLite storage (temp DB, removed on drop).
    pub storage: Arc<SqliteStorage>,
    pub catalog: Arc<SqliteCatalog>,
    pub pipeline: Arc<MessagePipeline>,
    pub purchases: Arc<PurchaseDesk>,
    pub config: ShopbotConfig,
    next_message_id: AtomicI32,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// A private-chat text message from `user`.
    pub fn message(&self, user: i64, text: &str) -> InboundMessage {
        InboundMessage {
            message_id: self.next_message_id.fetch_add(1, Ordering::SeqCst),
            chat_id: ChatId(user),
            sender: Sender {
                id: UserId(user),
                display_name: None,
            },
            text: text.to_string(),
            timestamp: chrono::Utc::now(),
        }
    }

    /// Runs one message through the pipeline.
    pub async fn send_message(&self, user: i64, text: &str) -> PipelineStep {
        let msg = self.message(user, text);
        self.pipeline.handle_message(&msg).await
    }

    /// Sends `/start` from `user`.
    pub async fn start(&self, user: i64) -> Result<(), ShopbotError> {
        let msg = self.message(user, "/start");
        self.pipeline.handle_start(&msg).await
    }

    /// Presses an inline button carrying `data`.
    pub async fn press(&self, user: i64, data: &str) -> PurchaseOutcome {
        let event = CallbackEvent {
            callback_id: format!("cb-{}", self.next_message_id.fetch_add(1, Ordering::SeqCst)),
            chat_id: ChatId(user),
            from_user: UserId(user),
            data: data.to_string(),
        };
        self.purchases.handle_callback(&event).await
    }
}
