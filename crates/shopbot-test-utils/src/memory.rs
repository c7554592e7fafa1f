// SPDX-FileCopyrightText: 2026 Shopbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory implementations of the store traits.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use shopbot_core::{
    Catalog, ChatMessage, ConversationStore, Language, Order, OrderLedger, Product, Role,
    ShopbotError, StoredMessage, User, UserDirectory, UserId,
};

#[derive(Default)]
struct State {
    history: Vec<StoredMessage>,
    users: HashMap<UserId, User>,
    orders: Vec<Order>,
}

/// Conversation store, user directory and order ledger kept in memory.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    ledger_down: AtomicBool,
}

impl MemoryStore {
    /// Makes every subsequent `record` call fail.
    pub fn fail_ledger(&self, fail: bool) {
        self.ledger_down.store(fail, Ordering::SeqCst);
    }

    /// Every stored message of `user_id`, oldest first.
    pub async fn history(&self, user_id: UserId) -> Vec<StoredMessage> {
        self.state
            .lock()
            .await
            .history
            .iter()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect()
    }

    /// Every recorded order.
    pub async fn orders(&self) -> Vec<Order> {
        self.state.lock().await.orders.clone()
    }
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn append(
        &self,
        user_id: UserId,
        role: Role,
        content: &str,
    ) -> Result<StoredMessage, ShopbotError> {
        if content.trim().is_empty() {
            return Err(ShopbotError::InvalidInput("message content is empty".into()));
        }
        let mut state = self.state.lock().await;
        let message = StoredMessage {
            id: state.history.len() as i64 + 1,
            user_id,
            role,
            content: content.to_string(),
            created_at: now(),
        };
        state.history.push(message.clone());
        Ok(message)
    }

    async fn recent(
        &self,
        user_id: UserId,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, ShopbotError> {
        let state = self.state.lock().await;
        let mine: Vec<_> = state
            .history
            .iter()
            .filter(|m| m.user_id == user_id)
            .collect();
        let skip = mine.len().saturating_sub(limit);
        Ok(mine
            .into_iter()
            .skip(skip)
            .map(|m| ChatMessage::new(m.role, m.content.clone()))
            .collect())
    }
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn exists(&self, user_id: UserId) -> Result<bool, ShopbotError> {
        Ok(self.state.lock().await.users.contains_key(&user_id))
    }

    async fn create(
        &self,
        user_id: UserId,
        display_name: Option<&str>,
    ) -> Result<(), ShopbotError> {
        let mut state = self.state.lock().await;
        if state.users.contains_key(&user_id) {
            return Err(ShopbotError::Conflict {
                entity: "user".into(),
                key: user_id.to_string(),
            });
        }
        state.users.insert(
            user_id,
            User {
                id: user_id,
                display_name: display_name.map(str::to_string),
                language: None,
                created_at: now(),
            },
        );
        Ok(())
    }

    async fn get(&self, user_id: UserId) -> Result<Option<User>, ShopbotError> {
        Ok(self.state.lock().await.users.get(&user_id).cloned())
    }

    async fn set_language(
        &self,
        user_id: UserId,
        language: Language,
    ) -> Result<(), ShopbotError> {
        let mut state = self.state.lock().await;
        state
            .users
            .entry(user_id)
            .or_insert_with(|| User {
                id: user_id,
                display_name: None,
                language: None,
                created_at: now(),
            })
            .language = Some(language);
        Ok(())
    }

    async fn get_language(&self, user_id: UserId) -> Result<Option<Language>, ShopbotError> {
        Ok(self
            .state
            .lock()
            .await
            .users
            .get(&user_id)
            .and_then(|u| u.language))
    }
}

#[async_trait]
impl OrderLedger for MemoryStore {
    async fn record(
        &self,
        user_id: UserId,
        product_name: &str,
        quantity: u32,
        unit_cost: f64,
    ) -> Result<i64, ShopbotError> {
        if self.ledger_down.load(Ordering::SeqCst) {
            return Err(ShopbotError::Storage {
                source: "ledger unavailable".into(),
            });
        }
        if quantity == 0 {
            return Err(ShopbotError::InvalidInput("quantity must be positive".into()));
        }
        let mut state = self.state.lock().await;
        let order_id = state.orders.len() as i64 + 1;
        state.orders.push(Order {
            order_id,
            user_id,
            product_name: product_name.to_string(),
            quantity,
            unit_cost,
            total_cost: unit_cost * f64::from(quantity),
            created_at: now(),
        });
        Ok(order_id)
    }
}

/// A fixed product list.
#[derive(Default)]
pub struct MemoryCatalog {
    products: Vec<Product>,
}

impl MemoryCatalog {
    pub fn with_products(products: Vec<Product>) -> Self {
        Self { products }
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn find(&self, name: &str) -> Result<Option<Product>, ShopbotError> {
        Ok(self.products.iter().find(|p| p.name == name).cloned())
    }
}
