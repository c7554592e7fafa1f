// SPDX-FileCopyrightText: 2026 Shopbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prompt assembly: system instruction, bounded history, optional product note.

use std::sync::Arc;

use shopbot_core::{Catalog, ChatMessage, ConversationStore, Language, Product, ShopbotError, UserId};
use tracing::debug;

use crate::locale;

/// Messages for one completion call plus the product they mention, if any.
#[derive(Debug, Clone)]
pub struct AssembledContext {
    pub messages: Vec<ChatMessage>,
    pub product: Option<Product>,
}

/// Builds the message list sent to the completion provider.
pub struct ContextAssembler {
    history: Arc<dyn ConversationStore>,
    catalog: Arc<dyn Catalog>,
    history_limit: usize,
}

impl ContextAssembler {
    pub fn new(
        history: Arc<dyn ConversationStore>,
        catalog: Arc<dyn Catalog>,
        history_limit: usize,
    ) -> Self {
        Self {
            history,
            catalog,
            history_limit,
        }
    }

    /// Only the last whitespace-separated token is looked up, so multi-word
    /// product names never match.
    pub fn product_candidate(text: &str) -> Option<&str> {
        text.split_whitespace().last()
    }

    /// Layout: `[instruction, history (oldest first, at most history_limit), product note?]`.
    ///
    /// The incoming message must already be persisted; it is read back as the
    /// last history entry.
    pub async fn build(
        &self,
        user_id: UserId,
        incoming_text: &str,
        language: Language,
        display_name: Option<&str>,
    ) -> Result<AssembledContext, ShopbotError> {
        let phrases = locale::phrases(language);
        let history = self.history.recent(user_id, self.history_limit).await?;

        let product = match Self::product_candidate(incoming_text) {
            Some(name) => self.catalog.find(name).await?,
            None => None,
        };

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(phrases.instruction_for(display_name)));
        messages.extend(history);
        if let Some(product) = &product {
            messages.push(ChatMessage::system(phrases.product_note(product)));
        }

        debug!(
            user_id = %user_id,
            messages = messages.len(),
            product = ?product.as_ref().map(|p| &p.name),
            "context assembled"
        );
        Ok(AssembledContext { messages, product })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopbot_core::Role;
    use shopbot_test_utils::{MemoryCatalog, MemoryStore};

    fn widget() -> Product {
        Product {
            name: "Widget".into(),
            description: "A widget".into(),
            unit_price: 9.99,
        }
    }

    fn assembler(store: Arc<MemoryStore>) -> ContextAssembler {
        let catalog = Arc::new(MemoryCatalog::with_products(vec![widget()]));
        ContextAssembler::new(store, catalog, 10)
    }

    #[tokio::test]
    async fn product_note_is_last_and_instruction_first() {
        let store = Arc::new(MemoryStore::default());
        store.append(UserId(1), Role::User, "Do you sell Widget").await.unwrap();

        let ctx = assembler(store)
            .build(UserId(1), "Do you sell Widget", Language::En, None)
            .await
            .unwrap();

        assert_eq!(ctx.messages.len(), 3);
        assert_eq!(ctx.messages[0].role, Role::System);
        assert!(ctx.messages[0].content.starts_with("You are a sales assistant"));
        assert_eq!(ctx.messages[1], ChatMessage::new(Role::User, "Do you sell Widget"));
        let note = &ctx.messages[2];
        assert_eq!(note.role, Role::System);
        assert!(note.content.contains("Widget"));
        assert!(note.content.contains("A widget"));
        assert!(note.content.contains("9.99"));
        assert_eq!(ctx.product, Some(widget()));
    }

    #[tokio::test]
    async fn history_window_is_bounded() {
        let store = Arc::new(MemoryStore::default());
        for i in 0..14 {
            store.append(UserId(2), Role::User, &format!("m{i}")).await.unwrap();
        }

        let ctx = assembler(store)
            .build(UserId(2), "m13", Language::Ru, Some("Олег"))
            .await
            .unwrap();

        assert_eq!(ctx.messages.len(), 11);
        assert!(ctx.messages[0].content.contains("Клиента зовут Олег"));
        assert_eq!(ctx.messages[1].content, "m4");
        assert_eq!(ctx.messages[10].content, "m13");
        assert!(ctx.product.is_none());
    }

    #[tokio::test]
    async fn only_last_token_is_matched() {
        let store = Arc::new(MemoryStore::default());
        let ctx = assembler(store)
            .build(UserId(3), "Widget please", Language::En, None)
            .await
            .unwrap();
        assert!(ctx.product.is_none());
        assert_eq!(ContextAssembler::product_candidate("   "), None);
    }
}
