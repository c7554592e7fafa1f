// SPDX-FileCopyrightText: 2026 Shopbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock channel adapter for deterministic testing.
//!
//! `MockChannel` implements `ChannelAdapter` with injectable inbound events
//! and captured outbound calls for assertion in tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use shopbot_core::{
    AdapterType, ChannelAdapter, ChatId, HealthStatus, InboundEvent, InlineAction, PluginAdapter,
    ShopbotError,
};

/// One captured outbound call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Text {
        chat_id: ChatId,
        text: String,
    },
    Reply {
        chat_id: ChatId,
        message_id: i32,
        text: String,
    },
    WithAction {
        chat_id: ChatId,
        text: String,
        action: InlineAction,
    },
    CallbackAnswer {
        callback_id: String,
        text: Option<String>,
    },
}

/// A mock messaging channel.
///
/// Events injected via [`MockChannel::inject`] are returned by `receive()`.
/// After [`MockChannel::close`], queued events are still delivered, then
/// `receive()` fails.
pub struct MockChannel {
    inbound: Mutex<VecDeque<InboundEvent>>,
    sent: Mutex<Vec<Outbound>>,
    notify: Notify,
    closed: AtomicBool,
    failing_sends: AtomicBool,
    failing_actions: AtomicBool,
}

impl MockChannel {
    pub fn new() -> Self {
        Self {
            inbound: Mutex::new(VecDeque::new()),
            sent: Mutex::new(Vec::new()),
            notify: Notify::new(),
            closed: AtomicBool::new(false),
            failing_sends: AtomicBool::new(false),
            failing_actions: AtomicBool::new(false),
        }
    }

    pub async fn inject(&self, event: InboundEvent) {
        self.inbound.lock().await.push_back(event);
        self.notify.notify_one();
    }

    pub async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }

    /// Makes `send_text`, `reply_to` and `send_with_action` fail.
    pub fn fail_sends(&self, fail: bool) {
        self.failing_sends.store(fail, Ordering::SeqCst);
    }

    /// Makes only `send_with_action` fail.
    pub fn fail_actions(&self, fail: bool) {
        self.failing_actions.store(fail, Ordering::SeqCst);
    }

    pub async fn sent(&self) -> Vec<Outbound> {
        self.sent.lock().await.clone()
    }

    /// Texts of plain `send_text` calls.
    pub async fn sent_texts(&self) -> Vec<String> {
        self.sent
            .lock()
            .await
            .iter()
            .filter_map(|o| match o {
                Outbound::Text { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    /// Texts of `reply_to` calls.
    pub async fn replies(&self) -> Vec<String> {
        self.sent
            .lock()
            .await
            .iter()
            .filter_map(|o| match o {
                Outbound::Reply { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    /// Buttons sent with `send_with_action`.
    pub async fn actions(&self) -> Vec<InlineAction> {
        self.sent
            .lock()
            .await
            .iter()
            .filter_map(|o| match o {
                Outbound::WithAction { action, .. } => Some(action.clone()),
                _ => None,
            })
            .collect()
    }

    /// `(callback_id, text)` of every `answer_callback` call.
    pub async fn callback_answers(&self) -> Vec<(String, Option<String>)> {
        self.sent
            .lock()
            .await
            .iter()
            .filter_map(|o| match o {
                Outbound::CallbackAnswer { callback_id, text } => {
                    Some((callback_id.clone(), text.clone()))
                }
                _ => None,
            })
            .collect()
    }

    pub async fn clear_sent(&self) {
        self.sent.lock().await.clear();
    }

    async fn capture(&self, outbound: Outbound) -> Result<(), ShopbotError> {
        if self.failing_sends.load(Ordering::SeqCst) {
            return Err(ShopbotError::channel_message("mock send failure"));
        }
        self.sent.lock().await.push(outbound);
        Ok(())
    }
}

impl Default for MockChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockChannel {
    fn name(&self) -> &str {
        "mock-channel"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, ShopbotError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ShopbotError> {
        self.close().await;
        Ok(())
    }
}

#[async_trait]
impl ChannelAdapter for MockChannel {
    async fn connect(&self) -> Result<(), ShopbotError> {
        Ok(())
    }

    async fn receive(&self) -> Result<InboundEvent, ShopbotError> {
        loop {
            {
                let mut queue = self.inbound.lock().await;
                if let Some(event) = queue.pop_front() {
                    return Ok(event);
                }
            }
            if self.closed.load(Ordering::SeqCst) {
                return Err(ShopbotError::channel_message("mock channel closed"));
            }
            self.notify.notified().await;
        }
    }

    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<(), ShopbotError> {
        self.capture(Outbound::Text {
            chat_id,
            text: text.to_string(),
        })
        .await
    }

    async fn reply_to(
        &self,
        chat_id: ChatId,
        message_id: i32,
        text: &str,
    ) -> Result<(), ShopbotError> {
        self.capture(Outbound::Reply {
            chat_id,
            message_id,
            text: text.to_string(),
        })
        .await
    }

    async fn send_with_action(
        &self,
        chat_id: ChatId,
        text: &str,
        action: InlineAction,
    ) -> Result<(), ShopbotError> {
        if self.failing_actions.load(Ordering::SeqCst) {
            return Err(ShopbotError::channel_message("mock action failure"));
        }
        self.capture(Outbound::WithAction {
            chat_id,
            text: text.to_string(),
            action,
        })
        .await
    }

    async fn answer_callback(
        &self,
        callback_id: &str,
        text: Option<&str>,
    ) -> Result<(), ShopbotError> {
        // Answers go through even when sends fail; they use a separate API call.
        self.sent.lock().await.push(Outbound::CallbackAnswer {
            callback_id: callback_id.to_string(),
            text: text.map(str::to_string),
        });
        Ok(())
    }
}
