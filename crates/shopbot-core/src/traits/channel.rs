// SPDX-FileCopyrightText: 2026 Shopbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel adapter trait for the chat transport.

use async_trait::async_trait;

use crate::error::ShopbotError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ChatId, InboundEvent, InlineAction};

/// Adapter for a bidirectional chat transport.
///
/// The pipeline only talks to the transport through this trait, so tests can
/// swap in an in-memory channel.
#[async_trait]
pub trait ChannelAdapter: PluginAdapter {
    /// Starts receiving updates from the platform.
    async fn connect(&self) -> Result<(), ShopbotError>;

    /// Receives the next inbound event. Returns an error once the transport is closed.
    async fn receive(&self) -> Result<InboundEvent, ShopbotError>;

    /// Sends a plain text message.
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<(), ShopbotError>;

    /// Sends a text message as a reply to an earlier message.
    async fn reply_to(
        &self,
        chat_id: ChatId,
        message_id: i32,
        text: &str,
    ) -> Result<(), ShopbotError>;

    /// Sends a text message with a single inline action button.
    async fn send_with_action(
        &self,
        chat_id: ChatId,
        text: &str,
        action: InlineAction,
    ) -> Result<(), ShopbotError>;

    /// Answers a button press, optionally showing a short notification.
    async fn answer_callback(
        &self,
        callback_id: &str,
        text: Option<&str>,
    ) -> Result<(), ShopbotError>;
}
