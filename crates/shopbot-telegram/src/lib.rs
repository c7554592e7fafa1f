// SPDX-FileCopyrightText: 2026 Shopbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram channel adapter for the Shopbot sales assistant.
//!
//! Implements [`ChannelAdapter`] for the Telegram Bot API via teloxide:
//! long polling, private text messages, inline purchase buttons and
//! callback answers.

pub mod handler;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use shopbot_core::{
    AdapterType, ChannelAdapter, ChatId, HealthStatus, InboundEvent, InlineAction,
    PluginAdapter, ShopbotError,
};
use teloxide::prelude::*;
use teloxide::types::{
    ChatId as TgChatId, InlineKeyboardButton, InlineKeyboardMarkup, MessageId, ReplyParameters,
};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};

/// Telegram's limit on `callback_data`, in bytes.
pub const MAX_CALLBACK_DATA_BYTES: usize = 64;

/// How long shutdown waits on each leftover callback answer.
const SHUTDOWN_ANSWER_TIMEOUT: Duration = Duration::from_secs(2);

/// Button presses waiting for an answer, keyed by the id handed to the dispatcher.
type PendingCallbacks = Arc<DashMap<String, CallbackQuery>>;

/// Telegram channel adapter implementing [`ChannelAdapter`].
pub struct TelegramChannel {
    bot: Bot,
    inbound_rx: Mutex<mpsc::Receiver<InboundEvent>>,
    inbound_tx: mpsc::Sender<InboundEvent>,
    pending_callbacks: PendingCallbacks,
    polling_handle: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl TelegramChannel {
    /// Creates a new Telegram channel adapter from a resolved bot token.
    pub fn new(token: &str) -> Result<Self, ShopbotError> {
        if token.trim().is_empty() {
            return Err(ShopbotError::Config(
                "telegram bot token cannot be empty".into(),
            ));
        }

        let (inbound_tx, inbound_rx) = mpsc::channel(100);
        Ok(Self {
            bot: Bot::new(token),
            inbound_rx: Mutex::new(inbound_rx),
            inbound_tx,
            pending_callbacks: Arc::new(DashMap::new()),
            polling_handle: Mutex::new(None),
        })
    }

    /// Returns a reference to the underlying teloxide Bot.
    pub fn bot(&self) -> &Bot {
        &self.bot
    }

    /// Removes every unanswered button press.
    fn take_pending(&self) -> Vec<CallbackQuery> {
        let keys: Vec<String> = self
            .pending_callbacks
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        keys.into_iter()
            .filter_map(|key| self.pending_callbacks.remove(&key).map(|(_, query)| query))
            .collect()
    }

    fn send_err(what: &str, e: teloxide::RequestError) -> ShopbotError {
        ShopbotError::channel(format!("failed to {what}: {e}"), e)
    }
}

async fn on_message(msg: Message, tx: mpsc::Sender<InboundEvent>) -> ResponseResult<()> {
    if !handler::is_dm(&msg) {
        debug!(chat_id = msg.chat.id.0, "ignoring non-DM message");
        return respond(());
    }

    match handler::to_inbound_message(&msg) {
        Some(inbound) => {
            metrics::counter!("shopbot_telegram_updates_total", "kind" => "message").increment(1);
            if tx.send(InboundEvent::Message(inbound)).await.is_err() {
                warn!("inbound channel closed, dropping message");
            }
        }
        None => debug!(msg_id = msg.id.0, "ignoring non-text message"),
    }
    respond(())
}

async fn on_callback(
    query: CallbackQuery,
    tx: mpsc::Sender<InboundEvent>,
    pending: PendingCallbacks,
) -> ResponseResult<()> {
    let key = uuid::Uuid::new_v4().to_string();
    let Some(event) = handler::to_callback_event(&query, key.clone()) else {
        debug!("ignoring callback query without data");
        return respond(());
    };

    metrics::counter!("shopbot_telegram_updates_total", "kind" => "callback").increment(1);
    pending.insert(key.clone(), query);
    if tx.send(InboundEvent::Callback(event)).await.is_err() {
        pending.remove(&key);
        warn!("inbound channel closed, dropping callback query");
    }
    respond(())
}

#[async_trait]
impl PluginAdapter for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, ShopbotError> {
        match self.bot.get_me().await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(format!(
                "Telegram bot unreachable: {e}"
            ))),
        }
    }

    async fn shutdown(&self) -> Result<(), ShopbotError> {
        if let Some(handle) = self.polling_handle.lock().await.take() {
            handle.abort();
        }

        // Clear the loading spinner on presses the dispatcher never handled.
        let leftover = self.take_pending();
        if !leftover.is_empty() {
            info!(count = leftover.len(), "answering unhandled callback queries");
        }
        for query in leftover {
            let answer = self.bot.answer_callback_query(query.id);
            match tokio::time::timeout(SHUTDOWN_ANSWER_TIMEOUT, answer).await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => warn!(error = %e, "failed to answer callback during shutdown"),
                Err(_) => warn!("timed out answering callback during shutdown"),
            }
        }

        debug!("Telegram channel shut down");
        Ok(())
    }
}

#[async_trait]
impl ChannelAdapter for TelegramChannel {
    async fn connect(&self) -> Result<(), ShopbotError> {
        let mut polling = self.polling_handle.lock().await;
        if polling.is_some() {
            return Ok(());
        }

        let bot = self.bot.clone();
        let message_tx = self.inbound_tx.clone();
        let callback_tx = self.inbound_tx.clone();
        let pending = Arc::clone(&self.pending_callbacks);

        info!("starting Telegram long polling");

        let handle = tokio::spawn(async move {
            let handler = dptree::entry()
                .branch(Update::filter_message().endpoint(move |msg: Message| {
                    on_message(msg, message_tx.clone())
                }))
                .branch(
                    Update::filter_callback_query().endpoint(move |query: CallbackQuery| {
                        on_callback(query, callback_tx.clone(), Arc::clone(&pending))
                    }),
                );

            Dispatcher::builder(bot, handler)
                .default_handler(|_| async {})
                .build()
                .dispatch()
                .await;
        });

        *polling = Some(handle);
        Ok(())
    }

    async fn receive(&self) -> Result<InboundEvent, ShopbotError> {
        let mut rx = self.inbound_rx.lock().await;
        rx.recv().await.ok_or_else(|| ShopbotError::Channel {
            message: "Telegram inbound channel closed".into(),
            source: None,
        })
    }

    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<(), ShopbotError> {
        self.bot
            .send_message(TgChatId(chat_id.0), text)
            .await
            .map_err(|e| Self::send_err("send message", e))?;
        Ok(())
    }

    async fn reply_to(
        &self,
        chat_id: ChatId,
        message_id: i32,
        text: &str,
    ) -> Result<(), ShopbotError> {
        self.bot
            .send_message(TgChatId(chat_id.0), text)
            .reply_parameters(ReplyParameters::new(MessageId(message_id)))
            .await
            .map_err(|e| Self::send_err("send reply", e))?;
        Ok(())
    }

    async fn send_with_action(
        &self,
        chat_id: ChatId,
        text: &str,
        action: InlineAction,
    ) -> Result<(), ShopbotError> {
        if action.data.len() > MAX_CALLBACK_DATA_BYTES {
            return Err(ShopbotError::InvalidInput(format!(
                "callback data is {} bytes, Telegram allows {MAX_CALLBACK_DATA_BYTES}",
                action.data.len()
            )));
        }

        let keyboard = InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
            action.label,
            action.data,
        )]]);
        self.bot
            .send_message(TgChatId(chat_id.0), text)
            .reply_markup(keyboard)
            .await
            .map_err(|e| Self::send_err("send purchase offer", e))?;
        Ok(())
    }

    async fn answer_callback(
        &self,
        callback_id: &str,
        text: Option<&str>,
    ) -> Result<(), ShopbotError> {
        let Some((_, query)) = self.pending_callbacks.remove(callback_id) else {
            return Err(ShopbotError::channel_message(format!(
                "unknown or already answered callback `{callback_id}`"
            )));
        };

        let mut request = self.bot.answer_callback_query(query.id);
        if let Some(text) = text {
            request = request.text(text);
        }
        request
            .await
            .map_err(|e| Self::send_err("answer callback query", e))?;
        Ok(())
    }
}
