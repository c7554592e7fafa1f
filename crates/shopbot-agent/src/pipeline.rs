// SPDX-FileCopyrightText: 2026 Shopbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-message pipeline from inbound text to delivered reply.
//!
//! Steps run strictly in order:
//! Received -> PersistedInbound -> LanguageResolved -> ContextBuilt ->
//! Completed -> PersistedOutbound -> Delivered. Any step may end in Failed,
//! in which case the user gets exactly one localized apology.

use std::sync::Arc;
use std::time::Duration;

use shopbot_config::ShopbotConfig;
use shopbot_core::{
    ChannelAdapter, CompletionRequest, ConversationStore, InboundMessage, InlineAction, Language,
    Product, ProviderAdapter, Role, Sender, ShopbotError, UserDirectory, UserId,
};
use tracing::{debug, error, info, warn};

use crate::context::ContextAssembler;
use crate::language::LanguageDetector;
use crate::locale;

/// Telegram rejects callback payloads longer than this many bytes.
const MAX_ACTION_DATA_BYTES: usize = 64;

/// Prefix of the purchase button payload; the product name follows it.
pub const PURCHASE_PREFIX: &str = "buy_";

/// Progress of one message through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStep {
    Received,
    PersistedInbound,
    LanguageResolved,
    ContextBuilt,
    Completed,
    PersistedOutbound,
    Delivered,
    Failed,
}

impl std::fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineStep::Received => write!(f, "received"),
            PipelineStep::PersistedInbound => write!(f, "persisted_inbound"),
            PipelineStep::LanguageResolved => write!(f, "language_resolved"),
            PipelineStep::ContextBuilt => write!(f, "context_built"),
            PipelineStep::Completed => write!(f, "completed"),
            PipelineStep::PersistedOutbound => write!(f, "persisted_outbound"),
            PipelineStep::Delivered => write!(f, "delivered"),
            PipelineStep::Failed => write!(f, "failed"),
        }
    }
}

/// Completion and conversation parameters the pipeline needs.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub completion_timeout: Duration,
    pub history_limit: usize,
    pub default_language: Language,
}

impl PipelineSettings {
    pub fn from_config(config: &ShopbotConfig) -> Self {
        Self {
            model: config.openai.model.clone(),
            max_tokens: config.openai.max_tokens,
            temperature: config.openai.temperature,
            completion_timeout: Duration::from_secs(config.openai.timeout_secs),
            history_limit: config.agent.history_limit,
            default_language: config.agent.default_language,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from_config(&ShopbotConfig::default())
    }
}

/// Button payload for buying `product`, if it fits Telegram's limit.
pub fn purchase_action_data(product: &Product) -> Option<String> {
    let data = format!("{PURCHASE_PREFIX}{}", product.name);
    (data.len() <= MAX_ACTION_DATA_BYTES).then_some(data)
}

/// Runs inbound messages through persistence, language resolution, context
/// assembly, completion and delivery.
pub struct MessagePipeline {
    history: Arc<dyn ConversationStore>,
    users: Arc<dyn UserDirectory>,
    provider: Arc<dyn ProviderAdapter>,
    channel: Arc<dyn ChannelAdapter>,
    assembler: ContextAssembler,
    detector: LanguageDetector,
    settings: PipelineSettings,
}

impl MessagePipeline {
    pub fn new(
        history: Arc<dyn ConversationStore>,
        users: Arc<dyn UserDirectory>,
        catalog: Arc<dyn shopbot_core::Catalog>,
        provider: Arc<dyn ProviderAdapter>,
        channel: Arc<dyn ChannelAdapter>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            assembler: ContextAssembler::new(history.clone(), catalog, settings.history_limit),
            detector: LanguageDetector::new(settings.default_language),
            history,
            users,
            provider,
            channel,
            settings,
        }
    }

    /// Handles one text message and returns the step it ended on
    /// ([`PipelineStep::Delivered`] or [`PipelineStep::Failed`]).
    pub async fn handle_message(&self, msg: &InboundMessage) -> PipelineStep {
        let mut step = PipelineStep::Received;
        match self.run(msg, &mut step).await {
            Ok(()) => {
                metrics::counter!("shopbot_pipeline_runs_total", "outcome" => "delivered")
                    .increment(1);
                PipelineStep::Delivered
            }
            Err(e) => {
                metrics::counter!("shopbot_pipeline_runs_total", "outcome" => "failed")
                    .increment(1);
                self.fail(msg, step, &e).await;
                PipelineStep::Failed
            }
        }
    }

    /// Replies to `/start` with the greeting in the user's stored language.
    /// Nothing is written to the conversation history.
    pub async fn handle_start(&self, msg: &InboundMessage) -> Result<(), ShopbotError> {
        self.ensure_user(&msg.sender).await?;
        let language = self
            .users
            .get_language(msg.sender.id)
            .await?
            .unwrap_or(self.settings.default_language);
        info!(user_id = %msg.sender.id, language = %language, "greeting user");
        self.channel
            .send_text(msg.chat_id, locale::phrases(language).greeting)
            .await
    }

    async fn run(&self, msg: &InboundMessage, step: &mut PipelineStep) -> Result<(), ShopbotError> {
        let user_id = msg.sender.id;
        debug!(user_id = %user_id, message_id = msg.message_id, "pipeline started");

        self.history.append(user_id, Role::User, &msg.text).await?;
        advance(step, PipelineStep::PersistedInbound, user_id);

        let language = self.resolve_language(&msg.sender, &msg.text).await?;
        advance(step, PipelineStep::LanguageResolved, user_id);

        let context = self
            .assembler
            .build(
                user_id,
                &msg.text,
                language,
                msg.sender.display_name.as_deref(),
            )
            .await?;
        advance(step, PipelineStep::ContextBuilt, user_id);

        let request = CompletionRequest {
            model: self.settings.model.clone(),
            messages: context.messages,
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        };
        let timeout = self.settings.completion_timeout;
        let response = tokio::time::timeout(timeout, self.provider.complete(request))
            .await
            .map_err(|_| ShopbotError::Timeout { duration: timeout })??;
        advance(step, PipelineStep::Completed, user_id);

        self.history
            .append(user_id, Role::Assistant, &response.content)
            .await?;
        advance(step, PipelineStep::PersistedOutbound, user_id);

        self.channel.send_text(msg.chat_id, &response.content).await?;
        advance(step, PipelineStep::Delivered, user_id);

        if let Some(product) = &context.product {
            self.offer_purchase(msg, product, language).await;
        }
        Ok(())
    }

    /// Creates the user on first contact, then combines detection with the
    /// stored preference. Detection wins; a failed detection keeps what is
    /// stored; a user with neither gets the default.
    async fn resolve_language(
        &self,
        sender: &Sender,
        text: &str,
    ) -> Result<Language, ShopbotError> {
        self.ensure_user(sender).await?;

        let detected = self.detector.classify(text);
        let stored = self.users.get_language(sender.id).await?;
        let language = detected
            .or(stored)
            .unwrap_or(self.settings.default_language);

        if detected.is_some() || stored.is_none() {
            self.users.set_language(sender.id, language).await?;
        }
        debug!(
            user_id = %sender.id,
            detected = ?detected,
            stored = ?stored,
            language = %language,
            "language resolved"
        );
        Ok(language)
    }

    async fn ensure_user(&self, sender: &Sender) -> Result<(), ShopbotError> {
        if self.users.exists(sender.id).await? {
            return Ok(());
        }
        match self
            .users
            .create(sender.id, sender.display_name.as_deref())
            .await
        {
            Ok(()) => {
                info!(user_id = %sender.id, "new user registered");
                Ok(())
            }
            // Lost a race with another message from the same user.
            Err(e) if e.is_conflict() => {
                debug!(user_id = %sender.id, "user already registered");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn offer_purchase(&self, msg: &InboundMessage, product: &Product, language: Language) {
        let Some(data) = purchase_action_data(product) else {
            warn!(product = %product.name, "product name too long for a purchase button");
            return;
        };
        let phrases = locale::phrases(language);
        let action = InlineAction {
            label: phrases.buy_button.to_string(),
            data,
        };
        if let Err(e) = self
            .channel
            .send_with_action(msg.chat_id, phrases.purchase_prompt, action)
            .await
        {
            warn!(user_id = %msg.sender.id, error = %e, "failed to send purchase offer");
        }
    }

    async fn fail(&self, msg: &InboundMessage, step: PipelineStep, e: &ShopbotError) {
        let user_id = msg.sender.id;
        error!(user_id = %user_id, step = %step, error = %e, "pipeline failed");

        let language = match self.users.get_language(user_id).await {
            Ok(stored) => stored.unwrap_or(self.settings.default_language),
            Err(lookup) => {
                warn!(user_id = %user_id, error = %lookup, "language lookup failed");
                self.settings.default_language
            }
        };

        if let Err(send) = self
            .channel
            .reply_to(msg.chat_id, msg.message_id, locale::phrases(language).apology)
            .await
        {
            error!(user_id = %user_id, error = %send, "failed to deliver apology");
        }
    }
}

fn advance(step: &mut PipelineStep, next: PipelineStep, user_id: UserId) {
    debug!(user_id = %user_id, from = %step, to = %next, "pipeline step");
    *step = next;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_display_names() {
        assert_eq!(PipelineStep::PersistedInbound.to_string(), "persisted_inbound");
        assert_eq!(PipelineStep::Failed.to_string(), "failed");
    }

    #[test]
    fn purchase_data_respects_limit() {
        let mut product = Product {
            name: "Widget".into(),
            description: String::new(),
            unit_price: 1.0,
        };
        assert_eq!(purchase_action_data(&product).as_deref(), Some("buy_Widget"));

        product.name = "x".repeat(60);
        assert_eq!(purchase_action_data(&product).map(|d| d.len()), Some(64));

        product.name = "x".repeat(61);
        assert!(purchase_action_data(&product).is_none());
    }

    #[test]
    fn settings_follow_config() {
        let settings = PipelineSettings::default();
        assert_eq!(settings.model, "gpt-3.5-turbo");
        assert_eq!(settings.max_tokens, 500);
        assert_eq!(settings.history_limit, 10);
        assert_eq!(settings.default_language, Language::En);
    }
}
