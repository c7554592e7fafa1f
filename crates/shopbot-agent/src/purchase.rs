// SPDX-FileCopyrightText: 2026 Shopbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Confirms purchases triggered by inline "buy" buttons.

use std::sync::Arc;

use shopbot_core::{
    CallbackEvent, Catalog, ChannelAdapter, Language, OrderLedger, ShopbotError, UserDirectory,
};
use tracing::{debug, error, info, warn};

use crate::locale;
use crate::pipeline::PURCHASE_PREFIX;

/// What happened to a button press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurchaseOutcome {
    /// An order was recorded.
    Ordered { order_id: i64 },
    /// The product is not (or no longer) in the catalog.
    UnknownProduct,
    /// The order could not be recorded.
    Failed,
    /// The payload was not a purchase request.
    Ignored,
}

/// Extracts the product name from `buy_<name>` payloads.
pub fn parse_purchase_data(data: &str) -> Option<&str> {
    data.strip_prefix(PURCHASE_PREFIX)
        .filter(|name| !name.is_empty())
}

/// Turns purchase button presses into orders.
pub struct PurchaseDesk {
    catalog: Arc<dyn Catalog>,
    ledger: Arc<dyn OrderLedger>,
    users: Arc<dyn UserDirectory>,
    channel: Arc<dyn ChannelAdapter>,
    default_language: Language,
}

impl PurchaseDesk {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        ledger: Arc<dyn OrderLedger>,
        users: Arc<dyn UserDirectory>,
        channel: Arc<dyn ChannelAdapter>,
        default_language: Language,
    ) -> Self {
        Self {
            catalog,
            ledger,
            users,
            channel,
            default_language,
        }
    }

    /// Handles one button press. Every press is answered exactly once so the
    /// client stops showing its progress indicator.
    pub async fn handle_callback(&self, event: &CallbackEvent) -> PurchaseOutcome {
        let Some(product_name) = parse_purchase_data(&event.data) else {
            debug!(data = %event.data, "ignoring unrecognized callback data");
            self.answer(event, None).await;
            return PurchaseOutcome::Ignored;
        };

        let language = self.language_of(event).await;
        let phrases = locale::phrases(language);

        let outcome = match self.place_order(event, product_name).await {
            Ok(Some(order_id)) => PurchaseOutcome::Ordered { order_id },
            Ok(None) => PurchaseOutcome::UnknownProduct,
            Err(e) => {
                error!(user_id = %event.from_user, product = %product_name, error = %e, "order failed");
                PurchaseOutcome::Failed
            }
        };

        match &outcome {
            PurchaseOutcome::Ordered { order_id } => {
                metrics::counter!("shopbot_orders_total").increment(1);
                self.answer(event, Some(phrases.order_placed)).await;
                let confirmation = phrases.order_confirmation(*order_id, product_name);
                if let Err(e) = self.channel.send_text(event.chat_id, &confirmation).await {
                    warn!(order_id, error = %e, "failed to send order confirmation");
                }
            }
            _ => self.answer(event, Some(phrases.order_failed)).await,
        }
        outcome
    }

    async fn place_order(
        &self,
        event: &CallbackEvent,
        product_name: &str,
    ) -> Result<Option<i64>, ShopbotError> {
        let Some(product) = self.catalog.find(product_name).await? else {
            warn!(user_id = %event.from_user, product = %product_name, "purchase of unknown product");
            return Ok(None);
        };
        let order_id = self
            .ledger
            .record(event.from_user, &product.name, 1, product.unit_price)
            .await?;
        info!(
            user_id = %event.from_user,
            order_id,
            product = %product.name,
            unit_price = product.unit_price,
            "order recorded"
        );
        Ok(Some(order_id))
    }

    async fn language_of(&self, event: &CallbackEvent) -> Language {
        match self.users.get_language(event.from_user).await {
            Ok(stored) => stored.unwrap_or(self.default_language),
            Err(e) => {
                warn!(user_id = %event.from_user, error = %e, "language lookup failed");
                self.default_language
            }
        }
    }

    async fn answer(&self, event: &CallbackEvent, text: Option<&str>) {
        if let Err(e) = self.channel.answer_callback(&event.callback_id, text).await {
            warn!(callback_id = %event.callback_id, error = %e, "failed to answer callback");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_buy_payloads() {
        assert_eq!(parse_purchase_data("buy_Widget"), Some("Widget"));
        assert_eq!(parse_purchase_data("buy_"), None);
        assert_eq!(parse_purchase_data("sell_Widget"), None);
        assert_eq!(parse_purchase_data("Widget"), None);
    }

    #[test]
    fn keeps_underscores_after_prefix() {
        assert_eq!(parse_purchase_data("buy_big_box"), Some("big_box"));
    }
}
