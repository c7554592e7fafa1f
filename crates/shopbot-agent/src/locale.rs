// SPDX-FileCopyrightText: 2026 Shopbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixed user-facing strings, one table per supported language.

use shopbot_core::{Language, Product};

/// Every user-visible string the assistant produces outside of model replies.
#[derive(Debug)]
pub struct Phrases {
    pub system_instruction: &'static str,
    /// Appended to the instruction when the customer's name is known.
    customer_name: &'static str,
    pub greeting: &'static str,
    pub apology: &'static str,
    pub purchase_prompt: &'static str,
    pub buy_button: &'static str,
    pub order_placed: &'static str,
    pub order_failed: &'static str,
    confirmation: &'static str,
    product_label: &'static str,
    description_label: &'static str,
    price_label: &'static str,
    currency: &'static str,
}

const RU: Phrases = Phrases {
    system_instruction: "Вы помощник-продавец. Помните историю разговора и отвечайте осознанно. \
                         Отвечайте на том же языке, на котором задают вопрос.",
    customer_name: "Клиента зовут",
    greeting: "Привет! Я ваш бот-продавец. Чем могу помочь?",
    apology: "Извините, произошла ошибка при обработке вашего запроса.",
    purchase_prompt: "Хотите купить этот товар?",
    buy_button: "Купить",
    order_placed: "Заказ успешно оформлен!",
    order_failed: "Извините, произошла ошибка при оформлении заказа.",
    confirmation: "Ваш заказ #{id} на товар '{product}' успешно оформлен.",
    product_label: "Товар",
    description_label: "Описание",
    price_label: "Цена",
    currency: "руб.",
};

const EN: Phrases = Phrases {
    system_instruction: "You are a sales assistant. Remember the conversation and answer \
                         thoughtfully. Reply in the same language as the user's message.",
    customer_name: "The customer's name is",
    greeting: "Hello! I'm your sales bot. How can I assist you?",
    apology: "Sorry, there was an error processing your request.",
    purchase_prompt: "Would you like to buy this product?",
    buy_button: "Buy",
    order_placed: "Order placed successfully!",
    order_failed: "Sorry, there was an error placing your order.",
    confirmation: "Your order #{id} for '{product}' has been placed.",
    product_label: "Product",
    description_label: "Description",
    price_label: "Price",
    currency: "RUB",
};

/// Phrase table for `language`.
pub fn phrases(language: Language) -> &'static Phrases {
    match language {
        Language::Ru => &RU,
        Language::En => &EN,
    }
}

impl Phrases {
    /// The system instruction, mentioning the customer by name when known.
    pub fn instruction_for(&self, display_name: Option<&str>) -> String {
        match display_name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => format!("{} {} {name}.", self.system_instruction, self.customer_name),
            None => self.system_instruction.to_string(),
        }
    }

    /// Catalog context injected after the history.
    pub fn product_note(&self, product: &Product) -> String {
        format!(
            "{}: {}\n{}: {}\n{}: {:.2} {}",
            self.product_label,
            product.name,
            self.description_label,
            product.description,
            self.price_label,
            product.unit_price,
            self.currency
        )
    }

    /// Message sent after an order is recorded.
    pub fn order_confirmation(&self, order_id: i64, product_name: &str) -> String {
        self.confirmation
            .replace("{id}", &order_id.to_string())
            .replace("{product}", product_name)
    }
}
