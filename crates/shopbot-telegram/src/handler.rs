// SPDX-FileCopyrightText: 2026 Shopbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversion of Telegram updates into channel-agnostic events.

use shopbot_core::{CallbackEvent, ChatId, InboundMessage, Sender, UserId};
use teloxide::types::{CallbackQuery, ChatKind, Message, User};

/// Only private chats are served.
pub fn is_dm(msg: &Message) -> bool {
    matches!(msg.chat.kind, ChatKind::Private(_))
}

/// Telegram ids are positive and fit in 52 bits.
fn user_id(user: &User) -> UserId {
    UserId(user.id.0 as i64)
}

/// Best human-readable name: full name, then `@username`.
pub fn display_name(user: &User) -> Option<String> {
    let full = user.full_name();
    if !full.trim().is_empty() {
        return Some(full);
    }
    user.username.as_ref().map(|u| format!("@{u}"))
}

/// Text messages with a known sender become [`InboundMessage`]s; everything
/// else (media, service messages, channel posts) is dropped.
pub fn to_inbound_message(msg: &Message) -> Option<InboundMessage> {
    let text = msg.text()?;
    let from = msg.from.as_ref()?;

    Some(InboundMessage {
        message_id: msg.id.0,
        chat_id: ChatId(msg.chat.id.0),
        sender: Sender {
            id: user_id(from),
            display_name: display_name(from),
        },
        text: text.to_string(),
        timestamp: msg.date,
    })
}

/// Button presses carry their payload in `data`. In a private chat the chat id
/// equals the user id, so the event does not depend on the original message
/// still being accessible.
pub fn to_callback_event(query: &CallbackQuery, callback_id: String) -> Option<CallbackEvent> {
    let data = query.data.clone()?;
    let from = user_id(&query.from);
    Some(CallbackEvent {
        callback_id,
        chat_id: ChatId(from.0),
        from_user: from,
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_private_message(user_id: u64, text: Option<&str>) -> Message {
        let mut json = serde_json::json!({
            "message_id": 7,
            "date": 1700000000i64,
            "chat": {
                "id": user_id as i64,
                "type": "private",
                "first_name": "Ivan",
            },
            "from": {
                "id": user_id,
                "is_bot": false,
                "first_name": "Ivan",
                "last_name": "Petrov",
            },
        });
        if let Some(text) = text {
            json["text"] = serde_json::Value::String(text.to_string());
        } else {
            json["photo"] = serde_json::json!([{
                "file_id": "abc",
                "file_unique_id": "abc-u",
                "width": 90,
                "height": 90,
                "file_size": 1024,
            }]);
        }
        serde_json::from_value(json).expect("failed to deserialize mock message")
    }

    fn make_group_message(text: &str) -> Message {
        let json = serde_json::json!({
            "message_id": 1,
            "date": 1700000000i64,
            "chat": {"id": -100123i64, "type": "supergroup", "title": "Shop"},
            "from": {"id": 42u64, "is_bot": false, "first_name": "Test"},
            "text": text,
        });
        serde_json::from_value(json).expect("failed to deserialize mock group message")
    }

    fn make_callback(data: Option<&str>) -> CallbackQuery {
        let mut json = serde_json::json!({
            "id": "4382bfdwdsb323b2d9",
            "from": {"id": 555u64, "is_bot": false, "first_name": "Anna", "username": "anna"},
            "chat_instance": "-8765",
        });
        if let Some(data) = data {
            json["data"] = serde_json::Value::String(data.to_string());
        }
        serde_json::from_value(json).expect("failed to deserialize mock callback query")
    }

    #[test]
    fn private_chat_is_dm() {
        assert!(is_dm(&make_private_message(1, Some("hi"))));
        assert!(!is_dm(&make_group_message("hi")));
    }

    #[test]
    fn text_message_maps_fields() {
        let msg = make_private_message(12345, Some("Привет"));
        let inbound = to_inbound_message(&msg).unwrap();
        assert_eq!(inbound.message_id, 7);
        assert_eq!(inbound.chat_id, ChatId(12345));
        assert_eq!(inbound.sender.id, UserId(12345));
        assert_eq!(inbound.sender.display_name.as_deref(), Some("Ivan Petrov"));
        assert_eq!(inbound.text, "Привет");
        assert_eq!(inbound.timestamp.timestamp(), 1700000000);
    }

    #[test]
    fn non_text_message_is_dropped() {
        let msg = make_private_message(12345, None);
        assert!(to_inbound_message(&msg).is_none());
    }

    #[test]
    fn callback_maps_to_private_chat() {
        let event = to_callback_event(&make_callback(Some("buy_Widget")), "k1".into()).unwrap();
        assert_eq!(event.callback_id, "k1");
        assert_eq!(event.from_user, UserId(555));
        assert_eq!(event.chat_id, ChatId(555));
        assert_eq!(event.data, "buy_Widget");
    }

    #[test]
    fn callback_without_data_is_dropped() {
        assert!(to_callback_event(&make_callback(None), "k2".into()).is_none());
    }
}
