// SPDX-FileCopyrightText: 2026 Shopbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Shopbot sales assistant.

use thiserror::Error;

/// The primary error type used across all Shopbot adapter traits and core operations.
#[derive(Debug, Error)]
pub enum ShopbotError {
    /// Configuration errors (invalid TOML, missing credentials, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, migration).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A record with the same key already exists.
    #[error("{entity} already exists: {key}")]
    Conflict { entity: String, key: String },

    /// Chat transport errors (send failure, connection loss).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Completion provider errors (transport, non-2xx status, malformed body).
    #[error("completion error: {message}")]
    Completion {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// The caller passed a value the operation cannot accept.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ShopbotError {
    /// Shorthand for a [`ShopbotError::Completion`] without an underlying source.
    pub fn completion(message: impl Into<String>) -> Self {
        Self::Completion {
            message: message.into(),
            source: None,
        }
    }

    /// Shorthand for a [`ShopbotError::Channel`] wrapping a transport error.
    pub fn channel<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Channel {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Shorthand for a [`ShopbotError::Channel`] without an underlying source.
    pub fn channel_message(message: impl Into<String>) -> Self {
        Self::Channel {
            message: message.into(),
            source: None,
        }
    }

    /// Returns `true` for [`ShopbotError::Conflict`].
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}
