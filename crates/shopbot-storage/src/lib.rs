// SPDX-FileCopyrightText: 2026 Shopbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Shopbot sales assistant.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single-writer
//! model via `tokio-rusqlite`, and typed queries for conversation history,
//! users, products and orders.

pub mod adapter;
pub mod catalog;
pub mod database;
pub mod migrations;
pub mod queries;

pub use adapter::SqliteStorage;
pub use catalog::SqliteCatalog;
pub use database::Database;
