// SPDX-FileCopyrightText: 2026 Shopbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Shopbot integration tests.
//!
//! # Components
//!
//! - [`MemoryStore`] / [`MemoryCatalog`] - in-memory store trait implementations
//! - [`MockProvider`] - completion provider with queued replies, failures and delays
//! - [`MockChannel`] - channel with event injection and captured outbound calls
//! - [`TestHarness`] - full pipeline over a temp SQLite database

pub mod harness;
pub mod memory;
pub mod mock_channel;
pub mod mock_provider;

pub use harness::TestHarness;
pub use memory::{MemoryCatalog, MemoryStore};
pub use mock_channel::{MockChannel, Outbound};
pub use mock_provider::MockProvider;
