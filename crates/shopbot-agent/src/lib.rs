// SPDX-FileCopyrightText: 2026 Shopbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation handling for the Shopbot sales assistant.
//!
//! The [`Dispatcher`] pulls events off a [`ChannelAdapter`](shopbot_core::ChannelAdapter)
//! and runs them on a bounded worker pool. Text messages go through the
//! [`MessagePipeline`]; purchase button presses go to the [`PurchaseDesk`].

pub mod context;
pub mod dispatcher;
pub mod language;
pub mod locale;
pub mod pipeline;
pub mod purchase;
pub mod shutdown;

pub use context::{AssembledContext, ContextAssembler};
pub use dispatcher::{DispatchSettings, Dispatcher};
pub use language::LanguageDetector;
pub use pipeline::{MessagePipeline, PipelineSettings, PipelineStep};
pub use purchase::{PurchaseDesk, PurchaseOutcome};
pub use shutdown::install_signal_handler;
