// SPDX-FileCopyrightText: 2026 Shopbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `shopbot serve` - wires storage, catalog, provider and Telegram together
//! and runs the dispatcher until a shutdown signal arrives.

use std::sync::Arc;

use shopbot_agent::{
    DispatchSettings, Dispatcher, MessagePipeline, PipelineSettings, PurchaseDesk,
    install_signal_handler,
};
use shopbot_config::{Credentials, ShopbotConfig};
use shopbot_core::{ChannelAdapter, PluginAdapter, ShopbotError, StorageAdapter};
use shopbot_openai::OpenAiProvider;
use shopbot_storage::{SqliteCatalog, SqliteStorage};
use shopbot_telegram::TelegramChannel;
use tracing::{info, warn};

pub async fn run_serve(config: ShopbotConfig) -> Result<(), ShopbotError> {
    init_tracing(&config.agent.log_level);

    info!(name = %config.agent.name, "starting shopbot serve");

    let credentials = Credentials::resolve(&config)?;

    let storage = Arc::new(SqliteStorage::new(config.storage.clone()));
    storage.initialize().await?;
    info!(path = %config.storage.database_path, "storage ready");

    let catalog = Arc::new(SqliteCatalog::open(config.storage.catalog_database()).await?);

    let provider = Arc::new(OpenAiProvider::new(
        &config.openai,
        &credentials.openai_api_key,
    )?);
    info!(model = %config.openai.model, "completion provider ready");

    let channel = Arc::new(TelegramChannel::new(&credentials.telegram_token)?);
    channel.connect().await?;

    let pipeline = Arc::new(MessagePipeline::new(
        storage.clone(),
        storage.clone(),
        catalog.clone(),
        provider.clone(),
        channel.clone(),
        PipelineSettings::from_config(&config),
    ));
    let purchases = Arc::new(PurchaseDesk::new(
        catalog.clone(),
        storage.clone(),
        storage.clone(),
        channel.clone(),
        config.agent.default_language,
    ));
    let dispatcher = Dispatcher::new(
        channel.clone(),
        pipeline,
        purchases,
        DispatchSettings::from_config(&config),
    );

    let cancel = install_signal_handler();
    info!("shopbot is running, press Ctrl+C to stop");
    dispatcher.run(cancel).await?;

    if let Err(e) = channel.shutdown().await {
        warn!(error = %e, "channel shutdown failed");
    }
    storage.close().await?;
    info!("shopbot stopped");
    Ok(())
}

/// `shopbot=<level>,warn` unless `RUST_LOG` is set.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("shopbot={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
