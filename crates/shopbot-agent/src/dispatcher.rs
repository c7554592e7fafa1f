// SPDX-FileCopyrightText: 2026 Shopbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Receive loop and bounded worker pool.
//!
//! Every inbound event runs on the pool. Events of different users run in
//! parallel; events of the same user run one at a time, in arrival order.
//!
//! Each user with pending work has a FIFO queue and exactly one runner task
//! draining it. The runner takes a worker permit only while an event is being
//! handled, so a user's backlog never holds more than one worker. The receive
//! loop applies backpressure through a separate admission limit on queued
//! events.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use shopbot_config::ShopbotConfig;
use shopbot_core::{ChannelAdapter, InboundEvent, ShopbotError, UserId};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::pipeline::MessagePipeline;
use crate::purchase::PurchaseDesk;

/// Events admitted but not yet finished, per worker.
pub const BACKLOG_PER_WORKER: usize = 4;

/// An admitted event. The admission slot is released when it is dropped.
struct Queued {
    event: InboundEvent,
    _slot: OwnedSemaphorePermit,
}

/// Presence of a key means a runner task owns that user's queue.
type UserQueues = Arc<DashMap<UserId, VecDeque<Queued>>>;

/// Worker pool sizing and shutdown behaviour.
#[derive(Debug, Clone, Copy)]
pub struct DispatchSettings {
    pub max_workers: usize,
    pub shutdown_timeout: Duration,
}

impl DispatchSettings {
    pub fn from_config(config: &ShopbotConfig) -> Self {
        Self {
            max_workers: config.dispatch.max_workers,
            shutdown_timeout: Duration::from_secs(config.dispatch.shutdown_timeout_secs),
        }
    }
}

/// Routes inbound events to the message pipeline or the purchase desk.
pub struct Dispatcher {
    channel: Arc<dyn ChannelAdapter>,
    pipeline: Arc<MessagePipeline>,
    purchases: Arc<PurchaseDesk>,
    workers: Arc<Semaphore>,
    admission: Arc<Semaphore>,
    queues: UserQueues,
    tracker: TaskTracker,
    settings: DispatchSettings,
}

impl Dispatcher {
    pub fn new(
        channel: Arc<dyn ChannelAdapter>,
        pipeline: Arc<MessagePipeline>,
        purchases: Arc<PurchaseDesk>,
        settings: DispatchSettings,
    ) -> Self {
        let max_workers = settings.max_workers.max(1);
        Self {
            channel,
            pipeline,
            purchases,
            workers: Arc::new(Semaphore::new(max_workers)),
            admission: Arc::new(Semaphore::new(max_workers * BACKLOG_PER_WORKER)),
            queues: Arc::new(DashMap::new()),
            tracker: TaskTracker::new(),
            settings,
        }
    }

    /// Number of user runners spawned and not yet finished.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Number of users with an event queued or running.
    pub fn active_users(&self) -> usize {
        self.queues.len()
    }

    /// Runs until `cancel` fires or the channel closes, then waits for
    /// in-flight tasks up to the shutdown timeout.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), ShopbotError> {
        info!(max_workers = self.settings.max_workers, "dispatcher running");

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("shutdown signal received, stopping receive loop");
                    break;
                }
                event = self.channel.receive() => match event {
                    Ok(event) => {
                        let Some(slot) = self.admit(&cancel).await else {
                            break;
                        };
                        self.enqueue(event, slot);
                    }
                    Err(e) => {
                        warn!(error = %e, "channel receive ended");
                        break;
                    }
                },
            }
        }

        self.drain().await;
        info!("dispatcher stopped");
        Ok(())
    }

    /// Waits for room in the backlog. `None` means shutdown started while waiting.
    async fn admit(&self, cancel: &CancellationToken) -> Option<OwnedSemaphorePermit> {
        tokio::select! {
            slot = Arc::clone(&self.admission).acquire_owned() => slot.ok(),
            _ = cancel.cancelled() => {
                debug!("shutdown while waiting for backlog room, dropping event");
                None
            }
        }
    }

    /// Appends to the user's queue, starting a runner if none owns it.
    fn enqueue(&self, event: InboundEvent, slot: OwnedSemaphorePermit) {
        let user_id = event.user_id();
        let queued = Queued { event, _slot: slot };

        let first = match self.queues.entry(user_id) {
            Entry::Occupied(mut entry) => {
                entry.get_mut().push_back(queued);
                return;
            }
            Entry::Vacant(entry) => {
                entry.insert(VecDeque::new());
                queued
            }
        };

        let runner = UserRunner {
            user_id,
            queues: Arc::clone(&self.queues),
            workers: Arc::clone(&self.workers),
            pipeline: Arc::clone(&self.pipeline),
            purchases: Arc::clone(&self.purchases),
        };
        self.tracker.spawn(runner.run(first));
    }

    async fn drain(&self) {
        self.tracker.close();
        let pending = self.tracker.len();
        if pending == 0 {
            return;
        }

        info!(count = pending, "waiting for in-flight tasks");
        if tokio::time::timeout(self.settings.shutdown_timeout, self.tracker.wait())
            .await
            .is_err()
        {
            warn!(
                remaining = self.tracker.len(),
                timeout = ?self.settings.shutdown_timeout,
                "shutdown timeout reached with tasks still running"
            );
        } else {
            info!("all in-flight tasks completed");
        }
    }
}

/// Drains one user's queue, one event at a time.
struct UserRunner {
    user_id: UserId,
    queues: UserQueues,
    workers: Arc<Semaphore>,
    pipeline: Arc<MessagePipeline>,
    purchases: Arc<PurchaseDesk>,
}

impl UserRunner {
    async fn run(self, first: Queued) {
        let mut next = Some(first);
        while let Some(queued) = next {
            let Ok(_worker) = Arc::clone(&self.workers).acquire_owned().await else {
                warn!(user_id = %self.user_id, "worker pool closed, dropping queued events");
                self.queues.remove(&self.user_id);
                return;
            };
            handle_event(&self.pipeline, &self.purchases, queued.event).await;
            next = self.pop();
        }
    }

    /// Next queued event, or `None` after releasing the queue.
    fn pop(&self) -> Option<Queued> {
        match self.queues.entry(self.user_id) {
            Entry::Occupied(mut entry) => {
                let next = entry.get_mut().pop_front();
                if next.is_none() {
                    entry.remove();
                }
                next
            }
            Entry::Vacant(_) => None,
        }
    }
}

async fn handle_event(pipeline: &MessagePipeline, purchases: &PurchaseDesk, event: InboundEvent) {
    match event {
        InboundEvent::Message(msg) if msg.is_start_command() => {
            if let Err(e) = pipeline.handle_start(&msg).await {
                error!(user_id = %msg.sender.id, error = %e, "failed to greet user");
            }
        }
        InboundEvent::Message(msg) => {
            pipeline.handle_message(&msg).await;
        }
        InboundEvent::Callback(callback) => {
            let outcome = purchases.handle_callback(&callback).await;
            debug!(user_id = %callback.from_user, outcome = ?outcome, "callback handled");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use chrono::Utc;
    use shopbot_core::{InboundMessage, Language, Sender};
    use shopbot_test_utils::{MemoryCatalog, MemoryStore, MockChannel, MockProvider};

    use crate::pipeline::PipelineSettings;

    fn message(user: i64, message_id: i32, text: &str) -> InboundEvent {
        InboundEvent::Message(InboundMessage {
            message_id,
            chat_id: shopbot_core::ChatId(user),
            sender: Sender {
                id: UserId(user),
                display_name: None,
            },
            text: text.into(),
            timestamp: Utc::now(),
        })
    }

    fn dispatcher(
        provider: Arc<MockProvider>,
        channel: Arc<MockChannel>,
        store: Arc<MemoryStore>,
        max_workers: usize,
    ) -> Dispatcher {
        let catalog = Arc::new(MemoryCatalog::default());
        let pipeline = Arc::new(MessagePipeline::new(
            store.clone(),
            store.clone(),
            catalog.clone(),
            provider,
            channel.clone(),
            PipelineSettings::default(),
        ));
        let purchases = Arc::new(PurchaseDesk::new(
            catalog,
            store.clone(),
            store,
            channel.clone(),
            Language::En,
        ));
        Dispatcher::new(
            channel,
            pipeline,
            purchases,
            DispatchSettings {
                max_workers,
                shutdown_timeout: Duration::from_secs(5),
            },
        )
    }

    #[tokio::test]
    async fn same_user_messages_never_overlap() {
        let provider = Arc::new(MockProvider::new().with_delay(Duration::from_millis(30)));
        let channel = Arc::new(MockChannel::new());
        let store = Arc::new(MemoryStore::default());
        let dispatcher = dispatcher(provider.clone(), channel.clone(), store.clone(), 8);

        for i in 0..4 {
            channel.inject(message(1, i, &format!("hello number {i}"))).await;
        }
        channel.close().await;

        dispatcher.run(CancellationToken::new()).await.unwrap();

        assert_eq!(provider.max_concurrency(), 1);
        let history = store.history(UserId(1)).await;
        let users: Vec<_> = history
            .iter()
            .filter(|m| m.role == shopbot_core::Role::User)
            .map(|m| m.content.clone())
            .collect();
        assert_eq!(
            users,
            vec!["hello number 0", "hello number 1", "hello number 2", "hello number 3"]
        );
        assert_eq!(dispatcher.active_users(), 0);
    }

    #[tokio::test]
    async fn different_users_run_in_parallel() {
        let provider = Arc::new(MockProvider::new().with_delay(Duration::from_millis(50)));
        let channel = Arc::new(MockChannel::new());
        let store = Arc::new(MemoryStore::default());
        let dispatcher = dispatcher(provider.clone(), channel.clone(), store, 8);

        for user in 1..=4 {
            channel.inject(message(user, 1, "hello there")).await;
        }
        channel.close().await;

        dispatcher.run(CancellationToken::new()).await.unwrap();

        assert!(provider.max_concurrency() > 1);
        assert_eq!(provider.requests().await.len(), 4);
    }

    #[tokio::test]
    async fn pool_size_bounds_concurrency() {
        let provider = Arc::new(MockProvider::new().with_delay(Duration::from_millis(30)));
        let channel = Arc::new(MockChannel::new());
        let store = Arc::new(MemoryStore::default());
        let dispatcher = dispatcher(provider.clone(), channel.clone(), store, 2);

        for user in 1..=6 {
            channel.inject(message(user, 1, "hello there")).await;
        }
        channel.close().await;

        dispatcher.run(CancellationToken::new()).await.unwrap();

        assert!(provider.max_concurrency() <= 2);
        assert_eq!(provider.requests().await.len(), 6);
    }

    #[tokio::test]
    async fn start_command_greets_without_completion() {
        let provider = Arc::new(MockProvider::new());
        let channel = Arc::new(MockChannel::new());
        let store = Arc::new(MemoryStore::default());
        let dispatcher = dispatcher(provider.clone(), channel.clone(), store.clone(), 4);

        channel.inject(message(5, 1, "/start")).await;
        channel.close().await;
        dispatcher.run(CancellationToken::new()).await.unwrap();

        assert!(provider.requests().await.is_empty());
        assert!(store.history(UserId(5)).await.is_empty());
        assert_eq!(
            channel.sent_texts().await,
            vec!["Hello! I'm your sales bot. How can I assist you?".to_string()]
        );
    }

    #[tokio::test]
    async fn cancellation_stops_the_loop() {
        let provider = Arc::new(MockProvider::new());
        let channel = Arc::new(MockChannel::new());
        let store = Arc::new(MemoryStore::default());
        let dispatcher = dispatcher(provider, channel, store, 4);

        let cancel = CancellationToken::new();
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), dispatcher.run(cancel))
            .await
            .expect("dispatcher should stop promptly")
            .unwrap();
        assert_eq!(dispatcher.in_flight(), 0);
    }

    fn stored_user_texts(history: &[shopbot_core::StoredMessage]) -> Vec<String> {
        history
            .iter()
            .filter(|m| m.role == shopbot_core::Role::User)
            .map(|m| m.content.clone())
            .collect()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn same_user_order_holds_on_multi_thread_runtime() {
        for round in 0..10 {
            let provider = Arc::new(MockProvider::new());
            let channel = Arc::new(MockChannel::new());
            let store = Arc::new(MemoryStore::default());
            let dispatcher = dispatcher(provider.clone(), channel.clone(), store.clone(), 8);

            let mut expected = Vec::new();
            for i in 0..40 {
                let text = format!("round {round} message {i}");
                channel.inject(message(1, i, &text)).await;
                channel.inject(message(2, i, "noise from another user")).await;
                expected.push(text);
            }
            channel.close().await;

            dispatcher.run(CancellationToken::new()).await.unwrap();

            assert_eq!(stored_user_texts(&store.history(UserId(1)).await), expected);
            assert_eq!(dispatcher.active_users(), 0);
        }
    }

    #[tokio::test]
    async fn one_users_backlog_leaves_workers_for_others() {
        let provider = Arc::new(MockProvider::new().with_delay(Duration::from_millis(200)));
        let channel = Arc::new(MockChannel::new());
        let store = Arc::new(MemoryStore::default());
        let dispatcher = dispatcher(provider.clone(), channel.clone(), store, 2);

        for i in 0..4 {
            channel.inject(message(1, i, &format!("busy user message {i}"))).await;
        }
        channel.inject(message(2, 1, "waiting user message")).await;
        channel.close().await;

        dispatcher.run(CancellationToken::new()).await.unwrap();

        let requests = provider.requests().await;
        assert_eq!(requests.len(), 5);
        let position = requests
            .iter()
            .position(|r| r.messages.iter().any(|m| m.content == "waiting user message"))
            .unwrap();
        assert!(position < 2, "second user waited behind the backlog: {position}");
        assert_eq!(provider.max_concurrency(), 2);
    }
}
