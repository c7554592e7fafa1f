// SPDX-FileCopyrightText: 2026 Shopbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock completion provider for deterministic testing.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use shopbot_core::{
    AdapterType, CompletionRequest, CompletionResponse, HealthStatus, PluginAdapter,
    ProviderAdapter, ShopbotError, TokenUsage,
};

/// A provider that returns queued replies.
///
/// Replies are popped from a FIFO queue. When the queue is empty,
/// "mock response" is returned. Every request is recorded.
pub struct MockProvider {
    replies: Mutex<VecDeque<Result<String, String>>>,
    requests: Mutex<Vec<CompletionRequest>>,
    delay: Option<Duration>,
    active: AtomicUsize,
    peak: AtomicUsize,
}

struct ActiveCall<'a>(&'a AtomicUsize);

impl Drop for ActiveCall<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            delay: None,
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// A provider pre-loaded with the given replies.
    pub fn with_responses(responses: Vec<String>) -> Self {
        Self {
            replies: Mutex::new(responses.into_iter().map(Ok).collect()),
            ..Self::new()
        }
    }

    /// Every call sleeps for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub async fn add_response(&self, text: impl Into<String>) {
        self.replies.lock().await.push_back(Ok(text.into()));
    }

    /// Queues a call that fails with a completion error.
    pub async fn add_failure(&self, message: impl Into<String>) {
        self.replies.lock().await.push_back(Err(message.into()));
    }

    /// Requests received so far, in call order.
    pub async fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().await.clone()
    }

    /// Highest number of calls that were in progress at the same time.
    pub fn max_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockProvider {
    fn name(&self) -> &str {
        "mock-provider"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, ShopbotError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ShopbotError> {
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for MockProvider {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ShopbotError> {
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        let _active = ActiveCall(&self.active);
        self.peak.fetch_max(now_active, Ordering::SeqCst);

        let model = request.model.clone();
        self.requests.lock().await.push(request);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let reply = self
            .replies
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Ok("mock response".to_string()));

        match reply {
            Ok(content) => Ok(CompletionResponse {
                id: format!("mock-{}", self.peak.load(Ordering::SeqCst)),
                content,
                model,
                usage: TokenUsage {
                    prompt_tokens: 10,
                    completion_tokens: 20,
                },
            }),
            Err(message) => Err(ShopbotError::completion(message)),
        }
    }
}
