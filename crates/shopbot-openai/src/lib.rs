// SPDX-FileCopyrightText: 2026 Shopbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenAI-compatible completion provider for the Shopbot sales assistant.
//!
//! Implements [`ProviderAdapter`] over the `/chat/completions` endpoint.

pub mod client;
pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use shopbot_config::model::OpenAiConfig;
use shopbot_core::{
    AdapterType, CompletionRequest, CompletionResponse, HealthStatus, PluginAdapter,
    ProviderAdapter, ShopbotError, TokenUsage,
};
use tracing::{debug, info};

use crate::client::OpenAiClient;
use crate::types::{ApiMessage, ChatCompletionRequest, ChatCompletionResponse};

/// Chat-completion provider implementing [`ProviderAdapter`].
pub struct OpenAiProvider {
    client: OpenAiClient,
}

impl OpenAiProvider {
    /// Creates a provider from the `[openai]` section and a resolved API key.
    pub fn new(config: &OpenAiConfig, api_key: &str) -> Result<Self, ShopbotError> {
        let client = OpenAiClient::new(
            api_key,
            &config.base_url,
            Duration::from_secs(config.timeout_secs),
        )?;
        info!(model = %config.model, endpoint = client.endpoint(), "OpenAI provider initialized");
        Ok(Self { client })
    }
}

fn to_api_request(request: &CompletionRequest) -> ChatCompletionRequest {
    ChatCompletionRequest {
        model: request.model.clone(),
        messages: request
            .messages
            .iter()
            .map(|m| ApiMessage {
                role: m.role.to_string(),
                content: m.content.clone(),
            })
            .collect(),
        max_tokens: request.max_tokens,
        temperature: request.temperature,
    }
}

/// Takes the first choice's text. A missing choice or blank text is an error.
fn from_api_response(response: ChatCompletionResponse) -> Result<CompletionResponse, ShopbotError> {
    let ChatCompletionResponse {
        id,
        model,
        choices,
        usage,
    } = response;

    let content = choices
        .into_iter()
        .next()
        .ok_or_else(|| ShopbotError::completion("response contained no choices"))?
        .message
        .content
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| ShopbotError::completion("first choice has no text content"))?;

    Ok(CompletionResponse {
        id,
        content,
        model,
        usage: TokenUsage {
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
        },
    })
}

#[async_trait]
impl PluginAdapter for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
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
impl ProviderAdapter for OpenAiProvider {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ShopbotError> {
        let api_request = to_api_request(&request);
        debug!(
            model = %api_request.model,
            messages = api_request.messages.len(),
            "sending completion request"
        );
        let response = self.client.create_chat_completion(&api_request).await?;
        from_api_response(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopbot_core::{ChatMessage, Role};
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base_url: &str) -> OpenAiConfig {
        OpenAiConfig {
            base_url: base_url.to_string(),
            timeout_secs: 5,
            ..OpenAiConfig::default()
        }
    }

    fn request() -> CompletionRequest {
        CompletionRequest {
            model: "gpt-3.5-turbo".into(),
            messages: vec![
                ChatMessage::system("You are a sales assistant."),
                ChatMessage::new(Role::User, "Do you sell Widget"),
            ],
            max_tokens: 500,
            temperature: 0.7,
        }
    }

    #[test]
    fn request_roles_are_lowercase() {
        let api = to_api_request(&request());
        let json = serde_json::to_value(&api).unwrap();
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["max_tokens"], 500);
    }

    #[test]
    fn empty_choices_is_error() {
        let resp = ChatCompletionResponse {
            id: "x".into(),
            model: "m".into(),
            choices: vec![],
            usage: Default::default(),
        };
        assert!(matches!(
            from_api_response(resp),
            Err(ShopbotError::Completion { .. })
        ));
    }

    #[tokio::test]
    async fn complete_through_provider() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(serde_json::json!({
                "messages": [
                    {"role": "system", "content": "You are a sales assistant."},
                    {"role": "user", "content": "Do you sell Widget"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "chatcmpl-1",
                "model": "gpt-3.5-turbo",
                "choices": [{"index": 0, "message": {"role": "assistant", "content": "Yes, 9.99."}}],
                "usage": {"prompt_tokens": 20, "completion_tokens": 4}
            })))
            .mount(&server)
            .await;

        let provider = OpenAiProvider::new(&config(&server.uri()), "sk-test").unwrap();
        let response = provider.complete(request()).await.unwrap();
        assert_eq!(response.content, "Yes, 9.99.");
        assert_eq!(response.usage.completion_tokens, 4);
    }

    #[tokio::test]
    async fn blank_content_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "chatcmpl-2",
                "model": "gpt-3.5-turbo",
                "choices": [{"index": 0, "message": {"role": "assistant", "content": "  "}}]
            })))
            .mount(&server)
            .await;

        let provider = OpenAiProvider::new(&config(&server.uri()), "sk-test").unwrap();
        let err = provider.complete(request()).await.unwrap_err();
        assert!(err.to_string().contains("no text content"), "got: {err}");
    }
}
