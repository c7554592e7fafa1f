// SPDX-FileCopyrightText: 2026 Shopbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for an OpenAI-compatible chat-completions endpoint.
//!
//! One call is one HTTP request. Failures are reported, never retried.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use shopbot_core::ShopbotError;
use tracing::debug;

use crate::types::{ApiErrorResponse, ChatCompletionRequest, ChatCompletionResponse};

/// HTTP client for chat completions.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: reqwest::Client,
    endpoint: String,
}

impl OpenAiClient {
    /// Creates a new client.
    ///
    /// `base_url` is everything before `/chat/completions`, e.g.
    /// `https://api.openai.com/v1`.
    pub fn new(api_key: &str, base_url: &str, timeout: Duration) -> Result<Self, ShopbotError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {api_key}")).map_err(|e| {
                ShopbotError::Config(format!("invalid API key header value: {e}"))
            })?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| ShopbotError::Completion {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
        })
    }

    /// Full URL requests are posted to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Sends a request and returns the parsed response.
    pub async fn create_chat_completion(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, ShopbotError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| ShopbotError::Completion {
                message: format!("HTTP request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        debug!(status = %status, "completion response received");

        let body = response.text().await.map_err(|e| ShopbotError::Completion {
            message: format!("failed to read response body: {e}"),
            source: Some(Box::new(e)),
        })?;

        if !status.is_success() {
            let message = match serde_json::from_str::<ApiErrorResponse>(&body) {
                Ok(api_err) => format!(
                    "OpenAI API error ({}, {}): {}",
                    status,
                    api_err.error.type_.as_deref().unwrap_or("unknown"),
                    api_err.error.message
                ),
                Err(_) => format!("API returned {status}: {body}"),
            };
            return Err(ShopbotError::completion(message));
        }

        serde_json::from_str(&body).map_err(|e| ShopbotError::Completion {
            message: format!("failed to parse API response: {e}"),
            source: Some(Box::new(e)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ApiMessage;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(base_url: &str) -> OpenAiClient {
        OpenAiClient::new("test-api-key", base_url, Duration::from_secs(5)).unwrap()
    }

    fn test_request() -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: "gpt-3.5-turbo".into(),
            messages: vec![ApiMessage {
                role: "user".into(),
                content: "Hello".into(),
            }],
            max_tokens: 500,
            temperature: 0.7,
        }
    }

    fn success_body(content: &str) -> serde_json::Value {
        serde_json::json!({
            "id": "chatcmpl-test",
            "object": "chat.completion",
            "model": "gpt-3.5-turbo",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": content},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        })
    }

    #[test]
    fn endpoint_joins_base_url() {
        let client = test_client("https://api.openai.com/v1/");
        assert_eq!(client.endpoint(), "https://api.openai.com/v1/chat/completions");
    }

    #[tokio::test]
    async fn create_chat_completion_success() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-api-key"))
            .and(body_partial_json(serde_json::json!({
                "model": "gpt-3.5-turbo",
                "max_tokens": 500
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_body("Hi there!")))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let result = client.create_chat_completion(&test_request()).await.unwrap();
        assert_eq!(result.id, "chatcmpl-test");
        assert_eq!(result.usage.prompt_tokens, 10);
        assert_eq!(result.choices[0].message.content.as_deref(), Some("Hi there!"));
    }

    #[tokio::test]
    async fn server_error_is_not_retried() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(503).set_body_json(serde_json::json!({
                "error": {"type": "server_error", "message": "overloaded"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let err = client
            .create_chat_completion(&test_request())
            .await
            .unwrap_err();
        assert!(matches!(err, ShopbotError::Completion { .. }));
        assert!(err.to_string().contains("server_error"), "got: {err}");
    }

    #[tokio::test]
    async fn unparsable_body_is_completion_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let err = client
            .create_chat_completion(&test_request())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("failed to parse"), "got: {err}");
    }
}
