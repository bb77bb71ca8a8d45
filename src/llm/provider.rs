//! Core `CodeProvider` trait and the OpenAI-style chat-completions adapter.
//!
//! `ChatCompletionsProvider` serves both DeepSeek and OpenAI, which share the
//! `/v1/chat/completions` wire format and bearer authentication.  Endpoints
//! and credentials come from [`ProvidersConfig`]; the defaults there point at
//! the public APIs.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::{AppConfig, ProvidersConfig, Secret};
use crate::error::{PipelineError, ProviderResult};
use crate::llm::http;
use crate::llm::request::{Backend, GenerationRequest};

// ---------------------------------------------------------------------------
// CodeProvider trait
// ---------------------------------------------------------------------------

/// One code-generation backend.
///
/// Implementors must be `Send + Sync` so the gateway can hold them as
/// `Box<dyn CodeProvider>`.  [`complete`](CodeProvider::complete) performs a
/// single attempt; retries belong to the gateway.
#[async_trait]
pub trait CodeProvider: Send + Sync {
    fn backend(&self) -> Backend;

    /// `false` when no credential is configured.
    fn is_available(&self) -> bool;

    /// Send one request and return the model's raw answer text.
    async fn complete(
        &self,
        request: &GenerationRequest,
        system: &str,
        user: &str,
    ) -> ProviderResult<String>;
}

/// Return the key if it is present and non-blank.
pub(crate) fn usable_key(key: Option<&Secret>) -> Option<&Secret> {
    key.filter(|k| !k.is_blank())
}

// ---------------------------------------------------------------------------
// ChatCompletionsProvider
// ---------------------------------------------------------------------------

/// Calls an OpenAI-compatible `/v1/chat/completions` endpoint.
pub struct ChatCompletionsProvider {
    backend: Backend,
    client: reqwest::Client,
    url: String,
    api_key: Option<Secret>,
}

impl ChatCompletionsProvider {
    pub fn new(backend: Backend, url: impl Into<String>, api_key: Option<Secret>, timeout: Duration) -> Self {
        Self {
            backend,
            client: http::client_with_timeout(timeout),
            url: url.into(),
            api_key,
        }
    }

    pub fn deepseek(config: &AppConfig) -> Self {
        let ProvidersConfig {
            deepseek_url,
            deepseek_api_key,
            ..
        } = &config.providers;
        Self::new(
            Backend::DeepSeek,
            deepseek_url.clone(),
            deepseek_api_key.clone(),
            Duration::from_secs(config.generation.timeout_secs),
        )
    }

    pub fn openai(config: &AppConfig) -> Self {
        let ProvidersConfig {
            openai_url,
            openai_api_key,
            ..
        } = &config.providers;
        Self::new(
            Backend::OpenAi,
            openai_url.clone(),
            openai_api_key.clone(),
            Duration::from_secs(config.generation.timeout_secs),
        )
    }
}

#[async_trait]
impl CodeProvider for ChatCompletionsProvider {
    fn backend(&self) -> Backend {
        self.backend
    }

    fn is_available(&self) -> bool {
        usable_key(self.api_key.as_ref()).is_some()
    }

    async fn complete(
        &self,
        request: &GenerationRequest,
        system: &str,
        user: &str,
    ) -> ProviderResult<String> {
        let name = self.backend.display_name();
        let key = usable_key(self.api_key.as_ref())
            .ok_or_else(|| PipelineError::ProviderUnavailable(name.to_string()))?;

        let body = serde_json::json!({
            "model":       request.provider().model_name(),
            "messages": [
                { "role": "system", "content": system },
                { "role": "user",   "content": user   }
            ],
            "stream":      false,
            "temperature": request.temperature(),
            "max_tokens":  request.max_tokens()
        });

        log::debug!("provider: POST {name} model={}", request.provider());
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(key.expose())
            .json(&body)
            .send()
            .await?;
        let response = http::check_status(name, response).await?;

        let json: Value = response.json().await?;
        json["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| {
                PipelineError::ProviderProtocol(format!(
                    "{name} response has no choices[0].message.content"
                ))
            })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::llm::request::ProviderId;
    use crate::llm::stub::{StubResponse, StubServer};
    use serde_json::json;

    fn request() -> GenerationRequest {
        GenerationRequest::new("a circle", ProviderId::DeepseekCoder, 0.5, 1200).unwrap()
    }

    fn provider(url: &str, key: Option<&str>) -> ChatCompletionsProvider {
        ChatCompletionsProvider::new(
            Backend::DeepSeek,
            url,
            key.map(Secret::new),
            Duration::from_secs(5),
        )
    }

    #[test]
    fn availability_follows_key() {
        assert!(!provider("http://localhost", None).is_available());
        assert!(!provider("http://localhost", Some(" ")).is_available());
        assert!(provider("http://localhost", Some("sk-1")).is_available());
    }

    /// Verify that the provider is object-safe (usable as `dyn CodeProvider`).
    #[test]
    fn provider_is_object_safe() {
        let p: Box<dyn CodeProvider> = Box::new(provider("http://localhost", None));
        assert_eq!(p.backend(), Backend::DeepSeek);
    }

    #[tokio::test]
    async fn missing_key_fails_without_network() {
        let err = provider("http://127.0.0.1:9", None)
            .complete(&request(), "sys", "user")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProviderUnavailable);
    }

    #[tokio::test]
    async fn sends_chat_body_and_reads_content() {
        let server = StubServer::start(vec![StubResponse::json(
            200,
            json!({ "choices": [{ "message": { "content": "```python\nx = 1\n```" } }] }),
        )])
        .await;

        let text = provider(&server.url, Some("sk-abc"))
            .complete(&request(), "sys", "user")
            .await
            .unwrap();
        assert_eq!(text, "```python\nx = 1\n```");

        let sent = &server.requests()[0];
        assert_eq!(sent.header("authorization").as_deref(), Some("Bearer sk-abc"));
        let body = sent.json();
        assert_eq!(body["model"], "deepseek-coder");
        assert_eq!(body["max_tokens"], 1200);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "user");
    }

    #[tokio::test]
    async fn status_errors_are_classified() {
        let server = StubServer::start(vec![
            StubResponse::text(401, "bad key"),
            StubResponse::text(429, "slow down"),
        ])
        .await;
        let p = provider(&server.url, Some("sk-abc"));

        let first = p.complete(&request(), "s", "u").await.unwrap_err();
        assert_eq!(first.kind(), ErrorKind::ProviderAuth);
        let second = p.complete(&request(), "s", "u").await.unwrap_err();
        assert_eq!(second.kind(), ErrorKind::ProviderRateLimited);
    }

    #[tokio::test]
    async fn unexpected_shape_is_protocol_error() {
        let server = StubServer::start(vec![StubResponse::json(200, json!({ "choices": [] }))]).await;
        let err = provider(&server.url, Some("k"))
            .complete(&request(), "s", "u")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProviderProtocol);
    }

    #[tokio::test]
    async fn slow_server_times_out() {
        let server = StubServer::start(vec![StubResponse::json(200, json!({}))
            .delayed(Duration::from_secs(3))])
        .await;
        let p = ChatCompletionsProvider::new(
            Backend::OpenAi,
            server.url.clone(),
            Some(Secret::new("k")),
            Duration::from_millis(200),
        );
        let err = p.complete(&request(), "s", "u").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProviderTimeout);
    }
}
