//! Qwen text generation over the DashScope native API.
//!
//! The envelope differs from chat completions: messages sit under `input`,
//! sampling options under `parameters`, and the answer comes back as
//! `output.text` (or `output.choices[0].message.content` when the account
//! defaults to the message result format).

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::{AppConfig, Secret};
use crate::error::{PipelineError, ProviderResult};
use crate::llm::http;
use crate::llm::provider::{usable_key, CodeProvider};
use crate::llm::request::{Backend, GenerationRequest};

pub struct DashScopeProvider {
    client: reqwest::Client,
    url: String,
    api_key: Option<Secret>,
}

impl DashScopeProvider {
    pub fn new(url: impl Into<String>, api_key: Option<Secret>, timeout: Duration) -> Self {
        Self {
            client: http::client_with_timeout(timeout),
            url: url.into(),
            api_key,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.providers.qwen_url.clone(),
            config.providers.qwen_api_key.clone(),
            Duration::from_secs(config.generation.timeout_secs),
        )
    }
}

fn answer_text(json: &Value) -> Option<&str> {
    let output = &json["output"];
    output["text"]
        .as_str()
        .filter(|t| !t.is_empty())
        .or_else(|| output["choices"][0]["message"]["content"].as_str())
}

#[async_trait]
impl CodeProvider for DashScopeProvider {
    fn backend(&self) -> Backend {
        Backend::Qwen
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
        let name = Backend::Qwen.display_name();
        let key = usable_key(self.api_key.as_ref())
            .ok_or_else(|| PipelineError::ProviderUnavailable(name.to_string()))?;

        let body = serde_json::json!({
            "model": request.provider().model_name(),
            "input": {
                "messages": [
                    { "role": "system", "content": system },
                    { "role": "user",   "content": user   }
                ]
            },
            "parameters": {
                "temperature": request.temperature(),
                "max_tokens":  request.max_tokens()
            }
        });

        log::debug!("dashscope: POST model={}", request.provider());
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(key.expose())
            .json(&body)
            .send()
            .await?;
        let response = http::check_status(name, response).await?;

        let json: Value = response.json().await?;
        if let Some(usage) = json.get("usage") {
            log::debug!("dashscope: usage {usage}");
        }
        answer_text(&json).map(str::to_string).ok_or_else(|| {
            PipelineError::ProviderProtocol("Qwen response has no output text".into())
        })
    }
}
