//! `ProviderGateway`: one entry point over every generation backend.
//!
//! The gateway selects the adapter for a request's backend, applies the
//! retry policy around single attempts, and normalises answers (code
//! extraction, empty-result detection).  Adapters themselves never retry.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::config::AppConfig;
use crate::error::{PipelineError, ProviderResult};
use crate::llm::dashscope::DashScopeProvider;
use crate::llm::extract::extract_code;
use crate::llm::prompt::PromptBuilder;
use crate::llm::provider::{ChatCompletionsProvider, CodeProvider};
use crate::llm::request::{Backend, GenerationRequest, ProviderId};
use crate::llm::retry::RetryPolicy;
use crate::llm::transcribe::{
    OmniTranscriber, SpeechTranscriber, Transcription, METHOD, MIN_AUDIO_BYTES,
};
use crate::source::SourceArtifact;

pub struct ProviderGateway {
    providers: HashMap<Backend, Box<dyn CodeProvider>>,
    transcriber: Option<Box<dyn SpeechTranscriber>>,
    prompts: PromptBuilder,
    retry: RetryPolicy,
    voice_retry: RetryPolicy,
}

impl ProviderGateway {
    /// An empty gateway; register adapters with
    /// [`with_provider`](Self::with_provider) and
    /// [`with_transcriber`](Self::with_transcriber).
    pub fn new(retry: RetryPolicy) -> Self {
        Self {
            providers: HashMap::new(),
            transcriber: None,
            prompts: PromptBuilder::new(),
            retry,
            voice_retry: retry,
        }
    }

    /// Gateway with the DeepSeek, OpenAI, Qwen and Qwen-Omni adapters built
    /// from `config`.
    pub fn from_config(config: &AppConfig) -> Self {
        let retry = RetryPolicy::from_config(&config.retry);
        let voice_retry = RetryPolicy::new(
            config.voice.max_attempts,
            Duration::from_millis(config.retry.base_delay_ms),
        );
        let gateway = Self::new(retry)
            .with_provider(ChatCompletionsProvider::deepseek(config))
            .with_provider(ChatCompletionsProvider::openai(config))
            .with_provider(DashScopeProvider::from_config(config))
            .with_transcriber(OmniTranscriber::from_config(config), voice_retry);

        log::info!(
            "gateway: {} of {} models available",
            gateway.available_models().len(),
            ProviderId::ALL.len()
        );
        gateway
    }

    /// Register (or replace) the adapter for its backend.
    pub fn with_provider(mut self, provider: impl CodeProvider + 'static) -> Self {
        self.providers.insert(provider.backend(), Box::new(provider));
        self
    }

    pub fn with_transcriber(
        mut self,
        transcriber: impl SpeechTranscriber + 'static,
        retry: RetryPolicy,
    ) -> Self {
        self.transcriber = Some(Box::new(transcriber));
        self.voice_retry = retry;
        self
    }

    /// Models whose backend has a configured credential, in catalogue order.
    pub fn available_models(&self) -> Vec<ProviderId> {
        ProviderId::ALL
            .into_iter()
            .filter(|id| {
                self.providers
                    .get(&id.backend())
                    .is_some_and(|p| p.is_available())
            })
            .collect()
    }

    pub fn transcription_available(&self) -> bool {
        self.transcriber.as_ref().is_some_and(|t| t.is_available())
    }

    /// Generate Manim source for `request`.
    pub async fn generate_code(&self, request: &GenerationRequest) -> ProviderResult<SourceArtifact> {
        let backend = request.provider().backend();
        let name = backend.display_name();
        let provider = self
            .providers
            .get(&backend)
            .filter(|p| p.is_available())
            .ok_or_else(|| PipelineError::ProviderUnavailable(name.to_string()))?;

        let (system, user) = self.prompts.build_chat(request.prompt());
        let (system, user) = (system.as_str(), user.as_str());
        log::info!(
            "gateway: generating with {} (prompt {} chars)",
            request.provider(),
            request.prompt().chars().count()
        );

        let started = Instant::now();
        let raw = self
            .retry
            .run(name, move |attempt| {
                log::debug!("gateway: {name} attempt {attempt}");
                provider.complete(request, system, user)
            })
            .await?;

        let code = extract_code(&raw);
        if code.is_empty() {
            return Err(PipelineError::ProviderEmptyResult(name.to_string()));
        }
        log::info!(
            "gateway: {name} returned {} chars of code in {:.2}s",
            code.len(),
            started.elapsed().as_secs_f64()
        );
        Ok(SourceArtifact::from_code(code))
    }

    /// Transcribe a recording.
    ///
    /// Recordings shorter than [`MIN_AUDIO_BYTES`] are rejected before any
    /// network call.
    pub async fn transcribe(&self, audio: &[u8]) -> ProviderResult<Transcription> {
        if audio.len() < MIN_AUDIO_BYTES {
            return Err(PipelineError::InvalidAudio(format!(
                "recording is {} bytes, need at least {MIN_AUDIO_BYTES}",
                audio.len()
            )));
        }
        let transcriber = self
            .transcriber
            .as_ref()
            .filter(|t| t.is_available())
            .ok_or_else(|| PipelineError::ProviderUnavailable("Qwen-Omni".into()))?;

        log::info!("gateway: transcribing {} bytes of audio", audio.len());
        let text = self
            .voice_retry
            .run("Qwen-Omni", move |_| transcriber.transcribe_once(audio))
            .await?;

        Ok(Transcription {
            text,
            method: METHOD.to_string(),
            model: transcriber.model().to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
