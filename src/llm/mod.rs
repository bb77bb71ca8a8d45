//! Provider Gateway: code generation and speech transcription backends.
//!
//! This module provides:
//! * [`ProviderGateway`]: the single entry point callers use.
//! * [`CodeProvider`]: async trait implemented by every code backend.
//! * [`ChatCompletionsProvider`]: DeepSeek and OpenAI (`/v1/chat/completions`).
//! * [`DashScopeProvider`]: Qwen over DashScope's native envelope.
//! * [`SpeechTranscriber`] / [`OmniTranscriber`]: streaming Qwen-Omni speech-to-text.
//! * [`RetryPolicy`]: bounded exponential backoff for transient failures.
//! * [`extract_code`]: pulls the fenced code block out of an answer.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use manim_gpt::config::AppConfig;
//! use manim_gpt::llm::{GenerationRequest, ProviderGateway, ProviderId};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::load().unwrap();
//!     let gateway = ProviderGateway::from_config(&config);
//!
//!     let request =
//!         GenerationRequest::new("a square turning into a circle", ProviderId::DeepseekChat, 0.7, 4000)
//!             .unwrap();
//!     let source = gateway.generate_code(&request).await.unwrap();
//!     println!("{} -> {}", source.entry_point(), source.code());
//! }
//! ```

pub mod dashscope;
pub mod extract;
pub mod gateway;
pub(crate) mod http;
pub mod prompt;
pub mod provider;
pub mod request;
pub mod retry;
pub mod transcribe;

#[cfg(test)]
pub(crate) mod stub;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use dashscope::DashScopeProvider;
pub use extract::extract_code;
pub use gateway::ProviderGateway;
pub use prompt::{PromptBuilder, SYSTEM_PROMPT};
pub use provider::{ChatCompletionsProvider, CodeProvider};
pub use request::{Backend, GenerationRequest, ProviderId};
pub use retry::RetryPolicy;
pub use transcribe::{AudioFormat, OmniTranscriber, SpeechTranscriber, SseAccumulator, Transcription};
