//! Provider selectors and the validated generation request.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, ProviderResult};

// ---------------------------------------------------------------------------
// Backend
// ---------------------------------------------------------------------------

/// Wire protocol family a [`ProviderId`] is served by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// OpenAI-style chat completions at api.deepseek.com.
    DeepSeek,
    /// OpenAI chat completions.
    OpenAi,
    /// DashScope native text-generation.
    Qwen,
}

impl Backend {
    pub fn display_name(self) -> &'static str {
        match self {
            Backend::DeepSeek => "DeepSeek",
            Backend::OpenAi => "OpenAI",
            Backend::Qwen => "Qwen",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

// ---------------------------------------------------------------------------
// ProviderId
// ---------------------------------------------------------------------------

/// A code-generation model selectable by callers.
///
/// The serialised form is the model name sent on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ProviderId {
    #[default]
    #[serde(rename = "deepseek-chat")]
    DeepseekChat,
    #[serde(rename = "deepseek-coder")]
    DeepseekCoder,
    #[serde(rename = "gpt-4")]
    Gpt4,
    #[serde(rename = "gpt-3.5-turbo")]
    Gpt35Turbo,
    #[serde(rename = "qwen-turbo")]
    QwenTurbo,
    #[serde(rename = "qwen-plus")]
    QwenPlus,
    #[serde(rename = "qwen-max")]
    QwenMax,
}

impl ProviderId {
    pub const ALL: [ProviderId; 7] = [
        ProviderId::DeepseekChat,
        ProviderId::DeepseekCoder,
        ProviderId::Gpt4,
        ProviderId::Gpt35Turbo,
        ProviderId::QwenTurbo,
        ProviderId::QwenPlus,
        ProviderId::QwenMax,
    ];

    /// Model name as sent in the request body.
    pub fn model_name(self) -> &'static str {
        match self {
            ProviderId::DeepseekChat => "deepseek-chat",
            ProviderId::DeepseekCoder => "deepseek-coder",
            ProviderId::Gpt4 => "gpt-4",
            ProviderId::Gpt35Turbo => "gpt-3.5-turbo",
            ProviderId::QwenTurbo => "qwen-turbo",
            ProviderId::QwenPlus => "qwen-plus",
            ProviderId::QwenMax => "qwen-max",
        }
    }

    pub fn backend(self) -> Backend {
        match self {
            ProviderId::DeepseekChat | ProviderId::DeepseekCoder => Backend::DeepSeek,
            ProviderId::Gpt4 | ProviderId::Gpt35Turbo => Backend::OpenAi,
            ProviderId::QwenTurbo | ProviderId::QwenPlus | ProviderId::QwenMax => Backend::Qwen,
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.model_name())
    }
}

impl FromStr for ProviderId {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        ProviderId::ALL
            .into_iter()
            .find(|id| id.model_name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| PipelineError::InvalidRequest(format!("unknown model '{wanted}'")))
    }
}

// ---------------------------------------------------------------------------
// GenerationRequest
// ---------------------------------------------------------------------------

pub const TEMPERATURE_RANGE: std::ops::RangeInclusive<f32> = 0.0..=2.0;
pub const MAX_TOKENS_RANGE: std::ops::RangeInclusive<u32> = 100..=8000;

/// A bounds-checked request for generated code.  Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    prompt: String,
    provider: ProviderId,
    temperature: f32,
    max_tokens: u32,
}

impl GenerationRequest {
    /// Returns `InvalidRequest` when the prompt is blank or a sampling
    /// parameter is out of range.
    pub fn new(
        prompt: impl Into<String>,
        provider: ProviderId,
        temperature: f32,
        max_tokens: u32,
    ) -> ProviderResult<Self> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(PipelineError::InvalidRequest("prompt is empty".into()));
        }
        if !TEMPERATURE_RANGE.contains(&temperature) {
            return Err(PipelineError::InvalidRequest(format!(
                "temperature {temperature} outside {}..={}",
                TEMPERATURE_RANGE.start(),
                TEMPERATURE_RANGE.end()
            )));
        }
        if !MAX_TOKENS_RANGE.contains(&max_tokens) {
            return Err(PipelineError::InvalidRequest(format!(
                "max_tokens {max_tokens} outside {}..={}",
                MAX_TOKENS_RANGE.start(),
                MAX_TOKENS_RANGE.end()
            )));
        }
        Ok(Self {
            prompt,
            provider,
            temperature,
            max_tokens,
        })
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn provider(&self) -> ProviderId {
        self.provider
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn wire_names_round_trip_through_from_str() {
        for id in ProviderId::ALL {
            assert_eq!(id.model_name().parse::<ProviderId>().unwrap(), id);
        }
        assert_eq!("GPT-4".parse::<ProviderId>().unwrap(), ProviderId::Gpt4);
        assert!("llama".parse::<ProviderId>().is_err());
    }

    #[test]
    fn backends_group_models() {
        assert_eq!(ProviderId::DeepseekCoder.backend(), Backend::DeepSeek);
        assert_eq!(ProviderId::Gpt35Turbo.backend(), Backend::OpenAi);
        assert_eq!(ProviderId::QwenMax.backend(), Backend::Qwen);
    }

    #[test]
    fn serde_uses_wire_names() {
        let json = serde_json::to_string(&ProviderId::Gpt35Turbo).unwrap();
        assert_eq!(json, "\"gpt-3.5-turbo\"");
    }

    #[test]
    fn request_bounds_are_enforced() {
        assert!(GenerationRequest::new("circle", ProviderId::Gpt4, 0.0, 100).is_ok());
        assert!(GenerationRequest::new("circle", ProviderId::Gpt4, 2.0, 8000).is_ok());

        for (prompt, temp, tokens) in [
            ("  ", 0.7, 4000),
            ("circle", -0.1, 4000),
            ("circle", 2.5, 4000),
            ("circle", 0.7, 99),
            ("circle", 0.7, 8001),
        ] {
            let err = GenerationRequest::new(prompt, ProviderId::Gpt4, temp, tokens).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        }
    }
}
