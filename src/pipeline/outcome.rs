//! Externally visible result shapes, one per pipeline operation.
//!
//! Every outcome is a flat, serialisable record: a success flag, the
//! payload fields, and an optional human-readable error that has already
//! been redacted.

use serde::Serialize;

use crate::llm::Transcription;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationOutcome {
    pub success: bool,
    pub message: String,
    /// Present whenever code was generated, even if it later failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_path: Option<String>,
    /// `true` when `video_path` is a demo stand-in, not a video.
    pub demo: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_time_secs: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GenerationOutcome {
    pub(crate) fn failed(message: &str, code: Option<String>, error: String) -> Self {
        Self {
            success: false,
            message: message.to_string(),
            code,
            video_path: None,
            demo: false,
            execution_time_secs: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_path: Option<String>,
    pub demo: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PreviewOutcome {
    pub(crate) fn failed(error: String) -> Self {
        Self {
            success: false,
            video_path: None,
            demo: false,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaveOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptionOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<Transcription> for TranscriptionOutcome {
    fn from(t: Transcription) -> Self {
        Self {
            success: true,
            text: Some(t.text),
            method: Some(t.method),
            model: Some(t.model),
            error: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationOutcome {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
