//! Speech-to-text through Qwen-Omni's streaming chat endpoint.
//!
//! The audio is sent as a base64 data URI inside an OpenAI-compatible chat
//! request with `stream: true`.  The answer arrives as server-sent events;
//! [`SseAccumulator`] stitches the `choices[0].delta.content` fragments
//! together in arrival order.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use serde::Serialize;
use serde_json::Value;

use crate::config::{AppConfig, Secret};
use crate::error::{PipelineError, ProviderResult};
use crate::llm::http;
use crate::llm::provider::usable_key;

/// Value of [`Transcription::method`] for this backend.
pub const METHOD: &str = "qwen_omni";
/// Anything shorter cannot be a usable recording.
pub const MIN_AUDIO_BYTES: usize = 100;

const PROVIDER_NAME: &str = "Qwen-Omni";
const DONE_SENTINEL: &str = "[DONE]";

// ---------------------------------------------------------------------------
// Transcription
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transcription {
    pub text: String,
    pub method: String,
    pub model: String,
}

// ---------------------------------------------------------------------------
// AudioFormat
// ---------------------------------------------------------------------------

/// Container format, sniffed from leading magic bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Wav,
    Ogg,
    Webm,
    Mp3,
    Mp4,
}

impl AudioFormat {
    /// Unrecognised data is assumed to be WAV.
    pub fn detect(bytes: &[u8]) -> Self {
        match bytes {
            [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'A', b'V', b'E', ..] => AudioFormat::Wav,
            [b'O', b'g', b'g', b'S', ..] => AudioFormat::Ogg,
            [0x1A, 0x45, 0xDF, 0xA3, ..] => AudioFormat::Webm,
            [b'I', b'D', b'3', ..] => AudioFormat::Mp3,
            [0xFF, second, ..] if second & 0xE0 == 0xE0 => AudioFormat::Mp3,
            [_, _, _, _, b'f', b't', b'y', b'p', ..] => AudioFormat::Mp4,
            _ => AudioFormat::Wav,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AudioFormat::Wav => "wav",
            AudioFormat::Ogg => "ogg",
            AudioFormat::Webm => "webm",
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Mp4 => "mp4",
        }
    }
}

// ---------------------------------------------------------------------------
// SseAccumulator
// ---------------------------------------------------------------------------

/// Incremental decoder for a `text/event-stream` body.
///
/// Bytes may be pushed in arbitrary chunks; a line is only decoded once its
/// terminating newline has arrived (or at [`finish`](Self::finish)).  Frames
/// that are the `[DONE]` sentinel, are not JSON, or carry no text delta are
/// skipped.
#[derive(Debug, Default)]
pub struct SseAccumulator {
    pending: Vec<u8>,
    text: String,
    frames: usize,
}

impl SseAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            self.consume_line(&line);
        }
    }

    /// Number of frames whose delta contributed text.
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Flush any unterminated last line and return the trimmed text.
    pub fn finish(mut self) -> String {
        if !self.pending.is_empty() {
            let rest = std::mem::take(&mut self.pending);
            self.consume_line(&rest);
        }
        self.text.trim().to_string()
    }

    fn consume_line(&mut self, raw: &[u8]) {
        let line = String::from_utf8_lossy(raw);
        let Some(data) = line.trim().strip_prefix("data:") else {
            return;
        };
        let data = data.trim();
        if data.is_empty() || data == DONE_SENTINEL {
            return;
        }
        let Ok(frame) = serde_json::from_str::<Value>(data) else {
            log::debug!("transcribe: skipping undecodable frame");
            return;
        };
        if let Some(delta) = frame["choices"][0]["delta"]["content"].as_str() {
            self.text.push_str(delta);
            self.frames += 1;
        }
    }
}

// ---------------------------------------------------------------------------
// SpeechTranscriber trait
// ---------------------------------------------------------------------------

/// A speech-to-text backend.  One call is one network attempt.
#[async_trait]
pub trait SpeechTranscriber: Send + Sync {
    fn is_available(&self) -> bool;

    /// Model name reported alongside results.
    fn model(&self) -> &str;

    async fn transcribe_once(&self, audio: &[u8]) -> ProviderResult<String>;
}

// ---------------------------------------------------------------------------
// OmniTranscriber
// ---------------------------------------------------------------------------

pub struct OmniTranscriber {
    client: reqwest::Client,
    url: String,
    api_key: Option<Secret>,
    model: String,
    prompt: String,
}

impl OmniTranscriber {
    pub fn new(
        url: impl Into<String>,
        api_key: Option<Secret>,
        model: impl Into<String>,
        prompt: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client: http::client_with_timeout(timeout),
            url: url.into(),
            api_key,
            model: model.into(),
            prompt: prompt.into(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let transcriber = Self::new(
            config.providers.omni_url.clone(),
            config.providers.dashscope_api_key.clone(),
            config.voice.model.clone(),
            config.voice.prompt.clone(),
            Duration::from_secs(config.voice.timeout_secs),
        );
        if transcriber.is_available() {
            log::info!("transcribe: Qwen-Omni ready (model {})", transcriber.model);
        } else {
            log::warn!("transcribe: DASHSCOPE_API_KEY not set, speech transcription unavailable");
        }
        transcriber
    }

    fn request_body(&self, audio: &[u8]) -> Value {
        let format = AudioFormat::detect(audio).as_str();
        let encoded = base64::engine::general_purpose::STANDARD.encode(audio);
        serde_json::json!({
            "model": self.model,
            "messages": [{
                "role": "user",
                "content": [
                    {
                        "type": "input_audio",
                        "input_audio": {
                            "data":   format!("data:audio/{format};base64,{encoded}"),
                            "format": format
                        }
                    },
                    { "type": "text", "text": self.prompt }
                ]
            }],
            "modalities":     ["text"],
            "stream":         true,
            "stream_options": { "include_usage": true }
        })
    }
}

#[async_trait]
impl SpeechTranscriber for OmniTranscriber {
    fn is_available(&self) -> bool {
        usable_key(self.api_key.as_ref()).is_some()
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn transcribe_once(&self, audio: &[u8]) -> ProviderResult<String> {
        let key = usable_key(self.api_key.as_ref())
            .ok_or_else(|| PipelineError::ProviderUnavailable(PROVIDER_NAME.to_string()))?;

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(key.expose())
            .json(&self.request_body(audio))
            .send()
            .await?;
        let mut response = http::check_status(PROVIDER_NAME, response).await?;

        let mut acc = SseAccumulator::new();
        while let Some(chunk) = response.chunk().await? {
            acc.push(&chunk);
        }
        let frames = acc.frames();
        let text = acc.finish();
        if text.is_empty() {
            return Err(PipelineError::ProviderEmptyResult(PROVIDER_NAME.to_string()));
        }
        log::debug!("transcribe: {frames} frames, {} chars", text.chars().count());
        Ok(text)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::llm::stub::{StubResponse, StubServer};

    fn wav_bytes() -> Vec<u8> {
        let mut v = b"RIFF\x24\x00\x00\x00WAVEfmt ".to_vec();
        v.resize(256, 0);
        v
    }

    fn transcriber(url: &str) -> OmniTranscriber {
        OmniTranscriber::new(
            url,
            Some(Secret::new("dash")),
            "qwen2.5-omni-7b",
            "transcribe this",
            Duration::from_secs(5),
        )
    }

    #[test]
    fn detects_containers() {
        assert_eq!(AudioFormat::detect(&wav_bytes()), AudioFormat::Wav);
        assert_eq!(AudioFormat::detect(b"OggS\0\0\0\0"), AudioFormat::Ogg);
        assert_eq!(AudioFormat::detect(&[0x1A, 0x45, 0xDF, 0xA3, 0]), AudioFormat::Webm);
        assert_eq!(AudioFormat::detect(b"ID3\x04"), AudioFormat::Mp3);
        assert_eq!(AudioFormat::detect(&[0xFF, 0xFB, 0x90]), AudioFormat::Mp3);
        assert_eq!(AudioFormat::detect(b"\0\0\0\x18ftypmp42"), AudioFormat::Mp4);
        assert_eq!(AudioFormat::detect(b"garbage"), AudioFormat::Wav);
    }

    #[test]
    fn accumulates_deltas_across_split_chunks() {
        let mut acc = SseAccumulator::new();
        acc.push(b"data: {\"choices\":[{\"delta\":{\"content\":\" Hel\"}}]}\n\ndata: {\"choi");
        acc.push(b"ces\":[{\"delta\":{\"content\":\"lo \"}}]}\n");
        acc.push(b"data: not json\n");
        acc.push(b"data: {\"choices\":[{\"delta\":{\"content\":null}}]}\n");
        acc.push(b"data: {\"choices\":[],\"usage\":{\"total_tokens\":3}}\n");
        acc.push(b"data: [DONE]");
        assert_eq!(acc.frames(), 2);
        assert_eq!(acc.finish(), "Hello");
    }

    #[test]
    fn unterminated_last_frame_is_flushed() {
        let mut acc = SseAccumulator::new();
        acc.push(b"data: {\"choices\":[{\"delta\":{\"content\":\"tail\"}}]}");
        assert_eq!(acc.finish(), "tail");
    }

    #[test]
    fn request_carries_data_uri() {
        let body = transcriber("http://localhost").request_body(&wav_bytes());
        let audio = &body["messages"][0]["content"][0]["input_audio"];
        assert_eq!(audio["format"], "wav");
        assert!(audio["data"].as_str().unwrap().starts_with("data:audio/wav;base64,UklGR"));
        assert_eq!(body["stream"], true);
        assert_eq!(body["modalities"][0], "text");
        assert_eq!(body["messages"][0]["content"][1]["text"], "transcribe this");
    }

    #[tokio::test]
    async fn streams_text_from_server() {
        let sse = "data: {\"choices\":[{\"delta\":{\"content\":\"你好\"}}]}\n\n\
                   data: {\"choices\":[{\"delta\":{\"content\":\"世界\"}}]}\n\n\
                   data: [DONE]\n\n";
        let server = StubServer::start(vec![StubResponse::event_stream(sse)]).await;
        let text = transcriber(&server.url).transcribe_once(&wav_bytes()).await.unwrap();
        assert_eq!(text, "你好世界");
    }

    #[tokio::test]
    async fn empty_stream_is_empty_result() {
        let server = StubServer::start(vec![StubResponse::event_stream("data: [DONE]\n\n")]).await;
        let err = transcriber(&server.url).transcribe_once(&wav_bytes()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProviderEmptyResult);
    }

    #[tokio::test]
    async fn unauthorized_is_auth_error() {
        let server = StubServer::start(vec![StubResponse::text(401, "invalid key")]).await;
        let err = transcriber(&server.url).transcribe_once(&wav_bytes()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProviderAuth);
    }
}
