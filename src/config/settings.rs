//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files.  After loading, a small
//! set of environment variables can override file values (credentials,
//! directories and generation defaults).
//!
//! The resulting [`AppConfig`] is treated as immutable: components receive a
//! reference at construction time and copy what they need.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;
use crate::llm::ProviderId;
use crate::render::{ExecutionStrategy, Quality};

// ---------------------------------------------------------------------------
// Secret
// ---------------------------------------------------------------------------

/// An API credential.  `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Empty strings count as "not configured".
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

// ---------------------------------------------------------------------------
// ProvidersConfig
// ---------------------------------------------------------------------------

/// Credentials and endpoints for every remote backend.
///
/// A backend without a (non-blank) key reports itself unavailable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub deepseek_api_key: Option<Secret>,
    pub openai_api_key: Option<Secret>,
    /// DashScope key used for the Qwen text-generation models.
    pub qwen_api_key: Option<Secret>,
    /// DashScope key used for Qwen-Omni speech transcription.
    pub dashscope_api_key: Option<Secret>,

    pub deepseek_url: String,
    pub openai_url: String,
    pub qwen_url: String,
    pub omni_url: String,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            deepseek_api_key: None,
            openai_api_key: None,
            qwen_api_key: None,
            dashscope_api_key: None,
            deepseek_url: "https://api.deepseek.com/v1/chat/completions".into(),
            openai_url: "https://api.openai.com/v1/chat/completions".into(),
            qwen_url:
                "https://dashscope.aliyuncs.com/api/v1/services/aigc/text-generation/generation"
                    .into(),
            omni_url: "https://dashscope.aliyuncs.com/compatible-mode/v1/chat/completions".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// GenerationConfig
// ---------------------------------------------------------------------------

/// Defaults for code generation requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub default_provider: ProviderId,
    /// Sampling temperature (0.0 – 2.0).
    pub temperature: f32,
    pub max_tokens: u32,
    /// Per-attempt network timeout.
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            default_provider: ProviderId::default(),
            temperature: 0.7,
            max_tokens: 4000,
            timeout_secs: 60,
        }
    }
}

// ---------------------------------------------------------------------------
// VoiceConfig
// ---------------------------------------------------------------------------

/// Settings for Qwen-Omni speech transcription.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    pub model: String,
    /// Instruction sent alongside the audio.
    pub prompt: String,
    /// Per-attempt network timeout.
    pub timeout_secs: u64,
    pub max_attempts: u32,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            model: "qwen2.5-omni-7b".into(),
            prompt: "请将这段音频转换为文字".into(),
            timeout_secs: 15,
            max_attempts: 3,
        }
    }
}

// ---------------------------------------------------------------------------
// RetryConfig
// ---------------------------------------------------------------------------

/// Retry budget for transient provider failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles for each further attempt.
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
        }
    }
}

// ---------------------------------------------------------------------------
// RenderConfig
// ---------------------------------------------------------------------------

/// Settings for the external renderer and its working directories.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Renderer executable, looked up on `PATH`.
    pub program: String,
    /// Arguments placed before the quality flag (e.g. `["-m", "manim"]` when
    /// `program` is a Python interpreter).
    pub program_args: Vec<String>,
    /// Where per-job scratch sources are written.
    pub scratch_dir: PathBuf,
    /// Renderer working directory and default save destination.
    pub output_dir: PathBuf,
    pub default_quality: Quality,
    pub timeout_secs: u64,
    pub strategy: ExecutionStrategy,
    /// Simulated render time in demo mode.
    pub demo_delay_ms: u64,
    /// Use demo mode even when the renderer is installed.
    pub force_demo: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            program: "manim".into(),
            program_args: Vec::new(),
            scratch_dir: PathBuf::from("temp"),
            output_dir: PathBuf::from("outputs"),
            default_quality: Quality::default(),
            timeout_secs: 300,
            strategy: ExecutionStrategy::default(),
            demo_delay_ms: 2000,
            force_demo: false,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// ```rust,no_run
/// use manim_gpt::config::AppConfig;
///
/// // File (or defaults) first, then environment overrides.
/// let config = AppConfig::load().unwrap();
/// println!("{}", config.render.output_dir.display());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub providers: ProvidersConfig,
    pub generation: GenerationConfig,
    pub voice: VoiceConfig,
    pub retry: RetryConfig,
    pub render: RenderConfig,
}

impl AppConfig {
    /// Load from the platform-appropriate `settings.toml` and apply
    /// environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&AppPaths::new().settings_file)?;
        config.apply_env();
        Ok(config)
    }

    /// Load from an explicit path without touching the environment.
    ///
    /// Returns `Default` when the file does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save to an explicit path, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Apply overrides using `lookup` as the environment.
    ///
    /// Unparseable numeric values are ignored with a warning.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("DEEPSEEK_API_KEY") {
            self.providers.deepseek_api_key = Some(Secret::new(v));
        }
        if let Some(v) = get("OPENAI_API_KEY") {
            self.providers.openai_api_key = Some(Secret::new(v));
        }
        if let Some(v) = get("QWEN_API_KEY") {
            self.providers.qwen_api_key = Some(Secret::new(v));
        }
        if let Some(v) = get("DASHSCOPE_API_KEY") {
            self.providers.dashscope_api_key = Some(Secret::new(v));
        }
        if let Some(v) = get("QWEN_OMNI_MODEL") {
            self.voice.model = v;
        }
        if let Some(v) = get("OUTPUT_DIR") {
            self.render.output_dir = PathBuf::from(v);
        }
        if let Some(v) = get("TEMP_DIR") {
            self.render.scratch_dir = PathBuf::from(v);
        }

        if let Some(v) = get("VOICE_NETWORK_TIMEOUT") {
            set_parsed(&mut self.voice.timeout_secs, "VOICE_NETWORK_TIMEOUT", &v);
        }
        if let Some(v) = get("VOICE_RETRY_TIMES") {
            set_parsed(&mut self.voice.max_attempts, "VOICE_RETRY_TIMES", &v);
        }
        if let Some(v) = get("DEFAULT_MODEL") {
            set_parsed(&mut self.generation.default_provider, "DEFAULT_MODEL", &v);
        }
        if let Some(v) = get("MAX_TOKENS") {
            set_parsed(&mut self.generation.max_tokens, "MAX_TOKENS", &v);
        }
        if let Some(v) = get("TEMPERATURE") {
            set_parsed(&mut self.generation.temperature, "TEMPERATURE", &v);
        }
        if let Some(v) = get("MANIM_QUALITY") {
            set_parsed(&mut self.render.default_quality, "MANIM_QUALITY", &v);
        }
    }
}

fn set_parsed<T: std::str::FromStr>(slot: &mut T, key: &str, raw: &str) {
    match raw.trim().parse() {
        Ok(value) => *slot = value,
        Err(_) => log::warn!("config: ignoring unparseable {key}={raw:?}"),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
