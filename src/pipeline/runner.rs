//! Pipeline orchestrator: drives generate → validate → render and the
//! standalone preview / save / transcribe operations.
//!
//! Every public method returns an outcome record rather than a `Result`:
//! internal [`PipelineError`]s are logged with their kind and converted to a
//! redacted message here, so callers never see raw paths or credentials.

use std::path::Path;
use std::time::Instant;

use crate::artifact::Persistence;
use crate::config::AppConfig;
use crate::error::PipelineError;
use crate::llm::{GenerationRequest, ProviderGateway, ProviderId};
use crate::render::{Quality, Renderer};
use crate::source::SourceArtifact;
use crate::validate;

use super::outcome::{
    GenerationOutcome, PreviewOutcome, SaveOutcome, TranscriptionOutcome, ValidationOutcome,
};
use super::redact::Redactor;

// ---------------------------------------------------------------------------
// GenerateParams
// ---------------------------------------------------------------------------

/// Caller input for [`Pipeline::generate`].  `None` fields take the
/// configured defaults.
#[derive(Debug, Clone, Default)]
pub struct GenerateParams {
    pub prompt: String,
    pub model: Option<ProviderId>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub quality: Option<Quality>,
}

impl GenerateParams {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// The orchestrating caller.
///
/// ```rust,no_run
/// use manim_gpt::config::AppConfig;
/// use manim_gpt::pipeline::{GenerateParams, Pipeline};
///
/// # async fn example() {
/// let config = AppConfig::load().unwrap();
/// let pipeline = Pipeline::from_config(&config);
///
/// let outcome = pipeline.generate(GenerateParams::new("a circle morphing into a square")).await;
/// println!("{}", serde_json::to_string_pretty(&outcome).unwrap());
/// # }
/// ```
pub struct Pipeline {
    gateway: ProviderGateway,
    renderer: Renderer,
    persistence: Persistence,
    redactor: Redactor,
    default_model: ProviderId,
    default_temperature: f32,
    default_max_tokens: u32,
    default_quality: Quality,
}

impl Pipeline {
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config,
            ProviderGateway::from_config(config),
            Renderer::new(&config.render),
        )
    }

    /// Assemble from pre-built components (tests substitute doubles here).
    pub fn new(config: &AppConfig, gateway: ProviderGateway, renderer: Renderer) -> Self {
        let keys = &config.providers;
        let redactor = Redactor::new([
            (config.render.output_dir.as_path(), "<output_dir>"),
            (config.render.scratch_dir.as_path(), "<scratch_dir>"),
        ])
        .with_secrets(
            [
                &keys.deepseek_api_key,
                &keys.openai_api_key,
                &keys.qwen_api_key,
                &keys.dashscope_api_key,
            ]
            .into_iter()
            .flatten(),
        );
        Self {
            gateway,
            persistence: Persistence::new(config.render.output_dir.clone()),
            renderer,
            redactor,
            default_model: config.generation.default_provider,
            default_temperature: config.generation.temperature,
            default_max_tokens: config.generation.max_tokens,
            default_quality: config.render.default_quality,
        }
    }

    pub fn gateway(&self) -> &ProviderGateway {
        &self.gateway
    }

    pub fn available_models(&self) -> Vec<ProviderId> {
        self.gateway.available_models()
    }

    fn describe(&self, op: &str, e: &PipelineError) -> String {
        log::error!("pipeline: {op} failed ({:?}): {e}", e.kind());
        self.redactor.redact(&e.to_string())
    }

    // -----------------------------------------------------------------------
    // generate
    // -----------------------------------------------------------------------

    /// Prompt → code → validation → render.
    ///
    /// Code that was generated but failed validation or rendering is still
    /// returned so the caller can inspect or edit it.
    pub async fn generate(&self, params: GenerateParams) -> GenerationOutcome {
        let started = Instant::now();

        let request = match GenerationRequest::new(
            params.prompt,
            params.model.unwrap_or(self.default_model),
            params.temperature.unwrap_or(self.default_temperature),
            params.max_tokens.unwrap_or(self.default_max_tokens),
        ) {
            Ok(r) => r,
            Err(e) => {
                return GenerationOutcome::failed(
                    "invalid request",
                    None,
                    self.describe("generate", &e),
                )
            }
        };
        let quality = params.quality.unwrap_or(self.default_quality);
        log::info!(
            "pipeline: generate with {} at {quality}",
            request.provider()
        );

        let source = match self.gateway.generate_code(&request).await {
            Ok(s) => s,
            Err(e) => {
                return GenerationOutcome::failed(
                    "code generation failed",
                    None,
                    self.describe("generate", &e),
                )
            }
        };

        let validated = match validate::validate(source.clone()) {
            Ok(v) => v,
            Err(rejection) => {
                let e = PipelineError::from(rejection);
                return GenerationOutcome::failed(
                    "generated code failed validation",
                    Some(source.into_code()),
                    self.describe("generate", &e),
                );
            }
        };

        match self.renderer.render(&validated, quality).await {
            Ok(artifact) => {
                let demo = artifact.is_demo();
                let elapsed = started.elapsed().as_secs_f64();
                log::info!("pipeline: generate finished in {elapsed:.2}s (demo={demo})");
                GenerationOutcome {
                    success: true,
                    message: if demo {
                        "demo render completed (renderer not installed)".into()
                    } else {
                        "video generated".into()
                    },
                    code: Some(validated.code().to_string()),
                    video_path: Some(artifact.display_path()),
                    demo,
                    execution_time_secs: Some(elapsed),
                    error: None,
                }
            }
            Err(e) => GenerationOutcome::failed(
                "render failed",
                Some(validated.code().to_string()),
                self.describe("generate", &e),
            ),
        }
    }

    // -----------------------------------------------------------------------
    // preview / validate
    // -----------------------------------------------------------------------

    /// Render caller-supplied code.  `entry_point` overrides the scene
    /// derived from the source.
    pub async fn preview(
        &self,
        code: &str,
        quality: Option<Quality>,
        entry_point: Option<&str>,
    ) -> PreviewOutcome {
        let source = SourceArtifact::with_entry_point(code, entry_point);
        let validated = match validate::validate(source) {
            Ok(v) => v,
            Err(rejection) => {
                return PreviewOutcome::failed(
                    self.describe("preview", &PipelineError::from(rejection)),
                )
            }
        };

        let quality = quality.unwrap_or(self.default_quality);
        log::info!("pipeline: preview {} at {quality}", validated.entry_point());
        match self.renderer.render(&validated, quality).await {
            Ok(artifact) => PreviewOutcome {
                success: true,
                video_path: Some(artifact.display_path()),
                demo: artifact.is_demo(),
                error: None,
            },
            Err(e) => PreviewOutcome::failed(self.describe("preview", &e)),
        }
    }

    pub fn validate(&self, code: &str) -> ValidationOutcome {
        match validate::validate_code(code) {
            Ok(_) => ValidationOutcome {
                valid: true,
                error: None,
            },
            Err(rejection) => {
                log::info!("pipeline: validation rejected: {rejection}");
                ValidationOutcome {
                    valid: false,
                    error: Some(rejection.to_string()),
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // save / transcribe
    // -----------------------------------------------------------------------

    pub fn save(&self, source: &Path, dest_dir: Option<&Path>, dest_name: Option<&str>) -> SaveOutcome {
        match self.persistence.save(source, dest_dir, dest_name) {
            Ok(path) => SaveOutcome {
                success: true,
                saved_path: Some(path.to_string_lossy().replace('\\', "/")),
                error: None,
            },
            Err(e) => SaveOutcome {
                success: false,
                saved_path: None,
                error: Some(self.describe("save", &e)),
            },
        }
    }

    pub async fn transcribe(&self, audio: &[u8]) -> TranscriptionOutcome {
        match self.gateway.transcribe(audio).await {
            Ok(t) => {
                log::info!("pipeline: transcribed {} chars", t.text.chars().count());
                t.into()
            }
            Err(e) => TranscriptionOutcome {
                success: false,
                text: None,
                method: None,
                model: None,
                error: Some(self.describe("transcribe", &e)),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
