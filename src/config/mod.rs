//! Configuration module.
//!
//! Provides `AppConfig` (top-level settings), one sub-config per subsystem,
//! `AppPaths` for the platform config directory, TOML persistence via
//! `AppConfig::load_from` / `AppConfig::save_to`, and environment overrides.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{
    AppConfig, GenerationConfig, ProvidersConfig, RenderConfig, RetryConfig, Secret, VoiceConfig,
};
