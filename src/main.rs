//! Application entry point: Manim-GPT command-line interface.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] (from `--config` or the platform settings file)
//!    and apply environment overrides.
//! 3. Build the [`Pipeline`] from config.
//! 4. Run the requested subcommand and print its outcome as JSON.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use manim_gpt::{
    config::{AppConfig, AppPaths},
    llm::ProviderId,
    pipeline::{GenerateParams, Pipeline},
    render::Quality,
};

#[derive(Parser)]
#[command(name = "manim-gpt")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Generate and render Manim animations from natural language", long_about = None)]
struct Cli {
    /// Settings file (default: platform config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate code for a prompt and render it
    Generate {
        /// Free-text description of the animation
        prompt: String,

        /// Provider model, e.g. deepseek-chat, gpt-4, qwen-max
        #[arg(short, long)]
        model: Option<ProviderId>,

        #[arg(short, long)]
        temperature: Option<f32>,

        #[arg(long)]
        max_tokens: Option<u32>,

        /// low, medium, high or production
        #[arg(short, long)]
        quality: Option<Quality>,
    },

    /// Render existing code ("-" reads stdin)
    Preview {
        file: PathBuf,

        #[arg(short, long)]
        quality: Option<Quality>,

        /// Scene class to render (default: first scene in the file)
        #[arg(short, long)]
        scene: Option<String>,
    },

    /// Check code without rendering ("-" reads stdin)
    Validate { file: PathBuf },

    /// Copy a rendered file to a destination directory
    Save {
        source: PathBuf,

        #[arg(short, long)]
        dir: Option<PathBuf>,

        #[arg(short, long)]
        name: Option<String>,
    },

    /// Transcribe an audio recording to text
    Transcribe { audio: PathBuf },

    /// List models whose provider has a credential configured
    Models,

    /// Write a settings file with default values
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    match path {
        Some(path) => {
            let mut config = AppConfig::load_from(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            config.apply_env();
            Ok(config)
        }
        None => AppConfig::load().context("failed to load settings"),
    }
}

fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut code = String::new();
        std::io::stdin()
            .read_to_string(&mut code)
            .context("failed to read stdin")?;
        return Ok(code);
    }
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    if let Commands::InitConfig { force } = cli.command {
        let path = cli.config.unwrap_or_else(|| AppPaths::new().settings_file);
        if path.exists() && !force {
            anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
        }
        AppConfig::default().save_to(&path)?;
        println!("wrote {}", path.display());
        return Ok(ExitCode::SUCCESS);
    }

    let config = load_config(cli.config.as_deref())?;
    let pipeline = Pipeline::from_config(&config);

    match cli.command {
        Commands::Generate {
            prompt,
            model,
            temperature,
            max_tokens,
            quality,
        } => {
            let outcome = pipeline
                .generate(GenerateParams {
                    prompt,
                    model,
                    temperature,
                    max_tokens,
                    quality,
                })
                .await;
            print_json(&outcome)?;
            Ok(exit_code(outcome.success))
        }
        Commands::Preview {
            file,
            quality,
            scene,
        } => {
            let code = read_input(&file)?;
            let outcome = pipeline.preview(&code, quality, scene.as_deref()).await;
            print_json(&outcome)?;
            Ok(exit_code(outcome.success))
        }
        Commands::Validate { file } => {
            let outcome = pipeline.validate(&read_input(&file)?);
            print_json(&outcome)?;
            Ok(exit_code(outcome.valid))
        }
        Commands::Save { source, dir, name } => {
            let outcome = pipeline.save(&source, dir.as_deref(), name.as_deref());
            print_json(&outcome)?;
            Ok(exit_code(outcome.success))
        }
        Commands::Transcribe { audio } => {
            let bytes = std::fs::read(&audio)
                .with_context(|| format!("failed to read {}", audio.display()))?;
            let outcome = pipeline.transcribe(&bytes).await;
            print_json(&outcome)?;
            Ok(exit_code(outcome.success))
        }
        Commands::Models => {
            let models: Vec<String> = pipeline
                .available_models()
                .iter()
                .map(ToString::to_string)
                .collect();
            print_json(&serde_json::json!({
                "models": models,
                "transcription": pipeline.gateway().transcription_available(),
            }))?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::InitConfig { .. } => Ok(ExitCode::SUCCESS),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Cli::parse()).await {
        Ok(code) => code,
        Err(e) => {
            log::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn generate_parses_typed_options() {
        let cli = Cli::try_parse_from([
            "manim-gpt", "generate", "a spinning square", "-m", "qwen-max", "-q", "low",
        ])
        .unwrap();
        match cli.command {
            Commands::Generate { model, quality, .. } => {
                assert_eq!(model, Some(ProviderId::QwenMax));
                assert_eq!(quality, Some(Quality::Low));
            }
            _ => panic!("expected generate"),
        }
    }

    #[test]
    fn unknown_model_is_rejected() {
        assert!(Cli::try_parse_from(["manim-gpt", "generate", "x", "-m", "llama"]).is_err());
    }

    #[test]
    fn init_config_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        let cli = Cli::try_parse_from([
            "manim-gpt",
            "--config",
            path.to_str().unwrap(),
            "init-config",
        ])
        .unwrap();
        let rt = tokio::runtime::Runtime::new().unwrap();
        assert_eq!(rt.block_on(run(cli)).unwrap(), ExitCode::SUCCESS);
        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.generation.max_tokens, 4000);
    }
}
