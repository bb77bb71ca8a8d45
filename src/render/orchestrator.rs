//! `Renderer`: turn validated source into a media artifact.
//!
//! # Render flow
//!
//! ```text
//! render(source, quality)
//!   ├─ Demo mode → sleep(demo_delay) → write <entry>_<stamp>_demo.txt
//!   └─ Live mode
//!        ├─ write temp/manim_temp_<stamp>.py            [ScratchFile]
//!        ├─ <program> <args> <flag> --output_file <entry>_<stamp>
//!        │        <scratch> <entry>   (cwd = output dir, with deadline)
//!        ├─ exit != 0 → Render error
//!        ├─ locate(<entry>_<stamp>) under the output dir
//!        └─ remove scratch file (every path)
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::artifact::{ArtifactLocator, MediaArtifact};
use crate::config::RenderConfig;
use crate::error::{PipelineError, ProviderResult};
use crate::render::command::{runner_for, CommandRunner, CommandSpec};
use crate::render::quality::Quality;
use crate::render::scratch::{unique_stamp, ScratchFile};
use crate::validate::ValidatedSource;

/// Longest stderr tail carried into a render error.
const STDERR_TAIL_CHARS: usize = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// The renderer is installed and will be invoked.
    Live,
    /// Write a descriptive stand-in instead of a video.
    Demo,
}

pub struct Renderer {
    program: String,
    program_args: Vec<String>,
    scratch_dir: PathBuf,
    output_dir: PathBuf,
    timeout: Duration,
    demo_delay: Duration,
    mode: RenderMode,
    runner: Arc<dyn CommandRunner>,
    locator: ArtifactLocator,
}

impl Renderer {
    /// Build from config, probing `PATH` for the renderer once.
    pub fn new(config: &RenderConfig) -> Self {
        let mode = if config.force_demo {
            log::info!("render: demo mode forced by configuration");
            RenderMode::Demo
        } else {
            match which::which(&config.program) {
                Ok(path) => {
                    log::info!("render: using {}", path.display());
                    RenderMode::Live
                }
                Err(_) => {
                    log::warn!(
                        "render: '{}' not found on PATH, falling back to demo mode",
                        config.program
                    );
                    RenderMode::Demo
                }
            }
        };

        Self {
            program: config.program.clone(),
            program_args: config.program_args.clone(),
            scratch_dir: config.scratch_dir.clone(),
            output_dir: config.output_dir.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            demo_delay: Duration::from_millis(config.demo_delay_ms),
            mode,
            runner: runner_for(config.strategy),
            locator: ArtifactLocator::new(config.output_dir.clone()),
        }
    }

    pub fn with_runner(mut self, runner: impl CommandRunner + 'static) -> Self {
        self.runner = Arc::new(runner);
        self
    }

    pub fn with_mode(mut self, mode: RenderMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    /// `<program> <args..> <flag> --output_file <output_name> <scratch> <entry>`
    pub fn build_command(
        &self,
        scratch: &Path,
        output_name: &str,
        entry: &str,
        quality: Quality,
    ) -> CommandSpec {
        CommandSpec::new(&self.program, self.timeout)
            .args(&self.program_args)
            .arg(quality.flag())
            .arg("--output_file")
            .arg(output_name)
            .arg(scratch)
            .arg(entry)
            .current_dir(&self.output_dir)
    }

    /// Render `source` at `quality`.
    ///
    /// Spawn failures and deadline expiry are not retried here.
    pub async fn render(
        &self,
        source: &ValidatedSource,
        quality: Quality,
    ) -> ProviderResult<MediaArtifact> {
        let stamp = unique_stamp();
        match self.mode {
            RenderMode::Demo => self.render_demo(source, quality, &stamp).await,
            RenderMode::Live => self.render_live(source, quality, &stamp).await,
        }
    }

    async fn render_live(
        &self,
        source: &ValidatedSource,
        quality: Quality,
        stamp: &str,
    ) -> ProviderResult<MediaArtifact> {
        let entry = source.entry_point();
        std::fs::create_dir_all(&self.output_dir).map_err(|e| {
            PipelineError::Spawn(format!("cannot create output directory: {e}"))
        })?;

        let mut scratch = ScratchFile::create(&self.scratch_dir, stamp, source.code())?;
        let output_name = format!("{entry}_{stamp}");
        let spec = self.build_command(scratch.path(), &output_name, entry, quality);

        log::info!("render: {entry} at {quality} ({})", spec.display());
        let result = self.execute(&spec, &output_name).await;
        scratch.cleanup();
        result
    }

    async fn execute(&self, spec: &CommandSpec, output_name: &str) -> ProviderResult<MediaArtifact> {
        let output = self.runner.run(spec).await?;
        log::debug!(
            "render: exited {:?} after {:.1}s",
            output.status,
            output.duration.as_secs_f64()
        );

        if !output.success() {
            let stderr = tail(&output.stderr, STDERR_TAIL_CHARS);
            log::error!("render: failed with status {:?}", output.status);
            return Err(PipelineError::Render {
                status: output.status.unwrap_or(-1),
                stderr,
            });
        }

        self.locator
            .locate(output_name)
            .ok_or_else(|| PipelineError::ArtifactNotFound(output_name.to_string()))
    }

    async fn render_demo(
        &self,
        source: &ValidatedSource,
        quality: Quality,
        stamp: &str,
    ) -> ProviderResult<MediaArtifact> {
        let entry = source.entry_point();
        log::warn!("render: demo render of {entry} (no video will be produced)");
        tokio::time::sleep(self.demo_delay).await;

        let io_err =
            |e: std::io::Error| PipelineError::PersistenceIo(format!("cannot write demo file: {e}"));
        std::fs::create_dir_all(&self.output_dir).map_err(io_err)?;
        let path = self.output_dir.join(format!("{entry}_{stamp}_demo.txt"));

        let body = format!(
            "Manim demo render\n\
             =================\n\
             \n\
             Scene:     {entry}\n\
             Quality:   {quality} ({flag})\n\
             Generated: {time}\n\
             \n\
             The renderer '{program}' is not installed, so this text file stands in\n\
             for the video.  Install Manim Community Edition to render real output.\n\
             \n\
             Source ({lines} lines):\n\
             \n\
             {code}\n",
            flag = quality.flag(),
            time = chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            program = self.program,
            lines = source.code().lines().count(),
            code = source.code(),
        );
        std::fs::write(&path, body).map_err(io_err)?;

        log::info!("render: demo artifact {}", path.display());
        Ok(MediaArtifact::demo(path))
    }
}

/// Last `max` characters of `text`, trimmed.
fn tail(text: &str, max: usize) -> String {
    let trimmed = text.trim();
    let count = trimmed.chars().count();
    if count <= max {
        return trimmed.to_string();
    }
    trimmed.chars().skip(count - max).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
