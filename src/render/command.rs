//! Run an external command with a deadline and capture its output.
//!
//! Two [`CommandRunner`] implementations share one contract:
//!
//! * [`AsyncRunner`] spawns through `tokio::process` and races
//!   `wait_with_output` against the deadline.  The child is killed when the
//!   wait is abandoned.
//! * [`BlockingRunner`] spawns through `std::process` on the blocking pool,
//!   drains both pipes on helper threads and polls for exit, killing the
//!   child once the deadline passes.  Use it where the async subprocess
//!   primitive is unreliable.
//!
//! On Unix the child leads its own process group and a timeout kills the
//! whole group, so renderer helpers (ffmpeg) die with it.  Elsewhere only
//! the direct child is killed.

use std::ffi::{OsStr, OsString};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, ProviderResult};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

// ---------------------------------------------------------------------------
// CommandSpec / CommandOutput
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CommandSpec {
    program: OsString,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
    timeout: Duration,
}

impl CommandSpec {
    pub fn new(program: impl AsRef<OsStr>, timeout: Duration) -> Self {
        Self {
            program: program.as_ref().to_os_string(),
            args: Vec::new(),
            cwd: None,
            timeout,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn program(&self) -> &OsStr {
        &self.program
    }

    pub fn arguments(&self) -> &[OsString] {
        &self.args
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Shell-like rendering for logs.
    pub fn display(&self) -> String {
        std::iter::once(&self.program)
            .chain(&self.args)
            .map(|s| s.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn program_name(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }
}

#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// `None` when the process was terminated by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

// ---------------------------------------------------------------------------
// CommandRunner trait
// ---------------------------------------------------------------------------

/// Spawn failures become [`PipelineError::Spawn`]; deadline expiry becomes
/// [`PipelineError::RenderTimeout`].  A non-zero exit is *not* an error at
/// this layer.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, spec: &CommandSpec) -> ProviderResult<CommandOutput>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStrategy {
    #[default]
    Async,
    Blocking,
}

pub fn runner_for(strategy: ExecutionStrategy) -> Arc<dyn CommandRunner> {
    match strategy {
        ExecutionStrategy::Async => Arc::new(AsyncRunner),
        ExecutionStrategy::Blocking => Arc::new(BlockingRunner),
    }
}

// ---------------------------------------------------------------------------
// AsyncRunner
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
pub struct AsyncRunner;

#[async_trait]
impl CommandRunner for AsyncRunner {
    async fn run(&self, spec: &CommandSpec) -> ProviderResult<CommandOutput> {
        let mut cmd = tokio::process::Command::new(&spec.program);
        cmd.args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);
        if let Some(dir) = &spec.cwd {
            cmd.current_dir(dir);
        }

        let started = Instant::now();
        let child = cmd
            .spawn()
            .map_err(|e| PipelineError::Spawn(format!("{}: {e}", spec.program_name())))?;
        let pid = child.id();

        // Dropping the wait future drops the child, which kills it.
        let output = match tokio::time::timeout(spec.timeout, child.wait_with_output()).await {
            Ok(result) => {
                result.map_err(|e| PipelineError::Spawn(format!("{}: {e}", spec.program_name())))?
            }
            Err(_) => {
                if let Some(pid) = pid {
                    kill_group(pid);
                }
                return Err(PipelineError::RenderTimeout(spec.timeout));
            }
        };

        Ok(CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            duration: started.elapsed(),
        })
    }
}

// ---------------------------------------------------------------------------
// BlockingRunner
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
pub struct BlockingRunner;

#[async_trait]
impl CommandRunner for BlockingRunner {
    async fn run(&self, spec: &CommandSpec) -> ProviderResult<CommandOutput> {
        let spec = spec.clone();
        tokio::task::spawn_blocking(move || run_blocking(&spec))
            .await
            .map_err(|e| PipelineError::Spawn(format!("worker thread failed: {e}")))?
    }
}

fn run_blocking(spec: &CommandSpec) -> ProviderResult<CommandOutput> {
    let mut cmd = std::process::Command::new(&spec.program);
    cmd.args(&spec.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }
    if let Some(dir) = &spec.cwd {
        cmd.current_dir(dir);
    }

    let started = Instant::now();
    let mut child = cmd
        .spawn()
        .map_err(|e| PipelineError::Spawn(format!("{}: {e}", spec.program_name())))?;
    let pid = child.id();

    let (tx, rx) = mpsc::channel();
    drain(Pipe::Stdout, child.stdout.take(), tx.clone());
    drain(Pipe::Stderr, child.stderr.take(), tx);
    let deadline = started + spec.timeout;

    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if Instant::now() >= deadline => {
                kill_group(pid);
                let _ = child.kill();
                let _ = child.wait();
                return Err(PipelineError::RenderTimeout(spec.timeout));
            }
            Ok(None) => std::thread::sleep(POLL_INTERVAL),
            Err(e) => {
                let _ = child.kill();
                return Err(PipelineError::Spawn(format!(
                    "{}: {e}",
                    spec.program_name()
                )));
            }
        }
    };

    // Grandchildren can hold the pipes open after the child exits, so
    // collecting output is bounded by the same deadline.
    let (mut stdout, mut stderr) = (String::new(), String::new());
    for _ in 0..2 {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(remaining) {
            Ok((Pipe::Stdout, text)) => stdout = text,
            Ok((Pipe::Stderr, text)) => stderr = text,
            Err(RecvTimeoutError::Timeout) => {
                log::warn!(
                    "render: {} exited but its output pipes stayed open past the deadline",
                    spec.program_name()
                );
                kill_group(pid);
                return Err(PipelineError::RenderTimeout(spec.timeout));
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    Ok(CommandOutput {
        status: status.code(),
        stdout,
        stderr,
        duration: started.elapsed(),
    })
}

#[derive(Debug, Clone, Copy)]
enum Pipe {
    Stdout,
    Stderr,
}

/// Read a pipe to the end on its own thread so a chatty child never blocks
/// on a full pipe buffer.  The text is sent once the pipe closes.
fn drain<R>(which: Pipe, pipe: Option<R>, tx: mpsc::Sender<(Pipe, String)>)
where
    R: Read + Send + 'static,
{
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        let _ = tx.send((which, String::from_utf8_lossy(&buf).into_owned()));
    });
}

/// Kill the process group led by `pid`.
#[cfg(unix)]
fn kill_group(pid: u32) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    if let Err(e) = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
        log::debug!("render: killpg({pid}) failed: {e}");
    }
}

#[cfg(not(unix))]
fn kill_group(_pid: u32) {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
