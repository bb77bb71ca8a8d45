//! Per-job scratch files.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{PipelineError, ProviderResult};

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// `<millis>_<seq>`: wall-clock milliseconds plus a process-wide counter,
/// unique within this process even when two jobs start in the same
/// millisecond.
pub fn unique_stamp() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("{millis}_{seq}")
}

/// Source written to `manim_temp_<stamp>.py`, removed on
/// [`cleanup`](Self::cleanup) or drop, whichever comes first.
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
    removed: bool,
}

impl ScratchFile {
    /// Write `contents` to a fresh file in `dir` (created if missing).
    ///
    /// The returned path is absolute so it stays valid when the renderer
    /// runs in another working directory.
    pub fn create(dir: &Path, stamp: &str, contents: &str) -> ProviderResult<Self> {
        let io_err = |e: std::io::Error| {
            PipelineError::Spawn(format!("cannot write scratch file: {e}"))
        };

        std::fs::create_dir_all(dir).map_err(io_err)?;
        let dir = dir.canonicalize().map_err(io_err)?;
        let path = dir.join(format!("manim_temp_{stamp}.py"));

        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(io_err)?;
        file.write_all(contents.as_bytes()).map_err(io_err)?;

        log::debug!("scratch: wrote {}", path.display());
        Ok(Self {
            path,
            removed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the file.  Safe to call repeatedly; failures are logged.
    pub fn cleanup(&mut self) {
        if self.removed {
            return;
        }
        self.removed = true;
        match std::fs::remove_file(&self.path) {
            Ok(()) => log::debug!("scratch: removed {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("scratch: failed to remove {}: {e}", self.path.display()),
        }
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        self.cleanup();
    }
}
