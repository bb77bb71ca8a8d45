//! Copy a rendered artifact to a caller-chosen location.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{PipelineError, ProviderResult};

#[derive(Debug, Clone)]
pub struct Persistence {
    default_dir: PathBuf,
}

impl Persistence {
    /// `default_dir` is used when [`save`](Self::save) gets no directory.
    pub fn new(default_dir: impl Into<PathBuf>) -> Self {
        Self {
            default_dir: default_dir.into(),
        }
    }

    /// Copy `source` into `dest_dir` (default: the output root) as
    /// `dest_name` (default: the source's file name).
    ///
    /// The source must exist; nothing is created when it does not.  The
    /// destination directory is created if absent.  The source is left in
    /// place.
    pub fn save(
        &self,
        source: &Path,
        dest_dir: Option<&Path>,
        dest_name: Option<&str>,
    ) -> ProviderResult<PathBuf> {
        if !source.is_file() {
            return Err(PipelineError::PersistenceNotFound(source.to_path_buf()));
        }

        let name = match dest_name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => checked_name(name)?,
            None => source
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| PipelineError::PersistenceIo("source has no file name".into()))?,
        };

        let dir = dest_dir.unwrap_or(&self.default_dir);
        fs::create_dir_all(dir).map_err(|e| {
            PipelineError::PersistenceIo(format!("cannot create destination directory: {e}"))
        })?;
        let dest = dir.join(&name);

        if same_file(source, &dest) {
            log::info!("persist: {} is already in place", dest.display());
            return Ok(dest);
        }

        let bytes = fs::copy(source, &dest)
            .map_err(|e| PipelineError::PersistenceIo(format!("copy failed: {e}")))?;
        log::info!(
            "persist: saved {} -> {} ({bytes} bytes)",
            source.display(),
            dest.display()
        );
        Ok(dest)
    }
}

/// Destination names must be a single path component.
fn checked_name(name: &str) -> ProviderResult<String> {
    if name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(PipelineError::PersistenceIo(format!(
            "invalid file name '{name}'"
        )));
    }
    Ok(name.to_string())
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
