//! Find the video a render produced under the output root.
//!
//! Search order, first match wins:
//!
//! 1. `<root>/media` and every directory beneath it (pre-order, entries
//!    sorted by name).  Within each directory the extensions in
//!    [`VIDEO_EXTENSIONS`] are tried in order.
//! 2. The output root itself, non-recursively, same extension order.
//!
//! A file matches when its name contains the identifier.  Symlinks are
//! never followed, so every result lies inside the root.

use std::fs;
use std::path::{Path, PathBuf};

use crate::artifact::MediaArtifact;

/// Video containers in priority order.
pub const VIDEO_EXTENSIONS: [&str; 3] = ["mp4", "mov", "avi"];
/// Directory the renderer writes media into, relative to the output root.
pub const MEDIA_DIR: &str = "media";

#[derive(Debug, Clone)]
pub struct ArtifactLocator {
    root: PathBuf,
}

impl ArtifactLocator {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `None` means nothing matched; callers decide whether that is an error.
    pub fn locate(&self, id: &str) -> Option<MediaArtifact> {
        if id.is_empty() {
            return None;
        }

        let mut dirs = Vec::new();
        collect_dirs(&self.root.join(MEDIA_DIR), &mut dirs);

        let found = dirs
            .iter()
            .find_map(|dir| find_in(dir, id))
            .or_else(|| find_in(&self.root, id));

        match &found {
            Some(path) => log::info!("locator: {id} -> {}", path.display()),
            None => log::warn!("locator: no video matching {id} under {}", self.root.display()),
        }
        found.map(MediaArtifact::new)
    }
}

/// Sorted `(name, path, is_dir, is_file)` listing; symlinks count as neither.
fn sorted_entries(dir: &Path) -> Vec<(String, PathBuf, bool, bool)> {
    let Ok(read) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut entries: Vec<_> = read
        .filter_map(Result::ok)
        .filter_map(|entry| {
            let ft = entry.file_type().ok()?;
            let name = entry.file_name().to_string_lossy().into_owned();
            Some((name, entry.path(), ft.is_dir(), ft.is_file()))
        })
        .collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    entries
}

fn collect_dirs(dir: &Path, out: &mut Vec<PathBuf>) {
    if !dir.is_dir() || fs::symlink_metadata(dir).map_or(true, |m| m.file_type().is_symlink()) {
        return;
    }
    out.push(dir.to_path_buf());
    for (_, path, is_dir, _) in sorted_entries(dir) {
        if is_dir {
            collect_dirs(&path, out);
        }
    }
}

fn find_in(dir: &Path, id: &str) -> Option<PathBuf> {
    let files: Vec<_> = sorted_entries(dir)
        .into_iter()
        .filter(|(name, _, _, is_file)| *is_file && name.contains(id))
        .collect();

    VIDEO_EXTENSIONS.iter().find_map(|ext| {
        files
            .iter()
            .find(|(_, path, _, _)| {
                path.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case(ext))
            })
            .map(|(_, path, _, _)| path.clone())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"video").unwrap();
    }

    #[test]
    fn nested_media_then_root_then_missing() {
        let root = tempdir().unwrap();
        let nested = root.path().join("media/render/SceneA_123.mp4");
        let top = root.path().join("SceneB_999.mov");
        touch(&nested);
        touch(&top);

        let locator = ArtifactLocator::new(root.path());
        assert_eq!(locator.locate("SceneA").unwrap().path(), nested);
        assert_eq!(locator.locate("SceneB").unwrap().path(), top);
        assert!(locator.locate("Missing").is_none());
    }

    #[test]
    fn media_tree_beats_root() {
        let root = tempdir().unwrap();
        let nested = root.path().join("media/videos/tmp/480p15/Wave_1.avi");
        touch(&nested);
        touch(&root.path().join("Wave_1.mp4"));

        let found = ArtifactLocator::new(root.path()).locate("Wave_1").unwrap();
        assert_eq!(found.path(), nested);
    }

    #[test]
    fn extension_priority_within_a_directory() {
        let root = tempdir().unwrap();
        touch(&root.path().join("media/Clip.avi"));
        touch(&root.path().join("media/Clip.mp4"));
        touch(&root.path().join("media/Clip.txt"));

        let found = ArtifactLocator::new(root.path()).locate("Clip").unwrap();
        assert_eq!(found.path().extension().unwrap(), "mp4");
    }

    #[test]
    fn root_search_is_not_recursive() {
        let root = tempdir().unwrap();
        touch(&root.path().join("other/Deep.mp4"));
        assert!(ArtifactLocator::new(root.path()).locate("Deep").is_none());
    }

    #[test]
    fn empty_id_matches_nothing() {
        let root = tempdir().unwrap();
        touch(&root.path().join("Any.mp4"));
        assert!(ArtifactLocator::new(root.path()).locate("").is_none());
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_media_outside_root_is_ignored() {
        let root = tempdir().unwrap();
        let outside = tempdir().unwrap();
        touch(&outside.path().join("Escape.mp4"));
        std::os::unix::fs::symlink(outside.path(), root.path().join("media")).unwrap();
        std::os::unix::fs::symlink(
            outside.path().join("Escape.mp4"),
            root.path().join("Escape.mp4"),
        )
        .unwrap();

        assert!(ArtifactLocator::new(root.path()).locate("Escape").is_none());
    }
}
