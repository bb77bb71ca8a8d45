//! Rendered media: the resolved artifact type, the locator that finds it,
//! and persistence that copies it elsewhere.

pub mod locator;
pub mod persist;

use std::path::{Path, PathBuf};

use serde::Serialize;

pub use locator::{ArtifactLocator, MEDIA_DIR, VIDEO_EXTENSIONS};
pub use persist::Persistence;

/// Media kind, inferred from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Mp4,
    Mov,
    Avi,
    /// Descriptive stand-in written when no renderer is installed.
    Demo,
    Other,
}

impl MediaKind {
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("mp4") => MediaKind::Mp4,
            Some("mov") => MediaKind::Mov,
            Some("avi") => MediaKind::Avi,
            Some("txt") => MediaKind::Demo,
            _ => MediaKind::Other,
        }
    }
}

/// A located output file.  Read-only once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaArtifact {
    path: PathBuf,
    kind: MediaKind,
}

impl MediaArtifact {
    pub fn new(path: PathBuf) -> Self {
        let kind = MediaKind::from_path(&path);
        Self { path, kind }
    }

    pub fn demo(path: PathBuf) -> Self {
        Self {
            path,
            kind: MediaKind::Demo,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn is_demo(&self) -> bool {
        self.kind == MediaKind::Demo
    }

    /// Path rendered with forward slashes on every platform.
    pub fn display_path(&self) -> String {
        self.path.to_string_lossy().replace('\\', "/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_follows_extension() {
        assert_eq!(MediaArtifact::new("a/B.MP4".into()).kind(), MediaKind::Mp4);
        assert_eq!(MediaArtifact::new("a/B.mov".into()).kind(), MediaKind::Mov);
        assert_eq!(MediaArtifact::new("a/B.gif".into()).kind(), MediaKind::Other);
        assert!(MediaArtifact::demo("B_demo.txt".into()).is_demo());
    }

    #[test]
    fn display_path_uses_forward_slashes() {
        let a = MediaArtifact::new(PathBuf::from("outputs").join("media").join("X.mp4"));
        assert_eq!(a.display_path(), "outputs/media/X.mp4");
    }
}
