//! Generated program text and its render entry point.

use crate::validate::scene;

/// Generated Manim source plus the scene class the renderer should run.
///
/// Built by the provider gateway (or from user-supplied code for previews)
/// and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceArtifact {
    code: String,
    entry_point: String,
}

impl SourceArtifact {
    /// Wrap `code`, deriving the entry point from its scene declarations
    /// (falls back to [`scene::DEFAULT_ENTRY_POINT`]).
    pub fn from_code(code: impl Into<String>) -> Self {
        let code = code.into();
        let entry_point = scene::entry_point(&code);
        Self { code, entry_point }
    }

    /// Wrap `code` with a caller-chosen entry point.  A blank name is
    /// treated as "not supplied".
    pub fn with_entry_point(code: impl Into<String>, entry_point: Option<&str>) -> Self {
        match entry_point.map(str::trim).filter(|s| !s.is_empty()) {
            Some(name) => Self {
                code: code.into(),
                entry_point: name.to_string(),
            },
            None => Self::from_code(code),
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    pub fn into_code(self) -> String {
        self.code
    }
}
