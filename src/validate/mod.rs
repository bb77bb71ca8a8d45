//! Static acceptance check for generated Manim source.
//!
//! [`validate`] runs three checks in order and stops at the first failure:
//!
//! 1. the source must parse as Python ([`grammar`]), and its statement
//!    structure must satisfy [`lexer`], [`blocks`] and the header parsing
//!    in [`scene`];
//! 2. at least one class must derive from a scene base type;
//! 3. a scene class must define the `construct` entry method.
//!
//! Nothing is executed.  The check is advisory: it keeps obviously broken
//! code away from the renderer but is not a sandbox.
//!
//! Accepted source is wrapped in [`ValidatedSource`], the only type the
//! render orchestrator accepts, so unvalidated code cannot reach a
//! subprocess.

pub mod blocks;
pub mod grammar;
pub mod lexer;
pub mod scene;

use thiserror::Error;

use crate::source::SourceArtifact;

pub use lexer::{LogicalLine, SyntaxIssue};
pub use scene::{ClassDecl, DEFAULT_ENTRY_POINT, ENTRY_METHOD};

// ---------------------------------------------------------------------------
// Rejection
// ---------------------------------------------------------------------------

/// Broad category of a [`Rejection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionKind {
    SyntaxError,
    StructuralError,
}

/// Why source was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("syntax error: {0}")]
    Syntax(#[from] SyntaxIssue),

    #[error("missing scene declaration")]
    MissingScene,

    #[error("missing entry method")]
    MissingEntryMethod,
}

impl Rejection {
    pub fn kind(&self) -> RejectionKind {
        match self {
            Rejection::Syntax(_) => RejectionKind::SyntaxError,
            Rejection::MissingScene | Rejection::MissingEntryMethod => {
                RejectionKind::StructuralError
            }
        }
    }
}

// ---------------------------------------------------------------------------
// ValidatedSource
// ---------------------------------------------------------------------------

/// Source that passed [`validate`].  Only this module can construct it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedSource {
    source: SourceArtifact,
}

impl ValidatedSource {
    pub fn code(&self) -> &str {
        self.source.code()
    }

    pub fn entry_point(&self) -> &str {
        self.source.entry_point()
    }

    pub fn source(&self) -> &SourceArtifact {
        &self.source
    }
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

/// Validate `source`, keeping its entry point unchanged on success.
pub fn validate(source: SourceArtifact) -> Result<ValidatedSource, Rejection> {
    log::debug!("validate: checking {} bytes of source", source.code().len());

    grammar::check_syntax(source.code())?;
    let lines = lexer::logical_lines(source.code())?;
    blocks::check_blocks(&lines)?;
    let classes = scene::parse_declarations(&lines)?;

    let scenes: Vec<&ClassDecl> = classes.iter().filter(|c| c.is_scene()).collect();
    if scenes.is_empty() {
        log::warn!("validate: rejected, no class derives from Scene");
        return Err(Rejection::MissingScene);
    }
    if !scenes.iter().any(|c| c.defines(ENTRY_METHOD)) {
        log::warn!("validate: rejected, no scene defines {ENTRY_METHOD}()");
        return Err(Rejection::MissingEntryMethod);
    }

    log::debug!("validate: accepted (entry point {})", source.entry_point());
    Ok(ValidatedSource { source })
}

/// Convenience wrapper for raw code.
pub fn validate_code(code: &str) -> Result<ValidatedSource, Rejection> {
    validate(SourceArtifact::from_code(code))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
