//! Crate-wide error type and its classification.
//!
//! Every component returns `Result<T, PipelineError>` (aliased as
//! [`ProviderResult`]).  [`PipelineError::kind`] collapses the variants into
//! the small set of [`ErrorKind`]s that callers branch on, and
//! [`PipelineError::is_transient`] decides whether the provider retry loop may
//! try again.

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::validate::Rejection;

/// Uniform result shape shared by the gateway, the renderer and persistence.
pub type ProviderResult<T> = Result<T, PipelineError>;

// ---------------------------------------------------------------------------
// ErrorKind
// ---------------------------------------------------------------------------

/// Coarse classification of a [`PipelineError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Source or audio rejected by static checks.  Never retried.
    Validation,
    /// Request parameters out of bounds.
    InvalidRequest,
    /// No credential configured for the selected backend.
    ProviderUnavailable,
    /// Credential rejected by the provider.
    ProviderAuth,
    /// Provider refused the request as malformed (non-auth 4xx).
    ProviderRejected,
    ProviderRateLimited,
    ProviderTimeout,
    /// Provider answered with a 5xx status.
    ProviderOutage,
    /// Connection-level failure before any status was received.
    ProviderTransport,
    /// The response body did not have the expected shape.
    ProviderProtocol,
    ProviderExhausted,
    ProviderEmptyResult,
    /// Subprocess could not be spawned or exceeded its deadline.
    Execution,
    /// Subprocess ran and exited non-zero.
    Render,
    /// Subprocess exited zero but no output file was found.
    ArtifactNotFound,
    PersistenceNotFound,
    PersistenceIo,
}

impl ErrorKind {
    /// Failures that surface immediately and are never retried.
    pub fn is_fatal(self) -> bool {
        matches!(
            self,
            ErrorKind::ProviderAuth | ErrorKind::ProviderRejected | ErrorKind::ProviderProtocol
        )
    }
}

// ---------------------------------------------------------------------------
// PipelineError
// ---------------------------------------------------------------------------

/// Every failure the pipeline can report.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("code validation failed: {0}")]
    Validation(#[from] Rejection),

    #[error("invalid audio: {0}")]
    InvalidAudio(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("{0} is not configured (missing API key)")]
    ProviderUnavailable(String),

    #[error("{0}")]
    ProviderAuth(String),

    #[error("{provider} rejected the request ({status}): {body}")]
    ProviderRejected {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("{0}")]
    ProviderRateLimited(String),

    #[error("provider request timed out")]
    ProviderTimeout,

    #[error("{provider} returned server error {status}")]
    ProviderOutage { provider: String, status: u16 },

    #[error("provider request failed: {0}")]
    ProviderTransport(String),

    #[error("unexpected provider response: {0}")]
    ProviderProtocol(String),

    #[error("{provider} still failing after {attempts} attempts: {last}")]
    ProviderExhausted {
        provider: String,
        attempts: u32,
        last: String,
    },

    #[error("{0} returned an empty result")]
    ProviderEmptyResult(String),

    #[error("failed to start renderer: {0}")]
    Spawn(String),

    #[error("renderer timed out after {}s", .0.as_secs())]
    RenderTimeout(Duration),

    #[error("renderer exited with status {status}: {stderr}")]
    Render { status: i32, stderr: String },

    #[error("renderer reported success but no output video was found for {0}")]
    ArtifactNotFound(String),

    #[error("source file does not exist: {}", .0.display())]
    PersistenceNotFound(PathBuf),

    #[error("failed to save file: {0}")]
    PersistenceIo(String),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Validation(_) | PipelineError::InvalidAudio(_) => ErrorKind::Validation,
            PipelineError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            PipelineError::ProviderUnavailable(_) => ErrorKind::ProviderUnavailable,
            PipelineError::ProviderAuth(_) => ErrorKind::ProviderAuth,
            PipelineError::ProviderRejected { .. } => ErrorKind::ProviderRejected,
            PipelineError::ProviderRateLimited(_) => ErrorKind::ProviderRateLimited,
            PipelineError::ProviderTimeout => ErrorKind::ProviderTimeout,
            PipelineError::ProviderOutage { .. } => ErrorKind::ProviderOutage,
            PipelineError::ProviderTransport(_) => ErrorKind::ProviderTransport,
            PipelineError::ProviderProtocol(_) => ErrorKind::ProviderProtocol,
            PipelineError::ProviderExhausted { .. } => ErrorKind::ProviderExhausted,
            PipelineError::ProviderEmptyResult(_) => ErrorKind::ProviderEmptyResult,
            PipelineError::Spawn(_) | PipelineError::RenderTimeout(_) => ErrorKind::Execution,
            PipelineError::Render { .. } => ErrorKind::Render,
            PipelineError::ArtifactNotFound(_) => ErrorKind::ArtifactNotFound,
            PipelineError::PersistenceNotFound(_) => ErrorKind::PersistenceNotFound,
            PipelineError::PersistenceIo(_) => ErrorKind::PersistenceIo,
        }
    }

    /// Whether the provider retry loop may attempt the call again.
    pub fn is_transient(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::ProviderRateLimited
                | ErrorKind::ProviderTimeout
                | ErrorKind::ProviderOutage
                | ErrorKind::ProviderTransport
        )
    }
}

impl From<reqwest::Error> for PipelineError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            PipelineError::ProviderTimeout
        } else if e.is_decode() {
            PipelineError::ProviderProtocol(e.to_string())
        } else {
            // Drop the URL so query strings never reach logs or callers.
            PipelineError::ProviderTransport(e.without_url().to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
