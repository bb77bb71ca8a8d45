//! Pipeline orchestrator module for Manim-GPT.
//!
//! This module wires the Provider Gateway, Code Validator and Render
//! Orchestrator into the operations a transport layer calls, and maps every
//! internal failure to a uniform, redacted outcome record.
//!
//! # Architecture
//!
//! ```text
//! generate(params)
//!   ├─ GenerationRequest::new            (bounds)
//!   ├─ ProviderGateway::generate_code    (retry / backoff, code extraction)
//!   ├─ validate::validate                (syntax, scene, construct)
//!   └─ Renderer::render                  (scratch → subprocess → locate)
//!
//! preview(code)     → validate → render
//! validate(code)    → validate
//! save(path)        → Persistence::save
//! transcribe(audio) → ProviderGateway::transcribe (streaming Qwen-Omni)
//! ```

pub mod outcome;
pub mod redact;
pub mod runner;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use outcome::{
    GenerationOutcome, PreviewOutcome, SaveOutcome, TranscriptionOutcome, ValidationOutcome,
};
pub use redact::Redactor;
pub use runner::{GenerateParams, Pipeline};
