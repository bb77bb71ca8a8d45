//! Manim-GPT: natural-language prompts to rendered Manim animations.
//!
//! A prompt goes to a language-model provider, the returned Python is
//! checked by the static [`validate`] pass, and accepted source is handed
//! to the external Manim renderer.  The [`pipeline`] module ties the
//! pieces together and is what the command-line binary drives.

pub mod artifact;
pub mod config;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod render;
pub mod source;
pub mod validate;
