//! Render Orchestrator: run the external renderer on validated source.
//!
//! # Module layout
//!
//! ```text
//! render/
//!   quality.rs       Quality tiers and renderer flags
//!   command.rs       CommandSpec, CommandRunner, AsyncRunner, BlockingRunner
//!   scratch.rs       ScratchFile (removed on every exit path), unique_stamp
//!   orchestrator.rs  Renderer: live and demo render flows
//! ```
//!
//! Only [`ValidatedSource`](crate::validate::ValidatedSource) can be
//! rendered, so unvalidated code never reaches a subprocess.

pub mod command;
pub mod orchestrator;
pub mod quality;
pub mod scratch;

pub use command::{
    runner_for, AsyncRunner, BlockingRunner, CommandOutput, CommandRunner, CommandSpec,
    ExecutionStrategy,
};
pub use orchestrator::{RenderMode, Renderer};
pub use quality::Quality;
pub use scratch::{unique_stamp, ScratchFile};
