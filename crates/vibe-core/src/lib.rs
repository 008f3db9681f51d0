//! Live preview engine for generated UI components.
//!
//! This crate provides:
//! - Resource registry pairing every acquire with exactly one release
//! - Compilation of untrusted component source into dynamic libraries
//! - Render host with a failure boundary and full remounts
//! - Revision sequencing that discards superseded loads
//! - A single-slot error channel for the chrome

pub mod channel;
pub mod compile;
pub mod engine;
pub mod error;
pub mod load;
pub mod paths;
pub mod render;
pub mod resource;
pub mod sequencer;
pub mod source;

pub use channel::{ErrorChannel, PreviewError};
pub use compile::{CompilerConfig, ComponentCompiler, Diagnostic, ToolchainManager};
pub use engine::{EngineConfig, PreviewEngine};
pub use error::{Error, Result};
pub use load::{DylibLoader, FailureKind, LoadFailure, LoadOutcome, LoadRequest, LoadResult, ModuleLoader};
pub use paths::PreviewDirs;
pub use render::{Component, RenderFault, RenderHost, View};
pub use resource::{ResourceHandle, ResourceRegistry, ResourceStats};
pub use sequencer::{Phase, Sequencer, Settlement};
pub use source::{Generation, INITIAL_COMPONENT, Revision, SourceRecord};
