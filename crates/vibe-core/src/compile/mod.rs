//! Compilation pipeline for generated components.
//!
//! This module provides:
//! - Source normalization (execution-mode preamble)
//! - Entry point analysis (`syn`)
//! - Toolchain discovery
//! - Component compilation (source → cdylib with a C ABI render export)
//! - Error mapping (rustc diagnostics → component source locations)
//!
//! # Architecture
//!
//! ```text
//! Component source
//!     │
//!     ├── ComponentSourceProcessor::normalize ──► normalized text (bound to a ResourceHandle)
//!     │
//!     └── ComponentCompiler
//!             ├── analyze (syn) ──► syntax diagnostics / entry point
//!             ├── wrapper = header + source + export shim
//!             └── rustc --crate-type=cdylib ──► libvibe_component.so
//! ```

mod component;
mod errors;
mod source_processor;
mod toolchain;
mod types;

pub use component::{ComponentCompiler, FREE_SYMBOL, RENDER_SYMBOL};
pub use errors::{Diagnostic, ErrorLevel, ErrorMapper, SourceLocation};
pub use source_processor::{ComponentSourceProcessor, PREAMBLE, SourceAnalysis};
pub use toolchain::ToolchainManager;
pub use types::{CompiledComponent, CompilerConfig, DEFAULT_ENTRY_POINT, dylib_extension, dylib_prefix};
