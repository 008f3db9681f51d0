//! Module loading.
//!
//! A [`ModuleLoader`] turns the normalized text bound to a
//! [`ResourceHandle`] into a mountable [`Component`], or into a typed
//! [`LoadFailure`]. Loaders never touch the resource registry: the engine
//! acquires the handle, resolves its text into the [`LoadRequest`] and
//! decides when the handle is released once the load settles.
//!
//! # Backends
//!
//! - **`DylibLoader`** - compiles the source with rustc into a cdylib and
//!   opens it with libloading.

mod dylib;

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::compile::Diagnostic;
use crate::render::Component;
use crate::resource::ResourceHandle;
use crate::source::Revision;

pub use dylib::DylibLoader;
pub(crate) use dylib::ScratchDir;

/// Classification of a failed generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The source did not parse or compile into a loadable unit.
    CompileError,
    /// The unit loaded but exports no usable entry point.
    MissingEntryPoint,
    /// The entry point failed during construction or first paint.
    RenderError,
    /// The load did not settle within the configured bound.
    Timeout,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::CompileError => "compile error",
            Self::MissingEntryPoint => "missing entry point",
            Self::RenderError => "render error",
            Self::Timeout => "timeout",
        };
        f.write_str(label)
    }
}

/// A failed load or render, in the one shape every failure is reported in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{kind}: {detail}")]
pub struct LoadFailure {
    /// What went wrong
    pub kind: FailureKind,

    /// Human-readable detail
    pub detail: String,

    /// Compiler diagnostics, for compile errors
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

impl LoadFailure {
    /// Create a failure without diagnostics.
    pub fn new(kind: FailureKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
            diagnostics: Vec::new(),
        }
    }

    /// A compile error with a plain message.
    pub fn compile(detail: impl Into<String>) -> Self {
        Self::new(FailureKind::CompileError, detail)
    }

    /// A compile error summarizing compiler diagnostics.
    pub fn from_diagnostics(diagnostics: Vec<Diagnostic>) -> Self {
        let detail = match diagnostics.as_slice() {
            [] => "compilation failed".to_string(),
            [only] => only.summary(),
            [first, rest @ ..] => format!("{} (and {} more)", first.summary(), rest.len()),
        };
        Self {
            kind: FailureKind::CompileError,
            detail,
            diagnostics,
        }
    }

    /// The unit has no usable entry point.
    pub fn missing_entry_point(detail: impl Into<String>) -> Self {
        Self::new(FailureKind::MissingEntryPoint, detail)
    }

    /// The entry point failed while painting.
    pub fn render(detail: impl Into<String>) -> Self {
        Self::new(FailureKind::RenderError, detail)
    }

    /// The load exceeded `limit`.
    pub fn timeout(limit: Duration) -> Self {
        Self::new(
            FailureKind::Timeout,
            format!("load did not settle within {limit:?}"),
        )
    }
}

/// State of a load.
#[derive(Debug)]
pub enum LoadResult<T = Box<dyn Component>> {
    /// Load in flight.
    Pending,
    /// Resolved entry point.
    Ready(T),
    /// Load or render failed.
    Failed(LoadFailure),
}

impl<T> LoadResult<T> {
    /// Whether the load is still in flight.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Whether the load resolved to an entry point.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// The failure, if the load failed.
    pub fn failure(&self) -> Option<&LoadFailure> {
        match self {
            Self::Failed(failure) => Some(failure),
            _ => None,
        }
    }

    /// Map the ready value.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> LoadResult<U> {
        match self {
            Self::Pending => LoadResult::Pending,
            Self::Ready(value) => LoadResult::Ready(f(value)),
            Self::Failed(failure) => LoadResult::Failed(failure),
        }
    }
}

impl<T> From<Result<T, LoadFailure>> for LoadResult<T> {
    fn from(result: Result<T, LoadFailure>) -> Self {
        match result {
            Ok(value) => Self::Ready(value),
            Err(failure) => Self::Failed(failure),
        }
    }
}

/// What a settled load produced.
pub type LoadOutcome = Result<Box<dyn Component>, LoadFailure>;

/// One load: a handle and the normalized text it resolves to.
#[derive(Debug, Clone)]
pub struct LoadRequest {
    /// Revision being loaded
    pub revision: Revision,

    /// Resource the text was resolved from
    pub handle: ResourceHandle,

    /// Text bound to `handle` in the registry
    pub text: Arc<str>,
}

/// Turns component source into a mountable component.
pub trait ModuleLoader: Send + Sync + 'static {
    /// Ensure whatever preamble the backend needs is present.
    ///
    /// Must be idempotent: normalizing normalized text returns it unchanged.
    fn normalize<'a>(&self, source: &'a str) -> Cow<'a, str> {
        Cow::Borrowed(source)
    }

    /// Load the request. The source is not validated beforehand; whether
    /// it is loadable is discovered only by attempting the load.
    fn load(&self, request: LoadRequest) -> impl Future<Output = LoadOutcome> + Send;
}
