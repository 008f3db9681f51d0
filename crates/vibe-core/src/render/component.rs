//! Renderable components and the views they produce.

use std::fmt;

use libloading::Library;
use serde::Serialize;
use thiserror::Error;

use crate::compile::{CompiledComponent, FREE_SYMBOL, RENDER_SYMBOL};
use crate::load::{LoadFailure, ScratchDir};

use super::ffi::{FfiBuffer, FreeFn, RenderFn, RenderStatus};

/// Rendered output of a component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct View {
    markup: String,
}

impl View {
    /// Wrap rendered markup.
    pub fn new(markup: impl Into<String>) -> Self {
        Self {
            markup: markup.into(),
        }
    }

    /// The neutral view shown while nothing is mounted.
    pub fn placeholder() -> Self {
        Self::new("Compiling preview...")
    }

    /// The rendered markup.
    pub fn markup(&self) -> &str {
        &self.markup
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.markup)
    }
}

/// Why a component failed to paint.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderFault {
    /// The component panicked.
    #[error("component panicked: {0}")]
    Panicked(String),

    /// The render entry returned an unknown status code.
    #[error("component returned status {0}")]
    Status(i32),

    /// The component reported a failure.
    #[error("{0}")]
    Message(String),
}

/// A loaded, mountable UI entry point.
pub trait Component: Send {
    /// Construct and paint the component.
    fn render(&mut self) -> Result<View, RenderFault>;
}

impl<F> Component for F
where
    F: FnMut() -> Result<View, RenderFault> + Send,
{
    fn render(&mut self) -> Result<View, RenderFault> {
        self()
    }
}

/// A component living in a dynamically loaded library.
///
/// The library stays loaded for as long as this value lives; dropping it
/// unloads the library and then removes the build directory it came from.
pub struct DylibComponent {
    // Declared before `_scratch` so the library unloads first.
    library: Library,
    compiled: CompiledComponent,
    _scratch: Option<ScratchDir>,
}

impl DylibComponent {
    /// Open a compiled component and check its exports.
    ///
    /// A library that cannot be opened is a compile failure; one that opens
    /// but lacks the render exports has no entry point.
    pub fn open(compiled: CompiledComponent) -> Result<Self, LoadFailure> {
        let library = unsafe { Library::new(&compiled.dylib_path) }
            .map_err(|e| LoadFailure::compile(format!("failed to load library: {e}")))?;

        let exports = unsafe {
            library.get::<RenderFn>(RENDER_SYMBOL.as_bytes()).is_ok()
                && library.get::<FreeFn>(FREE_SYMBOL.as_bytes()).is_ok()
        };
        if !exports {
            let detail = compiled
                .missing_entry
                .clone()
                .unwrap_or_else(|| format!("library does not export `{RENDER_SYMBOL}`"));
            return Err(LoadFailure::missing_entry_point(detail));
        }

        Ok(Self {
            library,
            compiled,
            _scratch: None,
        })
    }

    /// Take ownership of the build directory the library was compiled in.
    pub(crate) fn with_scratch(mut self, scratch: ScratchDir) -> Self {
        self._scratch = Some(scratch);
        self
    }

    /// The compiled artifact this component was opened from.
    pub fn compiled(&self) -> &CompiledComponent {
        &self.compiled
    }
}

impl Component for DylibComponent {
    fn render(&mut self) -> Result<View, RenderFault> {
        let (render, free) = unsafe {
            let render = self
                .library
                .get::<RenderFn>(RENDER_SYMBOL.as_bytes())
                .map_err(|e| RenderFault::Message(e.to_string()))?;
            let free = self
                .library
                .get::<FreeFn>(FREE_SYMBOL.as_bytes())
                .map_err(|e| RenderFault::Message(e.to_string()))?;
            (*render, *free)
        };

        let mut out_ptr: *mut u8 = std::ptr::null_mut();
        let mut out_len: usize = 0;
        let code = unsafe { render(&mut out_ptr, &mut out_len) };

        let buffer = unsafe { FfiBuffer::new(out_ptr, out_len, free) };
        let text = String::from_utf8_lossy(buffer.as_bytes()).into_owned();

        match RenderStatus::from(code) {
            RenderStatus::Success => Ok(View::new(text)),
            RenderStatus::Panic => Err(RenderFault::Panicked(text)),
            RenderStatus::ComponentError => Err(RenderFault::Status(code)),
        }
    }
}
