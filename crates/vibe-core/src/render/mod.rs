//! Rendering of loaded components.
//!
//! - `component` - the [`Component`] trait, [`View`] and the dylib-backed
//!   component
//! - `ffi` - C ABI types shared with the generated export shim
//! - `host` - the [`RenderHost`] and its failure boundary

mod component;
mod ffi;
mod host;

pub use component::{Component, DylibComponent, RenderFault, View};
pub use ffi::{FreeFn, RenderFn, RenderStatus};
pub use host::RenderHost;

pub(crate) use host::panic_message;
