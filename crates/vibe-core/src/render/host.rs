//! Render host.
//!
//! Mounts one component instance at a time into a bounded region, behind a
//! failure boundary. Generations are not assumed to be related, so every
//! new revision gets a full remount; nothing is patched across them.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};

use crate::load::LoadFailure;
use crate::source::Revision;

use super::component::{Component, View};

/// The instance currently on screen.
struct Mounted {
    revision: Revision,
    /// Kept alive for as long as its view is shown
    _component: Box<dyn Component>,
    view: View,
}

/// Hosts the rendered output of the latest successful load.
pub struct RenderHost {
    mounted: Option<Mounted>,
    placeholder: View,
}

impl RenderHost {
    /// Create an empty host showing `placeholder`.
    pub fn new(placeholder: View) -> Self {
        Self {
            mounted: None,
            placeholder,
        }
    }

    /// Mount `component` for `revision`, tearing down whatever was mounted.
    ///
    /// Construction and first paint run inside the failure boundary: an
    /// `Err` or a panic from the component becomes a render failure, the
    /// component is dropped, and the host is left showing the placeholder.
    pub fn mount(
        &mut self,
        revision: Revision,
        mut component: Box<dyn Component>,
    ) -> Result<&View, LoadFailure> {
        if let Some(previous) = self.unmount() {
            tracing::debug!(%previous, %revision, "tore down previous instance before mount");
        }

        let painted = catch_unwind(AssertUnwindSafe(|| component.render()));
        let view = match painted {
            Ok(Ok(view)) => view,
            Ok(Err(fault)) => return Err(LoadFailure::render(fault.to_string())),
            Err(payload) => return Err(LoadFailure::render(panic_message(payload.as_ref()))),
        };

        let mounted = self.mounted.insert(Mounted {
            revision,
            _component: component,
            view,
        });
        Ok(&mounted.view)
    }

    /// Tear down the mounted instance, returning its revision.
    pub fn unmount(&mut self) -> Option<Revision> {
        self.mounted.take().map(|mounted| mounted.revision)
    }

    /// What the host currently shows.
    pub fn view(&self) -> &View {
        self.mounted
            .as_ref()
            .map_or(&self.placeholder, |mounted| &mounted.view)
    }

    /// Revision of the mounted instance.
    pub fn mounted_revision(&self) -> Option<Revision> {
        self.mounted.as_ref().map(|mounted| mounted.revision)
    }

    /// Whether an instance is mounted.
    pub fn is_mounted(&self) -> bool {
        self.mounted.is_some()
    }
}

/// Extract a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}
