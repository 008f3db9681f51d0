//! Generation sequencer.
//!
//! Orders accepted revisions, owns the pending and live resource handles and
//! decides, for every settled load, whether it is still current. It performs
//! no I/O and never touches the registry itself: every transition hands back
//! the handles the caller must release.

use serde::Serialize;

use crate::resource::ResourceHandle;
use crate::source::Revision;

/// Observable state of the preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", content = "revision", rename_all = "snake_case")]
pub enum Phase {
    /// Nothing accepted yet, or torn down.
    #[default]
    Idle,
    /// The revision's load is in flight.
    Loading(Revision),
    /// The revision is mounted.
    Rendering(Revision),
    /// The revision failed to load or paint.
    Failed(Revision),
}

impl Phase {
    /// The revision this phase refers to.
    pub fn revision(&self) -> Option<Revision> {
        match self {
            Self::Idle => None,
            Self::Loading(r) | Self::Rendering(r) | Self::Failed(r) => Some(*r),
        }
    }

    /// Whether a load is in flight.
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading(_))
    }
}

/// How a settled load relates to the accepted revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// The load belongs to the current revision; its outcome is applied.
    Current,
    /// A newer revision was accepted (or the host unmounted) meanwhile.
    Abandoned,
}

/// Handles a transition has taken out of the sequencer's ownership.
#[derive(Debug, Default, PartialEq, Eq)]
#[must_use = "retired handles must be released"]
pub struct Retired {
    /// Handle of a superseded in-flight load
    pub pending: Option<ResourceHandle>,
    /// Handle of the instance being torn down
    pub live: Option<ResourceHandle>,
}

impl Retired {
    /// All retired handles.
    pub fn into_handles(self) -> impl Iterator<Item = ResourceHandle> {
        self.pending.into_iter().chain(self.live)
    }
}

/// Revision ordering and handle ownership.
#[derive(Debug, Default)]
pub struct Sequencer {
    latest: Revision,
    phase: Phase,
    pending: Option<(Revision, ResourceHandle)>,
    live: Option<(Revision, ResourceHandle)>,
}

impl Sequencer {
    /// Create an idle sequencer.
    pub fn new() -> Self {
        Self::default()
    }

    /// The highest revision issued or accepted.
    pub fn latest(&self) -> Revision {
        self.latest
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Issue the next revision number.
    pub fn issue(&mut self) -> Revision {
        self.latest = self.latest.next();
        self.latest
    }

    /// Whether an externally numbered `revision` is newer than anything seen
    /// and within [`Revision::MAX_SUBMITTED`].
    pub fn admits(&self, revision: Revision) -> bool {
        revision > self.latest && revision <= Revision::MAX_SUBMITTED
    }

    /// Move to loading `revision`, retiring the in-flight load and the live
    /// instance.
    ///
    /// Retired handles must be released before the new revision's handle is
    /// acquired and passed to [`track`](Self::track); the host shows the
    /// placeholder until the new revision settles.
    pub fn supersede(&mut self, revision: Revision) -> Retired {
        self.latest = self.latest.max(revision);
        self.phase = Phase::Loading(revision);
        Retired {
            pending: self.pending.take().map(|(_, h)| h),
            live: self.live.take().map(|(_, h)| h),
        }
    }

    /// Take ownership of the handle bound to the loading revision.
    pub fn track(&mut self, revision: Revision, handle: ResourceHandle) {
        debug_assert_eq!(self.phase, Phase::Loading(revision));
        self.pending = Some((revision, handle));
    }

    /// Classify the load for `revision` bound to `handle` as it settles.
    ///
    /// A current settlement takes the handle out of pending ownership; the
    /// caller then either commits it or releases it.
    pub fn settle(&mut self, revision: Revision, handle: &ResourceHandle) -> Settlement {
        match &self.pending {
            Some((r, h)) if *r == revision && h == handle => {
                self.pending = None;
                Settlement::Current
            }
            _ => Settlement::Abandoned,
        }
    }

    /// Record a successful mount of the current revision.
    pub fn commit(&mut self, revision: Revision, handle: ResourceHandle) {
        debug_assert!(self.live.is_none());
        self.phase = Phase::Rendering(revision);
        self.live = Some((revision, handle));
    }

    /// Record a failure of the current revision.
    pub fn fail(&mut self, revision: Revision) {
        self.phase = Phase::Failed(revision);
    }

    /// Tear everything down, abandoning in-flight work.
    pub fn reset(&mut self) -> Retired {
        self.phase = Phase::Idle;
        Retired {
            pending: self.pending.take().map(|(_, h)| h),
            live: self.live.take().map(|(_, h)| h),
        }
    }

    /// Revision and handle of the mounted instance.
    pub fn live(&self) -> Option<(Revision, &ResourceHandle)> {
        self.live.as_ref().map(|(r, h)| (*r, h))
    }

    /// Revision and handle of the in-flight load.
    pub fn pending(&self) -> Option<(Revision, &ResourceHandle)> {
        self.pending.as_ref().map(|(r, h)| (*r, h))
    }
}
