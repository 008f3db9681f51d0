//! Preview engine.
//!
//! Wires the resource registry, sequencer, render host and error channel
//! around a [`ModuleLoader`]. All state is mutated from the task that owns
//! the engine; the only concurrency is the load itself, which runs in a
//! tokio [`JoinSet`] and is settled back through [`PreviewEngine::settle_next`].
//!
//! Every handle acquired for a revision is released exactly once: when a
//! newer revision supersedes it, when its load fails, when an abandoned load
//! settles, or when the host unmounts.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use rustc_hash::FxHashMap;
use tokio::sync::watch;
use tokio::task::{Id, JoinSet};

use crate::channel::{ErrorChannel, PreviewError};
use crate::error::{Error, Result};
use crate::load::{LoadFailure, LoadOutcome, LoadRequest, LoadResult, ModuleLoader};
use crate::render::{RenderHost, View, panic_message};
use crate::resource::{ResourceHandle, ResourceRegistry, ResourceStats};
use crate::sequencer::{Phase, Sequencer, Settlement};
use crate::source::{Generation, INITIAL_COMPONENT, Revision, SourceRecord};

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Upper bound on a single load; `None` waits indefinitely
    pub load_timeout: Option<Duration>,

    /// Shown while nothing is mounted
    pub placeholder: View,

    /// Source accepted by [`PreviewEngine::accept_initial`]
    pub initial_source: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            load_timeout: Some(Duration::from_secs(120)),
            placeholder: View::placeholder(),
            initial_source: Some(INITIAL_COMPONENT.to_string()),
        }
    }
}

impl EngineConfig {
    /// Set the load timeout.
    pub fn with_load_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.load_timeout = timeout;
        self
    }

    /// Set the initial component source.
    pub fn with_initial_source(mut self, source: Option<String>) -> Self {
        self.initial_source = source;
        self
    }
}

/// Live preview of generated component source.
///
/// Must be driven from within a tokio runtime: accepting source spawns the
/// load onto the current runtime.
pub struct PreviewEngine<L: ModuleLoader> {
    loader: Arc<L>,
    config: EngineConfig,
    registry: ResourceRegistry,
    sequencer: Sequencer,
    host: RenderHost,
    errors: ErrorChannel,
    phase_tx: watch::Sender<Phase>,
    loads: JoinSet<LoadOutcome>,
    /// Revision and handle each spawned load is bound to
    in_flight: FxHashMap<Id, (Revision, ResourceHandle)>,
    accepted: Option<SourceRecord>,
    accepted_generation: Option<Generation>,
    rendered: Option<SourceRecord>,
}

impl<L: ModuleLoader> PreviewEngine<L> {
    /// Create an idle engine.
    pub fn new(loader: L, config: EngineConfig) -> Self {
        let (phase_tx, _rx) = watch::channel(Phase::Idle);
        Self {
            loader: Arc::new(loader),
            host: RenderHost::new(config.placeholder.clone()),
            config,
            registry: ResourceRegistry::new(),
            sequencer: Sequencer::new(),
            errors: ErrorChannel::new(),
            phase_tx,
            loads: JoinSet::new(),
            in_flight: FxHashMap::default(),
            accepted: None,
            accepted_generation: None,
            rendered: None,
        }
    }

    /// The module loader.
    pub fn loader(&self) -> &L {
        &self.loader
    }

    /// The engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Accept edited source under the next revision.
    pub fn accept(&mut self, text: &str) -> Revision {
        let revision = self.sequencer.issue();
        self.accepted_generation = None;
        self.begin(text, revision);
        revision
    }

    /// Accept a generation from the generation service.
    pub fn accept_generation(&mut self, generation: Generation) -> Result<Revision> {
        generation.validate()?;
        let revision = self.sequencer.issue();
        self.begin(&generation.code, revision);
        self.accepted_generation = Some(generation);
        Ok(revision)
    }

    /// Accept an externally numbered record.
    ///
    /// Fails with [`Error::StaleRevision`] unless the record is newer than
    /// every revision seen so far, and with [`Error::RevisionOutOfRange`]
    /// above [`Revision::MAX_SUBMITTED`].
    pub fn submit(&mut self, record: SourceRecord) -> Result<Revision> {
        let revision = record.revision();
        if revision > Revision::MAX_SUBMITTED {
            return Err(Error::RevisionOutOfRange {
                submitted: revision,
                max: Revision::MAX_SUBMITTED,
            });
        }
        if !self.sequencer.admits(revision) {
            return Err(Error::StaleRevision {
                submitted: revision,
                latest: self.sequencer.latest(),
            });
        }
        self.accepted_generation = None;
        self.begin(record.text(), revision);
        Ok(revision)
    }

    /// Re-accept the current source under a new revision.
    pub fn refresh(&mut self) -> Option<Revision> {
        let text = self.accepted.as_ref()?.shared_text();
        let revision = self.sequencer.issue();
        self.begin(&text, revision);
        Some(revision)
    }

    /// Accept the configured initial component, if there is one.
    pub fn accept_initial(&mut self) -> Option<Revision> {
        let text = self.config.initial_source.clone()?;
        Some(self.accept(&text))
    }

    fn begin(&mut self, text: &str, revision: Revision) {
        let record = SourceRecord::new(self.loader.normalize(text), revision);

        if let Some(previous) = self.errors.clear() {
            tracing::debug!(%revision, cleared = %previous, "cleared error on new revision");
        }
        if let Some(torn_down) = self.host.unmount() {
            tracing::debug!(%revision, %torn_down, "tore down instance for new revision");
        }

        let retired = self.sequencer.supersede(revision);
        for handle in retired.into_handles() {
            self.registry.release(&handle);
        }

        let handle = self.registry.acquire(record.shared_text());
        debug_assert_eq!(self.registry.live_count(), 1, "only the new revision may be bound");
        self.sequencer.track(revision, handle.clone());
        tracing::debug!(%revision, resource = %handle, "accepted source");

        let text = self
            .registry
            .resolve(&handle)
            .unwrap_or_else(|| record.shared_text());
        self.spawn_load(LoadRequest {
            revision,
            handle,
            text,
        });
        self.accepted = Some(record);
        self.publish_phase();
    }

    fn spawn_load(&mut self, request: LoadRequest) {
        let bound = (request.revision, request.handle.clone());
        let loader = Arc::clone(&self.loader);
        let limit = self.config.load_timeout;

        let task = self.loads.spawn(async move {
            let load = AssertUnwindSafe(loader.load(request)).catch_unwind();
            let caught = match limit {
                Some(limit) => tokio::time::timeout(limit, load)
                    .await
                    .unwrap_or_else(|_| Ok(Err(LoadFailure::timeout(limit)))),
                None => load.await,
            };
            caught.unwrap_or_else(|payload| {
                Err(LoadFailure::compile(format!(
                    "loader panicked: {}",
                    panic_message(payload.as_ref())
                )))
            })
        });
        self.in_flight.insert(task.id(), bound);
    }

    /// Wait for one load to settle and apply it.
    ///
    /// Returns `false` when no load is outstanding. Cancel-safe: dropping
    /// the future before it completes loses no completion.
    pub async fn settle_next(&mut self) -> bool {
        let Some(joined) = self.loads.join_next_with_id().await else {
            return false;
        };

        let (id, outcome) = match joined {
            Ok((id, outcome)) => (id, outcome),
            Err(e) => (
                e.id(),
                Err(LoadFailure::compile(format!("load task failed: {e}"))),
            ),
        };

        match self.in_flight.remove(&id) {
            Some((revision, handle)) => self.complete(revision, handle, outcome),
            None => tracing::warn!("settled load {id} was never tracked"),
        }
        true
    }

    /// Settle every outstanding load.
    pub async fn settle_all(&mut self) {
        while self.settle_next().await {}
    }

    fn complete(&mut self, revision: Revision, handle: ResourceHandle, outcome: LoadOutcome) {
        if self.sequencer.settle(revision, &handle) == Settlement::Abandoned {
            let released = self.registry.release(&handle);
            tracing::debug!(%revision, released, ok = outcome.is_ok(), "discarded abandoned load");
            return;
        }
        debug_assert!(self.registry.is_live(&handle), "current load lost its binding");

        let mounted = outcome.and_then(|component| {
            self.host.mount(revision, component).map(|view| view.markup().len())
        });

        match mounted {
            Ok(bytes) => {
                self.sequencer.commit(revision, handle);
                self.rendered = self.accepted.clone();
                tracing::info!(%revision, bytes, "rendered preview");
            }
            Err(failure) => {
                self.registry.release(&handle);
                self.sequencer.fail(revision);
                tracing::warn!(%revision, %failure, "preview failed");
                self.errors.report(PreviewError::new(revision, failure));
            }
        }
        self.publish_phase();
    }

    /// Tear down the host and release every resource.
    ///
    /// In-flight loads are abandoned; the engine stays usable.
    pub fn unmount(&mut self) {
        self.host.unmount();
        for handle in self.sequencer.reset().into_handles() {
            self.registry.release(&handle);
        }
        self.errors.clear();
        self.rendered = None;
        self.publish_phase();
    }

    fn publish_phase(&self) {
        let phase = self.sequencer.phase();
        self.phase_tx.send_if_modified(|current| {
            let changed = *current != phase;
            *current = phase;
            changed
        });
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.sequencer.phase()
    }

    /// Whether the accepted revision is still loading.
    pub fn is_loading(&self) -> bool {
        self.sequencer.phase().is_loading()
    }

    /// What the host shows: the mounted view or the placeholder.
    pub fn view(&self) -> &View {
        self.host.view()
    }

    /// Outcome of the accepted revision.
    ///
    /// Before anything is accepted the placeholder is shown, which reads as
    /// pending.
    pub fn outcome(&self) -> LoadResult<&View> {
        match self.sequencer.phase() {
            Phase::Idle | Phase::Loading(_) => LoadResult::Pending,
            Phase::Rendering(_) => LoadResult::Ready(self.host.view()),
            Phase::Failed(_) => match self.errors.current() {
                Some(error) => LoadResult::Failed(error.failure),
                None => LoadResult::Pending,
            },
        }
    }

    /// The visible error.
    pub fn error(&self) -> Option<PreviewError> {
        self.errors.current()
    }

    /// Receiver for error updates.
    pub fn subscribe_errors(&self) -> watch::Receiver<Option<PreviewError>> {
        self.errors.subscribe()
    }

    /// Receiver for phase updates.
    pub fn subscribe_phase(&self) -> watch::Receiver<Phase> {
        self.phase_tx.subscribe()
    }

    /// Normalized source of the most recent successful render.
    pub fn rendered_source(&self) -> Option<&SourceRecord> {
        self.rendered.as_ref()
    }

    /// Normalized source of the most recently accepted revision.
    pub fn accepted_source(&self) -> Option<&SourceRecord> {
        self.accepted.as_ref()
    }

    /// The generation behind the accepted revision, if it came from one.
    pub fn accepted_generation(&self) -> Option<&Generation> {
        self.accepted_generation.as_ref()
    }

    /// Resource counters.
    pub fn resource_stats(&self) -> ResourceStats {
        self.registry.stats()
    }

    /// Number of loads not yet settled, abandoned ones included.
    pub fn outstanding_loads(&self) -> usize {
        self.loads.len()
    }
}

impl<L: ModuleLoader> Drop for PreviewEngine<L> {
    fn drop(&mut self) {
        self.loads.abort_all();
        self.host.unmount();
        let released = self.registry.release_all();
        if released > 0 {
            tracing::debug!(released, "released resources on shutdown");
        }
    }
}
