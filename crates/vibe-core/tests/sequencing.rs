//! Integration tests for revision sequencing and resource lifecycle.
//!
//! Loads are driven by a scripted loader whose completions are released by
//! the test, so completion order is fully controlled.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::oneshot;
use vibe_core::{
    Component, EngineConfig, Error, FailureKind, LoadFailure, LoadOutcome, LoadRequest,
    ModuleLoader, Phase, PreviewEngine, RenderFault, Revision, SourceRecord, View,
};

// =============================================================================
// Test Helpers
// =============================================================================

const PLACEHOLDER: &str = "Compiling preview...";

/// How a scripted load settles.
enum Step {
    /// Resolve to a component painting this markup.
    Render(String),
    /// Fail the load.
    Fail(LoadFailure),
    /// Panic inside the loader.
    Panic,
    /// Resolve to a component that panics while painting.
    PanicOnPaint,
}

/// Loader whose loads settle when the test says so.
///
/// Sources with a registered gate wait for it; other sources settle at once:
/// `fail` fails to compile, anything else renders itself.
#[derive(Clone, Default)]
struct ScriptedLoader {
    gates: Arc<Mutex<HashMap<String, oneshot::Receiver<Step>>>>,
}

impl ScriptedLoader {
    /// Hold back the load of `source` until the returned sender fires.
    fn gate(&self, source: &str) -> oneshot::Sender<Step> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().unwrap().insert(source.to_string(), rx);
        tx
    }
}

impl ModuleLoader for ScriptedLoader {
    fn load(&self, request: LoadRequest) -> impl Future<Output = LoadOutcome> + Send {
        let gate = self.gates.lock().unwrap().remove(&*request.text);
        let text = request.text.to_string();
        async move {
            let step = match gate {
                Some(rx) => match rx.await {
                    Ok(step) => step,
                    Err(_) => std::future::pending().await,
                },
                None if text == "fail" => Step::Fail(LoadFailure::compile("expected item")),
                None => Step::Render(text),
            };

            match step {
                Step::Render(markup) => {
                    let component: Box<dyn Component> =
                        Box::new(move || Ok::<_, RenderFault>(View::new(markup.clone())));
                    Ok(component)
                }
                Step::Fail(failure) => Err(failure),
                Step::Panic => panic!("loader exploded"),
                Step::PanicOnPaint => {
                    let component: Box<dyn Component> =
                        Box::new(|| -> Result<View, RenderFault> { panic!("paint exploded") });
                    Ok(component)
                }
            }
        }
    }
}

fn engine_with(loader: &ScriptedLoader) -> PreviewEngine<ScriptedLoader> {
    PreviewEngine::new(loader.clone(), EngineConfig::default())
}

/// At most one resource is live at any instant.
fn assert_exclusive(engine: &PreviewEngine<ScriptedLoader>) {
    let live = engine.resource_stats().live();
    assert!(live <= 1, "{live} resources live at once");
}

// =============================================================================
// Rendering and Supersession
// =============================================================================

#[tokio::test]
async fn test_fast_revision_wins_over_slow() {
    let loader = ScriptedLoader::default();
    let mut engine = engine_with(&loader);
    let slow = loader.gate("slow");

    let r1 = engine.accept("slow");
    let r2 = engine.accept("fast");
    assert_exclusive(&engine);

    assert!(engine.settle_next().await);
    assert_eq!(engine.phase(), Phase::Rendering(r2));
    assert_eq!(engine.view().markup(), "fast");

    slow.send(Step::Render("slow".to_string())).ok();
    assert!(engine.settle_next().await);

    assert!(r1 < r2);
    assert_eq!(engine.phase(), Phase::Rendering(r2));
    assert_eq!(engine.view().markup(), "fast");
    assert!(engine.error().is_none());

    let stats = engine.resource_stats();
    assert_eq!(stats.acquired, 2);
    assert_eq!(stats.released, 1);
    assert_eq!(engine.outstanding_loads(), 0);
}

#[tokio::test]
async fn test_latest_revision_commits_regardless_of_completion_order() {
    for older_first in [true, false] {
        let loader = ScriptedLoader::default();
        let mut engine = engine_with(&loader);
        let first = loader.gate("one");
        let second = loader.gate("two");

        engine.accept("one");
        let latest = engine.accept("two");

        if older_first {
            first.send(Step::Render("one".to_string())).ok();
            assert!(engine.settle_next().await);
            assert!(engine.is_loading());
            second.send(Step::Render("two".to_string())).ok();
        } else {
            second.send(Step::Render("two".to_string())).ok();
            assert!(engine.settle_next().await);
            first.send(Step::Render("one".to_string())).ok();
        }
        engine.settle_all().await;

        assert_eq!(engine.phase(), Phase::Rendering(latest));
        assert_eq!(engine.view().markup(), "two");
        assert_eq!(engine.rendered_source().map(|r| r.text()), Some("two"));
        assert_eq!(engine.resource_stats().live(), 1);
    }
}

#[tokio::test]
async fn test_placeholder_while_loading() {
    let loader = ScriptedLoader::default();
    let mut engine = engine_with(&loader);
    engine.accept("<p>one</p>");
    engine.settle_all().await;

    let gate = loader.gate("<p>two</p>");
    engine.accept("<p>two</p>");

    assert!(engine.is_loading());
    assert!(engine.outcome().is_pending());
    assert_eq!(engine.view().markup(), PLACEHOLDER);
    assert_eq!(engine.accepted_source().map(|r| r.text()), Some("<p>two</p>"));
    assert_eq!(engine.rendered_source().map(|r| r.text()), Some("<p>one</p>"));

    gate.send(Step::Render("<p>two</p>".to_string())).ok();
    engine.settle_all().await;
    assert!(engine.outcome().is_ready());
}

// =============================================================================
// Resource Accounting
// =============================================================================

#[tokio::test]
async fn test_every_acquire_is_released() {
    let loader = ScriptedLoader::default();
    let mut engine = engine_with(&loader);
    let hung = loader.gate("hung");

    let mut hung_in_flight = false;
    for source in ["<a/>", "fail", "hung", "<b/>", "fail", "<c/>"] {
        engine.accept(source);
        hung_in_flight |= source == "hung";
        assert_exclusive(&engine);
        while engine.outstanding_loads() > usize::from(hung_in_flight) {
            engine.settle_next().await;
            assert_exclusive(&engine);
        }
    }

    hung.send(Step::Render("hung".to_string())).ok();
    engine.settle_all().await;
    assert_exclusive(&engine);

    engine.unmount();

    let stats = engine.resource_stats();
    assert_eq!(stats.acquired, 6);
    assert_eq!(stats.released, 6);
}

#[tokio::test]
async fn test_unmount_releases_live_resource_once() {
    let loader = ScriptedLoader::default();
    let mut engine = engine_with(&loader);
    engine.accept("<p>hello</p>");
    engine.settle_all().await;
    assert_eq!(engine.resource_stats().released, 0);

    engine.unmount();

    let stats = engine.resource_stats();
    assert_eq!(stats.acquired, 1);
    assert_eq!(stats.released, 1);
    assert!(engine.error().is_none());
    assert_eq!(engine.phase(), Phase::Idle);
    assert_eq!(engine.view().markup(), PLACEHOLDER);

    engine.unmount();
    assert_eq!(engine.resource_stats().released, 1);
}

#[tokio::test]
async fn test_unmount_abandons_in_flight_load() {
    let loader = ScriptedLoader::default();
    let mut engine = engine_with(&loader);
    let gate = loader.gate("fail-later");

    engine.accept("fail-later");
    engine.unmount();
    assert_eq!(engine.resource_stats().live(), 0);

    gate.send(Step::Fail(LoadFailure::compile("late failure"))).ok();
    engine.settle_all().await;

    assert_eq!(engine.phase(), Phase::Idle);
    assert!(engine.error().is_none());
    let stats = engine.resource_stats();
    assert_eq!(stats.acquired, 1);
    assert_eq!(stats.released, 1);
}

#[tokio::test]
async fn test_engine_reusable_after_unmount() {
    let loader = ScriptedLoader::default();
    let mut engine = engine_with(&loader);
    engine.accept("<p>before</p>");
    engine.settle_all().await;
    engine.unmount();

    let revision = engine.accept("<p>after</p>");
    engine.settle_all().await;

    assert_eq!(revision, Revision::new(2));
    assert_eq!(engine.view().markup(), "<p>after</p>");
}

// =============================================================================
// Failure Isolation
// =============================================================================

#[tokio::test]
async fn test_compile_error_does_not_block_next_revision() {
    let loader = ScriptedLoader::default();
    let mut engine = engine_with(&loader);

    let failed = engine.accept("fail");
    engine.settle_all().await;
    assert_eq!(engine.phase(), Phase::Failed(failed));
    assert_eq!(engine.view().markup(), PLACEHOLDER);

    let next = engine.accept("<p>recovered</p>");
    engine.settle_all().await;

    assert_eq!(engine.phase(), Phase::Rendering(next));
    assert_eq!(engine.view().markup(), "<p>recovered</p>");
    assert!(engine.error().is_none());
}

#[tokio::test]
async fn test_render_panic_is_contained() {
    let loader = ScriptedLoader::default();
    let mut engine = engine_with(&loader);
    let gate = loader.gate("explodes");

    let revision = engine.accept("explodes");
    gate.send(Step::PanicOnPaint).ok();
    engine.settle_all().await;

    let error = engine.error().unwrap();
    assert_eq!(error.revision, revision);
    assert_eq!(error.kind(), FailureKind::RenderError);
    assert!(error.failure.detail.contains("paint exploded"));
    assert_eq!(engine.resource_stats().live(), 0);

    engine.accept("<p>fine</p>");
    engine.settle_all().await;
    assert_eq!(engine.view().markup(), "<p>fine</p>");
}

#[tokio::test]
async fn test_loader_panic_is_a_compile_error() {
    let loader = ScriptedLoader::default();
    let mut engine = engine_with(&loader);
    let gate = loader.gate("boom");

    engine.accept("boom");
    gate.send(Step::Panic).ok();
    engine.settle_all().await;

    let error = engine.error().unwrap();
    assert_eq!(error.kind(), FailureKind::CompileError);
    assert!(error.failure.detail.contains("loader exploded"));
    assert_eq!(engine.resource_stats().live(), 0);
}

#[tokio::test]
async fn test_load_timeout() {
    let loader = ScriptedLoader::default();
    let config = EngineConfig::default().with_load_timeout(Some(Duration::from_millis(50)));
    let mut engine = PreviewEngine::new(loader.clone(), config);
    let _held = loader.gate("slow");

    let revision = engine.accept("slow");
    engine.settle_all().await;

    assert_eq!(engine.phase(), Phase::Failed(revision));
    assert_eq!(engine.error().map(|e| e.kind()), Some(FailureKind::Timeout));
    assert_eq!(engine.resource_stats().live(), 0);
}

#[tokio::test]
async fn test_abandoned_failure_is_swallowed() {
    let loader = ScriptedLoader::default();
    let mut engine = engine_with(&loader);
    let gate = loader.gate("old");

    engine.accept("old");
    let current = engine.accept("<p>new</p>");
    engine.settle_next().await;

    gate.send(Step::Fail(LoadFailure::missing_entry_point("no export"))).ok();
    engine.settle_all().await;

    assert_eq!(engine.phase(), Phase::Rendering(current));
    assert!(engine.error().is_none());
}

// =============================================================================
// Error Channel
// =============================================================================

#[tokio::test]
async fn test_only_latest_error_is_visible() {
    let loader = ScriptedLoader::default();
    let mut engine = engine_with(&loader);
    let mut errors = engine.subscribe_errors();

    engine.accept("fail");
    engine.settle_all().await;
    let first = errors.borrow_and_update().clone().unwrap();

    let gate = loader.gate("<p>missing</p>");
    let second = engine.accept("<p>missing</p>");
    gate.send(Step::Fail(LoadFailure::missing_entry_point("no export"))).ok();
    engine.settle_all().await;

    let visible = errors.borrow_and_update().clone().unwrap();
    assert_ne!(first.revision, visible.revision);
    assert_eq!(visible.revision, second);
    assert_eq!(visible.kind(), FailureKind::MissingEntryPoint);
}

#[tokio::test]
async fn test_submit_rejects_stale_record() {
    let loader = ScriptedLoader::default();
    let mut engine = engine_with(&loader);
    engine
        .submit(SourceRecord::new("<p>ten</p>", Revision::new(10)))
        .unwrap();

    let result = engine.submit(SourceRecord::new("<p>nine</p>", Revision::new(9)));

    assert!(matches!(result, Err(Error::StaleRevision { .. })));
    engine.settle_all().await;
    assert_eq!(engine.view().markup(), "<p>ten</p>");
}
