//! End-to-end behavior of the URL synchronizer against in-process routers.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use calscope_core::{DisplayMode, FixedClock, FocusTarget, Milestone};
use calscope_resolver::{
    DataLoadedSignal, InMemoryLookup, IntentRunner, ResolverConfig, ScopeIntent, ScopeResolver,
};
use calscope_store::{ScopeAction, ScopeStore};
use calscope_sync::{
    MemoryRouter, NavigationError, NavigationRequest, QueryParams, RouteEvent, Router, SyncConfig,
    SyncHandle, UrlSynchronizer,
};
use chrono::NaiveDate;
use parking_lot::Mutex;
use tokio::sync::{Semaphore, broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

async fn run_pending() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

async fn step(ms: u64) {
    tokio::time::advance(Duration::from_millis(ms)).await;
    run_pending().await;
}

fn value(request: &NavigationRequest, key: &str) -> Option<Option<String>> {
    request.query_params.get(key).cloned()
}

// ─────────────────────────────────────────────────────────────────────────────
// Test router
// ─────────────────────────────────────────────────────────────────────────────

/// Router that can hold navigations open and reject them.
struct TestRouter {
    inner: MemoryRouter,
    calls: Mutex<Vec<NavigationRequest>>,
    gate: Option<Arc<Semaphore>>,
    reject_next: AtomicBool,
}

impl TestRouter {
    fn new() -> Self {
        Self {
            inner: MemoryRouter::new(),
            calls: Mutex::new(Vec::new()),
            gate: None,
            reject_next: AtomicBool::new(false),
        }
    }

    fn gated(gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new()
        }
    }

    fn calls(&self) -> Vec<NavigationRequest> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Router for TestRouter {
    async fn navigate(&self, request: NavigationRequest) -> Result<bool, NavigationError> {
        self.calls.lock().push(request.clone());
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        if self.reject_next.swap(false, Ordering::SeqCst) {
            return Err(NavigationError::Rejected("guard refused".to_string()));
        }
        self.inner.navigate(request).await
    }

    fn query_params(&self) -> watch::Receiver<QueryParams> {
        self.inner.query_params()
    }

    fn route_events(&self) -> broadcast::Receiver<RouteEvent> {
        self.inner.route_events()
    }
}

struct Harness<R> {
    store: Arc<ScopeStore>,
    router: Arc<R>,
    intents: mpsc::Receiver<ScopeIntent>,
    handle: SyncHandle,
}

fn spawn_sync<R: Router + 'static>(router: R) -> Harness<R> {
    let store = Arc::new(ScopeStore::new());
    let router = Arc::new(router);
    let (tx, intents) = mpsc::channel(32);
    let handle = UrlSynchronizer::spawn(
        Arc::clone(&store),
        Arc::clone(&router) as Arc<dyn Router>,
        tx,
        SyncConfig::default(),
    );
    Harness {
        store,
        router,
        intents,
        handle,
    }
}

fn drain(rx: &mut mpsc::Receiver<ScopeIntent>) -> Vec<ScopeIntent> {
    let mut out = Vec::new();
    while let Ok(intent) = rx.try_recv() {
        out.push(intent);
    }
    out
}

// ─────────────────────────────────────────────────────────────────────────────
// Outbound
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn changes_within_debounce_merge_into_one_navigation() {
    let h = spawn_sync(TestRouter::new());
    run_pending().await;

    let _ = h.store.dispatch(ScopeAction::SetStart(d(2024, 1, 1)));
    run_pending().await;
    step(49).await;
    let _ = h.store.dispatch(ScopeAction::SetMode(DisplayMode::FourWeeks));
    run_pending().await;
    step(49).await;
    let _ = h.store.dispatch(ScopeAction::SetFocus(Some(FocusTarget::task("abc"))));
    run_pending().await;
    step(49).await;
    let _ = h
        .store
        .dispatch(ScopeAction::SetExpandedWeeks(vec![d(2024, 1, 8), d(2024, 1, 1)]));
    run_pending().await;

    step(49).await;
    assert!(h.router.calls().is_empty(), "quiet period restarts on every change");

    step(2).await;
    let calls = h.router.calls();
    assert_eq!(calls.len(), 1);
    let request = &calls[0];
    assert_eq!(request.query_params.len(), 4);
    assert_eq!(value(request, "start"), Some(Some("2024-01-01".to_string())));
    assert_eq!(value(request, "mode"), Some(Some("4w".to_string())));
    assert_eq!(value(request, "focus"), Some(Some("TASK_abc".to_string())));
    assert_eq!(
        value(request, "expanded"),
        Some(Some("2024-01-01,2024-01-08".to_string()))
    );
    assert!(request.merge);
    assert!(request.replace_url);

    let _ = h.store.dispatch(ScopeAction::SetMode(DisplayMode::EighteenWeeks));
    run_pending().await;
    step(51).await;
    let calls = h.router.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].query_params.len(), 1);
    assert_eq!(value(&calls[1], "mode"), Some(Some("18w".to_string())));

    assert!(h.handle.shutdown().await);
}

#[tokio::test(start_paused = true)]
async fn second_navigation_waits_for_first_to_settle() {
    let gate = Arc::new(Semaphore::new(0));
    let h = spawn_sync(TestRouter::gated(Arc::clone(&gate)));
    run_pending().await;

    let _ = h.store.dispatch(ScopeAction::SetStart(d(2024, 1, 1)));
    run_pending().await;
    step(51).await;
    assert_eq!(h.router.calls().len(), 1);

    let _ = h.store.dispatch(ScopeAction::SetMode(DisplayMode::FourWeeks));
    run_pending().await;
    step(51).await;
    let _ = h.store.dispatch(ScopeAction::SetStart(d(2024, 2, 5)));
    run_pending().await;
    step(51).await;
    assert_eq!(h.router.calls().len(), 1, "first navigation still pending");

    gate.add_permits(1);
    run_pending().await;
    let calls = h.router.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(value(&calls[0], "start"), Some(Some("2024-01-01".to_string())));
    assert_eq!(value(&calls[1], "mode"), Some(Some("4w".to_string())));
    assert_eq!(
        value(&calls[1], "start"),
        Some(Some("2024-02-05".to_string())),
        "batches queued behind one navigation coalesce"
    );

    gate.add_permits(1);
    run_pending().await;
    assert_eq!(h.router.calls().len(), 2);
    assert_eq!(
        h.router.inner.current(),
        QueryParams::from_pairs([("start", "2024-02-05"), ("mode", "4w")])
    );

    assert!(h.handle.shutdown().await);
}

#[tokio::test(start_paused = true)]
async fn rejected_navigation_does_not_stall_queue() {
    let router = TestRouter::new();
    router.reject_next.store(true, Ordering::SeqCst);
    let h = spawn_sync(router);
    run_pending().await;

    let _ = h.store.dispatch(ScopeAction::SetStart(d(2024, 1, 1)));
    run_pending().await;
    step(51).await;
    let _ = h.store.dispatch(ScopeAction::SetMode(DisplayMode::FourWeeks));
    run_pending().await;
    step(51).await;

    assert_eq!(h.router.calls().len(), 2);
    assert_eq!(
        h.router.inner.current(),
        QueryParams::from_pairs([("mode", "4w")])
    );
    assert!(h.handle.shutdown().await);
}

#[tokio::test(start_paused = true)]
async fn cleared_facets_remove_parameters() {
    let h = spawn_sync(TestRouter::new());
    run_pending().await;

    let _ = h.store.dispatch(ScopeAction::SetFocus(Some(FocusTarget::milestone("m"))));
    run_pending().await;
    step(51).await;
    let _ = h.store.dispatch(ScopeAction::SetFocus(None));
    run_pending().await;
    step(51).await;

    let calls = h.router.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(value(&calls[1], "focus"), Some(None));
    assert!(h.router.inner.current().is_empty());
    assert!(h.handle.shutdown().await);
}

// ─────────────────────────────────────────────────────────────────────────────
// Inbound
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn focus_in_url_suppresses_start() {
    let mut h = spawn_sync(MemoryRouter::with_params(QueryParams::from_pairs([
        ("start", "2024-01-01"),
        ("focus", "TASK_abc"),
    ])));
    run_pending().await;

    assert_eq!(
        drain(&mut h.intents),
        vec![ScopeIntent::ResolveFocus(FocusTarget::task("abc"))]
    );
    assert!(h.handle.shutdown().await);
}

#[tokio::test(start_paused = true)]
async fn inbound_waits_for_navigation_to_settle() {
    let mut h = spawn_sync(MemoryRouter::new());
    run_pending().await;

    let _ = h.router.emit(RouteEvent::NavigationStart);
    let _ = h.router.emit(RouteEvent::GuardsCheckStart);
    h.router
        .replace_query(QueryParams::from_pairs([("mode", "18w")]));
    run_pending().await;
    assert!(drain(&mut h.intents).is_empty());

    let _ = h.router.emit(RouteEvent::NavigationCancel);
    run_pending().await;
    assert_eq!(
        drain(&mut h.intents),
        vec![ScopeIntent::SetMode(DisplayMode::EighteenWeeks)]
    );
    assert!(h.handle.shutdown().await);
}

#[tokio::test(start_paused = true)]
async fn url_change_applied_to_store_does_not_loop() {
    let mut h = spawn_sync(MemoryRouter::new());
    run_pending().await;

    h.router.set_url(QueryParams::from_pairs([
        ("start", "2024-02-07"),
        ("mode", "4w"),
        ("tab", "board"),
    ]));
    run_pending().await;

    let intents = drain(&mut h.intents);
    assert_eq!(
        intents,
        vec![
            ScopeIntent::SetStart(d(2024, 2, 5)),
            ScopeIntent::SetMode(DisplayMode::FourWeeks),
        ]
    );
    for intent in intents {
        let _ = h.store.dispatch(intent.into_action().unwrap());
    }
    run_pending().await;
    step(51).await;
    step(1_000).await;

    assert!(drain(&mut h.intents).is_empty());
    assert_eq!(h.router.navigation_count(), 1);
    assert_eq!(
        h.router.current(),
        QueryParams::from_pairs([("start", "2024-02-05"), ("mode", "4w"), ("tab", "board")])
    );
    assert!(h.handle.shutdown().await);
}

#[tokio::test(start_paused = true)]
async fn own_write_echo_does_not_revert_newer_state() {
    let gate = Arc::new(Semaphore::new(0));
    let mut h = spawn_sync(TestRouter::gated(Arc::clone(&gate)));
    run_pending().await;

    let _ = h.store.dispatch(ScopeAction::SetStart(d(2024, 1, 1)));
    run_pending().await;
    step(51).await;
    let _ = h.store.dispatch(ScopeAction::SetStart(d(2024, 3, 4)));
    run_pending().await;

    gate.add_permits(1);
    run_pending().await;

    assert!(
        drain(&mut h.intents).is_empty(),
        "start=2024-01-01 is our own write, not a user change"
    );
    assert_eq!(h.store.scope_parameters().start, Some(d(2024, 3, 4)));

    gate.add_permits(1);
    step(51).await;
    assert!(h.handle.shutdown().await);
}

#[tokio::test(start_paused = true)]
async fn lone_focus_link_resolves_after_own_write() {
    let mut h = spawn_sync(TestRouter::new());
    run_pending().await;

    let _ = h.store.dispatch(ScopeAction::SetStart(d(2024, 6, 3)));
    let _ = h.store.dispatch(ScopeAction::SetFocus(Some(FocusTarget::task("abc"))));
    run_pending().await;
    step(60).await;
    assert_eq!(h.router.calls().len(), 1);
    assert!(drain(&mut h.intents).is_empty());

    h.router
        .inner
        .set_url(QueryParams::parse("?focus=TASK_abc"));
    run_pending().await;

    assert_eq!(
        drain(&mut h.intents),
        vec![ScopeIntent::ResolveFocus(FocusTarget::task("abc"))]
    );
    assert!(h.handle.shutdown().await);
}

// ─────────────────────────────────────────────────────────────────────────────
// Full loop
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn deep_link_resolves_and_writes_scope_back_once() {
    let store = Arc::new(ScopeStore::new());
    let lookup = InMemoryLookup::new().with_milestone(Milestone {
        id: "m1".into(),
        date: d(2024, 6, 5),
    });
    let resolver = Arc::new(ScopeResolver::new(
        Arc::clone(&store),
        Arc::new(lookup),
        Arc::new(FixedClock(d(2024, 3, 13))),
        ResolverConfig::default(),
    ));
    let router = Arc::new(MemoryRouter::with_params(QueryParams::from_pairs([(
        "focus",
        "MILESTONE_m1",
    )])));

    let (tx, rx) = mpsc::channel(32);
    let cancel = CancellationToken::new();
    let runner = IntentRunner::new(Arc::clone(&resolver), Arc::new(DataLoadedSignal::new()))
        .spawn(rx, cancel.clone());
    let sync = UrlSynchronizer::spawn(
        Arc::clone(&store),
        Arc::clone(&router) as Arc<dyn Router>,
        tx,
        SyncConfig::default(),
    );

    run_pending().await;
    assert_eq!(store.focus(), Some(FocusTarget::milestone("m1")));
    assert_eq!(store.scope_parameters().start, Some(d(2024, 6, 3)));

    step(51).await;
    step(1_000).await;

    assert_eq!(router.navigation_count(), 1);
    assert_eq!(
        router.current(),
        QueryParams::from_pairs([
            ("focus", "MILESTONE_m1"),
            ("start", "2024-06-03"),
            ("mode", "6w"),
        ])
    );
    assert_eq!(resolver.generation(), 1);

    assert!(sync.shutdown().await);
    cancel.cancel();
    runner.await.unwrap();
}
