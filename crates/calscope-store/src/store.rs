//! Owned state container for the calendar scope.
//!
//! [`ScopeStore::dispatch`] is the only mutation entry point. Each dispatch
//! runs the reducer under a lock, publishes the committed snapshot on a
//! `watch` channel and appends the action to a `broadcast` log. Readers
//! never observe a partially applied transition.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};

use calscope_core::{DisplayMode, FocusTarget, ScopeParameters, ScopeWindow};
use chrono::NaiveDate;
use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};
use tracing::trace;

use crate::action::ScopeAction;
use crate::reducer::reduce;
use crate::state::CalendarScopeState;

/// Default action log capacity.
const DEFAULT_ACTION_CAPACITY: usize = 256;

/// The calendar scope store.
pub struct ScopeStore {
    state: watch::Sender<CalendarScopeState>,
    actions: broadcast::Sender<ScopeAction>,
    dispatch_lock: Mutex<()>,
    dispatch_count: AtomicU64,
}

impl ScopeStore {
    /// Create a store in the empty baseline.
    pub fn new() -> Self {
        Self::with_state(CalendarScopeState::default())
    }

    /// Create a store with an initial state.
    pub fn with_state(state: CalendarScopeState) -> Self {
        let (state, _) = watch::channel(state);
        let (actions, _) = broadcast::channel(DEFAULT_ACTION_CAPACITY);
        Self {
            state,
            actions,
            dispatch_lock: Mutex::new(()),
            dispatch_count: AtomicU64::new(0),
        }
    }

    /// Apply a transition. Returns whether the state changed.
    pub fn dispatch(&self, action: ScopeAction) -> bool {
        let _guard = self.dispatch_lock.lock();
        let changed = self.state.send_if_modified(|state| reduce(state, &action));
        let _ = self.dispatch_count.fetch_add(1, Ordering::Relaxed);
        trace!(action = action.name(), changed, "dispatched");
        // No receivers is fine: the log is optional.
        let _ = self.actions.send(action);
        changed
    }

    /// Apply several transitions in order.
    pub fn dispatch_all<I>(&self, actions: I)
    where
        I: IntoIterator<Item = ScopeAction>,
    {
        for action in actions {
            let _ = self.dispatch(action);
        }
    }

    // ── Snapshots ───────────────────────────────────────────────────────

    /// Full committed state.
    pub fn snapshot(&self) -> CalendarScopeState {
        self.state.borrow().clone()
    }

    /// Current scope parameters.
    pub fn scope_parameters(&self) -> ScopeParameters {
        self.state.borrow().scope_parameters
    }

    /// Current focus.
    pub fn focus(&self) -> Option<FocusTarget> {
        self.state.borrow().focus.clone()
    }

    /// Current expanded weeks.
    pub fn expanded_weeks(&self) -> BTreeSet<NaiveDate> {
        self.state.borrow().expanded_weeks.clone()
    }

    /// Current visible window, if start and mode are set.
    pub fn window(&self) -> Option<ScopeWindow> {
        self.state.borrow().window()
    }

    /// Number of dispatched actions so far.
    pub fn dispatch_count(&self) -> u64 {
        self.dispatch_count.load(Ordering::Relaxed)
    }

    // ── Streams ─────────────────────────────────────────────────────────

    /// Receiver of committed full-state snapshots.
    pub fn subscribe(&self) -> watch::Receiver<CalendarScopeState> {
        self.state.subscribe()
    }

    /// Receiver of every action dispatched after this call.
    pub fn subscribe_actions(&self) -> broadcast::Receiver<ScopeAction> {
        self.actions.subscribe()
    }

    /// Distinct changes of the scope parameters.
    pub fn watch_scope_parameters(&self) -> FacetWatcher<ScopeParameters> {
        FacetWatcher::new(self.subscribe(), |s| s.scope_parameters)
    }

    /// Distinct changes of the window start.
    pub fn watch_start(&self) -> FacetWatcher<Option<NaiveDate>> {
        FacetWatcher::new(self.subscribe(), |s| s.scope_parameters.start)
    }

    /// Distinct changes of the display mode.
    pub fn watch_mode(&self) -> FacetWatcher<Option<DisplayMode>> {
        FacetWatcher::new(self.subscribe(), |s| s.scope_parameters.mode)
    }

    /// Distinct changes of the focus.
    pub fn watch_focus(&self) -> FacetWatcher<Option<FocusTarget>> {
        FacetWatcher::new(self.subscribe(), |s| s.focus.clone())
    }

    /// Distinct changes of the expanded weeks.
    pub fn watch_expanded_weeks(&self) -> FacetWatcher<BTreeSet<NaiveDate>> {
        FacetWatcher::new(self.subscribe(), |s| s.expanded_weeks.clone())
    }

    /// Distinct changes of the derived window.
    pub fn watch_window(&self) -> FacetWatcher<Option<ScopeWindow>> {
        FacetWatcher::new(self.subscribe(), CalendarScopeState::window)
    }

    /// Distinct changes of the navigate-to-element signal.
    pub fn watch_navigate_to_element(&self) -> FacetWatcher<Option<FocusTarget>> {
        FacetWatcher::new(self.subscribe(), |s| s.navigate_to_element.clone())
    }
}

impl Default for ScopeStore {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// FacetWatcher
// ─────────────────────────────────────────────────────────────────────────────

/// Projection of the state that only reports distinct changes.
///
/// [`FacetWatcher::changed`] is cancel-safe and can be used in `select!`.
pub struct FacetWatcher<T> {
    rx: watch::Receiver<CalendarScopeState>,
    project: fn(&CalendarScopeState) -> T,
    last: T,
}

impl<T: Clone + PartialEq> FacetWatcher<T> {
    /// Start watching from the current value.
    pub fn new(mut rx: watch::Receiver<CalendarScopeState>, project: fn(&CalendarScopeState) -> T) -> Self {
        let last = project(&rx.borrow_and_update());
        Self { rx, project, last }
    }

    /// Last observed value.
    pub fn current(&self) -> T {
        self.last.clone()
    }

    /// Wait for the next distinct value. `None` once the store is dropped.
    pub async fn changed(&mut self) -> Option<T> {
        loop {
            self.rx.changed().await.ok()?;
            let next = (self.project)(&self.rx.borrow_and_update());
            if next != self.last {
                self.last = next.clone();
                return Some(next);
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::FocusResolveStatus;
    use std::sync::Arc;
    use std::time::Duration;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn dispatch_updates_snapshot() {
        let store = ScopeStore::new();
        assert!(store.dispatch(ScopeAction::SetStart(d(2024, 1, 3))));
        assert!(store.dispatch(ScopeAction::SetMode(DisplayMode::FourWeeks)));
        assert_eq!(
            store.scope_parameters(),
            ScopeParameters::new(d(2024, 1, 1), DisplayMode::FourWeeks)
        );
        assert_eq!(store.window().unwrap().end, d(2024, 1, 28));
        assert_eq!(store.dispatch_count(), 2);
    }

    #[test]
    fn dispatch_reports_no_change() {
        let store = ScopeStore::new();
        assert!(!store.dispatch(ScopeAction::InitializeAll));
    }

    #[tokio::test]
    async fn action_log_preserves_order() {
        let store = ScopeStore::new();
        let mut rx = store.subscribe_actions();

        store.dispatch_all([
            ScopeAction::ResolveFocus(FocusTarget::task("t")),
            ScopeAction::InitializeScopeParameters,
            ScopeAction::ResolveFocusFulfilled(None),
        ]);

        assert_eq!(rx.recv().await.unwrap().name(), "resolve_focus");
        assert_eq!(rx.recv().await.unwrap().name(), "initialize_scope_parameters");
        assert_eq!(rx.recv().await.unwrap().name(), "resolve_focus_fulfilled");
        assert_eq!(store.snapshot().focus_resolve_status, FocusResolveStatus::Success);
    }

    #[tokio::test]
    async fn facet_watcher_skips_unrelated_changes() {
        let store = Arc::new(ScopeStore::new());
        let mut mode = store.watch_mode();
        assert_eq!(mode.current(), None);

        let writer = Arc::clone(&store);
        let handle = tokio::spawn(async move {
            let _ = writer.dispatch(ScopeAction::SetStart(d(2024, 1, 1)));
            tokio::time::sleep(Duration::from_millis(5)).await;
            let _ = writer.dispatch(ScopeAction::SetMode(DisplayMode::EighteenWeeks));
        });

        let next = tokio::time::timeout(Duration::from_secs(1), mode.changed())
            .await
            .unwrap();
        assert_eq!(next, Some(Some(DisplayMode::EighteenWeeks)));
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn facet_watcher_ends_when_store_dropped() {
        let store = ScopeStore::new();
        let mut focus = store.watch_focus();
        drop(store);
        assert_eq!(focus.changed().await, None);
    }

    #[tokio::test]
    async fn watch_window_derives_from_start_and_mode() {
        let store = ScopeStore::new();
        let mut window = store.watch_window();
        let _ = store.dispatch(ScopeAction::SetScopeParameters(ScopeParameters::new(
            d(2024, 1, 1),
            DisplayMode::SixWeeks,
        )));
        let next = window.changed().await.unwrap().unwrap();
        assert_eq!(next.start, d(2024, 1, 1));
        assert_eq!(next.end, d(2024, 2, 11));
    }
}
