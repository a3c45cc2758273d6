//! Navigation seam.
//!
//! The synchronizer never touches a real URL. A [`Router`] exposes the
//! current query as a `watch` stream, the navigation lifecycle as a
//! `broadcast` stream, and an async `navigate` that applies a query patch.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use calscope_core::ScopeError;
use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};

use crate::query::{QueryParams, QueryPatch};

/// Default route-event channel capacity.
const DEFAULT_EVENT_CAPACITY: usize = 64;

/// A query-parameter navigation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NavigationRequest {
    /// Parameters to set (`Some`) or remove (`None`).
    pub query_params: QueryPatch,
    /// Keep parameters not named in the patch.
    pub merge: bool,
    /// Replace the current history entry instead of pushing one.
    pub replace_url: bool,
    /// Update router state without touching the address bar.
    pub skip_location_change: bool,
}

impl NavigationRequest {
    /// Merge into the current query, replacing the history entry.
    pub fn merge_replace(query_params: QueryPatch) -> Self {
        Self {
            query_params,
            merge: true,
            replace_url: true,
            skip_location_change: false,
        }
    }
}

/// Navigation failure reported by the router.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NavigationError {
    /// The router rejected the navigation.
    #[error("navigation rejected: {0}")]
    Rejected(String),
    /// A newer navigation superseded this one.
    #[error("navigation cancelled")]
    Cancelled,
}

impl From<NavigationError> for ScopeError {
    fn from(error: NavigationError) -> Self {
        Self::Navigation(error.to_string())
    }
}

/// Router lifecycle events.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouteEvent {
    /// A navigation began.
    NavigationStart,
    /// Route guards are running.
    GuardsCheckStart,
    /// Route guards finished.
    GuardsCheckEnd,
    /// Route data resolvers are running.
    ResolveStart,
    /// Route data resolvers finished.
    ResolveEnd,
    /// The navigation completed.
    NavigationEnd,
    /// The navigation was cancelled.
    NavigationCancel,
    /// The navigation failed.
    NavigationError,
}

impl RouteEvent {
    /// Whether this event ends a navigation.
    pub fn settles(self) -> bool {
        matches!(
            self,
            Self::NavigationEnd | Self::NavigationCancel | Self::NavigationError
        )
    }
}

/// Navigation primitives the synchronizer depends on.
#[async_trait]
pub trait Router: Send + Sync {
    /// Apply a query navigation. Resolves once it settles.
    async fn navigate(&self, request: NavigationRequest) -> Result<bool, NavigationError>;

    /// Current query parameters and their changes.
    fn query_params(&self) -> watch::Receiver<QueryParams>;

    /// Navigation lifecycle events emitted after this call.
    fn route_events(&self) -> broadcast::Receiver<RouteEvent>;
}

// ─────────────────────────────────────────────────────────────────────────────
// MemoryRouter
// ─────────────────────────────────────────────────────────────────────────────

/// In-process router holding the query in memory.
///
/// Every navigation emits `NavigationStart`, applies the patch and emits
/// `NavigationEnd`. Requests are recorded for inspection.
pub struct MemoryRouter {
    params: watch::Sender<QueryParams>,
    events: broadcast::Sender<RouteEvent>,
    requests: Mutex<Vec<NavigationRequest>>,
    navigation_count: AtomicU64,
}

impl MemoryRouter {
    /// Router at an empty query.
    pub fn new() -> Self {
        Self::with_params(QueryParams::new())
    }

    /// Router at the given query.
    pub fn with_params(params: QueryParams) -> Self {
        let (params, _) = watch::channel(params);
        let (events, _) = broadcast::channel(DEFAULT_EVENT_CAPACITY);
        Self {
            params,
            events,
            requests: Mutex::new(Vec::new()),
            navigation_count: AtomicU64::new(0),
        }
    }

    /// Simulate an external URL change (address bar, history, deep link).
    pub fn set_url(&self, params: QueryParams) {
        let _ = self.emit(RouteEvent::NavigationStart);
        self.replace_query(params);
        let _ = self.emit(RouteEvent::NavigationEnd);
    }

    /// Swap the query without lifecycle events.
    pub fn replace_query(&self, params: QueryParams) {
        let _ = self.params.send_replace(params);
    }

    /// Emit a lifecycle event. Returns the number of receivers.
    pub fn emit(&self, event: RouteEvent) -> usize {
        self.events.send(event).unwrap_or(0)
    }

    /// Current query.
    pub fn current(&self) -> QueryParams {
        self.params.borrow().clone()
    }

    /// Every request seen so far.
    pub fn requests(&self) -> Vec<NavigationRequest> {
        self.requests.lock().clone()
    }

    /// Number of navigations.
    pub fn navigation_count(&self) -> u64 {
        self.navigation_count.load(Ordering::Relaxed)
    }
}

impl Default for MemoryRouter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Router for MemoryRouter {
    async fn navigate(&self, request: NavigationRequest) -> Result<bool, NavigationError> {
        let _ = self.navigation_count.fetch_add(1, Ordering::Relaxed);
        let _ = self.emit(RouteEvent::NavigationStart);
        let changed = self.params.send_if_modified(|params| {
            let before = params.clone();
            if !request.merge {
                *params = QueryParams::new();
            }
            params.apply(&request.query_params);
            *params != before
        });
        self.requests.lock().push(request);
        let _ = self.emit(RouteEvent::NavigationEnd);
        Ok(changed)
    }

    fn query_params(&self) -> watch::Receiver<QueryParams> {
        self.params.subscribe()
    }

    fn route_events(&self) -> broadcast::Receiver<RouteEvent> {
        self.events.subscribe()
    }
}
