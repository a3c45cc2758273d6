//! State → URL direction.
//!
//! Facet changes accumulate in a [`PendingBatch`]. The batch flushes once no
//! change arrived for the debounce window. Flushed patches go out one
//! navigation at a time: while a navigation is in flight, further flushes
//! merge into a single queued patch that is issued once it settles. A
//! rejected navigation counts as settled.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use calscope_core::ScopeError;
use calscope_store::ScopeStore;
use futures::FutureExt;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info_span, warn};

use crate::query::{QueryCodec, QueryPatch};
use crate::router::{NavigationError, NavigationRequest, Router};

type Navigation = BoxFuture<'static, Result<bool, NavigationError>>;

// ─────────────────────────────────────────────────────────────────────────────
// PendingBatch
// ─────────────────────────────────────────────────────────────────────────────

/// Debounced accumulator of query entries.
#[derive(Debug)]
pub struct PendingBatch {
    patch: QueryPatch,
    deadline: Option<Instant>,
    debounce: Duration,
}

impl PendingBatch {
    /// Empty batch with the given quiet period.
    pub fn new(debounce: Duration) -> Self {
        Self {
            patch: QueryPatch::new(),
            deadline: None,
            debounce,
        }
    }

    /// Add an entry; a later value for the same key wins. Restarts the quiet period.
    pub fn push(&mut self, (key, value): (String, Option<String>)) {
        let _ = self.patch.insert(key, value);
        self.deadline = Some(Instant::now() + self.debounce);
    }

    /// When the batch is due, if it holds anything.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.patch.is_empty()
    }

    /// Take the accumulated patch and reset.
    pub fn take(&mut self) -> Option<QueryPatch> {
        self.deadline = None;
        (!self.patch.is_empty()).then(|| std::mem::take(&mut self.patch))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// WrittenParams
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Written {
    latest: Option<String>,
    superseded: Option<String>,
}

/// Values the outbound side wrote, per parameter.
///
/// Inbound consults it to recognize its own writes coming back. Besides the
/// latest value, the one it replaced is kept until the replacing navigation
/// settles, since the URL still shows it until then.
#[derive(Debug, Default)]
pub struct WrittenParams {
    values: Mutex<BTreeMap<String, Written>>,
}

impl WrittenParams {
    /// Empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a patch about to be navigated.
    pub fn record(&self, patch: &QueryPatch) {
        let mut values = self.values.lock();
        for (key, value) in patch {
            let entry = values.entry(key.clone()).or_default();
            entry.superseded = entry.latest.take();
            entry.latest.clone_from(value);
        }
    }

    /// The navigation carrying `patch` settled.
    pub fn settled(&self, patch: &QueryPatch) {
        let mut values = self.values.lock();
        for key in patch.keys() {
            if let Some(entry) = values.get_mut(key) {
                entry.superseded = None;
            }
        }
    }

    /// Whether `value` is one of our own writes for `key`.
    pub fn is_echo(&self, key: &str, value: &str) -> bool {
        self.values.lock().get(key).is_some_and(|entry| {
            entry.latest.as_deref() == Some(value) || entry.superseded.as_deref() == Some(value)
        })
    }

    /// Latest written value per parameter.
    pub fn snapshot(&self) -> QueryPatch {
        self.values
            .lock()
            .iter()
            .map(|(key, entry)| (key.clone(), entry.latest.clone()))
            .collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Loop
// ─────────────────────────────────────────────────────────────────────────────

/// Task mirroring facet changes into the URL until cancelled.
///
/// The facets are subscribed before this returns: values present now are
/// not written, every later change is.
pub(crate) fn outbound_task(
    store: &ScopeStore,
    router: Arc<dyn Router>,
    codec: QueryCodec,
    debounce: Duration,
    written: Arc<WrittenParams>,
    cancel: CancellationToken,
) -> impl Future<Output = ()> + Send + 'static {
    let mut start = store.watch_start();
    let mut mode = store.watch_mode();
    let mut focus = store.watch_focus();
    let mut expanded = store.watch_expanded_weeks();

    async move {
        let mut batch = PendingBatch::new(debounce);
        let mut queued: Option<QueryPatch> = None;
        let mut in_flight: Option<Navigation> = None;
        let mut issued = QueryPatch::new();

        loop {
            let deadline = batch.deadline();
            tokio::select! {
                () = cancel.cancelled() => {
                    debug!(pending = !batch.is_empty(), "outbound sync cancelled");
                    return;
                }
                Some(value) = start.changed() => batch.push(codec.start_entry(value)),
                Some(value) = mode.changed() => batch.push(codec.mode_entry(value)),
                Some(value) = focus.changed() => batch.push(codec.focus_entry(value.as_ref())),
                Some(value) = expanded.changed() => batch.push(codec.expanded_entry(&value)),
                () = time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    if let Some(patch) = batch.take() {
                        match queued.as_mut() {
                            Some(waiting) => waiting.extend(patch),
                            None => queued = Some(patch),
                        }
                    }
                }
                result = settle(&mut in_flight), if in_flight.is_some() => {
                    in_flight = None;
                    written.settled(&issued);
                    match result {
                        Ok(changed) => debug!(changed, "navigation settled"),
                        Err(error) => {
                            let error = ScopeError::from(error);
                            warn!(code = error.code(), %error, "navigation failed, continuing");
                        }
                    }
                }
            }

            if in_flight.is_none() {
                if let Some(patch) = queued.take() {
                    debug!(batch_size = patch.len(), "writing query batch");
                    written.record(&patch);
                    issued.clone_from(&patch);
                    let router = Arc::clone(&router);
                    let request = NavigationRequest::merge_replace(patch);
                    in_flight = Some(async move { router.navigate(request).await }.boxed());
                }
            }
        }
    }
    .instrument(info_span!("outbound_sync"))
}

/// Await the in-flight navigation. Cancel-safe: the navigation itself stays
/// in the slot until it completes.
async fn settle(slot: &mut Option<Navigation>) -> Result<bool, NavigationError> {
    match slot {
        Some(navigation) => navigation.await,
        None => std::future::pending().await,
    }
}
