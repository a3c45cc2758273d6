//! URL → intent direction.
//!
//! Rules, per parameter:
//! - `start` / `mode`: only when the URL carries no `focus`; emitted when the
//!   parsed value differs from the store.
//! - `expanded`: compared as a set of week starts; emitted on any difference.
//! - `focus`: a `ResolveFocus` intent when the URL holds only `focus`, or the
//!   decoded target differs from the stored focus.
//!
//! Absent or unparseable parameters never produce intents, and neither do
//! values the outbound side just wrote, except a lone `focus`. While the router is mid-navigation,
//! evaluation waits for the navigation to settle.

use std::sync::Arc;

use calscope_resolver::ScopeIntent;
use calscope_store::{CalendarScopeState, ScopeStore};
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info_span, trace};

use crate::outbound::WrittenParams;
use crate::query::{QueryCodec, QueryParams};
use crate::router::{RouteEvent, Router};

/// Intents implied by `params` against the current `state`.
pub fn inbound_intents(
    params: &QueryParams,
    state: &CalendarScopeState,
    codec: &QueryCodec,
    written: &WrittenParams,
) -> Vec<ScopeIntent> {
    let names = codec.names();
    let incoming = |key: &str| params.get(key).filter(|value| !written.is_echo(key, value));
    let mut intents = Vec::new();

    if !params.contains(&names.focus) {
        let start = incoming(&names.start).and_then(|value| codec.parse_start(value));
        if let Some(start) = start.filter(|s| state.scope_parameters.start != Some(*s)) {
            intents.push(ScopeIntent::SetStart(start));
        }
        let mode = incoming(&names.mode).and_then(|value| codec.parse_mode(value));
        if let Some(mode) = mode.filter(|m| state.scope_parameters.mode != Some(*m)) {
            intents.push(ScopeIntent::SetMode(mode));
        }
    }

    if let Some(value) = incoming(&names.expanded) {
        let weeks = codec.parse_expanded(value);
        if weeks != state.expanded_weeks {
            intents.push(ScopeIntent::SetExpandedWeeks(weeks.into_iter().collect()));
        }
    }

    // A URL holding only `focus` always re-resolves, even when it matches
    // our own last write.
    let only_focus = params.len() == 1;
    let focus = if only_focus {
        params.get(&names.focus)
    } else {
        incoming(&names.focus)
    };
    if let Some(target) = focus.and_then(|value| codec.parse_focus(value)) {
        if only_focus || state.focus.as_ref() != Some(&target) {
            intents.push(ScopeIntent::ResolveFocus(target));
        }
    }

    intents
}

/// Task turning URL changes into intents until cancelled.
///
/// The router streams are subscribed before this returns. The query present
/// at startup is evaluated first, so a deep link resolves without waiting
/// for a change.
pub(crate) fn inbound_task(
    store: Arc<ScopeStore>,
    router: &dyn Router,
    codec: QueryCodec,
    written: Arc<WrittenParams>,
    intents: mpsc::Sender<ScopeIntent>,
    cancel: CancellationToken,
) -> impl Future<Output = ()> + Send + 'static {
    let mut params = router.query_params();
    let mut events = RouteTracker::new(router.route_events());

    async move {
        let mut dirty = true;

        loop {
            dirty |= events.drain();
            if dirty && !events.navigating {
                dirty = false;
                let current = params.borrow_and_update().clone();
                let pending = inbound_intents(&current, &store.snapshot(), &codec, &written);
                for intent in pending {
                    trace!(intent = intent.name(), "inbound intent");
                    if intents.send(intent).await.is_err() {
                        debug!("intent receiver dropped, stopping inbound sync");
                        return;
                    }
                }
            }

            tokio::select! {
                () = cancel.cancelled() => {
                    debug!("inbound sync cancelled");
                    return;
                }
                changed = params.changed() => {
                    if changed.is_err() {
                        debug!("router dropped, stopping inbound sync");
                        return;
                    }
                    dirty = true;
                }
                event = events.rx.recv(), if events.open => {
                    dirty |= events.apply(event);
                }
            }
        }
    }
    .instrument(info_span!("inbound_sync"))
}

/// Whether the router is mid-navigation, from its lifecycle events.
struct RouteTracker {
    rx: broadcast::Receiver<RouteEvent>,
    open: bool,
    navigating: bool,
}

impl RouteTracker {
    fn new(rx: broadcast::Receiver<RouteEvent>) -> Self {
        Self {
            rx,
            open: true,
            navigating: false,
        }
    }

    /// Apply every event already received. Returns whether the query must
    /// be re-read.
    fn drain(&mut self) -> bool {
        let mut reread = false;
        while self.open {
            match self.rx.try_recv() {
                Ok(event) => reread |= self.apply(Ok(event)),
                Err(broadcast::error::TryRecvError::Empty) => break,
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    reread |= self.apply(Err(broadcast::error::RecvError::Lagged(skipped)));
                }
                Err(broadcast::error::TryRecvError::Closed) => {
                    reread |= self.apply(Err(broadcast::error::RecvError::Closed));
                }
            }
        }
        reread
    }

    fn apply(&mut self, event: Result<RouteEvent, broadcast::error::RecvError>) -> bool {
        match event {
            Ok(event) => {
                self.navigating = !event.settles();
                trace!(?event, navigating = self.navigating, "route event");
                false
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                debug!(skipped, "route events lagged, re-reading query");
                self.navigating = false;
                true
            }
            Err(broadcast::error::RecvError::Closed) => {
                self.open = false;
                self.navigating = false;
                false
            }
        }
    }
}
