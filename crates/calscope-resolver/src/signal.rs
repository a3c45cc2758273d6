//! "Calendar data loaded" signal from the list-loading subsystem.

use std::sync::atomic::{AtomicU64, Ordering};

use calscope_core::ScopeWindow;
use tokio::sync::broadcast;
use tracing::trace;

/// Default broadcast channel capacity.
const DEFAULT_CAPACITY: usize = 16;

/// The calendar finished loading the rows for a window.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CalendarDataLoaded {
    /// Window the data was loaded for, when the loader knows it.
    pub window: Option<ScopeWindow>,
}

impl CalendarDataLoaded {
    /// Data loaded for `window`.
    pub fn for_window(window: ScopeWindow) -> Self {
        Self {
            window: Some(window),
        }
    }

    /// Whether this event can release navigation into `window`. Events
    /// without a window always can.
    pub fn matches(&self, window: ScopeWindow) -> bool {
        self.window.is_none_or(|loaded| loaded == window)
    }
}

/// Broadcast of [`CalendarDataLoaded`] events.
///
/// Non-blocking: `notify` never awaits. Navigation only counts events
/// emitted after it subscribed.
#[derive(Debug)]
pub struct DataLoadedSignal {
    tx: broadcast::Sender<CalendarDataLoaded>,
    notify_count: AtomicU64,
}

impl DataLoadedSignal {
    /// Create a new signal.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(DEFAULT_CAPACITY);
        Self {
            tx,
            notify_count: AtomicU64::new(0),
        }
    }

    /// Announce loaded data. Returns the number of waiting receivers.
    pub fn notify(&self, event: CalendarDataLoaded) -> usize {
        let _ = self.notify_count.fetch_add(1, Ordering::Relaxed);
        self.tx.send(event).unwrap_or(0)
    }

    /// Receiver of every event announced after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<CalendarDataLoaded> {
        self.tx.subscribe()
    }

    /// Total number of announcements.
    pub fn notify_count(&self) -> u64 {
        self.notify_count.load(Ordering::Relaxed)
    }
}

impl Default for DataLoadedSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Wait for the first event on `rx` matching `window`.
///
/// A lagged receiver may have dropped the matching event, so it counts as
/// one. Returns `None` if the signal was dropped first.
pub(crate) async fn next_loaded(
    rx: &mut broadcast::Receiver<CalendarDataLoaded>,
    window: ScopeWindow,
) -> Option<CalendarDataLoaded> {
    loop {
        match rx.recv().await {
            Ok(event) if event.matches(window) => return Some(event),
            Ok(event) => trace!(loaded = ?event.window, "data loaded for another window"),
            Err(broadcast::error::RecvError::Lagged(_)) => return Some(CalendarDataLoaded::default()),
            Err(broadcast::error::RecvError::Closed) => return None,
        }
    }
}
