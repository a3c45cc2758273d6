//! Intent loop feeding the store and the resolver.
//!
//! Set-intents are dispatched inline, in arrival order. Focus and navigation
//! intents run as separate tasks so a newer request can start while an older
//! one still waits on lookups; the resolver's generation check decides which
//! one commits. A resolution task that dies without committing marks the
//! focus resolution rejected.

use std::collections::HashSet;
use std::sync::Arc;

use calscope_core::ScopeError;
use calscope_store::ScopeAction;
use tokio::sync::mpsc;
use tokio::task::{Id, JoinError, JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, trace, warn};

use crate::engine::ScopeResolver;
use crate::intent::ScopeIntent;
use crate::signal::DataLoadedSignal;

/// Routes [`ScopeIntent`]s until cancelled or the channel closes.
pub struct IntentRunner {
    resolver: Arc<ScopeResolver>,
    loaded: Arc<DataLoadedSignal>,
}

impl IntentRunner {
    /// Create a runner.
    pub fn new(resolver: Arc<ScopeResolver>, loaded: Arc<DataLoadedSignal>) -> Self {
        Self { resolver, loaded }
    }

    /// Intent channel sized by the resolver's `intent_buffer`.
    pub fn channel(&self) -> (mpsc::Sender<ScopeIntent>, mpsc::Receiver<ScopeIntent>) {
        mpsc::channel(self.resolver.config().intent_buffer.max(1))
    }

    /// Run on a new task.
    pub fn spawn(
        self,
        rx: mpsc::Receiver<ScopeIntent>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(self.run(rx, cancel))
    }

    /// Process intents until `cancel` fires or every sender is dropped.
    ///
    /// After the channel closes, in-flight resolutions are awaited unless
    /// `cancel` fires first; cancellation aborts them.
    #[instrument(skip_all, name = "intent_runner")]
    pub async fn run(self, mut rx: mpsc::Receiver<ScopeIntent>, cancel: CancellationToken) {
        let mut tasks = Tasks::default();

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    debug!(in_flight = tasks.set.len(), "intent runner cancelled");
                    tasks.set.abort_all();
                    return;
                }
                intent = rx.recv() => {
                    let Some(intent) = intent else {
                        debug!("intent channel closed");
                        break;
                    };
                    self.handle(intent, &mut tasks);
                }
                Some(result) = tasks.set.join_next_with_id(), if !tasks.set.is_empty() => {
                    self.finished(&mut tasks, result);
                }
            }
        }

        while !tasks.set.is_empty() {
            tokio::select! {
                () = cancel.cancelled() => {
                    tasks.set.abort_all();
                    return;
                }
                Some(result) = tasks.set.join_next_with_id() => self.finished(&mut tasks, result),
            }
        }
    }

    fn handle(&self, intent: ScopeIntent, tasks: &mut Tasks) {
        trace!(intent = intent.name(), "intent received");
        match intent {
            ScopeIntent::ResolveFocus(target) => {
                let resolver = Arc::clone(&self.resolver);
                let loaded = Arc::clone(&self.loaded);
                let handle = tasks.set.spawn(async move {
                    let _ = resolver.resolve_focus_and_navigate(target, &loaded).await;
                });
                let _ = tasks.resolutions.insert(handle.id());
            }
            ScopeIntent::ResolveNavigateToElement(target) => {
                let resolver = Arc::clone(&self.resolver);
                let _ = tasks.set.spawn(async move {
                    let _ = resolver.resolve_navigate_to_element(target).await;
                });
            }
            other => {
                if let Some(action) = other.into_action() {
                    let _ = self.resolver.store().dispatch(action);
                }
            }
        }
    }

    fn finished(&self, tasks: &mut Tasks, result: Result<(Id, ()), JoinError>) {
        let error = match result {
            Ok((id, ())) => {
                let _ = tasks.resolutions.remove(&id);
                return;
            }
            Err(error) => error,
        };
        let resolution = tasks.resolutions.remove(&error.id());
        if error.is_cancelled() {
            return;
        }

        let error = ScopeError::Task {
            name: if resolution { "resolution" } else { "navigation" }.to_string(),
            message: error.to_string(),
        };
        warn!(code = error.code(), %error, "intent task failed");
        if resolution {
            let _ = self.resolver.store().dispatch(ScopeAction::ResolveFocusRejected);
        }
    }
}

/// In-flight intent tasks; `resolutions` holds the focus resolutions.
#[derive(Default)]
struct Tasks {
    set: JoinSet<()>,
    resolutions: HashSet<Id>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use calscope_core::{
        DayCard, DayCardId, DisplayMode, FixedClock, FocusTarget, LookupError, Milestone,
        MilestoneId, Schedule, TaskId,
    };
    use calscope_store::{FocusResolveStatus, ScopeStore};
    use chrono::NaiveDate;

    use crate::engine::ResolverConfig;
    use crate::lookup::{InMemoryLookup, ScopeLookup};
    use crate::signal::CalendarDataLoaded;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn setup() -> (Arc<ScopeResolver>, Arc<DataLoadedSignal>) {
        let lookup = InMemoryLookup::new().with_milestone(Milestone {
            id: "m1".into(),
            date: d(2024, 6, 5),
        });
        let resolver = Arc::new(ScopeResolver::new(
            Arc::new(ScopeStore::new()),
            Arc::new(lookup),
            Arc::new(FixedClock(d(2024, 3, 13))),
            ResolverConfig::default(),
        ));
        (resolver, Arc::new(DataLoadedSignal::new()))
    }

    #[tokio::test]
    async fn set_intents_dispatch_in_order() {
        let (resolver, loaded) = setup();
        let (tx, rx) = mpsc::channel(8);
        let handle = IntentRunner::new(Arc::clone(&resolver), loaded)
            .spawn(rx, CancellationToken::new());

        tx.send(ScopeIntent::SetStart(d(2024, 2, 7))).await.unwrap();
        tx.send(ScopeIntent::SetMode(DisplayMode::FourWeeks)).await.unwrap();
        drop(tx);
        handle.await.unwrap();

        let params = resolver.store().scope_parameters();
        assert_eq!(params.start, Some(d(2024, 2, 5)));
        assert_eq!(params.mode, Some(DisplayMode::FourWeeks));
    }

    #[tokio::test]
    async fn resolve_intent_resolves_then_navigates() {
        let (resolver, loaded) = setup();
        let (tx, rx) = mpsc::channel(8);
        let handle = IntentRunner::new(Arc::clone(&resolver), Arc::clone(&loaded))
            .spawn(rx, CancellationToken::new());

        tx.send(ScopeIntent::ResolveFocus(FocusTarget::milestone("m1")))
            .await
            .unwrap();
        while resolver.store().snapshot().focus_resolve_status != FocusResolveStatus::Success {
            tokio::task::yield_now().await;
        }
        assert_eq!(resolver.store().focus(), Some(FocusTarget::milestone("m1")));

        let _ = loaded.notify(CalendarDataLoaded::default());
        drop(tx);
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(
            resolver.store().snapshot().navigate_to_element,
            Some(FocusTarget::milestone("m1"))
        );
    }

    #[tokio::test]
    async fn cancel_aborts_waiting_resolutions() {
        let (resolver, loaded) = setup();
        let (tx, rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        let handle = IntentRunner::new(Arc::clone(&resolver), loaded).spawn(rx, cancel.clone());

        tx.send(ScopeIntent::ResolveFocus(FocusTarget::milestone("m1")))
            .await
            .unwrap();
        while resolver.store().snapshot().focus_resolve_status != FocusResolveStatus::Success {
            tokio::task::yield_now().await;
        }

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(resolver.store().snapshot().navigate_to_element, None);
    }

    /// Lookup that panics mid-resolution.
    struct PanickingLookup;

    #[async_trait::async_trait]
    impl ScopeLookup for PanickingLookup {
        async fn find_schedule_by_task_id(&self, _: &TaskId) -> Result<Schedule, LookupError> {
            panic!("schedule backend crashed")
        }

        async fn find_milestone_by_id(&self, _: &MilestoneId) -> Result<Milestone, LookupError> {
            panic!("milestone backend crashed")
        }

        async fn find_day_card_by_id(&self, _: &DayCardId) -> Result<DayCard, LookupError> {
            panic!("day-card backend crashed")
        }
    }

    #[test]
    fn channel_uses_configured_buffer() {
        let (resolver, loaded) = setup();
        let (tx, _rx) = IntentRunner::new(resolver, loaded).channel();
        assert_eq!(tx.max_capacity(), 64);
    }

    #[tokio::test]
    async fn crashed_resolution_is_rejected() {
        let resolver = Arc::new(ScopeResolver::new(
            Arc::new(ScopeStore::new()),
            Arc::new(PanickingLookup),
            Arc::new(FixedClock(d(2024, 3, 13))),
            ResolverConfig::default(),
        ));
        let runner = IntentRunner::new(Arc::clone(&resolver), Arc::new(DataLoadedSignal::new()));
        let (tx, rx) = runner.channel();
        let handle = runner.spawn(rx, CancellationToken::new());

        tx.send(ScopeIntent::ResolveFocus(FocusTarget::milestone("m1")))
            .await
            .unwrap();
        drop(tx);
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();

        let state = resolver.store().snapshot();
        assert_eq!(state.focus_resolve_status, FocusResolveStatus::Error);
        assert_eq!(state.focus, None);
    }
}
