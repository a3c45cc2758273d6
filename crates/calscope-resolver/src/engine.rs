//! Scope Resolution Engine.
//!
//! [`ScopeResolver::resolve_focus`] looks up the focused entity and commits
//! the ordered transitions that put it inside the visible window.
//! [`ScopeResolver::resolve_navigate_to_element`] runs after the calendar has
//! loaded its rows and only moves the window when the element is out of view.
//!
//! Lookups fail soft. Any lookup error turns into the default-window fallback
//! (resolution) or an unshifted window (navigation); nothing is propagated.
//!
//! Every resolution takes a generation number. With stale suppression on, a
//! resolution or navigation whose generation has been superseded by a newer
//! `resolve_focus` commits nothing, so out-of-order lookups cannot overwrite
//! the newest request.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use calscope_core::week::{end_of_week, start_of_week};
use calscope_core::{
    Clock, DayCard, DayCardId, DisplayMode, FocusTarget, LookupError, LookupKind, Milestone,
    MilestoneId, Schedule, ScopeError, ScopeWindow, TaskId,
};
use calscope_settings::CalscopeSettings;
use calscope_store::{CalendarScopeState, LookupFulfilled, ScopeAction, ScopeStore};
use chrono::NaiveDate;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, instrument};

use crate::lookup::ScopeLookup;
use crate::signal::{CalendarDataLoaded, DataLoadedSignal, next_loaded};

/// Engine configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Mode used when the store has none and for every fallback.
    pub default_mode: DisplayMode,
    /// Drop transitions of superseded resolutions.
    pub stale_suppression: bool,
    /// Capacity of the intent channel.
    pub intent_buffer: usize,
}

impl ResolverConfig {
    /// Build from loaded settings.
    pub fn from_settings(settings: &CalscopeSettings) -> Self {
        Self {
            default_mode: settings.scope.default_mode,
            stale_suppression: settings.resolver.stale_suppression,
            intent_buffer: settings.resolver.intent_buffer,
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            default_mode: DisplayMode::default(),
            stale_suppression: true,
            intent_buffer: 64,
        }
    }
}

/// Outcome of a focus resolution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// The entity was found; the store now focuses it.
    Resolved(FocusTarget),
    /// A lookup failed; the store shows the current week with no focus.
    Fallback,
    /// A newer request superseded this one; nothing was committed.
    Superseded,
}

impl Resolution {
    /// The committed focus, if any.
    pub fn focus(&self) -> Option<&FocusTarget> {
        match self {
            Self::Resolved(focus) => Some(focus),
            Self::Fallback | Self::Superseded => None,
        }
    }
}

/// Where the focused entity sits and which window shows it.
struct FocusPlan {
    focus: FocusTarget,
    start: NaiveDate,
    expand: Option<NaiveDate>,
}

/// Armed data-loaded receiver of a committed resolution.
struct LoadWait {
    rx: broadcast::Receiver<CalendarDataLoaded>,
    window: ScopeWindow,
}

/// Calendar position of an element for navigation.
enum Placement {
    /// A task's scheduled range.
    Range { from: NaiveDate, to: NaiveDate },
    /// A single day. Day-cards also expand their week.
    Day { date: NaiveDate, expand: bool },
}

/// The resolution engine.
pub struct ScopeResolver {
    store: Arc<ScopeStore>,
    lookup: Arc<dyn ScopeLookup>,
    clock: Arc<dyn Clock>,
    config: ResolverConfig,
    generation: AtomicU64,
    commit_lock: Mutex<()>,
}

impl ScopeResolver {
    /// Create an engine writing into `store`.
    pub fn new(
        store: Arc<ScopeStore>,
        lookup: Arc<dyn ScopeLookup>,
        clock: Arc<dyn Clock>,
        config: ResolverConfig,
    ) -> Self {
        Self {
            store,
            lookup,
            clock,
            config,
            generation: AtomicU64::new(0),
            commit_lock: Mutex::new(()),
        }
    }

    /// The store this engine writes into.
    pub fn store(&self) -> &Arc<ScopeStore> {
        &self.store
    }

    /// Active configuration.
    pub fn config(&self) -> ResolverConfig {
        self.config
    }

    /// Generation of the newest resolution request.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    // ── Resolution ──────────────────────────────────────────────────────

    /// Resolve `target` and commit the transitions that bring it into view.
    pub async fn resolve_focus(&self, target: FocusTarget) -> Resolution {
        self.resolve(target, None).await.1
    }

    /// Resolve `target`, wait for the [`CalendarDataLoaded`] event of the
    /// committed window, then navigate to it.
    ///
    /// The receiver is armed before the new scope is dispatched, so a loader
    /// reacting to the dispatch cannot be missed. Events for another window
    /// are skipped; events without a window count. Fallback and superseded
    /// resolutions skip navigation.
    ///
    /// [`CalendarDataLoaded`]: crate::signal::CalendarDataLoaded
    pub async fn resolve_focus_and_navigate(
        &self,
        target: FocusTarget,
        loaded: &DataLoadedSignal,
    ) -> Resolution {
        let (generation, resolution, wait) = self.resolve(target, Some(loaded)).await;
        let (Resolution::Resolved(focus), Some(mut wait)) = (&resolution, wait) else {
            return resolution;
        };

        if next_loaded(&mut wait.rx, wait.window).await.is_none() {
            debug!(focus = %focus, "data-loaded signal closed before navigation");
            return resolution;
        }
        let _ = self.navigate(generation, focus.clone()).await;
        resolution
    }

    #[instrument(skip_all, fields(focus = %target, generation = tracing::field::Empty))]
    async fn resolve(
        &self,
        target: FocusTarget,
        loaded: Option<&DataLoadedSignal>,
    ) -> (u64, Resolution, Option<LoadWait>) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let _ = tracing::Span::current().record("generation", generation);
        let _ = self.store.dispatch(ScopeAction::ResolveFocus(target.clone()));

        let outcome = match self.plan_focus(&target).await {
            Ok(plan) => {
                debug!(start = %plan.start, "focus located");
                Ok(plan)
            }
            Err(error) => {
                let error = ScopeError::from(error);
                debug!(code = error.code(), %error, "focus lookup failed, falling back to the current week");
                Err(start_of_week(self.clock.today()))
            }
        };
        let resolution = match &outcome {
            Ok(plan) => Resolution::Resolved(plan.focus.clone()),
            Err(_) => Resolution::Fallback,
        };

        let default_mode = self.config.default_mode;
        let mut wait = None;
        let committed = self.commit(generation, |state| match outcome {
            Ok(plan) => {
                let mode = state.scope_parameters.mode.unwrap_or(default_mode);
                wait = loaded.map(|signal| LoadWait {
                    rx: signal.subscribe(),
                    window: ScopeWindow::new(plan.start, mode),
                });
                success_transitions(state, plan, default_mode)
            }
            Err(current_week) => fallback_transitions(current_week, default_mode),
        });
        if committed {
            (generation, resolution, wait)
        } else {
            (generation, Resolution::Superseded, None)
        }
    }

    async fn plan_focus(&self, target: &FocusTarget) -> Result<FocusPlan, LookupError> {
        match target {
            FocusTarget::Task { id } => {
                let schedule = self.fetch_schedule(id).await?;
                Ok(FocusPlan {
                    focus: target.clone(),
                    start: self.task_week(&schedule),
                    expand: None,
                })
            }
            FocusTarget::Milestone { id } => {
                let milestone = self.fetch_milestone(id).await?;
                Ok(FocusPlan {
                    focus: target.clone(),
                    start: start_of_week(milestone.date),
                    expand: None,
                })
            }
            FocusTarget::DayCard { task_id, id } => {
                let (focus, date) = self.locate_day_card(task_id, id).await?;
                let week = start_of_week(date);
                Ok(FocusPlan {
                    focus,
                    start: week,
                    expand: Some(week),
                })
            }
        }
    }

    /// Current week if the schedule touches it, else the schedule's first week.
    fn task_week(&self, schedule: &Schedule) -> NaiveDate {
        let current_week = start_of_week(self.clock.today());
        if schedule.overlaps(current_week, end_of_week(current_week)) {
            current_week
        } else {
            start_of_week(schedule.start)
        }
    }

    // ── Navigation ──────────────────────────────────────────────────────

    /// Shift the window if `target` is out of view, then mark navigation
    /// fulfilled. Returns `false` when a newer resolution superseded it.
    pub async fn resolve_navigate_to_element(&self, target: FocusTarget) -> bool {
        self.navigate(self.generation(), target).await
    }

    #[instrument(skip(self, target), fields(focus = %target))]
    async fn navigate(&self, generation: u64, target: FocusTarget) -> bool {
        let _ = self
            .store
            .dispatch(ScopeAction::ResolveNavigateToElement(target.clone()));

        let placement = match self.locate(&target).await {
            Ok(placement) => Some(placement),
            Err(error) => {
                let error = ScopeError::from(error);
                debug!(code = error.code(), %error, "navigation lookup failed, leaving the window in place");
                None
            }
        };

        let today = self.clock.today();
        let default_mode = self.config.default_mode;
        self.commit(generation, move |state| {
            let mut actions = placement
                .map(|placement| navigation_shift(state, &placement, today, default_mode))
                .unwrap_or_default();
            actions.push(ScopeAction::ResolveNavigateToElementFulfilled(target));
            actions
        })
    }

    async fn locate(&self, target: &FocusTarget) -> Result<Placement, LookupError> {
        match target {
            FocusTarget::Task { id } => {
                let schedule = self.fetch_schedule(id).await?;
                Ok(Placement::Range {
                    from: schedule.start,
                    to: schedule.end,
                })
            }
            FocusTarget::Milestone { id } => {
                let milestone = self.fetch_milestone(id).await?;
                Ok(Placement::Day {
                    date: milestone.date,
                    expand: false,
                })
            }
            FocusTarget::DayCard { task_id, id } => {
                let (_, date) = self.locate_day_card(task_id, id).await?;
                Ok(Placement::Day { date, expand: true })
            }
        }
    }

    // ── Lookups ─────────────────────────────────────────────────────────

    /// Build a day-card focus from a bare day-card id.
    pub async fn day_card_focus(&self, id: &DayCardId) -> Result<FocusTarget, LookupError> {
        let day_card = self.lookup.find_day_card_by_id(id).await?;
        Ok(FocusTarget::day_card(day_card.task_id, day_card.id))
    }

    /// Slot date of a day-card, following the card to its current owner.
    async fn locate_day_card(
        &self,
        task_id: &TaskId,
        id: &DayCardId,
    ) -> Result<(FocusTarget, NaiveDate), LookupError> {
        let mut schedule = self.fetch_schedule(task_id).await?;
        let day_card = self.fetch_day_card(id).await?;
        if day_card.task_id != *task_id {
            debug!(token_task = %task_id, owner = %day_card.task_id, "day-card belongs to another task");
            schedule = self.fetch_schedule(&day_card.task_id).await?;
        }
        let date = schedule
            .slot_date(id)
            .ok_or_else(|| LookupError::not_found(LookupKind::DayCard, id.as_str()))?;
        Ok((FocusTarget::day_card(day_card.task_id, id.clone()), date))
    }

    async fn fetch_schedule(&self, id: &TaskId) -> Result<Schedule, LookupError> {
        let schedule = self.lookup.find_schedule_by_task_id(id).await?;
        let _ = self
            .store
            .dispatch(ScopeAction::Lookup(LookupFulfilled::Schedule(schedule.clone())));
        Ok(schedule)
    }

    async fn fetch_milestone(&self, id: &MilestoneId) -> Result<Milestone, LookupError> {
        let milestone = self.lookup.find_milestone_by_id(id).await?;
        let _ = self
            .store
            .dispatch(ScopeAction::Lookup(LookupFulfilled::Milestone(milestone.clone())));
        Ok(milestone)
    }

    async fn fetch_day_card(&self, id: &DayCardId) -> Result<DayCard, LookupError> {
        let day_card = self.lookup.find_day_card_by_id(id).await?;
        let _ = self
            .store
            .dispatch(ScopeAction::Lookup(LookupFulfilled::DayCard(day_card.clone())));
        Ok(day_card)
    }

    // ── Commit ──────────────────────────────────────────────────────────

    /// Dispatch the transitions built from the latest state, unless stale.
    /// `build` runs under the commit lock, before anything is dispatched.
    fn commit<F>(&self, generation: u64, build: F) -> bool
    where
        F: FnOnce(&CalendarScopeState) -> Vec<ScopeAction>,
    {
        let _guard = self.commit_lock.lock();
        let latest = self.generation();
        if self.config.stale_suppression && latest != generation {
            debug!(generation, latest, "dropping superseded transitions");
            return false;
        }
        let actions = build(&self.store.snapshot());
        self.store.dispatch_all(actions);
        true
    }
}

fn success_transitions(
    state: &CalendarScopeState,
    plan: FocusPlan,
    default_mode: DisplayMode,
) -> Vec<ScopeAction> {
    let mode = state.scope_parameters.mode.unwrap_or(default_mode);
    let mut actions = vec![
        ScopeAction::InitializeScopeParameters,
        ScopeAction::SetStart(plan.start),
        ScopeAction::SetMode(mode),
        ScopeAction::ResolveFocusFulfilled(Some(plan.focus)),
    ];
    if let Some(week) = plan.expand {
        actions.extend(expand_week(state, week));
    }
    actions
}

fn fallback_transitions(current_week: NaiveDate, default_mode: DisplayMode) -> Vec<ScopeAction> {
    vec![
        ScopeAction::InitializeScopeParameters,
        ScopeAction::SetStart(current_week),
        ScopeAction::SetMode(default_mode),
        ScopeAction::ResolveFocusFulfilled(None),
    ]
}

/// Union `date`'s week into the expanded set, if missing.
fn expand_week(state: &CalendarScopeState, date: NaiveDate) -> Option<ScopeAction> {
    if state.is_week_expanded(date) {
        return None;
    }
    let mut weeks: Vec<NaiveDate> = state.expanded_weeks.iter().copied().collect();
    weeks.push(start_of_week(date));
    Some(ScopeAction::SetExpandedWeeks(weeks))
}

fn navigation_shift(
    state: &CalendarScopeState,
    placement: &Placement,
    today: NaiveDate,
    default_mode: DisplayMode,
) -> Vec<ScopeAction> {
    let window = state.window_or(today, default_mode);
    let move_to = |week: NaiveDate| {
        (state.scope_parameters.start != Some(week)).then_some(ScopeAction::SetStart(week))
    };

    match *placement {
        Placement::Range { from, to } => {
            if window.contains_range(from, to) {
                return Vec::new();
            }
            let current_week = start_of_week(today);
            let week = if from <= end_of_week(current_week) && to >= current_week {
                current_week
            } else {
                start_of_week(from)
            };
            move_to(week).into_iter().collect()
        }
        Placement::Day { date, expand } => {
            let mut actions = Vec::new();
            if !window.contains(date) {
                actions.extend(move_to(start_of_week(date)));
            }
            if expand {
                actions.extend(expand_week(state, date));
            }
            actions
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
