//! The calendar scope aggregate.

use std::collections::BTreeSet;

use calscope_core::week::start_of_week;
use calscope_core::{DisplayMode, FocusTarget, ScopeParameters, ScopeWindow};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Progress of the current focus resolution.
///
/// `Empty → InProgress → {Success, Error}` once per attempt; a new
/// resolve request restarts at `InProgress`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FocusResolveStatus {
    /// No resolution requested.
    #[default]
    Empty,
    /// Lookups in flight.
    InProgress,
    /// Resolution finished (possibly with no focus).
    Success,
    /// Resolution failed.
    Error,
}

/// Everything the calendar needs to know about what is visible.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarScopeState {
    /// Window start and display mode.
    pub scope_parameters: ScopeParameters,
    /// Week starts rendered expanded.
    pub expanded_weeks: BTreeSet<NaiveDate>,
    /// Resolved focus.
    pub focus: Option<FocusTarget>,
    /// Progress of the focus resolution.
    pub focus_resolve_status: FocusResolveStatus,
    /// Element the UI may scroll to now that its data has loaded.
    pub navigate_to_element: Option<FocusTarget>,
}

impl CalendarScopeState {
    /// Visible window, if start and mode are both set.
    #[must_use]
    pub fn window(&self) -> Option<ScopeWindow> {
        self.scope_parameters.window()
    }

    /// Visible window with unset fields filled from `today` and `default_mode`.
    #[must_use]
    pub fn window_or(&self, today: NaiveDate, default_mode: DisplayMode) -> ScopeWindow {
        self.scope_parameters.window_or(today, default_mode)
    }

    /// Whether the week containing `date` renders expanded.
    #[must_use]
    pub fn is_week_expanded(&self, date: NaiveDate) -> bool {
        self.expanded_weeks.contains(&start_of_week(date))
    }
}

/// Align every date to its week start and deduplicate.
pub fn normalize_weeks<I>(weeks: I) -> BTreeSet<NaiveDate>
where
    I: IntoIterator<Item = NaiveDate>,
{
    weeks.into_iter().map(start_of_week).collect()
}
