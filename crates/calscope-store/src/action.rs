//! Named transitions of the calendar scope.
//!
//! All actions flow through one log. The reducer ignores the mirrored
//! lookup results ([`ScopeAction::Lookup`]); they are recorded so consumers
//! see the full order of events around a focus resolution.

use calscope_core::{DayCard, DisplayMode, FocusTarget, Milestone, Schedule, ScopeParameters};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A calendar scope transition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum ScopeAction {
    /// Reset the whole aggregate (calendar teardown).
    InitializeAll,
    /// Clear focus and navigation, reset resolve status.
    InitializeFocus,
    /// Reset scope parameters to the empty baseline.
    InitializeScopeParameters,
    /// A focus resolution started.
    ResolveFocus(FocusTarget),
    /// A focus resolution finished; `None` means "no focus".
    ResolveFocusFulfilled(Option<FocusTarget>),
    /// A focus resolution failed outright.
    ResolveFocusRejected,
    /// Navigation to an element was requested.
    ResolveNavigateToElement(FocusTarget),
    /// The element's data is loaded; the UI may scroll to it.
    ResolveNavigateToElementFulfilled(FocusTarget),
    /// Replace the expanded weeks.
    SetExpandedWeeks(Vec<NaiveDate>),
    /// Replace the focus directly.
    SetFocus(Option<FocusTarget>),
    /// Replace the display mode.
    SetMode(DisplayMode),
    /// Replace the window start (aligned to its week).
    SetStart(NaiveDate),
    /// Replace start and mode together.
    SetScopeParameters(ScopeParameters),
    /// Result of an external lookup, mirrored into the log.
    Lookup(LookupFulfilled),
}

impl ScopeAction {
    /// Short name for logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::InitializeAll => "initialize_all",
            Self::InitializeFocus => "initialize_focus",
            Self::InitializeScopeParameters => "initialize_scope_parameters",
            Self::ResolveFocus(_) => "resolve_focus",
            Self::ResolveFocusFulfilled(_) => "resolve_focus_fulfilled",
            Self::ResolveFocusRejected => "resolve_focus_rejected",
            Self::ResolveNavigateToElement(_) => "resolve_navigate_to_element",
            Self::ResolveNavigateToElementFulfilled(_) => "resolve_navigate_to_element_fulfilled",
            Self::SetExpandedWeeks(_) => "set_expanded_weeks",
            Self::SetFocus(_) => "set_focus",
            Self::SetMode(_) => "set_mode",
            Self::SetStart(_) => "set_start",
            Self::SetScopeParameters(_) => "set_scope_parameters",
            Self::Lookup(LookupFulfilled::Schedule(_)) => "schedule_fulfilled",
            Self::Lookup(LookupFulfilled::Milestone(_)) => "milestone_fulfilled",
            Self::Lookup(LookupFulfilled::DayCard(_)) => "day_card_fulfilled",
        }
    }
}

/// A successful external lookup.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum LookupFulfilled {
    /// Task schedule.
    Schedule(Schedule),
    /// Milestone.
    Milestone(Milestone),
    /// Day-card.
    DayCard(DayCard),
}
