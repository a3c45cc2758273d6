//! Pure transition function of the calendar scope.

use calscope_core::week::start_of_week;
use calscope_core::ScopeParameters;

use crate::action::ScopeAction;
use crate::state::{CalendarScopeState, FocusResolveStatus, normalize_weeks};

/// Apply `action` to `state`. Returns whether anything changed.
///
/// Each setter touches exactly one field; nothing here performs I/O.
pub fn reduce(state: &mut CalendarScopeState, action: &ScopeAction) -> bool {
    let before = state.clone();
    match action {
        ScopeAction::InitializeAll => *state = CalendarScopeState::default(),
        ScopeAction::InitializeFocus => {
            state.focus = None;
            state.navigate_to_element = None;
            state.focus_resolve_status = FocusResolveStatus::Empty;
        }
        ScopeAction::InitializeScopeParameters => {
            state.scope_parameters = ScopeParameters::default();
        }
        ScopeAction::ResolveFocus(_) => {
            state.focus_resolve_status = FocusResolveStatus::InProgress;
        }
        ScopeAction::ResolveFocusFulfilled(target) => {
            state.focus.clone_from(target);
            state.focus_resolve_status = FocusResolveStatus::Success;
        }
        ScopeAction::ResolveFocusRejected => {
            state.focus_resolve_status = FocusResolveStatus::Error;
        }
        ScopeAction::ResolveNavigateToElementFulfilled(target) => {
            state.navigate_to_element = Some(target.clone());
        }
        ScopeAction::SetExpandedWeeks(weeks) => {
            state.expanded_weeks = normalize_weeks(weeks.iter().copied());
        }
        ScopeAction::SetFocus(target) => state.focus.clone_from(target),
        ScopeAction::SetMode(mode) => state.scope_parameters.mode = Some(*mode),
        ScopeAction::SetStart(start) => {
            state.scope_parameters.start = Some(start_of_week(*start));
        }
        ScopeAction::SetScopeParameters(params) => {
            state.scope_parameters = ScopeParameters {
                start: params.start.map(start_of_week),
                mode: params.mode,
            };
        }
        ScopeAction::ResolveNavigateToElement(_) | ScopeAction::Lookup(_) => {}
    }
    *state != before
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
