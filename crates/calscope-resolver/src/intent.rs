//! Requests to change the calendar scope.
//!
//! Intents come from the URL (inbound sync) or from the UI. Set-intents map
//! one-to-one onto store transitions; focus intents go through the resolver.

use calscope_core::{DisplayMode, FocusTarget, ScopeParameters};
use calscope_store::ScopeAction;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A requested scope change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum ScopeIntent {
    /// Move the window start.
    SetStart(NaiveDate),
    /// Change the display mode.
    SetMode(DisplayMode),
    /// Replace start and mode together.
    SetScopeParameters(ScopeParameters),
    /// Replace the expanded weeks.
    SetExpandedWeeks(Vec<NaiveDate>),
    /// Replace the focus without resolving it.
    SetFocus(Option<FocusTarget>),
    /// Resolve a focus and navigate to it once its data has loaded.
    ResolveFocus(FocusTarget),
    /// Bring an element into view without changing the focus.
    ResolveNavigateToElement(FocusTarget),
}

impl ScopeIntent {
    /// The store transition for set-intents; `None` for resolver intents.
    #[must_use]
    pub fn into_action(self) -> Option<ScopeAction> {
        match self {
            Self::SetStart(start) => Some(ScopeAction::SetStart(start)),
            Self::SetMode(mode) => Some(ScopeAction::SetMode(mode)),
            Self::SetScopeParameters(params) => Some(ScopeAction::SetScopeParameters(params)),
            Self::SetExpandedWeeks(weeks) => Some(ScopeAction::SetExpandedWeeks(weeks)),
            Self::SetFocus(focus) => Some(ScopeAction::SetFocus(focus)),
            Self::ResolveFocus(_) | Self::ResolveNavigateToElement(_) => None,
        }
    }

    /// Short name for logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::SetStart(_) => "set_start",
            Self::SetMode(_) => "set_mode",
            Self::SetScopeParameters(_) => "set_scope_parameters",
            Self::SetExpandedWeeks(_) => "set_expanded_weeks",
            Self::SetFocus(_) => "set_focus",
            Self::ResolveFocus(_) => "resolve_focus",
            Self::ResolveNavigateToElement(_) => "resolve_navigate_to_element",
        }
    }
}
