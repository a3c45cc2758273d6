//! # calscope-store
//!
//! Single source of truth for the calendar scope.
//!
//! - [`CalendarScopeState`]: scope parameters, expanded weeks, focus, resolve status
//! - [`ScopeAction`]: every named transition (plus mirrored lookup results)
//! - [`reduce`]: the pure transition function
//! - [`ScopeStore`]: owned container that serializes dispatches, publishes
//!   committed snapshots and keeps an action log subscribers can follow

#![deny(unsafe_code)]

pub mod action;
pub mod reducer;
pub mod state;
pub mod store;

pub use action::{LookupFulfilled, ScopeAction};
pub use reducer::reduce;
pub use state::{CalendarScopeState, FocusResolveStatus, normalize_weeks};
pub use store::{FacetWatcher, ScopeStore};
