//! # calscope-resolver
//!
//! Scope Resolution Engine.
//!
//! Given a focus request, looks up the focused entity and emits the ordered
//! scope transitions that bring it into view. A second pass
//! (navigate-to-element) runs once the calendar's data for the new window
//! has loaded and shifts the window only if the element is still out of view.
//!
//! - [`lookup::ScopeLookup`]: async seam to the task/milestone/day-card services
//! - [`engine::ScopeResolver`]: resolution and navigation logic
//! - [`signal::DataLoadedSignal`]: "calendar data loaded" events gating navigation
//! - [`runner::IntentRunner`]: routes [`ScopeIntent`]s to the store or the engine

#![deny(unsafe_code)]

pub mod engine;
pub mod intent;
pub mod lookup;
pub mod runner;
pub mod signal;

pub use engine::{Resolution, ResolverConfig, ScopeResolver};
pub use intent::ScopeIntent;
pub use lookup::{InMemoryLookup, LookupFixtures, ScopeLookup};
pub use runner::IntentRunner;
pub use signal::{CalendarDataLoaded, DataLoadedSignal};
