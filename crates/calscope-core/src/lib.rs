//! # calscope-core
//!
//! Foundation types for the calendar scope subsystem.
//!
//! This crate provides the shared vocabulary that the store, resolver and
//! synchronizer crates depend on:
//!
//! - **Branded IDs**: `TaskId`, `MilestoneId`, `DayCardId` as newtypes for type safety
//! - **Week alignment**: [`week::start_of_week`], [`week::end_of_week`], ISO date wire format
//! - **Scope**: [`scope::DisplayMode`], [`scope::ScopeParameters`], [`scope::ScopeWindow`]
//! - **Focus**: [`focus::FocusTarget`] and the URL token codec
//! - **Domain records**: schedules, milestones and day-cards returned by lookups
//! - **Errors**: lookup, codec and top-level scope errors via `thiserror`
//! - **Logging**: `tracing` subscriber setup and capture helpers for tests

#![deny(unsafe_code)]

pub mod clock;
pub mod domain;
pub mod errors;
pub mod focus;
pub mod ids;
pub mod logging;
pub mod scope;
pub mod week;

pub use clock::{Clock, FixedClock, SystemClock};
pub use domain::{DayCard, Milestone, Schedule, ScheduleSlot};
pub use errors::{CodecError, LookupError, LookupKind, ScopeError};
pub use focus::{FocusTarget, FocusType, IdentifierPair};
pub use ids::{DayCardId, MilestoneId, TaskId};
pub use scope::{DisplayMode, ScopeParameters, ScopeWindow};
