//! Scope value objects: display mode, scope parameters and the derived window.

use std::fmt;
use std::str::FromStr;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::errors::CodecError;
use crate::week::{end_of_week, start_of_week};

// ─────────────────────────────────────────────────────────────────────────────
// DisplayMode
// ─────────────────────────────────────────────────────────────────────────────

/// Fixed window-length presets of the calendar.
///
/// The serialized form (`"4w"`, `"6w"`, ...) is the `mode` query parameter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DisplayMode {
    /// Four visible weeks.
    #[serde(rename = "4w")]
    FourWeeks,
    /// Six visible weeks.
    #[default]
    #[serde(rename = "6w")]
    SixWeeks,
    /// Eighteen visible weeks.
    #[serde(rename = "18w")]
    EighteenWeeks,
    /// Twenty-six visible weeks.
    #[serde(rename = "26w")]
    TwentySixWeeks,
}

impl DisplayMode {
    /// All presets, shortest window first.
    pub const ALL: [Self; 4] = [
        Self::FourWeeks,
        Self::SixWeeks,
        Self::EighteenWeeks,
        Self::TwentySixWeeks,
    ];

    /// Number of weeks the window spans.
    #[must_use]
    pub fn weeks(self) -> u32 {
        match self {
            Self::FourWeeks => 4,
            Self::SixWeeks => 6,
            Self::EighteenWeeks => 18,
            Self::TwentySixWeeks => 26,
        }
    }

    /// Wire value used in the `mode` query parameter.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FourWeeks => "4w",
            Self::SixWeeks => "6w",
            Self::EighteenWeeks => "18w",
            Self::TwentySixWeeks => "26w",
        }
    }

    /// Lenient parse: `None` for anything that is not an exact wire value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|mode| mode.as_str() == value)
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DisplayMode {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| CodecError::UnknownMode(s.to_owned()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ScopeParameters
// ─────────────────────────────────────────────────────────────────────────────

/// Visible window start and display mode.
///
/// Both fields are `None` in the empty baseline. `start` is always the first
/// day of its week; use [`ScopeParameters::new`] or [`ScopeParameters::with_start`]
/// to keep that invariant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeParameters {
    /// Week-aligned first visible day.
    pub start: Option<NaiveDate>,
    /// Window length preset.
    pub mode: Option<DisplayMode>,
}

impl ScopeParameters {
    /// Fully specified parameters; `start` is aligned to its week.
    #[must_use]
    pub fn new(start: NaiveDate, mode: DisplayMode) -> Self {
        Self {
            start: Some(start_of_week(start)),
            mode: Some(mode),
        }
    }

    /// Copy with a new (week-aligned) start.
    #[must_use]
    pub fn with_start(self, start: NaiveDate) -> Self {
        Self {
            start: Some(start_of_week(start)),
            ..self
        }
    }

    /// Copy with a new mode.
    #[must_use]
    pub fn with_mode(self, mode: DisplayMode) -> Self {
        Self {
            mode: Some(mode),
            ..self
        }
    }

    /// Derived window, if both start and mode are known.
    #[must_use]
    pub fn window(&self) -> Option<ScopeWindow> {
        Some(ScopeWindow::new(self.start?, self.mode?))
    }

    /// Derived window, filling unknown fields from `today`'s week and `default_mode`.
    #[must_use]
    pub fn window_or(&self, today: NaiveDate, default_mode: DisplayMode) -> ScopeWindow {
        ScopeWindow::new(
            self.start.unwrap_or_else(|| start_of_week(today)),
            self.mode.unwrap_or(default_mode),
        )
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ScopeWindow
// ─────────────────────────────────────────────────────────────────────────────

/// Inclusive date range covered by the visible calendar.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeWindow {
    /// First visible day (a Monday).
    pub start: NaiveDate,
    /// Last visible day (a Sunday).
    pub end: NaiveDate,
}

impl ScopeWindow {
    /// Window starting at the week of `start` and spanning `mode.weeks()` weeks.
    #[must_use]
    pub fn new(start: NaiveDate, mode: DisplayMode) -> Self {
        let start = start_of_week(start);
        let last_week = start
            .checked_add_days(Days::new(u64::from(mode.weeks() - 1) * 7))
            .unwrap_or(start);
        Self {
            start,
            end: end_of_week(last_week),
        }
    }

    /// Whether `date` is visible.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Whether `[from, to]` lies completely inside the window.
    #[must_use]
    pub fn contains_range(&self, from: NaiveDate, to: NaiveDate) -> bool {
        self.contains(from) && self.contains(to)
    }

    /// Whether `[from, to]` shares at least one day with the window.
    #[must_use]
    pub fn overlaps(&self, from: NaiveDate, to: NaiveDate) -> bool {
        from <= self.end && to >= self.start
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
