//! Error hierarchy for the calendar scope subsystem.
//!
//! - [`LookupError`]: Failures of the external task/milestone/day-card lookups
//! - [`CodecError`]: Strict parsing failures for URL wire values
//! - [`ScopeError`]: Top-level enum covering all error domains
//!
//! Most of the subsystem fails soft: the resolver converts [`LookupError`]s
//! into fallback scope sequences and the lenient decoders return `None`.
//! These types exist so the failure is still logged with a stable code.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ─────────────────────────────────────────────────────────────────────────────
// LookupError
// ─────────────────────────────────────────────────────────────────────────────

/// Which external resource a lookup targeted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupKind {
    /// Task schedule by task ID.
    Schedule,
    /// Milestone by milestone ID.
    Milestone,
    /// Day-card by day-card ID.
    DayCard,
}

impl fmt::Display for LookupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Schedule => write!(f, "schedule"),
            Self::Milestone => write!(f, "milestone"),
            Self::DayCard => write!(f, "day_card"),
        }
    }
}

/// Failure of an external domain lookup.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LookupError {
    /// The resource does not exist (or the task has no schedule).
    #[error("{kind} {id} not found")]
    NotFound {
        /// Resource kind.
        kind: LookupKind,
        /// Requested identifier.
        id: String,
    },

    /// The lookup could not be completed (network, server error, ...).
    #[error("{kind} lookup unavailable: {message}")]
    Unavailable {
        /// Resource kind.
        kind: LookupKind,
        /// Transport-level description.
        message: String,
    },
}

impl LookupError {
    /// Shorthand for a [`LookupError::NotFound`].
    #[must_use]
    pub fn not_found(kind: LookupKind, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Shorthand for a [`LookupError::Unavailable`].
    #[must_use]
    pub fn unavailable(kind: LookupKind, message: impl Into<String>) -> Self {
        Self::Unavailable {
            kind,
            message: message.into(),
        }
    }

    /// Whether the resource is known to be absent.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// The resource kind the failed lookup targeted.
    #[must_use]
    pub fn kind(&self) -> LookupKind {
        match self {
            Self::NotFound { kind, .. } | Self::Unavailable { kind, .. } => *kind,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// CodecError
// ─────────────────────────────────────────────────────────────────────────────

/// Strict parse failure of a URL wire value.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CodecError {
    /// The token was empty.
    #[error("empty focus token")]
    EmptyToken,

    /// The leading segment is not a known focus type tag.
    #[error("unknown focus type: {0}")]
    UnknownFocusType(String),

    /// The token does not carry the identifiers its type requires.
    #[error("focus token {token} is missing identifiers")]
    MissingIdentifier {
        /// The offending token.
        token: String,
    },

    /// The display mode string is not one of the fixed presets.
    #[error("unknown display mode: {0}")]
    UnknownMode(String),

    /// A date was not in `YYYY-MM-DD` form.
    #[error("invalid date: {0}")]
    InvalidDate(String),
}

// ─────────────────────────────────────────────────────────────────────────────
// ScopeError
// ─────────────────────────────────────────────────────────────────────────────

/// Top-level error type for the calendar scope subsystem.
#[derive(Debug, Error)]
pub enum ScopeError {
    /// External lookup failed.
    #[error("{0}")]
    Lookup(#[from] LookupError),

    /// URL value could not be parsed.
    #[error("{0}")]
    Codec(#[from] CodecError),

    /// Router refused or failed a query-parameter update.
    #[error("navigation failed: {0}")]
    Navigation(String),

    /// A background task stopped unexpectedly.
    #[error("task {name} stopped: {message}")]
    Task {
        /// Task name.
        name: String,
        /// Failure description.
        message: String,
    },
}

impl ScopeError {
    /// Machine-readable error code for structured logs.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Lookup(LookupError::NotFound { .. }) => "LOOKUP_NOT_FOUND",
            Self::Lookup(LookupError::Unavailable { .. }) => "LOOKUP_UNAVAILABLE",
            Self::Codec(_) => "CODEC",
            Self::Navigation(_) => "NAVIGATION",
            Self::Task { .. } => "TASK",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display() {
        let err = LookupError::not_found(LookupKind::Schedule, "t-1");
        assert_eq!(err.to_string(), "schedule t-1 not found");
        assert!(err.is_not_found());
        assert_eq!(err.kind(), LookupKind::Schedule);
    }

    #[test]
    fn unavailable_display() {
        let err = LookupError::unavailable(LookupKind::DayCard, "503");
        assert_eq!(err.to_string(), "day_card lookup unavailable: 503");
        assert!(!err.is_not_found());
    }

    #[test]
    fn scope_error_from_lookup() {
        let err: ScopeError = LookupError::not_found(LookupKind::Milestone, "m").into();
        assert_eq!(err.code(), "LOOKUP_NOT_FOUND");
        assert_eq!(err.to_string(), "milestone m not found");
    }

    #[test]
    fn scope_error_from_codec() {
        let err: ScopeError = CodecError::UnknownFocusType("X".into()).into();
        assert_eq!(err.code(), "CODEC");
        assert!(err.to_string().contains("unknown focus type"));
    }

    #[test]
    fn lookup_kind_serde() {
        let json = serde_json::to_string(&LookupKind::DayCard).unwrap();
        assert_eq!(json, "\"day_card\"");
    }
}
