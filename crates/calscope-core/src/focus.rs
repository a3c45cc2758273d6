//! Focus target and its compact URL token.
//!
//! Token format: `TYPE_id1[_id2]`, delimiter `_`.
//!
//! | target    | token                      |
//! |-----------|----------------------------|
//! | task      | `TASK_<taskId>`            |
//! | milestone | `MILESTONE_<milestoneId>`  |
//! | day-card  | `DAYCARD_<taskId>_<dayCardId>` |
//!
//! The day-card token carries its owning task ID so the resolver can fetch
//! the schedule without an extra round trip. Identifiers are written
//! verbatim, so an identifier containing `_` does not survive a round trip:
//! decoding splits it and drops the surplus segments. [`decode`] never fails loudly:
//! anything it does not understand becomes `None` ("no focus").

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::CodecError;
use crate::ids::{DayCardId, MilestoneId, TaskId};

/// Separator between the type tag and the identifiers.
pub const FOCUS_DELIMITER: char = '_';

// ─────────────────────────────────────────────────────────────────────────────
// FocusType
// ─────────────────────────────────────────────────────────────────────────────

/// Closed set of focusable entity types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FocusType {
    /// A task.
    Task,
    /// A milestone.
    Milestone,
    /// A day-card.
    #[serde(rename = "DAYCARD")]
    DayCard,
}

impl FocusType {
    /// Type tag used as the first token segment.
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            Self::Task => "TASK",
            Self::Milestone => "MILESTONE",
            Self::DayCard => "DAYCARD",
        }
    }

    /// Exact, case-sensitive match against the known tags.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "TASK" => Some(Self::Task),
            "MILESTONE" => Some(Self::Milestone),
            "DAYCARD" => Some(Self::DayCard),
            _ => None,
        }
    }
}

impl fmt::Display for FocusType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// FocusTarget
// ─────────────────────────────────────────────────────────────────────────────

/// The entity the calendar should highlight and scroll to.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FocusTarget {
    /// A task.
    Task {
        /// Task ID.
        id: TaskId,
    },
    /// A milestone.
    Milestone {
        /// Milestone ID.
        id: MilestoneId,
    },
    /// A day-card, scoped to its owning task.
    DayCard {
        /// Owning task.
        task_id: TaskId,
        /// The day-card itself.
        id: DayCardId,
    },
}

impl FocusTarget {
    /// Task focus.
    pub fn task(id: impl Into<TaskId>) -> Self {
        Self::Task { id: id.into() }
    }

    /// Milestone focus.
    pub fn milestone(id: impl Into<MilestoneId>) -> Self {
        Self::Milestone { id: id.into() }
    }

    /// Day-card focus. The owning task must already be known.
    pub fn day_card(task_id: impl Into<TaskId>, id: impl Into<DayCardId>) -> Self {
        Self::DayCard {
            task_id: task_id.into(),
            id: id.into(),
        }
    }

    /// Entity type of this target.
    #[must_use]
    pub fn focus_type(&self) -> FocusType {
        match self {
            Self::Task { .. } => FocusType::Task,
            Self::Milestone { .. } => FocusType::Milestone,
            Self::DayCard { .. } => FocusType::DayCard,
        }
    }

    /// Stored identifiers in declaration order.
    #[must_use]
    pub fn params(&self) -> Vec<&str> {
        match self {
            Self::Task { id } => vec![id.as_str()],
            Self::Milestone { id } => vec![id.as_str()],
            Self::DayCard { task_id, id } => vec![task_id.as_str(), id.as_str()],
        }
    }

    /// Encode as a URL token. Identifiers must not contain
    /// [`FOCUS_DELIMITER`] to decode back to `self`.
    #[must_use]
    pub fn encode(&self) -> String {
        let mut token = self.focus_type().tag().to_owned();
        for param in self.params() {
            token.push(FOCUS_DELIMITER);
            token.push_str(param);
        }
        token
    }

    /// Project to a single type + id pair. For a day-card the id is the
    /// day-card's own id, not the owning task's.
    #[must_use]
    pub fn to_identifier_pair(&self) -> IdentifierPair {
        let id = match self {
            Self::Task { id } => id.as_str(),
            Self::Milestone { id } => id.as_str(),
            Self::DayCard { id, .. } => id.as_str(),
        };
        IdentifierPair {
            kind: self.focus_type(),
            id: id.to_owned(),
        }
    }
}

impl fmt::Display for FocusTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for FocusTarget {
    type Err = CodecError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let raw = RawFocus::split(token).ok_or(CodecError::EmptyToken)?;
        let kind =
            FocusType::from_tag(&raw.tag).ok_or_else(|| CodecError::UnknownFocusType(raw.tag.clone()))?;
        let missing = || CodecError::MissingIdentifier {
            token: token.to_owned(),
        };
        match kind {
            FocusType::Task => Ok(Self::task(raw.param(0).ok_or_else(missing)?)),
            FocusType::Milestone => Ok(Self::milestone(raw.param(0).ok_or_else(missing)?)),
            FocusType::DayCard => Ok(Self::day_card(
                raw.param(0).ok_or_else(missing)?,
                raw.param(1).ok_or_else(missing)?,
            )),
        }
    }
}

/// Encode a focus target as a URL token.
#[must_use]
pub fn encode(focus: &FocusTarget) -> String {
    focus.encode()
}

/// Decode a URL token. `None` for empty, unknown or incomplete tokens.
#[must_use]
pub fn decode(token: Option<&str>) -> Option<FocusTarget> {
    token?.parse().ok()
}

// ─────────────────────────────────────────────────────────────────────────────
// Raw tokens and identifier pairs
// ─────────────────────────────────────────────────────────────────────────────

/// A token split into its tag and parameters, before type checking.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawFocus {
    /// First segment, unvalidated.
    pub tag: String,
    /// Remaining segments.
    pub params: Vec<String>,
}

impl RawFocus {
    /// Split on the delimiter. `None` for an empty token.
    #[must_use]
    pub fn split(token: &str) -> Option<Self> {
        if token.is_empty() {
            return None;
        }
        let mut segments = token.split(FOCUS_DELIMITER).map(str::to_owned);
        let tag = segments.next()?;
        Some(Self {
            tag,
            params: segments.collect(),
        })
    }

    fn param(&self, index: usize) -> Option<&str> {
        self.params
            .get(index)
            .map(String::as_str)
            .filter(|p| !p.is_empty())
    }

    /// Identifier pair for generic object APIs; `None` for unknown tags.
    #[must_use]
    pub fn to_identifier_pair(&self) -> Option<IdentifierPair> {
        let kind = FocusType::from_tag(&self.tag)?;
        let index = match kind {
            FocusType::Task | FocusType::Milestone => 0,
            FocusType::DayCard => 1,
        };
        Some(IdentifierPair {
            kind,
            id: self.param(index)?.to_owned(),
        })
    }
}

/// Generic `{type, id}` object identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdentifierPair {
    /// Entity type.
    #[serde(rename = "type")]
    pub kind: FocusType,
    /// Entity id.
    pub id: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use proptest::prelude::*;

    #[test]
    fn encode_task() {
        assert_eq!(FocusTarget::task("abc").encode(), "TASK_abc");
    }

    #[test]
    fn encode_day_card_orders_task_first() {
        assert_eq!(FocusTarget::day_card("t1", "d1").encode(), "DAYCARD_t1_d1");
    }

    #[test]
    fn decode_known_types() {
        assert_eq!(decode(Some("TASK_abc")), Some(FocusTarget::task("abc")));
        assert_eq!(
            decode(Some("MILESTONE_m-9")),
            Some(FocusTarget::milestone("m-9"))
        );
        assert_eq!(
            decode(Some("DAYCARD_t1_d1")),
            Some(FocusTarget::day_card("t1", "d1"))
        );
    }

    #[test]
    fn decode_unknown_type_is_none() {
        assert_eq!(decode(Some("UNKNOWN-TYPE_123")), None);
        assert_eq!(decode(Some("task_abc")), None);
    }

    #[test]
    fn decode_empty_is_none() {
        assert_eq!(decode(None), None);
        assert_eq!(decode(Some("")), None);
    }

    #[test]
    fn decode_incomplete_is_none() {
        assert_eq!(decode(Some("TASK")), None);
        assert_eq!(decode(Some("TASK_")), None);
        assert_eq!(decode(Some("DAYCARD_t1")), None);
    }

    #[test]
    fn strict_parse_reports_reason() {
        assert_matches!("".parse::<FocusTarget>(), Err(CodecError::EmptyToken));
        assert_matches!(
            "FOO_1".parse::<FocusTarget>(),
            Err(CodecError::UnknownFocusType(tag)) if tag == "FOO"
        );
        assert_matches!(
            "DAYCARD_t".parse::<FocusTarget>(),
            Err(CodecError::MissingIdentifier { .. })
        );
    }

    #[test]
    fn identifier_pair_for_day_card_uses_day_card_id() {
        let pair = FocusTarget::day_card("task-1", "card-2").to_identifier_pair();
        assert_eq!(pair.kind, FocusType::DayCard);
        assert_eq!(pair.id, "card-2");
    }

    #[test]
    fn raw_identifier_pair_unknown_type_is_none() {
        let raw = RawFocus::split("UNKNOWN-TYPE_123").unwrap();
        assert_eq!(raw.to_identifier_pair(), None);
        let raw = RawFocus::split("DAYCARD_t_d").unwrap();
        assert_eq!(
            raw.to_identifier_pair(),
            Some(IdentifierPair {
                kind: FocusType::DayCard,
                id: "d".into()
            })
        );
    }

    #[test]
    fn identifier_pair_serializes_type_field() {
        let pair = FocusTarget::task("x").to_identifier_pair();
        let json = serde_json::to_value(&pair).unwrap();
        assert_eq!(json["type"], "TASK");
        assert_eq!(json["id"], "x");
    }

    fn id_strategy() -> impl Strategy<Value = String> {
        "[A-Za-z0-9-]{1,36}"
    }

    fn target_strategy() -> impl Strategy<Value = FocusTarget> {
        prop_oneof![
            id_strategy().prop_map(FocusTarget::task),
            id_strategy().prop_map(FocusTarget::milestone),
            (id_strategy(), id_strategy()).prop_map(|(t, d)| FocusTarget::day_card(t, d)),
        ]
    }

    proptest! {
        #[test]
        fn token_round_trip(target in target_strategy()) {
            let token = encode(&target);
            let decoded = decode(Some(&token));
            prop_assert_eq!(decoded.as_ref(), Some(&target));
            let pair = decoded.map(|t| t.to_identifier_pair());
            let expected_id = match &target {
                FocusTarget::Task { id } => id.to_string(),
                FocusTarget::Milestone { id } => id.to_string(),
                FocusTarget::DayCard { id, .. } => id.to_string(),
            };
            prop_assert_eq!(pair.map(|p| p.id), Some(expected_id));
        }

        #[test]
        fn delimiter_in_id_truncates(head in id_strategy(), tail in id_strategy()) {
            let task = FocusTarget::task(format!("{head}_{tail}"));
            prop_assert_eq!(decode(Some(&task.encode())), Some(FocusTarget::task(head.clone())));

            let card = FocusTarget::day_card(format!("{head}_{tail}"), "dc");
            prop_assert_eq!(decode(Some(&card.encode())), Some(FocusTarget::day_card(head, tail)));
        }
    }
}
