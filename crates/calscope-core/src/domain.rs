//! Domain records returned by the external lookups.
//!
//! Only the fields the scope subsystem needs are modelled; the REST resources
//! carry much more.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::ids::{DayCardId, MilestoneId, TaskId};

/// A task's planned date range plus its day-card slots.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    /// Task the schedule belongs to.
    pub task_id: TaskId,
    /// First planned day.
    pub start: NaiveDate,
    /// Last planned day.
    pub end: NaiveDate,
    /// Day-cards placed on calendar days.
    #[serde(default)]
    pub slots: Vec<ScheduleSlot>,
}

impl Schedule {
    /// Calendar day the given day-card is placed on.
    #[must_use]
    pub fn slot_date(&self, day_card: &DayCardId) -> Option<NaiveDate> {
        self.slots
            .iter()
            .find(|slot| &slot.day_card_id == day_card)
            .map(|slot| slot.date)
    }

    /// Whether the schedule touches `[from, to]`.
    #[must_use]
    pub fn overlaps(&self, from: NaiveDate, to: NaiveDate) -> bool {
        self.start <= to && self.end >= from
    }
}

/// A day-card's position in a schedule.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleSlot {
    /// Calendar day.
    pub date: NaiveDate,
    /// Day-card placed there.
    pub day_card_id: DayCardId,
}

/// A milestone.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    /// Milestone ID.
    pub id: MilestoneId,
    /// Day the milestone falls on.
    pub date: NaiveDate,
}

/// A day-card.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayCard {
    /// Day-card ID.
    pub id: DayCardId,
    /// Owning task.
    pub task_id: TaskId,
}
