//! Lookup seam to the external domain services.
//!
//! The resolver only needs three reads. Production wiring implements
//! [`ScopeLookup`] over the HTTP resource clients; [`InMemoryLookup`] serves
//! fixture data for tests and the CLI.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use calscope_core::{
    DayCard, DayCardId, LookupError, LookupKind, Milestone, MilestoneId, Schedule, TaskId,
};
use serde::{Deserialize, Serialize};

/// Async reads the resolver depends on.
///
/// Implementations should map "no such entity" (including a task without a
/// schedule) to [`LookupError::NotFound`] and transport failures to
/// [`LookupError::Unavailable`]. The resolver treats both the same way.
#[async_trait]
pub trait ScopeLookup: Send + Sync {
    /// Schedule (date range and day-card slots) of a task.
    async fn find_schedule_by_task_id(&self, id: &TaskId) -> Result<Schedule, LookupError>;

    /// Milestone by id.
    async fn find_milestone_by_id(&self, id: &MilestoneId) -> Result<Milestone, LookupError>;

    /// Day-card by id.
    async fn find_day_card_by_id(&self, id: &DayCardId) -> Result<DayCard, LookupError>;
}

/// Serializable fixture data for [`InMemoryLookup`].
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LookupFixtures {
    /// Task schedules.
    pub schedules: Vec<Schedule>,
    /// Milestones.
    pub milestones: Vec<Milestone>,
    /// Day-cards.
    pub day_cards: Vec<DayCard>,
}

impl LookupFixtures {
    /// Read fixtures from a JSON file.
    pub fn from_path(path: &Path) -> Result<Self, LookupError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            LookupError::unavailable(LookupKind::Schedule, format!("{}: {e}", path.display()))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            LookupError::unavailable(LookupKind::Schedule, format!("{}: {e}", path.display()))
        })
    }
}

/// Lookup backed by in-memory maps.
#[derive(Clone, Debug, Default)]
pub struct InMemoryLookup {
    schedules: HashMap<TaskId, Schedule>,
    milestones: HashMap<MilestoneId, Milestone>,
    day_cards: HashMap<DayCardId, DayCard>,
}

impl InMemoryLookup {
    /// Empty lookup: every read is `NotFound`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a schedule.
    #[must_use]
    pub fn with_schedule(mut self, schedule: Schedule) -> Self {
        let _ = self.schedules.insert(schedule.task_id.clone(), schedule);
        self
    }

    /// Add a milestone.
    #[must_use]
    pub fn with_milestone(mut self, milestone: Milestone) -> Self {
        let _ = self.milestones.insert(milestone.id.clone(), milestone);
        self
    }

    /// Add a day-card.
    #[must_use]
    pub fn with_day_card(mut self, day_card: DayCard) -> Self {
        let _ = self.day_cards.insert(day_card.id.clone(), day_card);
        self
    }
}

impl From<LookupFixtures> for InMemoryLookup {
    fn from(fixtures: LookupFixtures) -> Self {
        let lookup = fixtures
            .schedules
            .into_iter()
            .fold(Self::new(), Self::with_schedule);
        let lookup = fixtures
            .milestones
            .into_iter()
            .fold(lookup, Self::with_milestone);
        fixtures
            .day_cards
            .into_iter()
            .fold(lookup, Self::with_day_card)
    }
}

#[async_trait]
impl ScopeLookup for InMemoryLookup {
    async fn find_schedule_by_task_id(&self, id: &TaskId) -> Result<Schedule, LookupError> {
        self.schedules
            .get(id)
            .cloned()
            .ok_or_else(|| LookupError::not_found(LookupKind::Schedule, id.as_str()))
    }

    async fn find_milestone_by_id(&self, id: &MilestoneId) -> Result<Milestone, LookupError> {
        self.milestones
            .get(id)
            .cloned()
            .ok_or_else(|| LookupError::not_found(LookupKind::Milestone, id.as_str()))
    }

    async fn find_day_card_by_id(&self, id: &DayCardId) -> Result<DayCard, LookupError> {
        self.day_cards
            .get(id)
            .cloned()
            .ok_or_else(|| LookupError::not_found(LookupKind::DayCard, id.as_str()))
    }
}
