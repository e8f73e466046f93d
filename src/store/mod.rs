use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

use crate::models::{Event, HistoryEntry, Location, MatchRecord, Notification, Skill, Volunteer};

pub mod memory;
pub mod mysql;

pub use memory::MemoryStore;
pub use mysql::MySqlStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("event not found")]
    EventNotFound,

    #[error("volunteer not found")]
    VolunteerNotFound,

    #[error("match not found")]
    MatchNotFound,

    #[error("notification not found")]
    NotificationNotFound,

    #[error("no matching location")]
    LocationNotResolved,

    #[error("volunteer already matched to this event")]
    DuplicateMatch,

    #[error("event has reached its volunteer capacity")]
    EventFull,

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

/// A fully validated event write. Produced by payload validation before any
/// storage work happens; `location` is still the free-text form input and is
/// resolved against the location catalog by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct EventInput {
    pub name: String,
    pub description: String,
    pub date: NaiveDate,
    pub volunteers_needed: i64,
    pub urgency: String,
    pub location: String,
    /// `None` retains existing skills on update; `Some(vec![])` clears them.
    pub skills: Option<Vec<String>>,
}

/// Outcome of attaching skill names to an event. Names missing from the
/// skill catalog are dropped rather than failing the write; `skipped` makes
/// that drop visible to callers instead of hiding it.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct SkillAssociation {
    pub applied: Vec<String>,
    pub skipped: Vec<String>,
}

/// Result of a transactional event write: the committed projection plus the
/// skill association outcome.
#[derive(Debug, Clone)]
pub struct EventWrite {
    pub event: Event,
    pub skills: SkillAssociation,
}

#[async_trait]
pub trait EventStore: Send + Sync {
    async fn list_events(&self, future_only: bool) -> Result<Vec<Event>, StoreError>;
    async fn get_event(&self, id: i64) -> Result<Option<Event>, StoreError>;
    async fn create_event(&self, input: EventInput) -> Result<EventWrite, StoreError>;
    async fn update_event(&self, id: i64, input: EventInput) -> Result<EventWrite, StoreError>;
    async fn delete_event(&self, id: i64) -> Result<Event, StoreError>;
    async fn search_by_skills(&self, names: &[String]) -> Result<Vec<Event>, StoreError>;
    async fn list_locations(&self) -> Result<Vec<Location>, StoreError>;
    async fn list_skills(&self) -> Result<Vec<Skill>, StoreError>;
}

#[async_trait]
pub trait MatchStore: Send + Sync {
    async fn search_volunteers(&self, query: &str) -> Result<Vec<Volunteer>, StoreError>;
    async fn volunteer_history(&self, volunteer_id: i64) -> Result<Vec<HistoryEntry>, StoreError>;
    async fn list_match_events(&self) -> Result<Vec<Event>, StoreError>;
    async fn create_match(&self, volunteer_id: i64, event_id: i64)
        -> Result<MatchRecord, StoreError>;
    async fn delete_match(&self, id: i64) -> Result<(), StoreError>;
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn notify_volunteer(
        &self,
        volunteer_id: i64,
        event_id: Option<i64>,
        message: &str,
    ) -> Result<Notification, StoreError>;
    async fn broadcast(&self, event_id: Option<i64>, message: &str) -> Result<u64, StoreError>;
    async fn volunteer_notifications(
        &self,
        volunteer_id: i64,
    ) -> Result<Vec<Notification>, StoreError>;
    async fn mark_read(&self, id: i64) -> Result<Notification, StoreError>;
}

pub trait Store: EventStore + MatchStore + NotificationStore {}

impl<T: EventStore + MatchStore + NotificationStore> Store for T {}

/// Extracts the venue to match against the location catalog: the substring
/// before the first comma, trimmed (the whole string when there is no comma).
pub(crate) fn venue_from(location_text: &str) -> &str {
    location_text
        .split(',')
        .next()
        .unwrap_or("")
        .trim()
}
