use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Volunteer {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub phone: Option<String>,
    pub full_name: String,
}

/// A volunteer-to-event match (one `volunteering_history` row).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MatchRecord {
    pub id: i64,
    pub event_id: i64,
    pub volunteer_id: i64,
    pub checked_in: bool,
}

/// A history row joined with the event it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: i64,
    pub event_id: i64,
    pub event_name: String,
    pub date: NaiveDate,
    pub checked_in: bool,
}
