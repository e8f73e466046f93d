use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// An event joined with its location and derived volunteer/skill aggregates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub date: NaiveDate,
    pub volunteers_needed: i64,
    pub urgency: String,
    pub location_id: i64,
    pub venue_name: String,
    pub address: String,
    pub volunteers_registered: i64,
    pub volunteers_confirmed: i64,
    pub skills: Vec<String>,
}

/// Raw create/update payload as it arrives on the wire. Everything is
/// optional so validation can report every missing field at once;
/// `volunteers_needed` stays a JSON value because clients send both numbers
/// and numeric strings, and `skills` stays one because anything that is not
/// an array means "no change requested" rather than a malformed request.
/// `time` is echoed back verbatim, never persisted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPayload {
    pub name: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub date: Option<String>,
    pub volunteers_needed: Option<serde_json::Value>,
    pub urgency: Option<String>,
    pub skills: Option<serde_json::Value>,
    pub time: Option<String>,
}
