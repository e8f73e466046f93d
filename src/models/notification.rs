use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: i64,
    pub volunteer_id: i64,
    pub event_id: Option<i64>,
    pub message: String,
    pub is_read: bool,
    pub created_at: NaiveDateTime,
}
