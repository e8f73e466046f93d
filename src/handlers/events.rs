use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::auth::AuthContext;
use crate::models::{Event, EventPayload};
use crate::store::{EventInput, EventStore};
use crate::utils::error::AppError;
use crate::utils::response::{created, success};
use crate::AppState;

const MAX_NAME_LEN: usize = 100;
const MAX_DESCRIPTION_LEN: usize = 200;
const DEFAULT_URGENCY: &str = "Medium";

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub future: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct SkillSearchQuery {
    pub skills: Option<String>,
}

/// An event plus the client-sent `time` field echoed back verbatim. `time`
/// is not persisted; clients that send it expect it mirrored in the response.
#[derive(Serialize)]
struct EventWithTime {
    #[serde(flatten)]
    event: Event,
    #[serde(skip_serializing_if = "Option::is_none")]
    time: Option<String>,
}

/// Checks every field and collects every violation so the client can show
/// them all at once.
pub fn validate_event_payload(payload: &EventPayload) -> Result<EventInput, Vec<String>> {
    let mut errors = Vec::new();

    let name = payload.name.as_deref().map(str::trim).unwrap_or("");
    if name.is_empty() {
        errors.push("Event name is required".to_string());
    } else if name.chars().count() > MAX_NAME_LEN {
        errors.push(format!(
            "Event name must be {MAX_NAME_LEN} characters or fewer"
        ));
    }

    let description = payload.description.as_deref().map(str::trim).unwrap_or("");
    if description.is_empty() {
        errors.push("Description is required".to_string());
    } else if description.chars().count() > MAX_DESCRIPTION_LEN {
        errors.push(format!(
            "Description must be {MAX_DESCRIPTION_LEN} characters or fewer"
        ));
    }

    let location = payload.location.as_deref().map(str::trim).unwrap_or("");
    if location.is_empty() {
        errors.push("Location is required".to_string());
    }

    let date = match payload.date.as_deref().map(str::trim) {
        None | Some("") => {
            errors.push("Event date is required".to_string());
            None
        }
        Some(raw) => match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            Ok(date) => Some(date),
            Err(_) => {
                errors.push("Event date must be a valid calendar date".to_string());
                None
            }
        },
    };

    let volunteers_needed = match &payload.volunteers_needed {
        None => {
            errors.push("Number of volunteers needed is required".to_string());
            None
        }
        Some(value) => match parse_count(value) {
            Some(count) => Some(count),
            None => {
                errors.push("Number of volunteers needed must be a number".to_string());
                None
            }
        },
    };

    if !errors.is_empty() {
        return Err(errors);
    }

    let urgency = payload
        .urgency
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .unwrap_or(DEFAULT_URGENCY)
        .to_string();

    Ok(EventInput {
        name: name.to_string(),
        description: description.to_string(),
        date: date.unwrap_or_default(),
        volunteers_needed: volunteers_needed.unwrap_or_default(),
        urgency,
        location: location.to_string(),
        skills: normalize_skills(&payload.skills),
    })
}

/// A skill list is only honored when it arrives as a JSON array of strings;
/// any other shape (string, object, number, absent) means "no change
/// requested" on update and "no skills" on create. Non-string array entries
/// are dropped like unknown skill names are.
fn normalize_skills(value: &Option<serde_json::Value>) -> Option<Vec<String>> {
    match value {
        Some(serde_json::Value::Array(items)) => Some(
            items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect(),
        ),
        _ => None,
    }
}

/// Clients send the volunteer count as either a JSON number or a numeric
/// string; both are accepted.
fn parse_count(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn parse_event_id(raw: &str) -> Result<i64, AppError> {
    raw.parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| AppError::ValidationError("Event id must be a positive integer".to_string()))
}

pub async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Response, AppError> {
    let events = state.store.list_events(query.future.unwrap_or(false)).await?;
    Ok(success(events, "Events retrieved").into_response())
}

pub async fn get_event(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Response, AppError> {
    let id = parse_event_id(&raw_id)?;
    let event = state
        .store
        .get_event(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;
    Ok(success(event, "Event retrieved").into_response())
}

pub async fn create_event(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(payload): Json<EventPayload>,
) -> Result<Response, AppError> {
    auth.require_admin()?;

    let input = validate_event_payload(&payload).map_err(AppError::Validation)?;
    let write = state.store.create_event(input).await?;

    if !write.skills.skipped.is_empty() {
        warn!(skipped = ?write.skills.skipped, event_id = write.event.id,
            "Dropped skill names not present in the catalog");
    }

    let body = EventWithTime {
        event: write.event,
        time: payload.time,
    };
    Ok(created(body, "Event created").into_response())
}

pub async fn update_event(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(raw_id): Path<String>,
    Json(payload): Json<EventPayload>,
) -> Result<Response, AppError> {
    auth.require_admin()?;

    let id = parse_event_id(&raw_id)?;
    let input = validate_event_payload(&payload).map_err(AppError::Validation)?;
    let write = state.store.update_event(id, input).await?;

    if !write.skills.skipped.is_empty() {
        warn!(skipped = ?write.skills.skipped, event_id = write.event.id,
            "Dropped skill names not present in the catalog");
    }

    let body = EventWithTime {
        event: write.event,
        time: payload.time,
    };
    Ok(success(body, "Event updated").into_response())
}

pub async fn delete_event(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(raw_id): Path<String>,
) -> Result<Response, AppError> {
    auth.require_admin()?;

    let id = parse_event_id(&raw_id)?;
    let deleted = state.store.delete_event(id).await?;
    Ok(success(deleted, "Event deleted").into_response())
}

pub async fn search_by_skills(
    State(state): State<AppState>,
    Query(query): Query<SkillSearchQuery>,
) -> Result<Response, AppError> {
    let names: Vec<String> = query
        .skills
        .as_deref()
        .unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect();
    if names.is_empty() {
        return Err(AppError::ValidationError(
            "skills query parameter is required".to_string(),
        ));
    }

    let events = state.store.search_by_skills(&names).await?;
    Ok(success(events, "Events retrieved").into_response())
}

pub async fn list_locations(State(state): State<AppState>) -> Result<Response, AppError> {
    let locations = state.store.list_locations().await?;
    Ok(success(locations, "Locations retrieved").into_response())
}

pub async fn list_skills(State(state): State<AppState>) -> Result<Response, AppError> {
    let skills = state.store.list_skills().await?;
    Ok(success(skills, "Skills retrieved").into_response())
}
