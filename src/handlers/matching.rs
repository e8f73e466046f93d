use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use crate::auth::AuthContext;
use crate::store::MatchStore;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct VolunteerSearchQuery {
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchPayload {
    pub volunteer_id: i64,
    pub event_id: i64,
}

pub async fn search_volunteers(
    State(state): State<AppState>,
    Query(query): Query<VolunteerSearchQuery>,
) -> Result<Response, AppError> {
    let volunteers = state
        .store
        .search_volunteers(query.q.as_deref().unwrap_or(""))
        .await?;
    Ok(success(volunteers, "Volunteers retrieved").into_response())
}

pub async fn volunteer_history(
    State(state): State<AppState>,
    Path(volunteer_id): Path<i64>,
) -> Result<Response, AppError> {
    let entries = state.store.volunteer_history(volunteer_id).await?;
    Ok(success(entries, "Volunteer history retrieved").into_response())
}

pub async fn list_match_events(State(state): State<AppState>) -> Result<Response, AppError> {
    let events = state.store.list_match_events().await?;
    Ok(success(events, "Events retrieved").into_response())
}

pub async fn create_match(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(payload): Json<MatchPayload>,
) -> Result<Response, AppError> {
    auth.require_admin()?;

    let record = state
        .store
        .create_match(payload.volunteer_id, payload.event_id)
        .await?;
    Ok(created(record, "Match created").into_response())
}

pub async fn delete_match(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    auth.require_admin()?;

    state.store.delete_match(id).await?;
    Ok(success((), "Match deleted").into_response())
}
