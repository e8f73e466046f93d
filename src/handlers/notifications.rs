use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::auth::AuthContext;
use crate::store::NotificationStore;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifyPayload {
    pub volunteer_id: i64,
    pub event_id: Option<i64>,
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastPayload {
    pub event_id: Option<i64>,
    pub message: String,
}

#[derive(Serialize)]
struct BroadcastResult {
    recipients: u64,
}

pub async fn send_notification(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(payload): Json<NotifyPayload>,
) -> Result<Response, AppError> {
    auth.require_admin()?;

    let notification = state
        .store
        .notify_volunteer(payload.volunteer_id, payload.event_id, &payload.message)
        .await?;
    Ok(created(notification, "Notification sent").into_response())
}

pub async fn broadcast_notification(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(payload): Json<BroadcastPayload>,
) -> Result<Response, AppError> {
    auth.require_admin()?;

    let recipients = state
        .store
        .broadcast(payload.event_id, &payload.message)
        .await?;
    Ok(created(BroadcastResult { recipients }, "Notification broadcast").into_response())
}

pub async fn volunteer_notifications(
    State(state): State<AppState>,
    Path(volunteer_id): Path<i64>,
) -> Result<Response, AppError> {
    let notifications = state.store.volunteer_notifications(volunteer_id).await?;
    Ok(success(notifications, "Notifications retrieved").into_response())
}

pub async fn mark_notification_read(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    let notification = state.store.mark_read(id).await?;
    Ok(success(notification, "Notification marked as read").into_response())
}
