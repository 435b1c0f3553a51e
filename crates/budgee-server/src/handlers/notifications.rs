//! Notification feed handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{get_user_email, AppError, AppState, SuccessResponse, MAX_PAGE_LIMIT};
use budgee_core::models::{Notification, NotificationKind};
use budgee_core::LedgerEvent;

#[derive(Debug, Deserialize)]
pub struct NotificationQuery {
    #[serde(default = "default_notification_limit")]
    pub limit: i64,
}

fn default_notification_limit() -> i64 {
    50
}

/// GET /api/notifications - Newest first
pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    Query(params): Query<NotificationQuery>,
) -> Result<Json<Vec<Notification>>, AppError> {
    let limit = params.limit.clamp(1, MAX_PAGE_LIMIT);
    Ok(Json(state.db.list_notifications(limit)?))
}

#[derive(Debug, Deserialize)]
pub struct CreateNotificationRequest {
    pub message: String,
    #[serde(default, rename = "type")]
    pub kind: NotificationKind,
}

/// POST /api/notifications - Post a notification
pub async fn create_notification(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateNotificationRequest>,
) -> Result<Json<Notification>, AppError> {
    let notification = state.db.add_notification(&req.message, req.kind)?;
    state.events.publish(LedgerEvent::NotificationAdded {
        id: notification.id,
    });
    Ok(Json(notification))
}

/// DELETE /api/notifications/:id - Dismiss one notification
pub async fn remove_notification(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, AppError> {
    if !state.db.remove_notification(id)? {
        return Err(AppError::not_found("Notification not found"));
    }
    state
        .events
        .publish(LedgerEvent::NotificationRemoved { id });
    Ok(Json(SuccessResponse { success: true }))
}

#[derive(Serialize)]
pub struct ClearResponse {
    pub removed: usize,
}

/// DELETE /api/notifications - Dismiss everything
pub async fn clear_notifications(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ClearResponse>, AppError> {
    let user_email = get_user_email(&headers);

    let ids: Vec<i64> = state
        .db
        .list_notifications(i64::MAX)?
        .into_iter()
        .map(|n| n.id)
        .collect();
    let removed = state.db.clear_notifications()?;

    state.db.log_audit(
        &user_email,
        "clear",
        Some("notification"),
        None,
        Some(&format!("removed={}", removed)),
    )?;
    for id in ids {
        state
            .events
            .publish(LedgerEvent::NotificationRemoved { id });
    }

    Ok(Json(ClearResponse { removed }))
}
