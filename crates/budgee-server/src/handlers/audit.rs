//! Audit trail handler

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;

use crate::{get_user_email, AppError, AppState, MAX_PAGE_LIMIT};
use budgee_core::AuditEntry;

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    /// Only entries for this entity type (budget, transaction, conversation, ...)
    pub entity: Option<String>,
    pub limit: Option<i64>,
}

/// GET /api/audit - Who changed what, newest first
pub async fn list_audit_log(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<AuditQuery>,
) -> Result<Json<Vec<AuditEntry>>, AppError> {
    let limit = params.limit.unwrap_or(100).clamp(1, MAX_PAGE_LIMIT);
    let entries = match params.entity.as_deref() {
        Some(entity) => state.db.list_audit_log_for(entity, limit)?,
        None => state.db.list_audit_log(limit)?,
    };

    state.db.log_audit(
        &get_user_email(&headers),
        "view",
        Some("audit_log"),
        None,
        params.entity.as_deref(),
    )?;

    Ok(Json(entries))
}
