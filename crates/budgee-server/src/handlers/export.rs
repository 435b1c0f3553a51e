//! Transaction export handler

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, HeaderMap, Response, StatusCode},
};
use serde::Deserialize;
use tracing::info;

use super::transactions::FilterQuery;
use crate::{get_user_email, AppError, AppState};
use budgee_core::export::{render_transactions, ExportFormat};

/// Query parameters for transaction export
#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    /// csv (default) or json (JSON lines)
    pub format: Option<String>,
}

/// GET /api/export - Export transactions as CSV or JSON lines
pub async fn export_transactions(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<ExportQuery>,
    Query(filter_query): Query<FilterQuery>,
) -> Result<Response<Body>, AppError> {
    let user_email = get_user_email(&headers);

    let format = params
        .format
        .as_deref()
        .map(str::parse::<ExportFormat>)
        .transpose()
        .map_err(|e| AppError::bad_request(&e))?
        .unwrap_or_default();

    let parsed = filter_query.parse()?;
    let transactions = state.db.all_transactions(&parsed.filter())?;
    let body = render_transactions(format, &transactions)?;

    state.db.log_audit(
        &user_email,
        "export",
        Some("transaction"),
        None,
        Some(&format!(
            "format={}, count={}",
            format.as_str(),
            transactions.len()
        )),
    )?;
    info!(
        count = transactions.len(),
        format = format.as_str(),
        "Exported transactions"
    );

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, format.content_type())
        .header(
            header::CONTENT_DISPOSITION,
            format!(
                "attachment; filename=\"transactions.{}\"",
                format.extension()
            ),
        )
        .body(Body::from(body))
        .map_err(|e| AppError::internal(&e.to_string()))
}
