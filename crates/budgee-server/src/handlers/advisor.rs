//! AI advisor handlers: spending analysis and backend health

use std::sync::Arc;

use axum::{extract::State, http::HeaderMap, Json};
use serde::Serialize;
use tracing::info;

use crate::{get_user_email, AppError, AppState};
use budgee_core::{AIBackend, FinancialSummary, RouterInfo, SpendingAnalysis};

/// POST /api/analysis - Review spending together with moods
pub async fn analyze_spending(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<SpendingAnalysis>, AppError> {
    let advisor = state.advisor()?;
    let user_email = get_user_email(&headers);

    let summary = FinancialSummary::load(&state.db, state.config.utc_offset)?;
    let analysis = advisor.analyze_spending(&summary).await?;

    state.db.log_audit(
        &user_email,
        "analyze",
        Some("spending"),
        None,
        Some(&format!(
            "model={}, transactions={}",
            analysis.model,
            summary.transactions.len()
        )),
    )?;
    info!(model = %analysis.model, blocks = analysis.blocks.len(), "Spending analysis served");

    Ok(Json(analysis))
}

#[derive(Serialize)]
pub struct AiHealthResponse {
    pub configured: bool,
    pub healthy: bool,
    pub host: Option<String>,
    pub model: Option<String>,
    pub router: Option<RouterInfo>,
}

/// GET /api/ai/health - Advisor backend status
pub async fn ai_health(State(state): State<Arc<AppState>>) -> Json<AiHealthResponse> {
    let Some(advisor) = state.advisor.as_ref() else {
        return Json(AiHealthResponse {
            configured: false,
            healthy: false,
            host: None,
            model: None,
            router: None,
        });
    };

    let client = advisor.client();
    Json(AiHealthResponse {
        configured: true,
        healthy: client.health_check().await,
        host: Some(client.host().to_string()),
        model: Some(client.model().to_string()),
        router: Some(client.router_info()),
    })
}
