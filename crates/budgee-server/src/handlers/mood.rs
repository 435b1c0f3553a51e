//! Mood chart and pattern handlers

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use super::transactions::parse_date_range;
use crate::{AppError, AppState};
use budgee_core::mood::{offset_from_minutes, MoodChart};
use budgee_core::tools::{self, MoodPatternsParams, MoodPatternsResult};

/// Query parameters for the mood chart
#[derive(Debug, Deserialize)]
pub struct MoodChartQuery {
    /// Start date (YYYY-MM-DD)
    pub from: Option<String>,
    /// End date (YYYY-MM-DD)
    pub to: Option<String>,
    /// Client offset from UTC in minutes; defaults to the server setting
    pub utc_offset_minutes: Option<i32>,
}

/// GET /api/mood/chart - Daily spending with mood scores
pub async fn get_mood_chart(
    State(state): State<Arc<AppState>>,
    Query(params): Query<MoodChartQuery>,
) -> Result<Json<MoodChart>, AppError> {
    let range = parse_date_range(params.from.as_deref(), params.to.as_deref())?;
    let offset = match params.utc_offset_minutes {
        Some(minutes) => offset_from_minutes(minutes)
            .ok_or_else(|| AppError::bad_request("utc_offset_minutes out of range"))?,
        None => state.config.utc_offset,
    };

    Ok(Json(tools::load_mood_chart(&state.db, range, offset)?))
}

/// Query parameters for mood patterns
#[derive(Debug, Deserialize)]
pub struct MoodPatternsQuery {
    /// this-month, last-month, last-30-days, last-90-days, this-year, all
    pub period: Option<String>,
}

/// GET /api/mood/patterns - Spending totals per mood
pub async fn get_mood_patterns(
    State(state): State<Arc<AppState>>,
    Query(params): Query<MoodPatternsQuery>,
) -> Result<Json<MoodPatternsResult>, AppError> {
    let result = tools::get_mood_patterns(
        &state.db,
        MoodPatternsParams {
            period: params.period,
        },
    )?;
    Ok(Json(result))
}
