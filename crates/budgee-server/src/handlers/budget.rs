//! Budget and savings handlers

use std::sync::Arc;

use axum::{extract::State, http::HeaderMap, Json};
use serde::{Deserialize, Serialize};

use crate::{get_user_email, run_reset_check, AppError, AppState};
use budgee_core::models::BudgetState;
use budgee_core::{LedgerEvent, MonthlyReset};

/// Request body carrying an amount
#[derive(Debug, Deserialize)]
pub struct AmountRequest {
    pub amount: f64,
}

/// GET /api/budget - Current budget and savings
pub async fn get_budget(
    State(state): State<Arc<AppState>>,
) -> Result<Json<BudgetState>, AppError> {
    Ok(Json(state.db.get_budget()?))
}

/// Record a balance change in the audit log and on the change feed
fn record_change(
    state: &AppState,
    headers: &HeaderMap,
    action: &str,
    amount: f64,
) -> Result<(), AppError> {
    let user_email = get_user_email(headers);
    state.db.log_audit(
        &user_email,
        action,
        Some("budget"),
        None,
        Some(&format!("amount={:.2}", amount)),
    )?;
    state.events.publish(LedgerEvent::BudgetChanged);
    Ok(())
}

/// PUT /api/budget - Set the monthly budget
pub async fn set_budget(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<AmountRequest>,
) -> Result<Json<BudgetState>, AppError> {
    let budget = state.db.set_total_budget(req.amount)?;
    record_change(&state, &headers, "set_budget", req.amount)?;
    Ok(Json(budget))
}

/// POST /api/budget/deposit - Add funds to the budget
pub async fn deposit_budget(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<AmountRequest>,
) -> Result<Json<BudgetState>, AppError> {
    let budget = state.db.add_to_budget(req.amount)?;
    record_change(&state, &headers, "budget_deposit", req.amount)?;
    Ok(Json(budget))
}

/// POST /api/savings/deposit - Move remaining budget into savings
pub async fn deposit_savings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<AmountRequest>,
) -> Result<Json<BudgetState>, AppError> {
    let budget = state.db.add_to_savings(req.amount)?;
    record_change(&state, &headers, "savings_deposit", req.amount)?;
    Ok(Json(budget))
}

/// POST /api/savings/withdraw - Move savings back into the budget
pub async fn withdraw_savings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<AmountRequest>,
) -> Result<Json<BudgetState>, AppError> {
    let budget = state.db.transfer_from_savings(req.amount)?;
    record_change(&state, &headers, "savings_withdrawal", req.amount)?;
    Ok(Json(budget))
}

#[derive(Serialize)]
pub struct ResetResponse {
    /// Whether a reset happened (false when already reset this month)
    pub reset: bool,
    pub transferred: f64,
    pub budget: BudgetState,
}

/// POST /api/budget/reset - Run the monthly reset check now
pub async fn reset_budget(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ResetResponse>, AppError> {
    let outcome: Option<MonthlyReset> = run_reset_check(&state.db, &state.events)?;

    Ok(Json(ResetResponse {
        reset: outcome.is_some(),
        transferred: outcome.map(|r| r.transferred).unwrap_or(0.0),
        budget: state.db.get_budget()?,
    }))
}
