//! Transaction handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{get_user_email, AppError, AppState, MAX_PAGE_LIMIT};
use budgee_core::db::TransactionFilter;
use budgee_core::models::{
    parse_transaction_date, Mood, NewTransaction, SortOrder, Transaction, TransactionKind,
    TransactionTotals, TransactionUpdate,
};
use budgee_core::LedgerEvent;

/// Filter parameters shared by listing, totals and export
#[derive(Debug, Default, Deserialize)]
pub struct FilterQuery {
    /// Search text (title or description)
    pub search: Option<String>,
    /// Comma-separated moods, e.g. "happy,regret"
    pub mood: Option<String>,
    /// expense, budget_deposit, savings_deposit or savings_withdrawal
    pub kind: Option<String>,
    /// Start date (YYYY-MM-DD)
    pub from: Option<String>,
    /// End date (YYYY-MM-DD)
    pub to: Option<String>,
    /// Sort direction (asc or desc)
    pub sort: Option<String>,
}

/// Owned, validated form of [`FilterQuery`]
pub struct ParsedFilter {
    search: Option<String>,
    moods: Option<Vec<Mood>>,
    kind: Option<TransactionKind>,
    range: Option<(NaiveDate, NaiveDate)>,
    sort: SortOrder,
}

impl FilterQuery {
    pub fn parse(&self) -> Result<ParsedFilter, AppError> {
        let moods = self
            .mood
            .as_deref()
            .map(|list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .map(|m| m.parse::<Mood>())
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()
            .map_err(|e| AppError::bad_request(&e))?
            .filter(|m| !m.is_empty());

        let kind = self
            .kind
            .as_deref()
            .map(str::parse::<TransactionKind>)
            .transpose()
            .map_err(|e| AppError::bad_request(&e))?;

        let range = parse_date_range(self.from.as_deref(), self.to.as_deref())?;

        let sort = self
            .sort
            .as_deref()
            .map(str::parse::<SortOrder>)
            .transpose()
            .map_err(|e| AppError::bad_request(&e))?
            .unwrap_or_default();

        Ok(ParsedFilter {
            search: self
                .search
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            moods,
            kind,
            range,
            sort,
        })
    }
}

impl ParsedFilter {
    pub fn filter(&self) -> TransactionFilter<'_> {
        TransactionFilter::new()
            .search(self.search.as_deref())
            .moods(self.moods.as_deref())
            .kind(self.kind)
            .date_range(self.range)
            .sort_order(self.sort)
    }
}

/// Parse optional `from`/`to` dates; an open end extends to year 1 or 9999
pub fn parse_date_range(
    from: Option<&str>,
    to: Option<&str>,
) -> Result<Option<(NaiveDate, NaiveDate)>, AppError> {
    let parse = |value: Option<&str>, name: &str| {
        value
            .map(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d"))
            .transpose()
            .map_err(|_| {
                AppError::bad_request(&format!("Invalid '{}' date format (use YYYY-MM-DD)", name))
            })
    };
    let from = parse(from, "from")?;
    let to = parse(to, "to")?;

    match (from, to) {
        (None, None) => Ok(None),
        (from, to) => {
            // Stored dates compare as text, so the open ends stay four-digit years
            let from = from
                .or_else(|| NaiveDate::from_ymd_opt(1, 1, 1))
                .unwrap_or(NaiveDate::MIN);
            let to = to
                .or_else(|| NaiveDate::from_ymd_opt(9999, 12, 31))
                .unwrap_or(NaiveDate::MAX);
            if from > to {
                return Err(AppError::bad_request("'from' must not be after 'to'"));
            }
            Ok(Some((from, to)))
        }
    }
}

/// Pagination parameters for listing transactions
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

#[derive(Serialize)]
pub struct TransactionResponse {
    pub transactions: Vec<Transaction>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// GET /api/transactions - List transactions
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(page): Query<PageQuery>,
    Query(params): Query<FilterQuery>,
) -> Result<Json<TransactionResponse>, AppError> {
    let user_email = get_user_email(&headers);

    let limit = page.limit.clamp(1, MAX_PAGE_LIMIT);
    let offset = page.offset.max(0);

    let parsed = params.parse()?;
    let filter = parsed.filter();
    let transactions = state.db.list_transactions(&filter, limit, offset)?;
    let total = state.db.transaction_totals(&filter)?.count;

    state.db.log_audit(
        &user_email,
        "list",
        Some("transaction"),
        None,
        Some(&format!(
            "limit={}, offset={}, search={:?}, mood={:?}, returned={}",
            limit,
            offset,
            params.search,
            params.mood,
            transactions.len()
        )),
    )?;

    Ok(Json(TransactionResponse {
        transactions,
        total,
        limit,
        offset,
    }))
}

/// GET /api/transactions/totals - Count, sum and large-expense count
pub async fn transaction_totals(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FilterQuery>,
) -> Result<Json<TransactionTotals>, AppError> {
    let parsed = params.parse()?;
    Ok(Json(state.db.transaction_totals(&parsed.filter())?))
}

/// Request body for recording an expense
#[derive(Debug, Deserialize)]
pub struct CreateTransactionRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub amount: f64,
    pub mood: Mood,
    /// RFC 3339 or YYYY-MM-DD; defaults to now
    pub date: Option<String>,
    /// Client timestamp in milliseconds, used to order same-day entries
    pub timestamp: Option<i64>,
}

/// POST /api/transactions - Record an expense
pub async fn create_transaction(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateTransactionRequest>,
) -> Result<Json<Transaction>, AppError> {
    let user_email = get_user_email(&headers);

    let mut new_tx = NewTransaction::now(&req.title, &req.description, req.amount, req.mood);
    if let Some(ref date) = req.date {
        new_tx.date = parse_transaction_date(date)?;
    }
    new_tx.timestamp = req.timestamp;

    let created = state.db.add_transaction(&new_tx)?;

    state.db.log_audit(
        &user_email,
        "create",
        Some("transaction"),
        Some(created.id),
        Some(&format!("amount={:.2}, mood={}", created.amount, created.mood)),
    )?;
    info!(id = created.id, amount = created.amount, "Expense recorded");

    state
        .events
        .publish(LedgerEvent::TransactionAdded { id: created.id });
    state.events.publish(LedgerEvent::BudgetChanged);

    Ok(Json(created))
}

/// GET /api/transactions/:id - Get a single transaction
pub async fn get_transaction(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<Transaction>, AppError> {
    let user_email = get_user_email(&headers);

    let transaction = state
        .db
        .get_transaction(id)?
        .ok_or_else(|| AppError::not_found("Transaction not found"))?;

    state
        .db
        .log_audit(&user_email, "get", Some("transaction"), Some(id), None)?;

    Ok(Json(transaction))
}

/// PATCH /api/transactions/:id - Update an expense
pub async fn update_transaction(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(update): Json<TransactionUpdate>,
) -> Result<Json<Transaction>, AppError> {
    let user_email = get_user_email(&headers);

    if update.is_empty() {
        return Err(AppError::bad_request("No fields to update"));
    }

    let updated = state.db.update_transaction(id, &update)?;

    state.db.log_audit(
        &user_email,
        "update",
        Some("transaction"),
        Some(id),
        Some(&format!(
            "amount={:?}, mood={:?}",
            update.amount, update.mood
        )),
    )?;

    state.events.publish(LedgerEvent::TransactionUpdated { id });
    if update.amount.is_some() {
        state.events.publish(LedgerEvent::BudgetChanged);
    }

    Ok(Json(updated))
}

/// DELETE /api/transactions/:id - Delete an expense and refund its amount
pub async fn delete_transaction(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<Transaction>, AppError> {
    let user_email = get_user_email(&headers);

    let deleted = state.db.delete_transaction(id)?;

    state.db.log_audit(
        &user_email,
        "delete",
        Some("transaction"),
        Some(id),
        Some(&format!("refund={:.2}", deleted.amount)),
    )?;

    state.events.publish(LedgerEvent::TransactionDeleted { id });
    state.events.publish(LedgerEvent::BudgetChanged);

    Ok(Json(deleted))
}
