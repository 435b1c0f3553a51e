//! MCP Tool implementations for Budgee
//!
//! These tools provide read-only queries against the Budgee database for
//! external LLM clients. They only query data, never modify it.

use chrono::{Datelike, Duration, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::db::{Database, TransactionFilter};
use crate::error::{Error, Result};
use crate::models::{Mood, Notification, Transaction};
use crate::mood::{offset_from_minutes, utc_query_range, MoodChart};

/// Largest page a tool returns
const MAX_LIMIT: i64 = 200;

// =============================================================================
// Period Resolution (shared utility)
// =============================================================================

const PERIOD_HELP: &str =
    "Use: this-month, last-month, last-30-days, last-90-days, this-year, all, or YYYY-MM-DD";

/// Resolve a period string to an inclusive date range, `None` meaning all time
pub fn resolve_period(period: &str) -> Result<Option<(NaiveDate, NaiveDate)>> {
    resolve_period_at(period, Utc::now().date_naive())
}

fn resolve_period_at(period: &str, today: NaiveDate) -> Result<Option<(NaiveDate, NaiveDate)>> {
    let range = match period.trim().to_lowercase().as_str() {
        "all" | "" => return Ok(None),
        "this-month" | "thismonth" => (first_of_month(today.year(), today.month())?, today),
        "last-month" | "lastmonth" => {
            let this_month = first_of_month(today.year(), today.month())?;
            let last_day = this_month - Duration::days(1);
            (first_of_month(last_day.year(), last_day.month())?, last_day)
        }
        "last-30-days" | "last30days" => (today - Duration::days(30), today),
        "last-90-days" | "last90days" => (today - Duration::days(90), today),
        "this-year" | "thisyear" | "ytd" => (first_of_month(today.year(), 1)?, today),
        other => {
            let date = NaiveDate::parse_from_str(other, "%Y-%m-%d").map_err(|_| {
                Error::InvalidData(format!("Invalid period: {}. {}", period, PERIOD_HELP))
            })?;
            (date, date)
        }
    };
    Ok(Some(range))
}

fn first_of_month(year: i32, month: u32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| Error::InvalidData(format!("Invalid month {}-{}", year, month)))
}

fn clamp_limit(limit: Option<i64>, default: i64) -> i64 {
    limit.unwrap_or(default).clamp(1, MAX_LIMIT)
}

fn parse_moods(moods: Option<&[String]>) -> Result<Option<Vec<Mood>>> {
    moods
        .filter(|m| !m.is_empty())
        .map(|m| {
            m.iter()
                .map(|s| s.parse::<Mood>().map_err(Error::InvalidData))
                .collect::<Result<Vec<_>>>()
        })
        .transpose()
}

// =============================================================================
// get_budget
// =============================================================================

#[derive(Debug, Serialize, schemars::JsonSchema)]
pub struct BudgetResult {
    pub total_budget: f64,
    pub remaining_budget: f64,
    pub savings: f64,
    /// Share of the budget spent so far (0.0 to 1.0)
    pub spent_ratio: f64,
    pub last_budget_reset: Option<String>,
    pub currency: String,
}

pub fn get_budget(db: &Database) -> Result<BudgetResult> {
    let budget = db.get_budget()?;
    Ok(BudgetResult {
        total_budget: budget.total_budget,
        remaining_budget: budget.remaining_budget,
        savings: budget.savings,
        spent_ratio: budget.spent_ratio(),
        last_budget_reset: budget.last_budget_reset.map(|d| d.to_rfc3339()),
        currency: crate::context::CURRENCY.to_string(),
    })
}

// =============================================================================
// search_transactions
// =============================================================================

#[derive(Debug, Default, Deserialize, schemars::JsonSchema)]
pub struct SearchTransactionsParams {
    #[schemars(description = "Text to search for in expense titles and descriptions")]
    pub query: Option<String>,

    #[schemars(
        description = "Only expenses with one of these moods: excited, happy, neutral, unhappy, regret"
    )]
    pub moods: Option<Vec<String>>,

    #[schemars(
        description = "Time period: this-month, last-month, last-30-days, last-90-days, this-year, all, or YYYY-MM-DD"
    )]
    pub period: Option<String>,

    #[schemars(description = "Maximum number of results to return (default 50, max 200)")]
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize, schemars::JsonSchema)]
pub struct TransactionSummary {
    pub id: i64,
    pub date: String,
    pub title: String,
    pub description: String,
    pub amount: f64,
    pub mood: String,
}

impl From<Transaction> for TransactionSummary {
    fn from(t: Transaction) -> Self {
        Self {
            id: t.id,
            date: t.date.format("%Y-%m-%d").to_string(),
            title: t.title,
            description: t.description,
            amount: t.amount,
            mood: t.mood.as_str().to_string(),
        }
    }
}

#[derive(Debug, Serialize, schemars::JsonSchema)]
pub struct SearchTransactionsResult {
    pub transactions: Vec<TransactionSummary>,
    /// Matches before the limit was applied
    pub total_count: i64,
    pub total_amount: f64,
}

pub fn search_transactions(
    db: &Database,
    params: SearchTransactionsParams,
) -> Result<SearchTransactionsResult> {
    let range = resolve_period(params.period.as_deref().unwrap_or("all"))?;
    let moods = parse_moods(params.moods.as_deref())?;
    let limit = clamp_limit(params.limit, 50);

    let filter = TransactionFilter::expenses()
        .search(params.query.as_deref())
        .moods(moods.as_deref())
        .date_range(range);

    let totals = db.transaction_totals(&filter)?;
    let transactions = db
        .list_transactions(&filter, limit, 0)?
        .into_iter()
        .map(TransactionSummary::from)
        .collect();

    Ok(SearchTransactionsResult {
        transactions,
        total_count: totals.count,
        total_amount: totals.total_amount,
    })
}

// =============================================================================
// get_mood_chart
// =============================================================================

#[derive(Debug, Default, Deserialize, schemars::JsonSchema)]
pub struct MoodChartParams {
    #[schemars(description = "Time period (default last-30-days)")]
    pub period: Option<String>,

    #[schemars(description = "Offset from UTC in minutes used to group expenses by day")]
    pub utc_offset_minutes: Option<i32>,
}

pub fn get_mood_chart(db: &Database, params: MoodChartParams) -> Result<MoodChart> {
    let range = resolve_period(params.period.as_deref().unwrap_or("last-30-days"))?;
    let minutes = params.utc_offset_minutes.unwrap_or(0);
    let offset = offset_from_minutes(minutes)
        .ok_or_else(|| Error::InvalidData(format!("Invalid UTC offset: {} minutes", minutes)))?;

    load_mood_chart(db, range, offset)
}

/// Mood chart of the expenses on the local calendar days in `range`
///
/// Stored dates are UTC, so the query is widened and trimmed back to local days.
pub fn load_mood_chart(
    db: &Database,
    range: Option<(NaiveDate, NaiveDate)>,
    offset: FixedOffset,
) -> Result<MoodChart> {
    let filter = TransactionFilter::expenses().date_range(utc_query_range(range));
    let transactions = db.all_transactions(&filter)?;
    Ok(MoodChart::build_for_days(&transactions, range, offset))
}

// =============================================================================
// get_mood_patterns
// =============================================================================

#[derive(Debug, Default, Deserialize, schemars::JsonSchema)]
pub struct MoodPatternsParams {
    #[schemars(description = "Time period (default all)")]
    pub period: Option<String>,
}

#[derive(Debug, Serialize, schemars::JsonSchema)]
pub struct MoodPattern {
    pub mood: String,
    pub total: f64,
    pub count: usize,
    pub average: f64,
    /// Share of all spending in the period (0.0 to 1.0)
    pub share: f64,
}

#[derive(Debug, Serialize, schemars::JsonSchema)]
pub struct MoodPatternsResult {
    /// Moods with spending, largest total first
    pub patterns: Vec<MoodPattern>,
    pub total_spent: f64,
}

pub fn get_mood_patterns(db: &Database, params: MoodPatternsParams) -> Result<MoodPatternsResult> {
    let range = resolve_period(params.period.as_deref().unwrap_or("all"))?;
    let transactions = db.all_transactions(&TransactionFilter::expenses().date_range(range))?;
    Ok(mood_patterns(&transactions))
}

fn mood_patterns(transactions: &[Transaction]) -> MoodPatternsResult {
    let total_spent: f64 = transactions.iter().map(|t| t.amount).sum();

    let mut patterns: Vec<MoodPattern> = Mood::all()
        .iter()
        .filter_map(|mood| {
            let amounts: Vec<f64> = transactions
                .iter()
                .filter(|t| t.mood == *mood)
                .map(|t| t.amount)
                .collect();
            if amounts.is_empty() {
                return None;
            }
            let total: f64 = amounts.iter().sum();
            Some(MoodPattern {
                mood: mood.as_str().to_string(),
                total,
                count: amounts.len(),
                average: total / amounts.len() as f64,
                share: if total_spent > 0.0 { total / total_spent } else { 0.0 },
            })
        })
        .collect();

    patterns.sort_by(|a, b| b.total.total_cmp(&a.total));

    MoodPatternsResult {
        patterns,
        total_spent,
    }
}

// =============================================================================
// list_notifications
// =============================================================================

#[derive(Debug, Default, Deserialize, schemars::JsonSchema)]
pub struct NotificationsParams {
    #[schemars(description = "Maximum number of notifications (default 20, max 200)")]
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct NotificationsResult {
    /// Newest first
    pub notifications: Vec<Notification>,
}

pub fn list_notifications(
    db: &Database,
    params: NotificationsParams,
) -> Result<NotificationsResult> {
    let notifications = db.list_notifications(clamp_limit(params.limit, 20))?;
    Ok(NotificationsResult { notifications })
}
