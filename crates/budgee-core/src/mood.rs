//! Mood-weighted daily aggregation
//!
//! Turns a list of transactions into one point per calendar day for the
//! spending-vs-mood chart. Each point carries the day's total spend and a
//! smoothed mood score in `[1, 5]`:
//!
//! - transactions are grouped by calendar day (in a fixed UTC offset)
//! - within a day, the most recent transaction gets recency weight 1, the
//!   next `e^-0.2`, then `e^-0.4`, and so on
//! - each transaction contributes `base_score * mood_weight * recency_weight`
//! - the sum is divided by the total recency weight and clamped to `[1, 5]`
//!
//! Everything here is a pure function of its input.

use std::collections::BTreeMap;

use chrono::{FixedOffset, NaiveDate, Offset, Utc};
use serde::Serialize;

use crate::models::{Mood, Transaction};

/// Decay rate applied per position in the recency ordering
pub const RECENCY_DECAY: f64 = 0.2;

/// Lowest possible mood score
pub const MIN_MOOD_SCORE: f64 = 1.0;

/// Highest possible mood score
pub const MAX_MOOD_SCORE: f64 = 5.0;

/// One chart point
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyAggregate {
    /// Calendar day
    pub date: NaiveDate,
    /// Sum of amounts spent on this day
    pub total_amount: f64,
    /// Recency- and mood-weighted average mood, always within `[1, 5]`
    pub mood_score: f64,
    /// Mood closest to `mood_score`
    pub dominant_mood: Mood,
    /// Contributing transactions, most recent first
    pub transactions: Vec<Transaction>,
}

/// Aggregate transactions into days using UTC calendar dates
pub fn aggregate_daily(transactions: &[Transaction]) -> Vec<DailyAggregate> {
    aggregate_daily_with_offset(transactions, utc())
}

/// Aggregate transactions into days using calendar dates at `offset`
///
/// Output is sorted ascending by date. Empty input yields empty output.
pub fn aggregate_daily_with_offset(
    transactions: &[Transaction],
    offset: FixedOffset,
) -> Vec<DailyAggregate> {
    let mut buckets: BTreeMap<NaiveDate, Vec<Transaction>> = BTreeMap::new();
    for tx in transactions {
        let day = tx.date.with_timezone(&offset).date_naive();
        buckets.entry(day).or_default().push(tx.clone());
    }

    buckets
        .into_iter()
        .map(|(date, mut day_transactions)| {
            sort_by_recency(&mut day_transactions);
            let mood_score = score_sorted(&day_transactions);
            let total_amount = day_transactions.iter().map(|t| t.amount).sum();
            DailyAggregate {
                date,
                total_amount,
                mood_score,
                dominant_mood: dominant_mood(mood_score),
                transactions: day_transactions,
            }
        })
        .collect()
}

/// Weighted mood score of a group of transactions, `None` if empty
///
/// The input order does not matter; transactions are ranked by recency first.
pub fn weighted_mood_score(transactions: &[Transaction]) -> Option<f64> {
    if transactions.is_empty() {
        return None;
    }
    let mut sorted = transactions.to_vec();
    sort_by_recency(&mut sorted);
    Some(score_sorted(&sorted))
}

/// Nearest mood to a continuous score
///
/// Starts from `Neutral` and only moves to another mood when it is strictly
/// closer, so ties resolve to `Neutral` and then to the more positive mood.
pub fn dominant_mood(score: f64) -> Mood {
    let mut closest = Mood::Neutral;
    let mut best = (Mood::Neutral.base_score() - score).abs();
    for mood in Mood::all() {
        let distance = (mood.base_score() - score).abs();
        if distance < best {
            closest = *mood;
            best = distance;
        }
    }
    closest
}

/// Mean of the daily totals, drawn as the chart's reference line
pub fn average_daily_spending(days: &[DailyAggregate]) -> f64 {
    if days.is_empty() {
        return 0.0;
    }
    days.iter().map(|d| d.total_amount).sum::<f64>() / days.len() as f64
}

/// Total amount spent per mood (only moods that occur are present)
pub fn mood_spending_totals(transactions: &[Transaction]) -> BTreeMap<Mood, f64> {
    let mut totals = BTreeMap::new();
    for tx in transactions {
        *totals.entry(tx.mood).or_insert(0.0) += tx.amount;
    }
    totals
}

/// Everything the spending/mood chart needs
#[derive(Debug, Clone, Serialize)]
pub struct MoodChart {
    pub days: Vec<DailyAggregate>,
    pub average_daily_spending: f64,
    pub total_spent: f64,
    pub mood_totals: BTreeMap<Mood, f64>,
}

impl MoodChart {
    /// Chart of every transaction given
    pub fn build(transactions: &[Transaction], offset: FixedOffset) -> Self {
        let days = aggregate_daily_with_offset(transactions, offset);
        Self {
            average_daily_spending: average_daily_spending(&days),
            total_spent: days.iter().map(|d| d.total_amount).sum(),
            mood_totals: mood_spending_totals(transactions),
            days,
        }
    }

    /// Chart restricted to the local calendar days in `range` (inclusive)
    ///
    /// The input may hold transactions outside the range, e.g. rows fetched
    /// with [`utc_query_range`]; those are dropped before aggregating.
    pub fn build_for_days(
        transactions: &[Transaction],
        range: Option<(NaiveDate, NaiveDate)>,
        offset: FixedOffset,
    ) -> Self {
        let Some((from, to)) = range else {
            return Self::build(transactions, offset);
        };
        let in_range: Vec<Transaction> = transactions
            .iter()
            .filter(|tx| {
                let day = tx.date.with_timezone(&offset).date_naive();
                day >= from && day <= to
            })
            .cloned()
            .collect();
        Self::build(&in_range, offset)
    }
}

/// UTC day range covering every instant of the local `range` at any offset
///
/// Offsets stay within a day of UTC, so one day of slack on each side is enough.
pub fn utc_query_range(range: Option<(NaiveDate, NaiveDate)>) -> Option<(NaiveDate, NaiveDate)> {
    range.map(|(from, to)| {
        (
            from.pred_opt().unwrap_or(from),
            to.succ_opt().unwrap_or(to),
        )
    })
}

/// Offset from UTC given in minutes, `None` if out of range
pub fn offset_from_minutes(minutes: i32) -> Option<FixedOffset> {
    FixedOffset::east_opt(minutes.checked_mul(60)?)
}

fn utc() -> FixedOffset {
    Utc.fix()
}

// Most recent first; equal keys (date-only entries) fall back to the later id
fn sort_by_recency(transactions: &mut [Transaction]) {
    transactions.sort_by(|a, b| {
        b.recency_key()
            .cmp(&a.recency_key())
            .then_with(|| b.id.cmp(&a.id))
    });
}

// Caller guarantees recency order and at least one transaction.
fn score_sorted(sorted: &[Transaction]) -> f64 {
    let (weighted, total_weight) =
        sorted
            .iter()
            .enumerate()
            .fold((0.0, 0.0), |(weighted, total), (i, tx)| {
                let recency = (-RECENCY_DECAY * i as f64).exp();
                (
                    weighted + tx.mood.base_score() * tx.mood.weight() * recency,
                    total + recency,
                )
            });

    if total_weight <= 0.0 {
        return Mood::Neutral.base_score();
    }
    (weighted / total_weight).clamp(MIN_MOOD_SCORE, MAX_MOOD_SCORE)
}
