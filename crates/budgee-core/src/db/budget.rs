//! Budget and savings balances
//!
//! The balances live in a single row. Each operation that changes them also
//! writes a bookkeeping entry to the ledger, inside the same SQLite transaction.

use chrono::{DateTime, Datelike, Utc};
use rusqlite::params;
use serde::Serialize;
use tracing::info;

use super::transactions::remaining_budget;
use super::{conversion_error, format_timestamp, parse_datetime, parse_timestamp, Database};
use crate::error::{Error, Result};
use crate::models::{validate_amount, BudgetState, NotificationKind, TransactionKind};

/// Message posted to the notification feed after a monthly reset
pub const MONTHLY_RESET_MESSAGE: &str =
    "Your monthly budget has been reset and remaining funds were transferred to savings.";

/// Outcome of a monthly reset that actually ran
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyReset {
    /// Remaining budget moved into savings
    pub transferred: f64,
    pub notification_id: i64,
}

impl Database {
    pub fn get_budget(&self) -> Result<BudgetState> {
        let conn = self.conn()?;
        read_budget(&conn)
    }

    /// Set the monthly budget; the remaining budget starts over at the same amount
    pub fn set_total_budget(&self, amount: f64) -> Result<BudgetState> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(Error::InvalidData(format!(
                "Budget must be zero or more, got {}",
                amount
            )));
        }

        let conn = self.conn()?;
        conn.execute(
            r#"
            UPDATE budget
            SET total_budget = ?, remaining_budget = ?, updated_at = CURRENT_TIMESTAMP
            WHERE id = 1
            "#,
            params![amount, amount],
        )?;

        info!(amount, "Set total budget");
        read_budget(&conn)
    }

    /// Add funds to both the total and the remaining budget
    pub fn add_to_budget(&self, amount: f64) -> Result<BudgetState> {
        validate_amount(amount)?;

        let mut conn = self.conn()?;
        let db_tx = conn.transaction()?;

        Self::insert_bookkeeping(&db_tx, TransactionKind::BudgetDeposit, amount)?;
        db_tx.execute(
            r#"
            UPDATE budget
            SET total_budget = total_budget + ?, remaining_budget = remaining_budget + ?,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = 1
            "#,
            params![amount, amount],
        )?;

        let state = read_budget(&db_tx)?;
        db_tx.commit()?;
        Ok(state)
    }

    /// Move part of the remaining budget into savings
    pub fn add_to_savings(&self, amount: f64) -> Result<BudgetState> {
        validate_amount(amount)?;

        let mut conn = self.conn()?;
        let db_tx = conn.transaction()?;

        let remaining = remaining_budget(&db_tx)?;
        if amount > remaining {
            return Err(Error::InsufficientBudget {
                requested: amount,
                available: remaining,
            });
        }

        Self::insert_bookkeeping(&db_tx, TransactionKind::SavingsDeposit, amount)?;
        db_tx.execute(
            r#"
            UPDATE budget
            SET remaining_budget = remaining_budget - ?, savings = savings + ?,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = 1
            "#,
            params![amount, amount],
        )?;

        let state = read_budget(&db_tx)?;
        db_tx.commit()?;
        Ok(state)
    }

    /// Move savings back into the budget
    pub fn transfer_from_savings(&self, amount: f64) -> Result<BudgetState> {
        validate_amount(amount)?;

        let mut conn = self.conn()?;
        let db_tx = conn.transaction()?;

        let savings: f64 =
            db_tx.query_row("SELECT savings FROM budget WHERE id = 1", [], |row| row.get(0))?;
        if amount > savings {
            return Err(Error::InsufficientSavings {
                requested: amount,
                available: savings,
            });
        }

        Self::insert_bookkeeping(&db_tx, TransactionKind::SavingsWithdrawal, amount)?;
        db_tx.execute(
            r#"
            UPDATE budget
            SET total_budget = total_budget + ?, remaining_budget = remaining_budget + ?,
                savings = savings - ?, updated_at = CURRENT_TIMESTAMP
            WHERE id = 1
            "#,
            params![amount, amount, amount],
        )?;

        let state = read_budget(&db_tx)?;
        db_tx.commit()?;
        Ok(state)
    }

    /// Roll the budget over when a new calendar month (UTC) has started
    ///
    /// Any remaining budget is moved into savings, the budget is zeroed and a
    /// notification is posted. Returns `None` when the budget was already
    /// reset this month.
    pub fn check_and_reset_monthly_budget(&self, now: DateTime<Utc>) -> Result<Option<MonthlyReset>> {
        let mut conn = self.conn()?;
        let db_tx = conn.transaction()?;

        let state = read_budget(&db_tx)?;
        if let Some(last) = state.last_budget_reset {
            if last.year() == now.year() && last.month() == now.month() {
                return Ok(None);
            }
        }

        let transferred = state.remaining_budget.max(0.0);
        if transferred > 0.0 {
            Self::insert_bookkeeping(&db_tx, TransactionKind::SavingsDeposit, transferred)?;
        }

        db_tx.execute(
            r#"
            UPDATE budget
            SET savings = savings + ?, total_budget = 0, remaining_budget = 0,
                last_budget_reset = ?, updated_at = CURRENT_TIMESTAMP
            WHERE id = 1
            "#,
            params![transferred, format_timestamp(&now)],
        )?;

        db_tx.execute(
            "INSERT INTO notifications (message, type) VALUES (?, ?)",
            params![MONTHLY_RESET_MESSAGE, NotificationKind::Info.as_str()],
        )?;
        let notification_id = db_tx.last_insert_rowid();

        db_tx.commit()?;

        info!(transferred, "Monthly budget reset");
        Ok(Some(MonthlyReset {
            transferred,
            notification_id,
        }))
    }
}

fn read_budget(conn: &rusqlite::Connection) -> Result<BudgetState> {
    let state = conn.query_row(
        r#"
        SELECT total_budget, remaining_budget, savings, last_budget_reset, updated_at
        FROM budget WHERE id = 1
        "#,
        [],
        |row| {
            let last_reset: Option<String> = row.get(3)?;
            let updated_at: String = row.get(4)?;
            Ok(BudgetState {
                total_budget: row.get(0)?,
                remaining_budget: row.get(1)?,
                savings: row.get(2)?,
                last_budget_reset: last_reset
                    .as_deref()
                    .map(parse_timestamp)
                    .transpose()
                    .map_err(|e| conversion_error(3, e))?,
                updated_at: parse_datetime(&updated_at),
            })
        },
    )?;
    Ok(state)
}
