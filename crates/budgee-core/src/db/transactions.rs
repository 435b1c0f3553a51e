//! Transaction operations
//!
//! Every operation that touches a balance runs inside one SQLite
//! transaction together with the budget row update.

use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use tracing::debug;

use super::transaction_filter::TransactionFilter;
use super::{conversion_error, format_timestamp, parse_datetime, parse_timestamp, Database};
use crate::error::{Error, Result};
use crate::models::{
    Mood, NewTransaction, Transaction, TransactionKind, TransactionTotals, TransactionUpdate,
    LARGE_EXPENSE_THRESHOLD,
};

const TRANSACTION_COLUMNS: &str = "t.id, t.title, t.description, t.amount, t.date, t.timestamp, \
     t.mood, t.kind, t.created_at, t.updated_at";

impl Database {
    /// Record an expense and deduct it from the remaining budget
    ///
    /// Fails with `InsufficientBudget` when the amount exceeds what is left;
    /// nothing is written in that case.
    pub fn add_transaction(&self, tx: &NewTransaction) -> Result<Transaction> {
        tx.validate()?;

        let mut conn = self.conn()?;
        let db_tx = conn.transaction()?;

        let remaining = remaining_budget(&db_tx)?;
        if tx.amount > remaining {
            return Err(Error::InsufficientBudget {
                requested: tx.amount,
                available: remaining,
            });
        }

        db_tx.execute(
            r#"
            INSERT INTO transactions (title, description, amount, date, timestamp, mood, kind)
            VALUES (?, ?, ?, ?, ?, ?, 'expense')
            "#,
            params![
                tx.title.trim(),
                tx.description,
                tx.amount,
                format_timestamp(&tx.date),
                tx.timestamp,
                tx.mood.as_str(),
            ],
        )?;
        let id = db_tx.last_insert_rowid();

        db_tx.execute(
            "UPDATE budget SET remaining_budget = remaining_budget - ?, updated_at = CURRENT_TIMESTAMP WHERE id = 1",
            params![tx.amount],
        )?;

        let created = fetch_transaction(&db_tx, id)?
            .ok_or_else(|| Error::NotFound(format!("Transaction {}", id)))?;
        db_tx.commit()?;

        debug!(id, amount = tx.amount, mood = %tx.mood, "Recorded expense");
        Ok(created)
    }

    /// Get a transaction by ID
    pub fn get_transaction(&self, id: i64) -> Result<Option<Transaction>> {
        let conn = self.conn()?;
        fetch_transaction(&conn, id)
    }

    /// Apply a partial update to an expense
    ///
    /// The remaining budget moves by the change in amount. An increase larger
    /// than the remaining budget is rejected.
    pub fn update_transaction(&self, id: i64, update: &TransactionUpdate) -> Result<Transaction> {
        update.validate()?;

        let mut conn = self.conn()?;
        let db_tx = conn.transaction()?;

        let existing = fetch_transaction(&db_tx, id)?
            .ok_or_else(|| Error::NotFound(format!("Transaction {}", id)))?;
        ensure_expense(&existing)?;

        let diff = update.amount.map(|a| a - existing.amount).unwrap_or(0.0);
        let remaining = remaining_budget(&db_tx)?;
        if diff > remaining {
            return Err(Error::InsufficientBudget {
                requested: diff,
                available: remaining,
            });
        }

        let title = update
            .title
            .as_deref()
            .map(str::trim)
            .unwrap_or(existing.title.as_str());
        let description = update
            .description
            .as_deref()
            .unwrap_or(existing.description.as_str());
        let amount = update.amount.unwrap_or(existing.amount);
        let date = update.date.unwrap_or(existing.date);
        let mood = update.mood.unwrap_or(existing.mood);
        // A moved expense is ranked by its new date, not the old entry time
        let stored_date = format_timestamp(&date);
        let timestamp = if stored_date == format_timestamp(&existing.date) {
            existing.timestamp
        } else {
            None
        };

        db_tx.execute(
            r#"
            UPDATE transactions
            SET title = ?, description = ?, amount = ?, date = ?, timestamp = ?, mood = ?,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = ?
            "#,
            params![
                title,
                description,
                amount,
                stored_date,
                timestamp,
                mood.as_str(),
                id
            ],
        )?;

        if diff != 0.0 {
            db_tx.execute(
                "UPDATE budget SET remaining_budget = remaining_budget - ?, updated_at = CURRENT_TIMESTAMP WHERE id = 1",
                params![diff],
            )?;
        }

        let updated = fetch_transaction(&db_tx, id)?
            .ok_or_else(|| Error::NotFound(format!("Transaction {}", id)))?;
        db_tx.commit()?;

        debug!(id, diff, "Updated expense");
        Ok(updated)
    }

    /// Delete an expense and refund its amount to the remaining budget
    pub fn delete_transaction(&self, id: i64) -> Result<Transaction> {
        let mut conn = self.conn()?;
        let db_tx = conn.transaction()?;

        let existing = fetch_transaction(&db_tx, id)?
            .ok_or_else(|| Error::NotFound(format!("Transaction {}", id)))?;
        ensure_expense(&existing)?;

        db_tx.execute("DELETE FROM transactions WHERE id = ?", params![id])?;
        db_tx.execute(
            "UPDATE budget SET remaining_budget = remaining_budget + ?, updated_at = CURRENT_TIMESTAMP WHERE id = 1",
            params![existing.amount],
        )?;
        db_tx.commit()?;

        debug!(id, refund = existing.amount, "Deleted expense");
        Ok(existing)
    }

    /// List transactions matching a filter
    pub fn list_transactions(
        &self,
        filter: &TransactionFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let built = filter.build();

        let sql = format!(
            "SELECT {} FROM transactions t {} {} LIMIT ? OFFSET ?",
            TRANSACTION_COLUMNS, built.where_clause, built.order_clause
        );

        let mut params = built.into_params();
        params.push(Box::new(limit));
        params.push(Box::new(offset));

        let mut stmt = conn.prepare(&sql)?;
        let params_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let transactions = stmt
            .query_map(params_refs.as_slice(), row_to_transaction)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(transactions)
    }

    /// Every transaction matching a filter, without paging
    pub fn all_transactions(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>> {
        // SQLite treats a negative LIMIT as no limit
        self.list_transactions(filter, -1, 0)
    }

    /// Count, sum and large-expense count for a filter
    pub fn transaction_totals(&self, filter: &TransactionFilter) -> Result<TransactionTotals> {
        let conn = self.conn()?;
        let built = filter.build();

        let sql = format!(
            r#"
            SELECT COUNT(*), COALESCE(SUM(t.amount), 0),
                   COALESCE(SUM(CASE WHEN t.amount > {} THEN 1 ELSE 0 END), 0)
            FROM transactions t {}
            "#,
            LARGE_EXPENSE_THRESHOLD, built.where_clause
        );

        let totals = conn.query_row(&sql, built.params_refs().as_slice(), |row| {
            Ok(TransactionTotals {
                count: row.get(0)?,
                total_amount: row.get(1)?,
                large_count: row.get(2)?,
            })
        })?;

        Ok(totals)
    }

    /// Record a budget or savings movement in the ledger
    ///
    /// Runs on the caller's SQLite transaction so it commits together with
    /// the balance change.
    pub(super) fn insert_bookkeeping(
        db_tx: &rusqlite::Transaction<'_>,
        kind: TransactionKind,
        amount: f64,
    ) -> Result<i64> {
        let (title, description) = kind
            .bookkeeping_labels()
            .ok_or_else(|| Error::InvalidData(format!("{} is not a bookkeeping entry", kind)))?;
        let now = Utc::now();

        db_tx.execute(
            r#"
            INSERT INTO transactions (title, description, amount, date, timestamp, mood, kind)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                title,
                description,
                amount,
                format_timestamp(&now),
                now.timestamp_millis(),
                Mood::Neutral.as_str(),
                kind.as_str(),
            ],
        )?;

        Ok(db_tx.last_insert_rowid())
    }
}

/// Current remaining budget, read inside an open transaction
pub(super) fn remaining_budget(conn: &rusqlite::Connection) -> Result<f64> {
    Ok(conn.query_row(
        "SELECT remaining_budget FROM budget WHERE id = 1",
        [],
        |row| row.get(0),
    )?)
}

fn ensure_expense(tx: &Transaction) -> Result<()> {
    if tx.kind != TransactionKind::Expense {
        return Err(Error::InvalidData(format!(
            "Transaction {} is a {} entry and cannot be changed",
            tx.id, tx.kind
        )));
    }
    Ok(())
}

fn fetch_transaction(conn: &rusqlite::Connection, id: i64) -> Result<Option<Transaction>> {
    let sql = format!("SELECT {} FROM transactions t WHERE t.id = ?", TRANSACTION_COLUMNS);
    Ok(conn
        .query_row(&sql, params![id], row_to_transaction)
        .optional()?)
}

fn row_to_transaction(row: &rusqlite::Row) -> rusqlite::Result<Transaction> {
    let date_str: String = row.get(4)?;
    let mood_str: String = row.get(6)?;
    let kind_str: String = row.get(7)?;
    let created_at_str: String = row.get(8)?;
    let updated_at_str: Option<String> = row.get(9)?;

    Ok(Transaction {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        amount: row.get(3)?,
        date: parse_timestamp(&date_str).map_err(|e| conversion_error(4, e))?,
        timestamp: row.get(5)?,
        mood: mood_str.parse().map_err(|e| conversion_error(6, e))?,
        kind: kind_str.parse().map_err(|e| conversion_error(7, e))?,
        created_at: parse_datetime(&created_at_str),
        updated_at: updated_at_str.as_deref().map(parse_datetime),
    })
}
