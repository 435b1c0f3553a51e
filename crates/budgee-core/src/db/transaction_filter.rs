//! Transaction filter builder for constructing dynamic SQL queries
//!
//! Listing, totals and export all share the same WHERE clause, so it is
//! built in one place.

use chrono::NaiveDate;

use super::contains_pattern;
use crate::models::{Mood, SortOrder, TransactionKind};

/// Builder for constructing transaction query filters
///
/// The lifetime `'query` covers borrowed filter values (search text, mood set).
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter<'query> {
    pub search: Option<&'query str>,
    pub moods: Option<&'query [Mood]>,
    pub kind: Option<TransactionKind>,
    pub date_range: Option<(NaiveDate, NaiveDate)>,
    pub sort_order: SortOrder,
}

/// SQL components produced by [`TransactionFilter::build`]
pub struct FilterResult {
    /// WHERE clause including "WHERE" keyword (empty if no conditions)
    pub where_clause: String,
    /// ORDER BY clause including "ORDER BY" keyword
    pub order_clause: String,
    /// Parameters for the query (boxed for rusqlite compatibility)
    pub params: Vec<Box<dyn rusqlite::ToSql>>,
}

impl<'query> TransactionFilter<'query> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only expenses, the rows the mood chart and analysis work from
    pub fn expenses() -> Self {
        Self::new().kind(Some(TransactionKind::Expense))
    }

    /// Case-insensitive substring match on title or description
    pub fn search(mut self, query: Option<&'query str>) -> Self {
        self.search = query;
        self
    }

    /// Any of the given moods
    pub fn moods(mut self, moods: Option<&'query [Mood]>) -> Self {
        self.moods = moods;
        self
    }

    pub fn kind(mut self, kind: Option<TransactionKind>) -> Self {
        self.kind = kind;
        self
    }

    /// Inclusive range of UTC calendar days
    pub fn date_range(mut self, range: Option<(NaiveDate, NaiveDate)>) -> Self {
        self.date_range = range;
        self
    }

    pub fn sort_order(mut self, order: SortOrder) -> Self {
        self.sort_order = order;
        self
    }

    pub fn build(&self) -> FilterResult {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(q) = self.search {
            if !q.trim().is_empty() {
                conditions.push(
                    "(t.title LIKE ? ESCAPE '\\' COLLATE NOCASE \
                     OR t.description LIKE ? ESCAPE '\\' COLLATE NOCASE)"
                        .to_string(),
                );
                let pattern = contains_pattern(q.trim());
                params.push(Box::new(pattern.clone()));
                params.push(Box::new(pattern));
            }
        }

        if let Some(moods) = self.moods {
            if !moods.is_empty() {
                let placeholders: Vec<&str> = moods.iter().map(|_| "?").collect();
                conditions.push(format!("t.mood IN ({})", placeholders.join(", ")));
                for mood in moods {
                    params.push(Box::new(mood.as_str()));
                }
            }
        }

        if let Some(kind) = self.kind {
            conditions.push("t.kind = ?".to_string());
            params.push(Box::new(kind.as_str()));
        }

        // Stored dates start with YYYY-MM-DD in UTC
        if let Some((from_date, to_date)) = self.date_range {
            conditions.push("substr(t.date, 1, 10) >= ? AND substr(t.date, 1, 10) <= ?".to_string());
            params.push(Box::new(from_date.to_string()));
            params.push(Box::new(to_date.to_string()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let dir = self.sort_order.as_sql();
        let order_clause = format!(
            "ORDER BY t.date {dir}, COALESCE(t.timestamp, 0) {dir}, t.id {dir}"
        );

        FilterResult {
            where_clause,
            order_clause,
            params,
        }
    }
}

impl FilterResult {
    /// Get parameter references for query execution
    pub fn params_refs(&self) -> Vec<&dyn rusqlite::ToSql> {
        self.params.iter().map(|p| p.as_ref()).collect()
    }

    /// Take the parameter vector to append pagination params
    pub fn into_params(self) -> Vec<Box<dyn rusqlite::ToSql>> {
        self.params
    }
}
