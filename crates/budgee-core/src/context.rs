//! Financial context for the advisor
//!
//! Collects the budget balances, recent expenses and per-mood spending into
//! one serializable summary. Prompts embed it as JSON.

use std::collections::{BTreeMap, HashMap};

use chrono::FixedOffset;
use serde::Serialize;

use crate::db::{Database, TransactionFilter};
use crate::error::Result;
use crate::models::{BudgetState, Mood, Transaction};
use crate::mood::mood_spending_totals;

/// Currency every amount is expressed in
pub const CURRENCY: &str = "PHP";

/// Most recent expenses included in a summary
pub const MAX_SUMMARY_TRANSACTIONS: usize = 200;

/// One expense as the advisor sees it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryTransaction {
    /// Local calendar date, `YYYY-MM-DD`
    pub date: String,
    pub amount: f64,
    pub title: String,
    pub mood: Mood,
    pub description: String,
}

/// Snapshot of the user's finances
#[derive(Debug, Clone, Serialize)]
pub struct FinancialSummary {
    pub total_budget: f64,
    pub remaining_budget: f64,
    pub savings: f64,
    pub currency: &'static str,
    /// Newest first
    pub transactions: Vec<SummaryTransaction>,
    /// Total spent per mood over every expense
    pub mood_patterns: BTreeMap<Mood, f64>,
}

impl FinancialSummary {
    /// Build from balances and expenses (newest first)
    pub fn new(budget: &BudgetState, expenses: &[Transaction], offset: FixedOffset) -> Self {
        let transactions = expenses
            .iter()
            .take(MAX_SUMMARY_TRANSACTIONS)
            .map(|t| SummaryTransaction {
                date: t.date.with_timezone(&offset).format("%Y-%m-%d").to_string(),
                amount: t.amount,
                title: t.title.clone(),
                mood: t.mood,
                description: t.description.clone(),
            })
            .collect();

        Self {
            total_budget: budget.total_budget,
            remaining_budget: budget.remaining_budget,
            savings: budget.savings,
            currency: CURRENCY,
            transactions,
            mood_patterns: mood_spending_totals(expenses),
        }
    }

    /// Read the current ledger
    pub fn load(db: &Database, offset: FixedOffset) -> Result<Self> {
        let budget = db.get_budget()?;
        let expenses = db.all_transactions(&TransactionFilter::expenses())?;
        Ok(Self::new(&budget, &expenses, offset))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Variables for the advisor prompt templates
    pub fn template_vars(&self) -> Result<HashMap<&'static str, String>> {
        let mut vars = HashMap::new();
        vars.insert("financial_data", self.to_json()?);
        vars.insert("transactions", serde_json::to_string(&self.transactions)?);
        vars.insert("mood_patterns", serde_json::to_string(&self.mood_patterns)?);
        vars.insert("total_budget", format!("{:.2}", self.total_budget));
        vars.insert("remaining_budget", format!("{:.2}", self.remaining_budget));
        vars.insert("savings", format!("{:.2}", self.savings));
        vars.insert("currency", self.currency.to_string());
        Ok(vars)
    }
}
