//! MCP tool parameter and result types
//!
//! The implementations live in budgee-core so the CLI and tests can call
//! them directly.

pub use budgee_core::tools::{
    // Functions
    get_budget,
    get_mood_chart,
    get_mood_patterns,
    list_notifications,
    resolve_period,
    search_transactions,
    // Result types
    BudgetResult,
    // Params types
    MoodChartParams,
    MoodPattern,
    MoodPatternsParams,
    MoodPatternsResult,
    NotificationsParams,
    NotificationsResult,
    SearchTransactionsParams,
    SearchTransactionsResult,
    TransactionSummary,
};
