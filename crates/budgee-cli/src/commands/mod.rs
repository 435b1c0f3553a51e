//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `advisor` - Spending analysis and advisor conversations
//! - `budget` - Budget and savings commands
//! - `core` - Init and shared utilities (open_db, mood parsing, UTC offset)
//! - `export` - Transaction export
//! - `mood` - Mood chart
//! - `notifications` - Notification feed commands
//! - `prompts` - Prompt library management commands
//! - `serve` - Web server command
//! - `status` - Database status
//! - `transactions` - Expense commands (add, list, show, update, delete)

pub mod advisor;
pub mod budget;
pub mod core;
pub mod export;
pub mod mood;
pub mod notifications;
pub mod prompts;
pub mod serve;
pub mod status;
pub mod transactions;

// Re-export command functions for main.rs
pub use advisor::*;
pub use budget::*;
pub use core::*;
pub use export::*;
pub use mood::*;
pub use notifications::*;
pub use prompts::*;
pub use serve::*;
pub use status::*;
pub use transactions::*;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Format an amount in pesos
pub fn peso(amount: f64) -> String {
    format!("₱{:.2}", amount)
}
