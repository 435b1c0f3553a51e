//! Status command implementation

use std::path::Path;

use anyhow::Result;
use budgee_core::db::{TransactionFilter, DB_KEY_ENV};
use budgee_core::{AIBackend, Database};

use super::{open_db, peso};

fn file_size(db_path: &Path) -> Option<String> {
    let bytes = std::fs::metadata(db_path).ok()?.len() as f64;
    Some(if bytes < 1024.0 * 1024.0 {
        format!("{:.1} KB", bytes / 1024.0)
    } else {
        format!("{:.1} MB", bytes / (1024.0 * 1024.0))
    })
}

fn encryption_line(no_encrypt: bool, has_key: bool) -> String {
    match (no_encrypt, has_key) {
        (true, _) => "off (--no-encrypt)".to_string(),
        (false, true) => format!("on ({} set)", DB_KEY_ENV),
        (false, false) => format!("required, but {} is not set", DB_KEY_ENV),
    }
}

fn print_ledger(db: &Database) {
    if let Ok(budget) = db.get_budget() {
        println!("  Budget:        {}", peso(budget.total_budget));
        println!("  Remaining:     {}", peso(budget.remaining_budget));
        println!("  Savings:       {}", peso(budget.savings));
    }
    if let Ok(totals) = db.transaction_totals(&TransactionFilter::expenses()) {
        println!(
            "  Expenses:      {} totalling {}",
            totals.count,
            peso(totals.total_amount)
        );
    }
    if let Ok(conversations) = db.list_conversations() {
        println!("  Conversations: {}", conversations.len());
    }
    if let Ok(unread) = db.list_notifications(100) {
        println!("  Notifications: {}", unread.len());
    }
}

pub fn cmd_status(db_path: &Path, no_encrypt: bool) -> Result<()> {
    let has_key = std::env::var(DB_KEY_ENV).is_ok();

    println!("Budgee");
    println!("  Database:      {}", db_path.display());
    println!(
        "  Size:          {}",
        file_size(db_path).unwrap_or_else(|| "not initialized".to_string())
    );
    println!("  Encryption:    {}", encryption_line(no_encrypt, has_key));

    if db_path.exists() {
        match open_db(db_path, no_encrypt) {
            Ok(db) => print_ledger(&db),
            Err(e) => {
                println!("  Cannot open database: {}", e);
                if !no_encrypt {
                    println!("  Check {} or pass --no-encrypt", DB_KEY_ENV);
                }
            }
        }
    }

    match budgee_core::AIClient::from_env() {
        Some(client) => println!("  Advisor:       {} at {}", client.model(), client.host()),
        None => println!("  Advisor:       not configured (set OLLAMA_HOST)"),
    }
    Ok(())
}
