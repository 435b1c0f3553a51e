//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the database
//! - `cmd_init` - Initialize the database
//! - helpers shared by several commands (moods, UTC offset, advisor)

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use chrono::{FixedOffset, Offset, Utc};
use budgee_core::db::Database;
use budgee_core::models::Mood;
use budgee_core::mood::offset_from_minutes;
use budgee_core::{AIClient, Advisor};

/// Environment variable holding the offset used to group expenses into days
pub const UTC_OFFSET_ENV: &str = "BUDGEE_UTC_OFFSET_MINUTES";

/// Open database with encryption by default, or unencrypted if --no-encrypt
pub fn open_db(db_path: &Path, no_encrypt: bool) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .ok_or_else(|| anyhow!("Database path must be valid UTF-8"))?;
    if no_encrypt {
        Database::new_unencrypted(path_str).context("Failed to open database (unencrypted)")
    } else {
        Database::new(path_str).context("Failed to open database")
    }
}

pub fn cmd_init(db_path: &Path, no_encrypt: bool) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    let db = open_db(db_path, no_encrypt)?;
    let budget = db.get_budget().context("Failed to read budget")?;
    println!("   Budget: {}", super::peso(budget.total_budget));

    if no_encrypt {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    } else {
        println!("   🔒 Encryption: ENABLED");
    }

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Set a budget: budgee budget set 3000");
    println!("  2. Record an expense: budgee add \"Coffee\" 120 --mood happy");
    println!("  3. Start web UI: budgee serve");

    Ok(())
}

/// Parse a mood name (aliases such as "rad" and "awful" are accepted)
pub fn parse_mood(s: &str) -> Result<Mood> {
    s.trim().parse::<Mood>().map_err(|e| anyhow!(e))
}

/// Parse a comma-separated mood list
pub fn parse_moods(s: &str) -> Result<Vec<Mood>> {
    s.split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(parse_mood)
        .collect()
}

/// Offset for calendar days, from BUDGEE_UTC_OFFSET_MINUTES (UTC when unset)
pub fn utc_offset_from_env() -> Result<FixedOffset> {
    match std::env::var(UTC_OFFSET_ENV) {
        Ok(value) => parse_utc_offset(&value),
        Err(_) => Ok(Utc.fix()),
    }
}

pub fn parse_utc_offset(value: &str) -> Result<FixedOffset> {
    let minutes: i32 = value
        .trim()
        .parse()
        .with_context(|| format!("{} must be a whole number of minutes", UTC_OFFSET_ENV))?;
    offset_from_minutes(minutes)
        .ok_or_else(|| anyhow!("{} out of range: {}", UTC_OFFSET_ENV, minutes))
}

/// Advisor from the AI environment variables
pub fn advisor_from_env() -> Result<Advisor> {
    AIClient::from_env().map(Advisor::new).ok_or_else(|| {
        anyhow!("AI advisor not configured. Set OLLAMA_HOST or BUDGEE_AI_BACKEND.")
    })
}
