//! Transaction command implementations

use anyhow::{anyhow, Result};
use budgee_core::db::{Database, TransactionFilter};
use budgee_core::models::{
    parse_transaction_date, NewTransaction, Transaction, TransactionKind, TransactionUpdate,
};

use super::{parse_mood, parse_moods, peso, truncate};

pub fn cmd_add(
    db: &Database,
    title: &str,
    amount: f64,
    mood: &str,
    description: &str,
    date: Option<&str>,
) -> Result<()> {
    let mood = parse_mood(mood)?;
    let mut new_tx = NewTransaction::now(title, description, amount, mood);
    if let Some(date) = date {
        new_tx.date = parse_transaction_date(date)?;
    }

    let tx = db.add_transaction(&new_tx)?;
    db.log_audit(
        "cli",
        "create",
        Some("transaction"),
        Some(tx.id),
        Some(&format!("amount={:.2}, mood={}", tx.amount, tx.mood)),
    )?;

    let budget = db.get_budget()?;
    println!(
        "✅ Recorded [{}] {} {} ({})",
        tx.id,
        tx.title,
        peso(tx.amount),
        tx.mood.label()
    );
    println!("   Remaining budget: {}", peso(budget.remaining_budget));

    Ok(())
}

pub fn cmd_transactions_list(
    db: &Database,
    limit: i64,
    search: Option<&str>,
    mood: Option<&str>,
) -> Result<()> {
    let moods = mood.map(parse_moods).transpose()?;
    let filter = TransactionFilter::new()
        .search(search)
        .moods(moods.as_deref());
    let transactions = db.list_transactions(&filter, limit, 0)?;

    if transactions.is_empty() {
        println!("No transactions found. Record one with:");
        println!("  budgee add \"Coffee\" 120 --mood happy");
        return Ok(());
    }

    println!();
    println!("📝 Recent Transactions");
    println!("   ─────────────────────────────────────────────────────────────");

    for tx in transactions {
        print_row(&tx);
    }

    Ok(())
}

fn print_row(tx: &Transaction) {
    let amount_str = match tx.kind {
        TransactionKind::Expense => format!("\x1b[31m{}\x1b[0m", peso(tx.amount)),
        _ => format!("\x1b[32m{}\x1b[0m", peso(tx.amount)),
    };
    let label = match tx.kind {
        TransactionKind::Expense => tx.mood.label(),
        _ => tx.kind.as_str(),
    };

    println!(
        "   [{}] {} │ {:>12} │ {:<8} │ {}",
        tx.id,
        tx.date.format("%Y-%m-%d"),
        amount_str,
        label,
        truncate(&tx.title, 35)
    );
}

pub fn cmd_transactions_show(db: &Database, id: i64) -> Result<()> {
    let tx = db
        .get_transaction(id)?
        .ok_or_else(|| anyhow!("Transaction {} not found", id))?;

    println!();
    println!("📝 Transaction {}", tx.id);
    println!("   ─────────────────────────────────────────");
    println!("   Title:       {}", tx.title);
    if !tx.description.is_empty() {
        println!("   Description: {}", tx.description);
    }
    println!("   Amount:      {}", peso(tx.amount));
    println!("   Date:        {}", tx.date.format("%Y-%m-%d %H:%M"));
    println!("   Mood:        {}", tx.mood.label());
    println!("   Kind:        {}", tx.kind.as_str());
    if let Some(updated) = tx.updated_at {
        println!("   Updated:     {}", updated.format("%Y-%m-%d %H:%M"));
    }

    Ok(())
}

pub fn cmd_transactions_update(
    db: &Database,
    id: i64,
    title: Option<String>,
    description: Option<String>,
    amount: Option<f64>,
    mood: Option<&str>,
    date: Option<&str>,
) -> Result<()> {
    let update = TransactionUpdate {
        title,
        description,
        amount,
        date: date.map(parse_transaction_date).transpose()?,
        mood: mood.map(parse_mood).transpose()?,
    };
    if update.is_empty() {
        anyhow::bail!("Nothing to update. Pass --title, --description, --amount, --mood or --date");
    }

    let tx = db.update_transaction(id, &update)?;
    db.log_audit("cli", "update", Some("transaction"), Some(id), None)?;

    println!(
        "✅ Updated [{}] {} {} ({})",
        tx.id,
        tx.title,
        peso(tx.amount),
        tx.mood.label()
    );
    println!(
        "   Remaining budget: {}",
        peso(db.get_budget()?.remaining_budget)
    );

    Ok(())
}

pub fn cmd_transactions_delete(db: &Database, id: i64) -> Result<()> {
    let tx = db.delete_transaction(id)?;
    db.log_audit(
        "cli",
        "delete",
        Some("transaction"),
        Some(id),
        Some(&format!("refund={:.2}", tx.amount)),
    )?;

    println!(
        "🗑️  Deleted '{}' and refunded {} to the budget",
        tx.title,
        peso(tx.amount)
    );

    Ok(())
}
