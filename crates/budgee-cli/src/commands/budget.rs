//! Budget and savings command implementations

use anyhow::Result;
use budgee_core::db::Database;
use budgee_core::models::BudgetState;
use chrono::Utc;

use super::peso;

fn print_budget(budget: &BudgetState) {
    println!("   Total budget:     {}", peso(budget.total_budget));
    println!("   Remaining:        {}", peso(budget.remaining_budget));
    println!("   Savings:          {}", peso(budget.savings));
}

pub fn cmd_budget_show(db: &Database) -> Result<()> {
    let budget = db.get_budget()?;

    println!();
    println!("💰 Budget");
    println!("   ─────────────────────────────────────────");
    print_budget(&budget);

    let spent = (budget.spent_ratio() * 100.0).round();
    let filled = (budget.spent_ratio() * 20.0).round() as usize;
    println!(
        "   Spent:            [{}{}] {}%",
        "█".repeat(filled),
        "░".repeat(20 - filled.min(20)),
        spent
    );
    match budget.last_budget_reset {
        Some(reset) => println!("   Last reset:       {}", reset.format("%Y-%m-%d")),
        None => println!("   Last reset:       never"),
    }

    Ok(())
}

pub fn cmd_budget_set(db: &Database, amount: f64) -> Result<()> {
    let budget = db.set_total_budget(amount)?;
    db.log_audit(
        "cli",
        "set_budget",
        Some("budget"),
        None,
        Some(&format!("amount={:.2}", amount)),
    )?;

    println!("✅ Monthly budget set to {}", peso(budget.total_budget));
    Ok(())
}

pub fn cmd_budget_add(db: &Database, amount: f64) -> Result<()> {
    let budget = db.add_to_budget(amount)?;
    db.log_audit(
        "cli",
        "budget_deposit",
        Some("budget"),
        None,
        Some(&format!("amount={:.2}", amount)),
    )?;

    println!("✅ Added {} to the budget", peso(amount));
    print_budget(&budget);
    Ok(())
}

pub fn cmd_budget_reset(db: &Database) -> Result<()> {
    match db.check_and_reset_monthly_budget(Utc::now())? {
        Some(reset) => {
            db.log_audit(
                "cli",
                "monthly_reset",
                Some("budget"),
                None,
                Some(&format!("transferred={:.2}", reset.transferred)),
            )?;
            println!(
                "🔄 Monthly reset done: {} moved to savings",
                peso(reset.transferred)
            );
            print_budget(&db.get_budget()?);
        }
        None => println!("Budget was already reset this month."),
    }
    Ok(())
}

pub fn cmd_savings_deposit(db: &Database, amount: f64) -> Result<()> {
    let budget = db.add_to_savings(amount)?;
    db.log_audit(
        "cli",
        "savings_deposit",
        Some("budget"),
        None,
        Some(&format!("amount={:.2}", amount)),
    )?;

    println!("🐷 Saved {}", peso(amount));
    print_budget(&budget);
    Ok(())
}

pub fn cmd_savings_withdraw(db: &Database, amount: f64) -> Result<()> {
    let budget = db.transfer_from_savings(amount)?;
    db.log_audit(
        "cli",
        "savings_withdrawal",
        Some("budget"),
        None,
        Some(&format!("amount={:.2}", amount)),
    )?;

    println!("↩️  Moved {} from savings into the budget", peso(amount));
    print_budget(&budget);
    Ok(())
}
