//! Mood chart command

use anyhow::{Context, Result};
use budgee_core::db::Database;
use budgee_core::tools::load_mood_chart;
use chrono::{FixedOffset, NaiveDate};

use super::peso;

fn parse_date(value: Option<&str>, flag: &str) -> Result<Option<NaiveDate>> {
    value
        .map(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d"))
        .transpose()
        .with_context(|| format!("Invalid --{} date format (use YYYY-MM-DD)", flag))
}

pub fn cmd_chart(
    db: &Database,
    from: Option<&str>,
    to: Option<&str>,
    offset: FixedOffset,
) -> Result<()> {
    let from = parse_date(from, "from")?;
    let to = parse_date(to, "to")?;
    let range = match (from, to) {
        (None, None) => None,
        (from, to) => Some((
            from.or_else(|| NaiveDate::from_ymd_opt(1, 1, 1))
                .unwrap_or(NaiveDate::MIN),
            to.or_else(|| NaiveDate::from_ymd_opt(9999, 12, 31))
                .unwrap_or(NaiveDate::MAX),
        )),
    };

    let chart = load_mood_chart(db, range, offset)?;

    if chart.days.is_empty() {
        println!("No expenses in this period.");
        return Ok(());
    }

    println!();
    println!("📈 Spending and Mood");
    println!("   ─────────────────────────────────────────────────────────────");

    let max = chart
        .days
        .iter()
        .map(|d| d.total_amount)
        .fold(0.0_f64, f64::max);

    for day in &chart.days {
        let width = if max > 0.0 {
            ((day.total_amount / max) * 30.0).round() as usize
        } else {
            0
        };
        println!(
            "   {} │ {:>12} │ {:<30} │ {:.1} {}",
            day.date,
            peso(day.total_amount),
            "█".repeat(width),
            day.mood_score,
            day.dominant_mood.label()
        );
    }

    println!();
    println!("   Total spent:          {}", peso(chart.total_spent));
    println!(
        "   Average per day:      {}",
        peso(chart.average_daily_spending)
    );
    for (mood, total) in &chart.mood_totals {
        println!("   {:<21} {}", format!("{}:", mood.label()), peso(*total));
    }

    Ok(())
}
