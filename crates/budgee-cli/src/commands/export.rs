//! Export command implementation

use std::path::Path;

use anyhow::{anyhow, Result};
use budgee_core::db::{Database, TransactionFilter};
use budgee_core::export::{export_transactions, ExportFormat};
use budgee_core::tools::resolve_period;

use super::parse_moods;

pub fn cmd_export(
    db: &Database,
    file: &Path,
    format: &str,
    mood: Option<&str>,
    period: &str,
) -> Result<()> {
    let format: ExportFormat = format.parse().map_err(|e: String| anyhow!(e))?;
    let moods = mood.map(parse_moods).transpose()?;
    let range = resolve_period(period)?;

    let filter = TransactionFilter::new()
        .moods(moods.as_deref())
        .date_range(range);
    let count = export_transactions(db, file, format, &filter)?;

    db.log_audit(
        "cli",
        "export",
        Some("transaction"),
        None,
        Some(&format!("format={}, count={}", format.as_str(), count)),
    )?;

    println!(
        "✅ Exported {} transaction(s) to {} ({})",
        count,
        file.display(),
        format.as_str()
    );
    Ok(())
}
