//! Transaction export
//!
//! Supports:
//! - CSV with a header row, for spreadsheets
//! - JSON lines, one transaction object per line
//!
//! Files are written to a temporary file next to the target and moved into
//! place once complete, so a failed export never leaves a partial file.

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::info;

use crate::db::{format_timestamp, Database, TransactionFilter};
use crate::error::{Error, Result};
use crate::models::{Mood, Transaction, TransactionKind};

/// Export format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Csv,
    /// JSON lines
    Json,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Csv => "text/csv; charset=utf-8",
            Self::Json => "application/x-ndjson",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "jsonl",
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" | "jsonl" | "ndjson" => Ok(Self::Json),
            _ => Err(format!("Unknown export format: {} (expected csv or json)", s)),
        }
    }
}

/// A transaction row as exported
#[derive(Debug, Clone, Serialize)]
pub struct TransactionExport<'a> {
    pub id: i64,
    pub date: String,
    pub title: &'a str,
    pub description: &'a str,
    pub amount: f64,
    pub mood: Mood,
    pub kind: TransactionKind,
}

impl<'a> From<&'a Transaction> for TransactionExport<'a> {
    fn from(tx: &'a Transaction) -> Self {
        Self {
            id: tx.id,
            date: format_timestamp(&tx.date),
            title: &tx.title,
            description: &tx.description,
            amount: tx.amount,
            mood: tx.mood,
            kind: tx.kind,
        }
    }
}

/// Write transactions in `format`, returning how many were written
pub fn write_transactions<W: Write>(
    mut writer: W,
    format: ExportFormat,
    transactions: &[Transaction],
) -> Result<usize> {
    match format {
        ExportFormat::Csv => {
            let mut csv = csv::Writer::from_writer(writer);
            for tx in transactions {
                csv.serialize(TransactionExport::from(tx))?;
            }
            csv.flush()?;
        }
        ExportFormat::Json => {
            for tx in transactions {
                serde_json::to_writer(&mut writer, &TransactionExport::from(tx))?;
                writer.write_all(b"\n")?;
            }
            writer.flush()?;
        }
    }
    Ok(transactions.len())
}

/// Render transactions in memory (for HTTP responses)
pub fn render_transactions(format: ExportFormat, transactions: &[Transaction]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    write_transactions(&mut buf, format, transactions)?;
    Ok(buf)
}

/// Export the transactions matching `filter` to `path`
///
/// The file is replaced atomically. Returns the number of transactions written.
pub fn export_transactions(
    db: &Database,
    path: &Path,
    format: ExportFormat,
    filter: &TransactionFilter,
) -> Result<usize> {
    let transactions = db.all_transactions(filter)?;

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    let count = write_transactions(&mut tmp, format, &transactions)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| Error::Io(e.error))?;

    info!(count, path = %path.display(), format = format.as_str(), "Exported transactions");
    Ok(count)
}
