//! Audit trail of ledger changes
//!
//! Every balance change, expense edit and advisor call is recorded with the
//! identity that made it ("scheduler" for the monthly reset, "cli" for the
//! command line).

use rusqlite::{params, Row};

use super::{AuditEntry, Database};
use crate::error::Result;

impl Database {
    /// Record an action against an entity (budget, transaction, conversation, ...)
    pub fn log_audit(
        &self,
        user_email: &str,
        action: &str,
        entity_type: Option<&str>,
        entity_id: Option<i64>,
        details: Option<&str>,
    ) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO audit_log (user_email, action, entity_type, entity_id, details) \
             VALUES (?, ?, ?, ?, ?)",
            params![user_email, action, entity_type, entity_id, details],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Newest entries first
    pub fn list_audit_log(&self, limit: i64) -> Result<Vec<AuditEntry>> {
        self.query_audit_log(None, limit)
    }

    /// Newest entries first, only those touching `entity_type`
    pub fn list_audit_log_for(&self, entity_type: &str, limit: i64) -> Result<Vec<AuditEntry>> {
        self.query_audit_log(Some(entity_type), limit)
    }

    fn query_audit_log(&self, entity_type: Option<&str>, limit: i64) -> Result<Vec<AuditEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, timestamp, user_email, action, entity_type, entity_id, details \
             FROM audit_log \
             WHERE (?1 IS NULL OR entity_type = ?1) \
             ORDER BY id DESC \
             LIMIT ?2",
        )?;
        let entries = stmt
            .query_map(params![entity_type, limit], row_to_entry)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entries)
    }
}

fn row_to_entry(row: &Row) -> rusqlite::Result<AuditEntry> {
    Ok(AuditEntry {
        id: row.get(0)?,
        timestamp: row.get(1)?,
        user_email: row.get(2)?,
        action: row.get(3)?,
        entity_type: row.get(4)?,
        entity_id: row.get(5)?,
        details: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use crate::db::Database;

    #[test]
    fn test_audit_log_filters_by_entity() {
        let db = Database::in_memory().unwrap();
        db.log_audit("cli", "set_budget", Some("budget"), None, Some("amount=3000.00"))
            .unwrap();
        db.log_audit("ana@example.com", "create", Some("transaction"), Some(7), None)
            .unwrap();
        db.log_audit("scheduler", "monthly_reset", Some("budget"), None, None)
            .unwrap();

        let all = db.list_audit_log(10).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].action, "monthly_reset");

        let budget = db.list_audit_log_for("budget", 10).unwrap();
        assert_eq!(budget.len(), 2);
        assert!(budget.iter().all(|e| e.entity_type.as_deref() == Some("budget")));

        let limited = db.list_audit_log(1).unwrap();
        assert_eq!(limited.len(), 1);
    }
}
