//! Notification feed

use rusqlite::params;

use super::{conversion_error, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{Notification, NotificationKind};

impl Database {
    pub fn add_notification(&self, message: &str, kind: NotificationKind) -> Result<Notification> {
        if message.trim().is_empty() {
            return Err(Error::InvalidData("Notification message is required".into()));
        }

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO notifications (message, type) VALUES (?, ?)",
            params![message, kind.as_str()],
        )?;
        let id = conn.last_insert_rowid();

        let notification = conn.query_row(
            "SELECT id, message, type, created_at FROM notifications WHERE id = ?",
            params![id],
            row_to_notification,
        )?;
        Ok(notification)
    }

    /// Newest first
    pub fn list_notifications(&self, limit: i64) -> Result<Vec<Notification>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT id, message, type, created_at
            FROM notifications
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#,
        )?;

        let notifications = stmt
            .query_map(params![limit], row_to_notification)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(notifications)
    }

    /// Returns whether the notification existed
    pub fn remove_notification(&self, id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let removed = conn.execute("DELETE FROM notifications WHERE id = ?", params![id])?;
        Ok(removed > 0)
    }

    /// Returns how many notifications were removed
    pub fn clear_notifications(&self) -> Result<usize> {
        let conn = self.conn()?;
        Ok(conn.execute("DELETE FROM notifications", [])?)
    }
}

fn row_to_notification(row: &rusqlite::Row) -> rusqlite::Result<Notification> {
    let kind_str: String = row.get(2)?;
    let created_at: String = row.get(3)?;
    Ok(Notification {
        id: row.get(0)?,
        message: row.get(1)?,
        kind: kind_str.parse().map_err(|e| conversion_error(2, e))?,
        created_at: parse_datetime(&created_at),
    })
}
