//! Notification command implementations

use anyhow::Result;
use budgee_core::db::Database;
use budgee_core::models::NotificationKind;

pub fn cmd_notifications_list(db: &Database, limit: i64) -> Result<()> {
    let notifications = db.list_notifications(limit)?;

    if notifications.is_empty() {
        println!("No notifications.");
        return Ok(());
    }

    println!();
    println!("🔔 Notifications");
    println!("   ─────────────────────────────────────────────────────────────");

    for n in notifications {
        let icon = match n.kind {
            NotificationKind::Info => "ℹ️ ",
            NotificationKind::Success => "✅",
            NotificationKind::Warning => "⚠️ ",
            NotificationKind::Error => "❌",
        };
        println!(
            "   [{}] {} {} │ {}",
            n.id,
            icon,
            n.created_at.format("%Y-%m-%d"),
            n.message
        );
    }

    Ok(())
}

pub fn cmd_notifications_dismiss(db: &Database, id: i64) -> Result<()> {
    if !db.remove_notification(id)? {
        anyhow::bail!("Notification {} not found", id);
    }
    println!("✅ Dismissed notification {}", id);
    Ok(())
}

pub fn cmd_notifications_clear(db: &Database) -> Result<()> {
    let removed = db.clear_notifications()?;
    db.log_audit(
        "cli",
        "clear",
        Some("notification"),
        None,
        Some(&format!("removed={}", removed)),
    )?;
    println!("✅ Dismissed {} notification(s)", removed);
    Ok(())
}
