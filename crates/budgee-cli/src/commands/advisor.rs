//! Advisor commands: spending analysis and conversations

use anyhow::{anyhow, Result};
use budgee_core::ai::plain_text;
use budgee_core::db::Database;
use budgee_core::models::Sender;
use budgee_core::{Advisor, FinancialSummary};
use chrono::FixedOffset;

use super::truncate;

pub async fn cmd_analyze(db: &Database, advisor: &Advisor, offset: FixedOffset) -> Result<()> {
    println!("🤖 Reviewing your spending...");

    let summary = FinancialSummary::load(db, offset)?;
    if summary.transactions.is_empty() {
        println!("No expenses recorded yet. Add a few first:");
        println!("  budgee add \"Coffee\" 120 --mood happy");
        return Ok(());
    }

    let analysis = advisor.analyze_spending(&summary).await?;
    db.log_audit(
        "cli",
        "analyze",
        Some("spending"),
        None,
        Some(&format!("model={}", analysis.model)),
    )?;

    println!();
    println!("{}", plain_text(&analysis.blocks));
    println!();
    println!("   (model: {})", analysis.model);

    Ok(())
}

pub fn cmd_chat_list(db: &Database, search: Option<&str>) -> Result<()> {
    let conversations = match search {
        Some(query) => db.search_conversations(query)?,
        None => db.list_conversations()?,
    };

    if conversations.is_empty() {
        println!("No conversations yet. Start one with:");
        println!("  budgee chat send \"How is my spending this week?\"");
        return Ok(());
    }

    println!();
    println!("💬 Conversations");
    println!("   ─────────────────────────────────────────────────────────────");

    for conversation in conversations {
        let unread = if conversation.unread_count > 0 {
            format!(" ({} new)", conversation.unread_count)
        } else {
            String::new()
        };
        println!(
            "   [{}] {}{} │ {}",
            conversation.id,
            conversation.name,
            unread,
            truncate(&conversation.last_message, 40)
        );
    }

    Ok(())
}

pub fn cmd_chat_new(db: &Database, name: Option<&str>) -> Result<()> {
    let conversation = db.create_conversation(name)?;
    println!(
        "✅ Started conversation [{}] {}",
        conversation.id, conversation.name
    );
    Ok(())
}

pub async fn cmd_chat_send(
    db: &Database,
    advisor: &Advisor,
    conversation_id: Option<i64>,
    text: &str,
    offset: FixedOffset,
) -> Result<()> {
    let summary = FinancialSummary::load(db, offset)?;
    let exchange = advisor
        .send_chat_message(db, conversation_id, text, &summary)
        .await?;

    db.log_audit(
        "cli",
        "send_message",
        Some("conversation"),
        Some(exchange.conversation.id),
        Some(&format!("failed={}", exchange.failed)),
    )?;

    println!();
    println!(
        "💬 [{}] {}",
        exchange.conversation.id, exchange.conversation.name
    );
    println!();
    println!("{}", exchange.advisor_message.text);

    if exchange.failed {
        println!();
        println!("   ⚠️  The advisor could not be reached. Check OLLAMA_HOST.");
    }

    Ok(())
}

pub fn cmd_chat_show(db: &Database, id: i64) -> Result<()> {
    let conversation = db
        .get_conversation(id)?
        .ok_or_else(|| anyhow!("Conversation {} not found", id))?;
    let messages = db.list_chat_messages(id)?;
    db.mark_conversation_read(id)?;

    println!();
    println!("💬 {}", conversation.name);
    println!("   ─────────────────────────────────────────────────────────────");

    for message in messages {
        let who = match message.sender {
            Sender::User => "You",
            Sender::Advisor => "Budgee",
        };
        println!();
        println!("{} ({}):", who, message.timestamp.format("%Y-%m-%d %H:%M"));
        println!("{}", message.text);
    }

    Ok(())
}

pub fn cmd_chat_rename(db: &Database, id: i64, name: &str) -> Result<()> {
    let conversation = db.rename_conversation(id, name)?;
    db.log_audit("cli", "rename", Some("conversation"), Some(id), None)?;
    println!("✅ Renamed conversation {} to '{}'", id, conversation.name);
    Ok(())
}

pub fn cmd_chat_delete(db: &Database, id: i64) -> Result<()> {
    if !db.delete_conversation(id)? {
        anyhow::bail!("Conversation {} not found", id);
    }
    db.log_audit("cli", "delete", Some("conversation"), Some(id), None)?;
    println!("🗑️  Deleted conversation {}", id);
    Ok(())
}
