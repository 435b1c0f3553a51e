//! Advisor conversations and chat messages

use rusqlite::{params, OptionalExtension};

use super::{contains_pattern, conversion_error, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{ChatMessage, Conversation, Sender, DEFAULT_CONVERSATION_NAME};

/// Characters of a message kept in the conversation preview
const PREVIEW_CHARS: usize = 30;

const CONVERSATION_COLUMNS: &str =
    "id, name, last_message, unread_count, created_at, updated_at";

/// Shorten a message for the conversation list
pub fn conversation_preview(text: &str) -> String {
    let text = text.trim();
    if text.chars().count() > PREVIEW_CHARS {
        let head: String = text.chars().take(PREVIEW_CHARS).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

/// Next value of the activity counter that orders the conversation list
const NEXT_ACTIVITY: &str = "(SELECT COALESCE(MAX(activity_seq), 0) + 1 FROM conversations)";

impl Database {
    /// Start a conversation, named "New Chat" unless a name is given
    pub fn create_conversation(&self, name: Option<&str>) -> Result<Conversation> {
        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(DEFAULT_CONVERSATION_NAME);

        let conn = self.conn()?;
        conn.execute(
            &format!(
                "INSERT INTO conversations (name, activity_seq) VALUES (?, {})",
                NEXT_ACTIVITY
            ),
            params![name],
        )?;
        let id = conn.last_insert_rowid();

        fetch_conversation(&conn, id)?
            .ok_or_else(|| Error::NotFound(format!("Conversation {}", id)))
    }

    pub fn get_conversation(&self, id: i64) -> Result<Option<Conversation>> {
        let conn = self.conn()?;
        fetch_conversation(&conn, id)
    }

    /// Most recently active first
    pub fn list_conversations(&self) -> Result<Vec<Conversation>> {
        self.search_conversations("")
    }

    /// Conversations whose name contains `query`, ignoring case
    pub fn search_conversations(&self, query: &str) -> Result<Vec<Conversation>> {
        let conn = self.conn()?;
        let pattern = contains_pattern(query.trim());

        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {}
            FROM conversations
            WHERE name LIKE ? ESCAPE '\' COLLATE NOCASE
            ORDER BY activity_seq DESC, id DESC
            "#,
            CONVERSATION_COLUMNS
        ))?;

        let conversations = stmt
            .query_map(params![pattern], row_to_conversation)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(conversations)
    }

    pub fn rename_conversation(&self, id: i64, name: &str) -> Result<Conversation> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidData("Conversation name cannot be empty".into()));
        }

        let conn = self.conn()?;
        let updated = conn.execute(
            &format!(
                "UPDATE conversations SET name = ?, updated_at = CURRENT_TIMESTAMP, activity_seq = {} WHERE id = ?",
                NEXT_ACTIVITY
            ),
            params![name, id],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("Conversation {}", id)));
        }

        fetch_conversation(&conn, id)?
            .ok_or_else(|| Error::NotFound(format!("Conversation {}", id)))
    }

    /// Delete a conversation together with its messages
    pub fn delete_conversation(&self, id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM conversations WHERE id = ?", params![id])?;
        Ok(deleted > 0)
    }

    /// Append a message to a conversation
    ///
    /// Advisor messages count as unread until the conversation is opened.
    pub fn add_chat_message(
        &self,
        conversation_id: i64,
        sender: Sender,
        text: &str,
    ) -> Result<ChatMessage> {
        let mut conn = self.conn()?;
        let db_tx = conn.transaction()?;

        let unread_increment = i64::from(sender == Sender::Advisor);
        let touched = db_tx.execute(
            &format!(
                r#"
                UPDATE conversations
                SET unread_count = unread_count + ?, updated_at = CURRENT_TIMESTAMP,
                    activity_seq = {}
                WHERE id = ?
                "#,
                NEXT_ACTIVITY
            ),
            params![unread_increment, conversation_id],
        )?;
        if touched == 0 {
            return Err(Error::NotFound(format!("Conversation {}", conversation_id)));
        }

        db_tx.execute(
            "INSERT INTO chat_messages (conversation_id, text, sender) VALUES (?, ?, ?)",
            params![conversation_id, text, sender.as_str()],
        )?;
        let id = db_tx.last_insert_rowid();

        let message = db_tx.query_row(
            "SELECT id, conversation_id, text, sender, timestamp FROM chat_messages WHERE id = ?",
            params![id],
            row_to_message,
        )?;
        db_tx.commit()?;

        Ok(message)
    }

    /// Oldest first
    pub fn list_chat_messages(&self, conversation_id: i64) -> Result<Vec<ChatMessage>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT id, conversation_id, text, sender, timestamp
            FROM chat_messages
            WHERE conversation_id = ?
            ORDER BY timestamp ASC, id ASC
            "#,
        )?;

        let messages = stmt
            .query_map(params![conversation_id], row_to_message)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(messages)
    }

    /// Store the shortened preview of the latest message
    pub fn update_conversation_preview(&self, id: i64, last_message: &str) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE conversations SET last_message = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
            params![conversation_preview(last_message), id],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("Conversation {}", id)));
        }
        Ok(())
    }

    pub fn mark_conversation_read(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE conversations SET unread_count = 0 WHERE id = ?",
            params![id],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("Conversation {}", id)));
        }
        Ok(())
    }
}

fn fetch_conversation(conn: &rusqlite::Connection, id: i64) -> Result<Option<Conversation>> {
    Ok(conn
        .query_row(
            &format!(
                "SELECT {} FROM conversations WHERE id = ?",
                CONVERSATION_COLUMNS
            ),
            params![id],
            row_to_conversation,
        )
        .optional()?)
}

fn row_to_conversation(row: &rusqlite::Row) -> rusqlite::Result<Conversation> {
    let created_at: String = row.get(4)?;
    let updated_at: String = row.get(5)?;
    Ok(Conversation {
        id: row.get(0)?,
        name: row.get(1)?,
        last_message: row.get(2)?,
        unread_count: row.get(3)?,
        created_at: parse_datetime(&created_at),
        updated_at: parse_datetime(&updated_at),
    })
}

fn row_to_message(row: &rusqlite::Row) -> rusqlite::Result<ChatMessage> {
    let sender: String = row.get(3)?;
    let timestamp: String = row.get(4)?;
    Ok(ChatMessage {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        text: row.get(2)?,
        sender: sender.parse().map_err(|e| conversion_error(3, e))?,
        timestamp: parse_datetime(&timestamp),
    })
}
