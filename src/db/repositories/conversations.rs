use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, Row};

use crate::db::{connection::Database, helpers::parse_datetime};
use crate::models::Conversation;

const ENABLE_LOGS: bool = true;

use crate::log_warn;

fn row_to_conversation(row: &Row) -> Result<Conversation> {
    let last_message_at: String = row.get("last_message_at")?;
    let created_at: String = row.get("created_at")?;

    Ok(Conversation {
        id: row.get("id")?,
        agent_id: row.get("agent_id")?,
        lead_email: row.get("lead_email")?,
        transcript: row.get("transcript")?,
        last_message_at: parse_datetime(&last_message_at, "last_message_at")?,
        created_at: parse_datetime(&created_at, "created_at")?,
    })
}

impl Database {
    pub async fn insert_conversation(&self, conversation: &Conversation) -> Result<()> {
        let record = conversation.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO conversations (
                    id, agent_id, lead_email, transcript, last_message_at, created_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    record.id,
                    record.agent_id,
                    record.lead_email,
                    record.transcript,
                    record.last_message_at.to_rfc3339(),
                    record.created_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    /// Candidate conversations for attribution, bounded by last-message
    /// time. A row that fails to parse is skipped with a warning so one bad
    /// candidate never aborts attribution of the whole order.
    pub async fn list_candidate_conversations(
        &self,
        agent_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Conversation>> {
        let agent_id = agent_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, agent_id, lead_email, transcript, last_message_at, created_at
                 FROM conversations
                 WHERE agent_id = ?1
                   AND last_message_at >= ?2
                   AND last_message_at <= ?3
                 ORDER BY last_message_at DESC",
            )?;

            let mut rows = stmt.query(params![
                agent_id,
                from.to_rfc3339(),
                to.to_rfc3339()
            ])?;
            let mut conversations = Vec::new();
            while let Some(row) = rows.next()? {
                match row_to_conversation(row) {
                    Ok(conversation) => conversations.push(conversation),
                    Err(err) => {
                        log_warn!("skipping unreadable candidate conversation: {err:#}");
                    }
                }
            }
            Ok(conversations)
        })
        .await
    }
}
