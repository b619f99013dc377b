use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Row};
use serde_json::to_string;

use crate::db::{
    connection::Database,
    helpers::{parse_datetime, parse_string_list},
};
use crate::models::ProactiveSuggestion;

fn row_to_suggestion(row: &Row) -> Result<ProactiveSuggestion> {
    let behavioral_triggers: String = row.get("behavioral_triggers")?;
    let was_shown: i64 = row.get("was_shown")?;
    let was_clicked: i64 = row.get("was_clicked")?;
    let conversation_started: i64 = row.get("conversation_started")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(ProactiveSuggestion {
        id: row.get("id")?,
        session_id: row.get("session_id")?,
        agent_id: row.get("agent_id")?,
        suggestion_type: row.get("suggestion_type")?,
        suggested_message: row.get("suggested_message")?,
        confidence: row.get("confidence")?,
        behavioral_triggers: parse_string_list(&behavioral_triggers, "behavioral_triggers")?,
        was_shown: was_shown != 0,
        was_clicked: was_clicked != 0,
        conversation_started: conversation_started != 0,
        created_at: parse_datetime(&created_at, "created_at")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    })
}

const SELECT_COLUMNS: &str = "id, session_id, agent_id, suggestion_type, suggested_message,
        confidence, behavioral_triggers, was_shown, was_clicked,
        conversation_started, created_at, updated_at";

impl Database {
    /// Insert guarded by the unique session_id: returns false when a
    /// suggestion for the session already exists (duplicate attempt).
    pub async fn insert_suggestion_once(&self, suggestion: &ProactiveSuggestion) -> Result<bool> {
        let record = suggestion.clone();
        self.execute(move |conn| {
            let behavioral_triggers = to_string(&record.behavioral_triggers)
                .context("failed to serialize behavioral triggers")?;

            let inserted = conn.execute(
                "INSERT OR IGNORE INTO proactive_suggestions (
                    id, session_id, agent_id, suggestion_type, suggested_message,
                    confidence, behavioral_triggers, was_shown, was_clicked,
                    conversation_started, created_at, updated_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    record.id,
                    record.session_id,
                    record.agent_id,
                    record.suggestion_type,
                    record.suggested_message,
                    record.confidence,
                    behavioral_triggers,
                    record.was_shown as i64,
                    record.was_clicked as i64,
                    record.conversation_started as i64,
                    record.created_at.to_rfc3339(),
                    record.updated_at.to_rfc3339(),
                ],
            )?;
            Ok(inserted > 0)
        })
        .await
    }

    pub async fn get_suggestion_for_session(
        &self,
        session_id: &str,
    ) -> Result<Option<ProactiveSuggestion>> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM proactive_suggestions WHERE session_id = ?1"
            ))?;

            let mut rows = stmt.query(params![session_id])?;
            let suggestion = match rows.next()? {
                Some(row) => Some(row_to_suggestion(row)?),
                None => None,
            };
            Ok(suggestion)
        })
        .await
    }

    /// Monotonic outcome flags: once set they are never cleared, so the
    /// updates only ever write 1.
    pub async fn mark_suggestion_shown(
        &self,
        session_id: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        self.set_suggestion_flag(session_id, "was_shown", updated_at)
            .await
    }

    pub async fn mark_suggestion_clicked(
        &self,
        session_id: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        self.set_suggestion_flag(session_id, "was_clicked", updated_at)
            .await
    }

    pub async fn mark_conversation_started(
        &self,
        session_id: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        self.set_suggestion_flag(session_id, "conversation_started", updated_at)
            .await
    }

    async fn set_suggestion_flag(
        &self,
        session_id: &str,
        flag: &'static str,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            conn.execute(
                &format!(
                    "UPDATE proactive_suggestions
                     SET {flag} = 1,
                         updated_at = ?1
                     WHERE session_id = ?2"
                ),
                params![updated_at.to_rfc3339(), session_id],
            )?;
            Ok(())
        })
        .await
    }
}
