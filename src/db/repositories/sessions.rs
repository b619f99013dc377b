use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, Row};

use crate::db::{
    connection::Database,
    helpers::{parse_datetime, to_i64, to_u64},
};
use crate::models::VisitorSession;

fn row_to_session(row: &Row) -> Result<VisitorSession> {
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;
    let total_page_views: i64 = row.get("total_page_views")?;
    let total_time_spent_secs: i64 = row.get("total_time_spent_secs")?;

    Ok(VisitorSession {
        id: row.get("id")?,
        agent_id: row.get("agent_id")?,
        first_page_url: row.get("first_page_url")?,
        current_page_url: row.get("current_page_url")?,
        created_at: parse_datetime(&created_at, "created_at")?,
        total_page_views: to_u64(total_page_views, "total_page_views")?,
        total_time_spent_secs: to_u64(total_time_spent_secs, "total_time_spent_secs")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    })
}

impl Database {
    pub async fn insert_visitor_session(&self, session: &VisitorSession) -> Result<()> {
        let record = session.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO visitor_sessions (
                    id, agent_id, first_page_url, current_page_url,
                    created_at, total_page_views, total_time_spent_secs, updated_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    record.id,
                    record.agent_id,
                    record.first_page_url,
                    record.current_page_url,
                    record.created_at.to_rfc3339(),
                    to_i64(record.total_page_views)?,
                    to_i64(record.total_time_spent_secs)?,
                    record.updated_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn get_visitor_session(&self, session_id: &str) -> Result<Option<VisitorSession>> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, agent_id, first_page_url, current_page_url,
                        created_at, total_page_views, total_time_spent_secs, updated_at
                 FROM visitor_sessions
                 WHERE id = ?1",
            )?;

            let mut rows = stmt.query(params![session_id])?;
            let session = match rows.next()? {
                Some(row) => Some(row_to_session(row)?),
                None => None,
            };
            Ok(session)
        })
        .await
    }

    /// Fold one tracked event's effect into the session aggregates.
    pub async fn update_session_activity(
        &self,
        session_id: &str,
        current_page_url: &str,
        total_page_views: u64,
        total_time_spent_secs: u64,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        let session_id = session_id.to_string();
        let current_page_url = current_page_url.to_string();
        self.execute(move |conn| {
            conn.execute(
                "UPDATE visitor_sessions
                 SET current_page_url = ?1,
                     total_page_views = ?2,
                     total_time_spent_secs = ?3,
                     updated_at = ?4
                 WHERE id = ?5",
                params![
                    current_page_url,
                    to_i64(total_page_views)?,
                    to_i64(total_time_spent_secs)?,
                    updated_at.to_rfc3339(),
                    session_id,
                ],
            )?;
            Ok(())
        })
        .await
    }
}
