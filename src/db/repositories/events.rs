use anyhow::Result;
use rusqlite::{params, Row};

use crate::db::{
    connection::Database,
    helpers::{parse_datetime, to_i64, to_u64},
};
use crate::models::{BehaviorEvent, BehaviorEventType};

fn row_to_event(row: &Row) -> Result<BehaviorEvent> {
    let event_type: String = row.get("event_type")?;
    let created_at: String = row.get("created_at")?;
    let scroll_depth: Option<i64> = row.get("scroll_depth")?;
    let time_on_page_secs: Option<i64> = row.get("time_on_page_secs")?;

    Ok(BehaviorEvent {
        id: row.get("id")?,
        session_id: row.get("session_id")?,
        event_type: BehaviorEventType::from_str(&event_type)?,
        page_url: row.get("page_url")?,
        scroll_depth: scroll_depth
            .map(|d| to_u64(d, "scroll_depth"))
            .transpose()?
            .map(|d| d.min(100) as u8),
        element_selector: row.get("element_selector")?,
        time_on_page_secs: time_on_page_secs
            .map(|t| to_u64(t, "time_on_page_secs"))
            .transpose()?,
        created_at: parse_datetime(&created_at, "created_at")?,
    })
}

impl Database {
    pub async fn insert_behavior_event(&self, event: &BehaviorEvent) -> Result<()> {
        let record = event.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO behavior_events (
                    session_id, event_type, page_url, scroll_depth,
                    element_selector, time_on_page_secs, created_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    record.session_id,
                    record.event_type.as_str(),
                    record.page_url,
                    record.scroll_depth.map(i64::from),
                    record.element_selector,
                    record
                        .time_on_page_secs
                        .map(to_i64)
                        .transpose()?,
                    record.created_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn get_events_for_session(&self, session_id: &str) -> Result<Vec<BehaviorEvent>> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, session_id, event_type, page_url, scroll_depth,
                        element_selector, time_on_page_secs, created_at
                 FROM behavior_events
                 WHERE session_id = ?1
                 ORDER BY created_at ASC, id ASC",
            )?;

            let mut rows = stmt.query(params![session_id])?;
            let mut events = Vec::new();
            while let Some(row) = rows.next()? {
                events.push(row_to_event(row)?);
            }
            Ok(events)
        })
        .await
    }
}
