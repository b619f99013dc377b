use anyhow::{Context, Result};
use rusqlite::{params, Row};
use serde_json::to_string;

use crate::db::{
    connection::Database,
    helpers::{parse_datetime, parse_string_list, to_i64, to_u64},
};
use crate::models::{TriggerDefinition, TriggerRow, TriggerRule};

const ENABLE_LOGS: bool = true;

use crate::log_warn;

fn row_to_trigger_row(row: &Row) -> Result<TriggerRow> {
    let enabled: i64 = row.get("enabled")?;
    let time_threshold_secs: Option<i64> = row.get("time_threshold_secs")?;
    let scroll_depth_percent: Option<i64> = row.get("scroll_depth_percent")?;
    let url_patterns: String = row.get("url_patterns")?;
    let created_at: String = row.get("created_at")?;

    Ok(TriggerRow {
        id: row.get("id")?,
        agent_id: row.get("agent_id")?,
        trigger_type: row.get("trigger_type")?,
        enabled: enabled != 0,
        time_threshold_secs: time_threshold_secs
            .map(|v| to_u64(v, "time_threshold_secs"))
            .transpose()?,
        scroll_depth_percent: scroll_depth_percent
            .map(|v| to_u64(v, "scroll_depth_percent"))
            .transpose()?
            .map(|v| v.min(u8::MAX as u64) as u8),
        element_selector: row.get("element_selector")?,
        url_patterns: parse_string_list(&url_patterns, "url_patterns")?,
        message: row.get("message")?,
        created_at: parse_datetime(&created_at, "created_at")?,
    })
}

impl Database {
    pub async fn insert_trigger_definition(&self, definition: &TriggerDefinition) -> Result<()> {
        let record = definition.clone();
        self.execute(move |conn| {
            let (time_threshold_secs, scroll_depth_percent, element_selector) = match &record.rule
            {
                TriggerRule::TimeOnPage { threshold_secs } => {
                    (Some(to_i64(*threshold_secs)?), None, None)
                }
                TriggerRule::ScrollDepth { percent } => (None, Some(i64::from(*percent)), None),
                TriggerRule::ElementVisible {
                    selector,
                    threshold_secs,
                } => (
                    Some(to_i64(*threshold_secs)?),
                    None,
                    Some(selector.clone()),
                ),
            };
            let url_patterns = to_string(&record.url_patterns)
                .context("failed to serialize url patterns")?;

            conn.execute(
                "INSERT INTO trigger_definitions (
                    id, agent_id, trigger_type, enabled, time_threshold_secs,
                    scroll_depth_percent, element_selector, url_patterns, message, created_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    record.id,
                    record.agent_id,
                    record.rule.trigger_type(),
                    record.enabled as i64,
                    time_threshold_secs,
                    scroll_depth_percent,
                    element_selector,
                    url_patterns,
                    record.message,
                    record.created_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    /// Raw enabled rows for an agent; callers promote them to typed
    /// definitions and decide what to do with rows that fail validation.
    /// A row that cannot be read back at all is skipped with a warning so
    /// one corrupt row never starves the agent's remaining triggers.
    pub async fn list_enabled_trigger_rows(&self, agent_id: &str) -> Result<Vec<TriggerRow>> {
        let agent_id = agent_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, agent_id, trigger_type, enabled, time_threshold_secs,
                        scroll_depth_percent, element_selector, url_patterns, message, created_at
                 FROM trigger_definitions
                 WHERE agent_id = ?1 AND enabled = 1
                 ORDER BY created_at ASC, id ASC",
            )?;

            let mut rows = stmt.query(params![agent_id])?;
            let mut triggers = Vec::new();
            while let Some(row) = rows.next()? {
                match row_to_trigger_row(row) {
                    Ok(trigger) => triggers.push(trigger),
                    Err(err) => {
                        log_warn!("skipping unreadable trigger definition row: {err:#}");
                    }
                }
            }
            Ok(triggers)
        })
        .await
    }
}
