use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Row};
use serde_json::{from_str, to_string};

use crate::db::{connection::Database, helpers::parse_datetime};
use crate::models::{AttributedOrder, AttributionType, LineItem};

fn row_to_attribution(row: &Row) -> Result<AttributedOrder> {
    let attribution_type: String = row.get("attribution_type")?;
    let line_items: String = row.get("line_items")?;
    let order_created_at: String = row.get("order_created_at")?;
    let created_at: String = row.get("created_at")?;

    Ok(AttributedOrder {
        order_id: row.get("order_id")?,
        conversation_id: row.get("conversation_id")?,
        attribution_type: AttributionType::from_str(&attribution_type)?,
        attribution_confidence: row.get("attribution_confidence")?,
        total_price: row.get("total_price")?,
        currency: row.get("currency")?,
        line_items: from_str::<Vec<LineItem>>(&line_items)
            .map_err(|err| anyhow!("invalid line_items JSON: {err}"))?,
        customer_email: row.get("customer_email")?,
        order_created_at: parse_datetime(&order_created_at, "order_created_at")?,
        created_at: parse_datetime(&created_at, "created_at")?,
    })
}

impl Database {
    /// Insert keyed by order_id: the primary key is the concurrency guard,
    /// so a rerun or a concurrent invocation leaves the existing row alone.
    pub async fn insert_attribution_once(&self, attribution: &AttributedOrder) -> Result<bool> {
        let record = attribution.clone();
        self.execute(move |conn| {
            let line_items =
                to_string(&record.line_items).context("failed to serialize line items")?;

            let inserted = conn.execute(
                "INSERT OR IGNORE INTO attributed_orders (
                    order_id, conversation_id, attribution_type, attribution_confidence,
                    total_price, currency, line_items, customer_email,
                    order_created_at, created_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    record.order_id,
                    record.conversation_id,
                    record.attribution_type.as_str(),
                    record.attribution_confidence,
                    record.total_price,
                    record.currency,
                    line_items,
                    record.customer_email,
                    record.order_created_at.to_rfc3339(),
                    record.created_at.to_rfc3339(),
                ],
            )?;
            Ok(inserted > 0)
        })
        .await
    }

    pub async fn get_attribution(&self, order_id: &str) -> Result<Option<AttributedOrder>> {
        let order_id = order_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT order_id, conversation_id, attribution_type, attribution_confidence,
                        total_price, currency, line_items, customer_email,
                        order_created_at, created_at
                 FROM attributed_orders
                 WHERE order_id = ?1",
            )?;

            let mut rows = stmt.query(params![order_id])?;
            let attribution = match rows.next()? {
                Some(row) => Some(row_to_attribution(row)?),
                None => None,
            };
            Ok(attribution)
        })
        .await
    }
}
