use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Row};
use serde_json::{from_str, to_string};

use crate::db::{connection::Database, helpers::parse_datetime};
use crate::models::{LineItem, Order};

fn row_to_order(row: &Row) -> Result<Order> {
    let line_items: String = row.get("line_items")?;
    let order_created_at: String = row.get("order_created_at")?;

    Ok(Order {
        id: row.get("id")?,
        agent_id: row.get("agent_id")?,
        customer_email: row.get("customer_email")?,
        total_price: row.get("total_price")?,
        currency: row.get("currency")?,
        line_items: from_str::<Vec<LineItem>>(&line_items)
            .map_err(|err| anyhow!("invalid line_items JSON: {err}"))?,
        order_created_at: parse_datetime(&order_created_at, "order_created_at")?,
    })
}

impl Database {
    pub async fn insert_order(&self, order: &Order) -> Result<()> {
        let record = order.clone();
        self.execute(move |conn| {
            let line_items =
                to_string(&record.line_items).context("failed to serialize line items")?;

            conn.execute(
                "INSERT OR REPLACE INTO orders (
                    id, agent_id, customer_email, total_price, currency,
                    line_items, order_created_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    record.id,
                    record.agent_id,
                    record.customer_email,
                    record.total_price,
                    record.currency,
                    line_items,
                    record.order_created_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn get_order(&self, order_id: &str) -> Result<Option<Order>> {
        let order_id = order_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, agent_id, customer_email, total_price, currency,
                        line_items, order_created_at
                 FROM orders
                 WHERE id = ?1",
            )?;

            let mut rows = stmt.query(params![order_id])?;
            let order = match rows.next()? {
                Some(row) => Some(row_to_order(row)?),
                None => None,
            };
            Ok(order)
        })
        .await
    }
}
