use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Chat conversation record as read from the store. `lead_email` is only
/// present when the visitor left contact details; `transcript` is the full
/// message text joined across both sides of the conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub agent_id: String,
    pub lead_email: Option<String>,
    pub transcript: String,
    pub last_message_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub title: String,
    pub quantity: u32,
    pub price: f64,
}

/// E-commerce order as fed in by the order pipeline (webhook-style upsert).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub agent_id: String,
    pub customer_email: Option<String>,
    pub total_price: f64,
    pub currency: String,
    pub line_items: Vec<LineItem>,
    pub order_created_at: DateTime<Utc>,
}

impl Order {
    pub fn line_item_titles(&self) -> Vec<&str> {
        self.line_items.iter().map(|li| li.title.as_str()).collect()
    }
}
