use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Anonymous identity for a browser tab lineage. The id is an opaque token
/// generated by the caller and stays stable for the browsing session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitorSession {
    pub id: String,
    pub agent_id: String,
    pub first_page_url: String,
    pub current_page_url: String,
    pub created_at: DateTime<Utc>,
    pub total_page_views: u64,
    pub total_time_spent_secs: u64,
    pub updated_at: DateTime<Utc>,
}

impl VisitorSession {
    pub fn new(id: String, agent_id: String, page_url: String, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            agent_id,
            first_page_url: page_url.clone(),
            current_page_url: page_url,
            created_at,
            total_page_views: 0,
            total_time_spent_secs: 0,
            updated_at: created_at,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BehaviorEventType {
    PageView,
    Scroll,
    TimeSpent,
    Click,
    ElementVisible,
}

impl BehaviorEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BehaviorEventType::PageView => "page_view",
            BehaviorEventType::Scroll => "scroll",
            BehaviorEventType::TimeSpent => "time_spent",
            BehaviorEventType::Click => "click",
            BehaviorEventType::ElementVisible => "element_visible",
        }
    }

    pub fn from_str(value: &str) -> anyhow::Result<Self> {
        match value {
            "page_view" => Ok(BehaviorEventType::PageView),
            "scroll" => Ok(BehaviorEventType::Scroll),
            "time_spent" => Ok(BehaviorEventType::TimeSpent),
            "click" => Ok(BehaviorEventType::Click),
            "element_visible" => Ok(BehaviorEventType::ElementVisible),
            _ => Err(anyhow::anyhow!("unknown event type '{value}'")),
        }
    }
}

/// An immutable behavioral fact. Append-only; events for a session are
/// processed in `created_at` order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BehaviorEvent {
    pub id: Option<i64>,
    pub session_id: String,
    pub event_type: BehaviorEventType,
    pub page_url: String,
    pub scroll_depth: Option<u8>,
    pub element_selector: Option<String>,
    pub time_on_page_secs: Option<u64>,
    pub created_at: DateTime<Utc>,
}
