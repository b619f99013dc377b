use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Suggestion kind surfaced to the chat widget. All behavioral triggers
/// currently produce a proactive chat prompt.
pub const SUGGESTION_TYPE_PROACTIVE_CHAT: &str = "proactive_chat";

/// The engine's output for one visitor session. At most one row exists per
/// session (`session_id` is the idempotency token); the outcome flags are
/// monotonic and never revert to false once set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProactiveSuggestion {
    pub id: String,
    pub session_id: String,
    pub agent_id: String,
    pub suggestion_type: String,
    pub suggested_message: String,
    pub confidence: f64,
    /// Evidence: ids of the behavioral triggers that fired this suggestion.
    pub behavioral_triggers: Vec<String>,
    pub was_shown: bool,
    pub was_clicked: bool,
    pub conversation_started: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
