use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use uuid::Uuid;

use crate::db::Database;
use crate::engagement::state::FiredTrigger;
use crate::models::{ProactiveSuggestion, SUGGESTION_TYPE_PROACTIVE_CHAT};

const ENABLE_LOGS: bool = true;

use crate::log_info;

/// Chat-surface hand-off: `(message, confidence)`. The surface owns
/// rendering and reports show/click outcomes back through the mark_* calls.
pub type SuggestionCallback = Arc<dyn Fn(&str, f64) + Send + Sync>;

/// Owns the at-most-once-per-session guarantee on the persistence side.
/// The session state machine already stops a single tab from firing twice;
/// the unique session_id row additionally absorbs duplicates from retried
/// requests and parallel tabs before metrics get double-counted.
#[derive(Clone)]
pub struct SuggestionDispatcher {
    db: Database,
}

impl SuggestionDispatcher {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Persist and hand off a fired suggestion. A duplicate attempt for an
    /// already-consumed session is a silent no-op returning `Ok(None)`;
    /// the callback only runs when this call won the insert.
    pub async fn dispatch(
        &self,
        session_id: &str,
        agent_id: &str,
        fired: &FiredTrigger,
        on_fired: Option<&SuggestionCallback>,
    ) -> Result<Option<ProactiveSuggestion>> {
        let now = Utc::now();
        let suggestion = ProactiveSuggestion {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            agent_id: agent_id.to_string(),
            suggestion_type: SUGGESTION_TYPE_PROACTIVE_CHAT.to_string(),
            suggested_message: fired.message.clone(),
            confidence: fired.confidence,
            behavioral_triggers: vec![fired.definition_id.clone()],
            was_shown: false,
            was_clicked: false,
            conversation_started: false,
            created_at: now,
            updated_at: now,
        };

        if !self.db.insert_suggestion_once(&suggestion).await? {
            log_info!("suggestion for session {session_id} already exists; ignoring duplicate");
            return Ok(None);
        }

        if let Some(callback) = on_fired {
            callback(&suggestion.suggested_message, suggestion.confidence);
        }

        log_info!(
            "dispatched suggestion {} for session {session_id} (trigger {}, confidence {:.2})",
            suggestion.id,
            fired.definition_id,
            fired.confidence
        );

        Ok(Some(suggestion))
    }

    /// The UI actually rendered the suggestion. Distinct from dispatch:
    /// tab-backgrounding can suppress display.
    pub async fn mark_shown(&self, session_id: &str) -> Result<()> {
        self.db.mark_suggestion_shown(session_id, Utc::now()).await
    }

    pub async fn mark_clicked(&self, session_id: &str) -> Result<()> {
        self.db
            .mark_suggestion_clicked(session_id, Utc::now())
            .await
    }

    pub async fn mark_conversation_started(&self, session_id: &str) -> Result<()> {
        self.db
            .mark_conversation_started(session_id, Utc::now())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn test_db() -> (TempDir, Database) {
        let dir = TempDir::new().unwrap();
        let db = Database::new(dir.path().join("engage.sqlite3")).unwrap();
        (dir, db)
    }

    fn fired_trigger() -> FiredTrigger {
        FiredTrigger {
            definition_id: "t1".to_string(),
            trigger_type: "time_on_page".to_string(),
            message: "Can I help you find anything?".to_string(),
            confidence: 1.0,
            fired_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn duplicate_dispatch_is_a_silent_no_op() {
        let (_dir, db) = test_db();
        let dispatcher = SuggestionDispatcher::new(db.clone());
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in_cb = calls.clone();
        let callback: SuggestionCallback =
            Arc::new(move |_msg, _conf| {
                calls_in_cb.fetch_add(1, Ordering::SeqCst);
            });

        let fired = fired_trigger();
        let first = dispatcher
            .dispatch("s1", "a1", &fired, Some(&callback))
            .await
            .unwrap();
        let second = dispatcher
            .dispatch("s1", "a1", &fired, Some(&callback))
            .await
            .unwrap();

        assert!(first.is_some());
        assert!(second.is_none());
        // The surface is only invoked for the winning dispatch.
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let stored = db.get_suggestion_for_session("s1").await.unwrap().unwrap();
        assert_eq!(stored.suggested_message, "Can I help you find anything?");
        assert_eq!(stored.behavioral_triggers, vec!["t1".to_string()]);
    }

    #[tokio::test]
    async fn outcome_flags_are_monotonic() {
        let (_dir, db) = test_db();
        let dispatcher = SuggestionDispatcher::new(db.clone());

        dispatcher
            .dispatch("s1", "a1", &fired_trigger(), None)
            .await
            .unwrap();

        dispatcher.mark_shown("s1").await.unwrap();
        dispatcher.mark_shown("s1").await.unwrap();
        dispatcher.mark_clicked("s1").await.unwrap();
        dispatcher.mark_conversation_started("s1").await.unwrap();

        let stored = db.get_suggestion_for_session("s1").await.unwrap().unwrap();
        assert!(stored.was_shown);
        assert!(stored.was_clicked);
        assert!(stored.conversation_started);
    }
}
