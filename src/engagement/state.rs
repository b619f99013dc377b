use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{BehaviorEvent, BehaviorEventType};
use crate::signals::max_scroll_depth;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum EvaluatorStatus {
    Idle,
    Evaluating,
    /// Terminal: a session never fires a second suggestion.
    Fired,
}

impl Default for EvaluatorStatus {
    fn default() -> Self {
        EvaluatorStatus::Idle
    }
}

/// The trigger decision the evaluator landed on for a session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FiredTrigger {
    pub definition_id: String,
    pub trigger_type: String,
    pub message: String,
    pub confidence: f64,
    pub fired_at: DateTime<Utc>,
}

/// Session-scoped evaluator state. Carried explicitly through the
/// evaluator instead of living in ambient globals, so the at-most-once
/// invariant is testable without any environment mocking.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub session_id: String,
    pub agent_id: String,
    pub started_at: DateTime<Utc>,
    pub first_page_url: String,
    pub current_page_url: String,
    pub total_page_views: u64,
    pub total_time_spent_secs: u64,
    pub max_scroll_depth: u8,
    /// First time each element selector was reported visible.
    pub element_first_seen: HashMap<String, DateTime<Utc>>,
    pub status: EvaluatorStatus,
    pub fired: Option<FiredTrigger>,
}

impl SessionState {
    pub fn new(
        session_id: String,
        agent_id: String,
        page_url: String,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            session_id,
            agent_id,
            started_at,
            first_page_url: page_url.clone(),
            current_page_url: page_url,
            total_page_views: 0,
            total_time_spent_secs: 0,
            max_scroll_depth: 0,
            element_first_seen: HashMap::new(),
            status: EvaluatorStatus::Idle,
            fired: None,
        }
    }

    /// Rebuild state from a persisted event log, e.g. when a tab reloads
    /// into an existing session. Events must be in arrival order.
    pub fn replay(
        session_id: String,
        agent_id: String,
        first_page_url: String,
        started_at: DateTime<Utc>,
        events: &[BehaviorEvent],
    ) -> Self {
        let mut state = Self::new(session_id, agent_id, first_page_url, started_at);
        for event in events {
            state.apply_event(event);
        }
        // One pass over the full log keeps the clamp consistent with the
        // incremental path.
        state.max_scroll_depth = max_scroll_depth(events);
        state
    }

    /// Fold one tracked event into the counters. Events arrive in
    /// `created_at` order; each counter is monotonic.
    pub fn apply_event(&mut self, event: &BehaviorEvent) {
        match event.event_type {
            BehaviorEventType::PageView => {
                self.total_page_views += 1;
                self.current_page_url = event.page_url.clone();
            }
            BehaviorEventType::Scroll => {
                if let Some(depth) = event.scroll_depth {
                    self.max_scroll_depth = self.max_scroll_depth.max(depth.min(100));
                }
            }
            BehaviorEventType::TimeSpent => {
                if let Some(secs) = event.time_on_page_secs {
                    self.total_time_spent_secs += secs;
                }
            }
            BehaviorEventType::ElementVisible => {
                if let Some(selector) = &event.element_selector {
                    self.element_first_seen
                        .entry(selector.clone())
                        .or_insert(event.created_at);
                }
            }
            BehaviorEventType::Click => {}
        }
    }

    pub fn has_fired(&self) -> bool {
        self.status == EvaluatorStatus::Fired
    }

    /// Seconds the element has been visible, or zero if never seen.
    pub fn element_visible_secs(&self, selector: &str, now: DateTime<Utc>) -> i64 {
        self.element_first_seen
            .get(selector)
            .map(|first_seen| (now - *first_seen).num_seconds().max(0))
            .unwrap_or(0)
    }

    pub fn mark_fired(&mut self, fired: FiredTrigger) {
        self.status = EvaluatorStatus::Fired;
        self.fired = Some(fired);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn event(event_type: BehaviorEventType, at: DateTime<Utc>) -> BehaviorEvent {
        BehaviorEvent {
            id: None,
            session_id: "s1".to_string(),
            event_type,
            page_url: "https://shop.example.com/".to_string(),
            scroll_depth: None,
            element_selector: None,
            time_on_page_secs: None,
            created_at: at,
        }
    }

    #[test]
    fn counters_fold_in_event_effects() {
        let start = Utc::now();
        let mut state = SessionState::new(
            "s1".into(),
            "a1".into(),
            "https://shop.example.com/".into(),
            start,
        );

        let mut page_view = event(BehaviorEventType::PageView, start);
        page_view.page_url = "https://shop.example.com/pricing".to_string();
        state.apply_event(&page_view);

        let mut scroll = event(BehaviorEventType::Scroll, start + Duration::seconds(3));
        scroll.scroll_depth = Some(60);
        state.apply_event(&scroll);

        let mut shallow_scroll = event(BehaviorEventType::Scroll, start + Duration::seconds(6));
        shallow_scroll.scroll_depth = Some(20);
        state.apply_event(&shallow_scroll);

        let mut time_spent = event(BehaviorEventType::TimeSpent, start + Duration::seconds(9));
        time_spent.time_on_page_secs = Some(30);
        state.apply_event(&time_spent);

        assert_eq!(state.total_page_views, 1);
        assert_eq!(state.current_page_url, "https://shop.example.com/pricing");
        assert_eq!(state.max_scroll_depth, 60);
        assert_eq!(state.total_time_spent_secs, 30);
    }

    #[test]
    fn element_first_seen_keeps_earliest_sighting() {
        let start = Utc::now();
        let mut state = SessionState::new("s1".into(), "a1".into(), "/".into(), start);

        let mut first = event(BehaviorEventType::ElementVisible, start);
        first.element_selector = Some("#pricing".into());
        state.apply_event(&first);

        let mut second = event(
            BehaviorEventType::ElementVisible,
            start + Duration::seconds(10),
        );
        second.element_selector = Some("#pricing".into());
        state.apply_event(&second);

        let now = start + Duration::seconds(15);
        assert_eq!(state.element_visible_secs("#pricing", now), 15);
        assert_eq!(state.element_visible_secs("#unseen", now), 0);
    }

    #[test]
    fn replay_reconstructs_counters_from_log() {
        let start = Utc::now();
        let mut scroll = event(BehaviorEventType::Scroll, start + Duration::seconds(2));
        scroll.scroll_depth = Some(80);
        let mut time_spent = event(BehaviorEventType::TimeSpent, start + Duration::seconds(4));
        time_spent.time_on_page_secs = Some(12);

        let state = SessionState::replay(
            "s1".into(),
            "a1".into(),
            "/".into(),
            start,
            &[scroll, time_spent],
        );

        assert_eq!(state.max_scroll_depth, 80);
        assert_eq!(state.total_time_spent_secs, 12);
        assert_eq!(state.status, EvaluatorStatus::Idle);
    }

    #[test]
    fn fired_is_terminal() {
        let start = Utc::now();
        let mut state = SessionState::new("s1".into(), "a1".into(), "/".into(), start);

        state.mark_fired(FiredTrigger {
            definition_id: "t1".into(),
            trigger_type: "time_on_page".into(),
            message: "Need a hand?".into(),
            confidence: 1.0,
            fired_at: start,
        });

        assert!(state.has_fired());
        assert_eq!(state.fired.as_ref().unwrap().definition_id, "t1");
    }
}
