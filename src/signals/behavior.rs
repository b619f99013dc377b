//! Behavior signals: pure measurements over a visitor session's event log,
//! used by the trigger evaluator.

use chrono::{DateTime, Utc};

use crate::models::{BehaviorEvent, BehaviorEventType};

/// Seconds elapsed since the session started, clamped at zero for clock
/// skew between the caller and the event timestamps.
pub fn time_elapsed(session_start: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - session_start).num_seconds().max(0)
}

/// Monotonic maximum scroll depth over the session, clamped to 100.
pub fn max_scroll_depth(events: &[BehaviorEvent]) -> u8 {
    events
        .iter()
        .filter(|e| e.event_type == BehaviorEventType::Scroll)
        .filter_map(|e| e.scroll_depth)
        .max()
        .unwrap_or(0)
        .min(100)
}
