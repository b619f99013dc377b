use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::models::TriggerRule;

/// Tunable knobs for the trigger evaluator.
///
/// The two-tier confidence gate mirrors observed product behavior:
/// time-on-page triggers are explicit tenant-authored config and are
/// trusted more (low gate), while scroll/visibility triggers are implicit
/// heuristics held to the higher bar. Both tiers are configuration, not
/// domain invariants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementConfig {
    /// Poll cadence for the per-session tick loop.
    #[serde(with = "duration_secs")]
    pub tick_interval: Duration,

    /// Fixed confidence constants per trigger type.
    pub time_trigger_confidence: f64,
    pub scroll_trigger_confidence: f64,
    pub element_trigger_confidence: f64,

    /// Gate for tenant-authored time-on-page triggers (exclusive).
    pub time_trigger_gate: f64,
    /// Gate for implicit/heuristic trigger types (exclusive).
    pub implicit_trigger_gate: f64,
}

impl Default for EngagementConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(5),
            time_trigger_confidence: 1.0,
            scroll_trigger_confidence: 0.8,
            element_trigger_confidence: 0.75,
            time_trigger_gate: 0.3,
            implicit_trigger_gate: 0.7,
        }
    }
}

impl EngagementConfig {
    pub fn confidence_for(&self, rule: &TriggerRule) -> f64 {
        match rule {
            TriggerRule::TimeOnPage { .. } => self.time_trigger_confidence,
            TriggerRule::ScrollDepth { .. } => self.scroll_trigger_confidence,
            TriggerRule::ElementVisible { .. } => self.element_trigger_confidence,
        }
    }

    pub fn gate_for(&self, rule: &TriggerRule) -> f64 {
        match rule {
            TriggerRule::TimeOnPage { .. } => self.time_trigger_gate,
            TriggerRule::ScrollDepth { .. } | TriggerRule::ElementVisible { .. } => {
                self.implicit_trigger_gate
            }
        }
    }

    /// True when the trigger type's constant confidence clears its gate.
    pub fn passes_gate(&self, rule: &TriggerRule) -> bool {
        self.confidence_for(rule) > self.gate_for(rule)
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(deserializer)?))
    }
}
