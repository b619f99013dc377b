use serde::{Deserialize, Serialize};

/// Tunable thresholds for attribution scoring and candidate selection.
///
/// The scorer's 30-minute temporal window and the resolver's wide 7d/1d
/// candidate pre-filter are deliberately separate knobs: the pre-filter is
/// a cheap fetch bound, the window is the precise scoring signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributionConfig {
    /// Contribution of an exact email match.
    pub weight_email: f64,
    /// Maximum contribution of temporal proximity; scales linearly down to
    /// zero as the delta approaches the window edge.
    pub weight_temporal: f64,
    /// Flat contribution of a product mention.
    pub weight_product: f64,

    /// Scoring window for the temporal-proximity signal.
    pub temporal_window_minutes: f64,

    /// Candidate pre-filter: conversations up to this many days before the
    /// order are considered.
    pub candidate_lookback_days: i64,
    /// Candidate pre-filter: conversations up to this many days after the
    /// order are considered (delayed event delivery).
    pub candidate_lookahead_days: i64,
}

impl Default for AttributionConfig {
    fn default() -> Self {
        Self {
            weight_email: 0.6,
            weight_temporal: 0.3,
            weight_product: 0.25,
            temporal_window_minutes: 30.0,
            candidate_lookback_days: 7,
            candidate_lookahead_days: 1,
        }
    }
}
