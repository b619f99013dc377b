use chrono::{DateTime, Utc};

use crate::engagement::config::EngagementConfig;
use crate::engagement::state::{EvaluatorStatus, FiredTrigger, SessionState};
use crate::models::{TriggerDefinition, TriggerRule};
use crate::signals::time_elapsed;

/// One behavioral tick: walk the applicable trigger definitions, pick the
/// winner if any crossed its threshold, and transition the session state.
///
/// Once a session has fired it never fires again, no matter how many
/// eligible triggers exist or how many ticks follow. Trigger types whose
/// constant confidence does not clear their gate are never eligible, so a
/// suggestion below its threshold can never be dispatched downstream.
pub fn evaluate_tick(
    state: &mut SessionState,
    definitions: &[TriggerDefinition],
    config: &EngagementConfig,
    now: DateTime<Utc>,
) -> Option<FiredTrigger> {
    if state.has_fired() {
        return None;
    }
    state.status = EvaluatorStatus::Evaluating;

    let mut winner: Option<(&TriggerDefinition, f64)> = None;

    for definition in definitions {
        if !definition.enabled
            || !definition.matches_url(&state.current_page_url)
            || !config.passes_gate(&definition.rule)
        {
            continue;
        }

        let Some(overage) = overage_fraction(state, &definition.rule, now) else {
            continue;
        };

        // Lowest overage relative to the trigger's own scale wins: the
        // trigger that only just crossed its threshold is the most timely,
        // and fast triggers don't get starved behind slow ones. Exact ties
        // fall back to definition-list order.
        let replace = match winner {
            None => true,
            Some((_, best_overage)) => overage < best_overage,
        };
        if replace {
            winner = Some((definition, overage));
        }
    }

    let Some((definition, _)) = winner else {
        state.status = EvaluatorStatus::Idle;
        return None;
    };

    let fired = FiredTrigger {
        definition_id: definition.id.clone(),
        trigger_type: definition.rule.trigger_type().to_string(),
        message: definition.message.clone(),
        confidence: config.confidence_for(&definition.rule),
        fired_at: now,
    };
    state.mark_fired(fired.clone());
    Some(fired)
}

/// How far past its own threshold a trigger is, as a fraction of that
/// threshold. `None` when the threshold has not been reached yet. A zero
/// threshold is already satisfied and maximally overdue.
fn overage_fraction(state: &SessionState, rule: &TriggerRule, now: DateTime<Utc>) -> Option<f64> {
    let (value, threshold) = match rule {
        TriggerRule::TimeOnPage { threshold_secs } => (
            time_elapsed(state.started_at, now) as f64,
            *threshold_secs as f64,
        ),
        TriggerRule::ScrollDepth { percent } => {
            (f64::from(state.max_scroll_depth), f64::from(*percent))
        }
        TriggerRule::ElementVisible {
            selector,
            threshold_secs,
        } => (
            state.element_visible_secs(selector, now) as f64,
            *threshold_secs as f64,
        ),
    };

    if value < threshold {
        return None;
    }
    if threshold <= 0.0 {
        return Some(f64::INFINITY);
    }
    Some(value / threshold - 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn definition(id: &str, rule: TriggerRule) -> TriggerDefinition {
        TriggerDefinition {
            id: id.to_string(),
            agent_id: "a1".to_string(),
            enabled: true,
            rule,
            url_patterns: Vec::new(),
            message: format!("message for {id}"),
            created_at: Utc::now(),
        }
    }

    fn state(started_at: DateTime<Utc>) -> SessionState {
        SessionState::new(
            "s1".to_string(),
            "a1".to_string(),
            "https://shop.example.com/pricing".to_string(),
            started_at,
        )
    }

    #[test]
    fn scroll_trigger_fires_exactly_once_at_crossing() {
        let start = Utc::now();
        let mut state = state(start);
        let defs = vec![definition("t1", TriggerRule::ScrollDepth { percent: 50 })];
        let config = EngagementConfig::default();

        state.max_scroll_depth = 49;
        assert!(evaluate_tick(&mut state, &defs, &config, start).is_none());
        assert_eq!(state.status, EvaluatorStatus::Idle);

        state.max_scroll_depth = 51;
        let fired = evaluate_tick(&mut state, &defs, &config, start).unwrap();
        assert_eq!(fired.definition_id, "t1");
        assert_eq!(state.status, EvaluatorStatus::Fired);

        // Deeper scrolling never re-fires.
        state.max_scroll_depth = 100;
        assert!(evaluate_tick(&mut state, &defs, &config, start).is_none());
        assert_eq!(state.fired.as_ref().unwrap().definition_id, "t1");
    }

    #[test]
    fn lowest_overage_fraction_wins_simultaneous_eligibility() {
        let start = Utc::now();
        let mut state = state(start);
        // Visitor at 35s of a 30s time trigger (17% overage) and 82% of an
        // 80% scroll trigger (2.5% overage): scroll wins.
        state.max_scroll_depth = 82;
        let now = start + Duration::seconds(35);

        let defs = vec![
            definition("t-time", TriggerRule::TimeOnPage { threshold_secs: 30 }),
            definition("t-scroll", TriggerRule::ScrollDepth { percent: 80 }),
        ];

        let fired = evaluate_tick(&mut state, &defs, &EngagementConfig::default(), now).unwrap();
        assert_eq!(fired.definition_id, "t-scroll");
        assert_eq!(fired.confidence, 0.8);
    }

    #[test]
    fn exact_overage_ties_fall_back_to_definition_order() {
        let start = Utc::now();
        let mut state = state(start);
        state.max_scroll_depth = 60;
        let now = start + Duration::seconds(60);

        // Both exactly at threshold: overage 0 each.
        let defs = vec![
            definition("t-first", TriggerRule::ScrollDepth { percent: 60 }),
            definition("t-second", TriggerRule::TimeOnPage { threshold_secs: 60 }),
        ];

        let fired = evaluate_tick(&mut state, &defs, &EngagementConfig::default(), now).unwrap();
        assert_eq!(fired.definition_id, "t-first");
    }

    #[test]
    fn url_patterns_scope_triggers_to_matching_pages() {
        let start = Utc::now();
        let mut state = state(start);
        state.max_scroll_depth = 90;

        let mut scoped = definition("t1", TriggerRule::ScrollDepth { percent: 50 });
        scoped.url_patterns = vec!["/checkout".to_string()];

        assert!(evaluate_tick(
            &mut state,
            &[scoped.clone()],
            &EngagementConfig::default(),
            start
        )
        .is_none());

        state.current_page_url = "https://shop.example.com/checkout/step-1".to_string();
        assert!(evaluate_tick(&mut state, &[scoped], &EngagementConfig::default(), start).is_some());
    }

    #[test]
    fn disabled_definitions_are_ignored() {
        let start = Utc::now();
        let mut state = state(start);
        state.max_scroll_depth = 100;

        let mut def = definition("t1", TriggerRule::ScrollDepth { percent: 50 });
        def.enabled = false;

        assert!(evaluate_tick(&mut state, &[def], &EngagementConfig::default(), start).is_none());
    }

    #[test]
    fn confidence_gate_blocks_low_trust_trigger_types() {
        let start = Utc::now();
        let mut state = state(start);
        state.max_scroll_depth = 100;

        // Heuristic scroll confidence pushed below the implicit gate: the
        // trigger can never fire, so the time trigger wins despite its
        // larger overage.
        let config = EngagementConfig {
            scroll_trigger_confidence: 0.6,
            ..EngagementConfig::default()
        };
        let now = start + Duration::seconds(45);

        let defs = vec![
            definition("t-scroll", TriggerRule::ScrollDepth { percent: 50 }),
            definition("t-time", TriggerRule::TimeOnPage { threshold_secs: 30 }),
        ];

        let fired = evaluate_tick(&mut state, &defs, &config, now).unwrap();
        assert_eq!(fired.definition_id, "t-time");

        // With every type gated out, nothing fires at all.
        let config = EngagementConfig {
            scroll_trigger_confidence: 0.6,
            time_trigger_confidence: 0.2,
            ..EngagementConfig::default()
        };
        let mut fresh = SessionState::new("s2".into(), "a1".into(), "/".into(), start);
        fresh.max_scroll_depth = 100;
        let defs = vec![
            definition("t-scroll", TriggerRule::ScrollDepth { percent: 50 }),
            definition("t-time", TriggerRule::TimeOnPage { threshold_secs: 30 }),
        ];
        assert!(evaluate_tick(&mut fresh, &defs, &config, now).is_none());
    }

    #[test]
    fn element_visibility_uses_seconds_since_first_sighting() {
        let start = Utc::now();
        let mut state = state(start);
        state
            .element_first_seen
            .insert("#pricing-table".to_string(), start);

        let defs = vec![definition(
            "t1",
            TriggerRule::ElementVisible {
                selector: "#pricing-table".to_string(),
                threshold_secs: 10,
            },
        )];
        let config = EngagementConfig::default();

        assert!(evaluate_tick(&mut state, &defs, &config, start + Duration::seconds(9)).is_none());
        let fired =
            evaluate_tick(&mut state, &defs, &config, start + Duration::seconds(10)).unwrap();
        assert_eq!(fired.definition_id, "t1");
        assert_eq!(fired.confidence, 0.75);
    }
}
