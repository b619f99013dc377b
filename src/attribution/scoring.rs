use crate::attribution::config::AttributionConfig;
use crate::models::{AttributionType, Conversation, Order};
use crate::signals::{
    email_match, product_mention, temporal_proximity, ProductMention, TemporalProximity,
};

/// Scoring outcome for one (conversation, order) pair, with the per-signal
/// breakdown kept so attribution decisions stay auditable to store owners.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributionScore {
    pub confidence: f64,
    /// `None` when no signal fired: the pair is not attributable, which is
    /// distinct from a low-confidence match.
    pub attribution_type: Option<AttributionType>,
    pub email_matched: bool,
    pub temporal: TemporalProximity,
    pub product: ProductMention,
}

/// Deterministic rule cascade: compute the three signals, sum their
/// contributions, clamp to [0, 1], and derive the label from which signals
/// fired. Chosen over a learned model so every attribution is explainable.
pub fn score_candidate(
    conversation: &Conversation,
    order: &Order,
    config: &AttributionConfig,
) -> AttributionScore {
    let email_matched = email_match(
        conversation.lead_email.as_deref(),
        order.customer_email.as_deref(),
    );
    let temporal = temporal_proximity(
        conversation.last_message_at,
        order.order_created_at,
        config.temporal_window_minutes,
    );
    let product = product_mention(&conversation.transcript, &order.line_item_titles());

    let mut confidence = 0.0;
    if email_matched {
        confidence += config.weight_email;
    }
    if temporal.matched {
        // Linear falloff: a delta at the window edge still counts as a
        // match for the label, but contributes nothing to the score.
        let falloff = 1.0 - temporal.delta_minutes / config.temporal_window_minutes;
        confidence += config.weight_temporal * falloff;
    }
    if product.matched {
        // Flat credit: partial "some but not all titles" credit is not
        // meaningful for a binary match decision.
        confidence += config.weight_product;
    }

    AttributionScore {
        confidence: confidence.clamp(0.0, 1.0),
        attribution_type: AttributionType::from_signals(
            email_matched,
            temporal.matched,
            product.matched,
        ),
        email_matched,
        temporal,
        product,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, Utc};

    fn conversation(
        lead_email: Option<&str>,
        transcript: &str,
        last_message_at: DateTime<Utc>,
    ) -> Conversation {
        Conversation {
            id: "c1".to_string(),
            agent_id: "a1".to_string(),
            lead_email: lead_email.map(str::to_string),
            transcript: transcript.to_string(),
            last_message_at,
            created_at: last_message_at - Duration::minutes(15),
        }
    }

    fn order(
        customer_email: Option<&str>,
        titles: &[&str],
        order_created_at: DateTime<Utc>,
    ) -> Order {
        Order {
            id: "o1".to_string(),
            agent_id: "a1".to_string(),
            customer_email: customer_email.map(str::to_string),
            total_price: 59.0,
            currency: "USD".to_string(),
            line_items: titles
                .iter()
                .map(|t| crate::models::LineItem {
                    title: t.to_string(),
                    quantity: 1,
                    price: 59.0,
                })
                .collect(),
            order_created_at,
        }
    }

    #[test]
    fn email_plus_temporal_ten_minutes_scores_point_eight() {
        let last_message = Utc::now();
        let conv = conversation(Some("a@x.com"), "hello", last_message);
        let ord = order(Some("a@x.com"), &["Blue Hoodie"], last_message + Duration::minutes(10));

        let score = score_candidate(&conv, &ord, &AttributionConfig::default());

        // 0.6 + 0.3 * (1 - 10/30) = 0.8
        assert!((score.confidence - 0.8).abs() < 1e-9);
        assert_eq!(score.attribution_type, Some(AttributionType::EmailTemporal));
    }

    #[test]
    fn product_mention_alone_scores_point_two_five() {
        let last_message = Utc::now();
        let conv = conversation(None, "does the blue hoodie come in XL?", last_message);
        let ord = order(None, &["Blue Hoodie"], last_message + Duration::hours(5));

        let score = score_candidate(&conv, &ord, &AttributionConfig::default());

        assert!((score.confidence - 0.25).abs() < 1e-9);
        assert_eq!(score.attribution_type, Some(AttributionType::ProductMention));
    }

    #[test]
    fn no_signal_means_zero_confidence_and_no_label() {
        let last_message = Utc::now();
        let conv = conversation(None, "hello there", last_message);
        let ord = order(None, &["Blue Hoodie"], last_message + Duration::hours(5));

        let score = score_candidate(&conv, &ord, &AttributionConfig::default());

        assert_eq!(score.confidence, 0.0);
        assert_eq!(score.attribution_type, None);
    }

    #[test]
    fn all_three_signals_collapse_to_all_methods() {
        let last_message = Utc::now();
        let conv = conversation(
            Some("a@x.com"),
            "thinking about the blue hoodie",
            last_message,
        );
        let ord = order(Some("A@X.COM"), &["Blue Hoodie"], last_message + Duration::minutes(6));

        let score = score_candidate(&conv, &ord, &AttributionConfig::default());

        // 0.6 + 0.3 * (1 - 6/30) + 0.25 = 1.09, clamped to 1.0
        assert_eq!(score.confidence, 1.0);
        assert_eq!(score.attribution_type, Some(AttributionType::AllMethods));
    }

    #[test]
    fn window_edge_matches_with_zero_contribution() {
        let last_message = Utc::now();
        let conv = conversation(Some("a@x.com"), "hello", last_message);
        let ord = order(Some("a@x.com"), &[], last_message + Duration::minutes(30));

        let score = score_candidate(&conv, &ord, &AttributionConfig::default());

        // Temporal still fires for the label, but adds nothing on top of email.
        assert!((score.confidence - 0.6).abs() < 1e-9);
        assert_eq!(score.attribution_type, Some(AttributionType::EmailTemporal));

        let past_edge = order(
            Some("a@x.com"),
            &[],
            last_message + Duration::minutes(30) + Duration::seconds(1),
        );
        let score = score_candidate(&conv, &past_edge, &AttributionConfig::default());
        assert_eq!(score.attribution_type, Some(AttributionType::EmailMatch));
    }

    #[test]
    fn scoring_is_deterministic() {
        let last_message = Utc::now();
        let conv = conversation(Some("a@x.com"), "blue hoodie please", last_message);
        let ord = order(Some("a@x.com"), &["Blue Hoodie"], last_message + Duration::minutes(12));
        let config = AttributionConfig::default();

        let first = score_candidate(&conv, &ord, &config);
        let second = score_candidate(&conv, &ord, &config);
        assert_eq!(first, second);
    }

    #[test]
    fn adding_a_signal_never_lowers_confidence() {
        let last_message = Utc::now();
        let config = AttributionConfig::default();
        let at = last_message + Duration::minutes(10);

        let without_email = score_candidate(
            &conversation(None, "blue hoodie", last_message),
            &order(Some("a@x.com"), &["Blue Hoodie"], at),
            &config,
        );
        let with_email = score_candidate(
            &conversation(Some("a@x.com"), "blue hoodie", last_message),
            &order(Some("a@x.com"), &["Blue Hoodie"], at),
            &config,
        );

        assert!(with_email.confidence >= without_email.confidence);

        let without_product = score_candidate(
            &conversation(Some("a@x.com"), "hello", last_message),
            &order(Some("a@x.com"), &["Blue Hoodie"], at),
            &config,
        );
        assert!(without_product.confidence <= with_email.confidence);
    }
}
