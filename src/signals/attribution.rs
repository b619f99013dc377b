//! Attribution signals: pure evidence extractors over an already-fetched
//! (conversation, order) pair. Missing data yields a neutral/false value,
//! never an error, since partial data is the expected case.

use chrono::{DateTime, Utc};

/// Case-insensitive exact match between the conversation lead email and the
/// order customer email. Missing on either side means no match.
pub fn email_match(lead_email: Option<&str>, customer_email: Option<&str>) -> bool {
    match (lead_email, customer_email) {
        (Some(lead), Some(customer)) => {
            !lead.is_empty() && lead.eq_ignore_ascii_case(customer)
        }
        _ => false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemporalProximity {
    pub matched: bool,
    pub delta_minutes: f64,
}

/// Matched iff the order landed within `window_minutes` of the last
/// conversation message, in either direction: orders placed before the
/// conversation's last message are still eligible (abandoned-cart recovery
/// legitimately precedes the order). The boundary is inclusive.
pub fn temporal_proximity(
    last_message_at: DateTime<Utc>,
    order_created_at: DateTime<Utc>,
    window_minutes: f64,
) -> TemporalProximity {
    let delta_minutes =
        ((order_created_at - last_message_at).num_milliseconds() as f64 / 60_000.0).abs();
    TemporalProximity {
        matched: delta_minutes <= window_minutes,
        delta_minutes,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductMention {
    pub matched: bool,
    pub matched_titles: Vec<String>,
}

/// Case-insensitive exact substring match between each line-item title and
/// the conversation transcript. No stemming or fuzzy matching: precision
/// over recall, so partial-word collisions can't manufacture a match.
pub fn product_mention(transcript: &str, line_item_titles: &[&str]) -> ProductMention {
    if transcript.is_empty() {
        return ProductMention {
            matched: false,
            matched_titles: Vec::new(),
        };
    }

    let haystack = transcript.to_lowercase();
    let matched_titles: Vec<String> = line_item_titles
        .iter()
        .filter(|title| !title.is_empty() && haystack.contains(&title.to_lowercase()))
        .map(|title| title.to_string())
        .collect();

    ProductMention {
        matched: !matched_titles.is_empty(),
        matched_titles,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn email_match_is_case_insensitive() {
        assert!(email_match(Some("A@x.com"), Some("a@X.COM")));
        assert!(!email_match(Some("a@x.com"), Some("b@x.com")));
    }

    #[test]
    fn email_match_treats_missing_as_false() {
        assert!(!email_match(None, Some("a@x.com")));
        assert!(!email_match(Some("a@x.com"), None));
        assert!(!email_match(None, None));
        assert!(!email_match(Some(""), Some("")));
    }

    #[test]
    fn temporal_proximity_matches_inside_window() {
        let last_message = Utc::now();
        let order = last_message + Duration::minutes(10);

        let result = temporal_proximity(last_message, order, 30.0);
        assert!(result.matched);
        assert!((result.delta_minutes - 10.0).abs() < 1e-9);
    }

    #[test]
    fn temporal_proximity_boundary_is_inclusive() {
        let last_message = Utc::now();
        let at_edge = last_message + Duration::minutes(30);
        let past_edge = last_message + Duration::minutes(30) + Duration::seconds(1);

        assert!(temporal_proximity(last_message, at_edge, 30.0).matched);
        assert!(!temporal_proximity(last_message, past_edge, 30.0).matched);

        // Even a sub-second overshoot falls outside the window.
        let barely_past = last_message + Duration::minutes(30) + Duration::milliseconds(500);
        assert!(!temporal_proximity(last_message, barely_past, 30.0).matched);
    }

    #[test]
    fn orders_before_the_conversation_are_eligible() {
        let last_message = Utc::now();
        let order = last_message - Duration::minutes(20);

        let result = temporal_proximity(last_message, order, 30.0);
        assert!(result.matched);
        assert!((result.delta_minutes - 20.0).abs() < 1e-9);
    }

    #[test]
    fn product_mention_is_substring_and_case_insensitive() {
        let transcript = "Hi, I was wondering if the blue hoodie ships to Canada?";
        let result = product_mention(transcript, &["Blue Hoodie", "Red Scarf"]);

        assert!(result.matched);
        assert_eq!(result.matched_titles, vec!["Blue Hoodie".to_string()]);
    }

    #[test]
    fn product_mention_neutral_on_missing_data() {
        assert!(!product_mention("", &["Blue Hoodie"]).matched);
        assert!(!product_mention("some chat text", &[]).matched);
        assert!(!product_mention("some chat text", &[""]).matched);
    }
}
