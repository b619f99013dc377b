use anyhow::Result;
use chrono::{Duration, Utc};

use crate::attribution::{
    config::AttributionConfig,
    scoring::{score_candidate, AttributionScore},
};
use crate::db::Database;
use crate::models::{AttributedOrder, Conversation, Order};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Links new orders to the conversation that most likely caused them.
/// Invoked fire-and-forget on order upsert events; safe to run concurrently
/// for different orders since each resolution reads its own candidate set.
#[derive(Clone)]
pub struct OrderResolver {
    db: Database,
    config: AttributionConfig,
}

impl OrderResolver {
    pub fn new(db: Database, config: AttributionConfig) -> Self {
        Self { db, config }
    }

    /// Attribute `order` to its best-matching conversation, if any.
    ///
    /// Returns the existing attribution unchanged when the order was
    /// already resolved (idempotent by order id), and `Ok(None)` when no
    /// signal fired for any candidate — "not attributable" is an expected
    /// terminal outcome, not an error.
    pub async fn resolve(&self, order: &Order) -> Result<Option<AttributedOrder>> {
        if let Some(existing) = self.db.get_attribution(&order.id).await? {
            log_info!("order {} already attributed; skipping", order.id);
            return Ok(Some(existing));
        }

        let from = order.order_created_at - Duration::days(self.config.candidate_lookback_days);
        let to = order.order_created_at + Duration::days(self.config.candidate_lookahead_days);

        let candidates = match self
            .db
            .list_candidate_conversations(&order.agent_id, from, to)
            .await
        {
            Ok(candidates) => candidates,
            Err(err) => {
                // Surfaced only as the absence of an attribution row; the
                // order pipeline itself never sees this failure.
                log_warn!("candidate fetch failed for order {}: {err:#}", order.id);
                return Ok(None);
            }
        };

        let Some((best, score)) = self.select_best(&candidates, order) else {
            log_info!("order {} has no attributable conversation", order.id);
            return Ok(None);
        };

        let attribution_type = match score.attribution_type {
            Some(label) => label,
            None => return Ok(None),
        };

        let attribution = AttributedOrder {
            order_id: order.id.clone(),
            conversation_id: best.id.clone(),
            attribution_type,
            attribution_confidence: score.confidence,
            total_price: order.total_price,
            currency: order.currency.clone(),
            line_items: order.line_items.clone(),
            customer_email: order.customer_email.clone(),
            order_created_at: order.order_created_at,
            created_at: Utc::now(),
        };

        let inserted = self.db.insert_attribution_once(&attribution).await?;
        if !inserted {
            // Lost a race with a concurrent invocation for the same order.
            // Scoring is deterministic, so the winner's row is equivalent.
            return self.db.get_attribution(&order.id).await;
        }

        log_info!(
            "attributed order {} to conversation {} ({}, confidence {:.2})",
            order.id,
            attribution.conversation_id,
            attribution.attribution_type.as_str(),
            attribution.attribution_confidence
        );

        Ok(Some(attribution))
    }

    /// Score every candidate and keep the strictly best one. Ties go to the
    /// conversation with the most recent last message (most likely causally
    /// adjacent). Zero-confidence candidates never win.
    fn select_best<'a>(
        &self,
        candidates: &'a [Conversation],
        order: &Order,
    ) -> Option<(&'a Conversation, AttributionScore)> {
        let mut best: Option<(&Conversation, AttributionScore)> = None;

        for candidate in candidates {
            let score = score_candidate(candidate, order, &self.config);
            if score.attribution_type.is_none() {
                continue;
            }

            let replace = match &best {
                None => true,
                Some((current, current_score)) => {
                    score.confidence > current_score.confidence
                        || (score.confidence == current_score.confidence
                            && candidate.last_message_at > current.last_message_at)
                }
            };
            if replace {
                best = Some((candidate, score));
            }
        }

        best
    }
}
