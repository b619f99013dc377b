use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Type-specific trigger parameters, keyed by trigger type so a malformed
/// or cross-type parameter set fails validation instead of surfacing as a
/// runtime `None` deep inside evaluation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "triggerType", rename_all = "snake_case")]
pub enum TriggerRule {
    /// Fires once the visitor has spent at least `threshold_secs` in the
    /// session. Tenant-authored, so it carries the highest confidence.
    TimeOnPage { threshold_secs: u64 },
    /// Fires once the session's maximum scroll depth reaches `percent`.
    ScrollDepth { percent: u8 },
    /// Fires once `selector` has been visible for at least `threshold_secs`.
    ElementVisible {
        selector: String,
        threshold_secs: u64,
    },
}

impl TriggerRule {
    pub fn trigger_type(&self) -> &'static str {
        match self {
            TriggerRule::TimeOnPage { .. } => "time_on_page",
            TriggerRule::ScrollDepth { .. } => "scroll_depth",
            TriggerRule::ElementVisible { .. } => "element_visible",
        }
    }

    /// Validate loose storage columns into a typed rule.
    pub fn from_parts(
        trigger_type: &str,
        time_threshold_secs: Option<u64>,
        scroll_depth_percent: Option<u8>,
        element_selector: Option<String>,
    ) -> Result<Self> {
        match trigger_type {
            "time_on_page" => {
                let threshold_secs = time_threshold_secs
                    .ok_or_else(|| anyhow!("time_on_page trigger missing time threshold"))?;
                Ok(TriggerRule::TimeOnPage { threshold_secs })
            }
            "scroll_depth" => {
                let percent = scroll_depth_percent
                    .ok_or_else(|| anyhow!("scroll_depth trigger missing depth percent"))?;
                if percent > 100 {
                    bail!("scroll_depth percent {percent} out of range 0-100");
                }
                Ok(TriggerRule::ScrollDepth { percent })
            }
            "element_visible" => {
                let selector = element_selector
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| anyhow!("element_visible trigger missing selector"))?;
                let threshold_secs = time_threshold_secs
                    .ok_or_else(|| anyhow!("element_visible trigger missing time threshold"))?;
                Ok(TriggerRule::ElementVisible {
                    selector,
                    threshold_secs,
                })
            }
            other => bail!("unknown trigger type '{other}'"),
        }
    }
}

/// Tenant configuration for one proactive trigger.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerDefinition {
    pub id: String,
    pub agent_id: String,
    pub enabled: bool,
    #[serde(flatten)]
    pub rule: TriggerRule,
    /// Substring matches against the current page url; empty = all pages.
    pub url_patterns: Vec<String>,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl TriggerDefinition {
    /// True when this definition applies to the given page.
    pub fn matches_url(&self, page_url: &str) -> bool {
        self.url_patterns.is_empty()
            || self.url_patterns.iter().any(|p| page_url.contains(p.as_str()))
    }
}

/// Raw trigger row as stored; promoted to a `TriggerDefinition` through
/// `TriggerRule::from_parts` so bad rows can be skipped individually.
#[derive(Debug, Clone)]
pub struct TriggerRow {
    pub id: String,
    pub agent_id: String,
    pub trigger_type: String,
    pub enabled: bool,
    pub time_threshold_secs: Option<u64>,
    pub scroll_depth_percent: Option<u8>,
    pub element_selector: Option<String>,
    pub url_patterns: Vec<String>,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl TriggerRow {
    pub fn into_definition(self) -> Result<TriggerDefinition> {
        let rule = TriggerRule::from_parts(
            &self.trigger_type,
            self.time_threshold_secs,
            self.scroll_depth_percent,
            self.element_selector,
        )?;
        Ok(TriggerDefinition {
            id: self.id,
            agent_id: self.agent_id,
            enabled: self.enabled,
            rule,
            url_patterns: self.url_patterns,
            message: self.message,
            created_at: self.created_at,
        })
    }
}
