use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock};

use crate::attribution::AttributionConfig;
use crate::engagement::EngagementConfig;

/// Tenant-tunable engine settings. The confidence gates and scoring
/// weights are observed product behavior, not domain invariants, so they
/// live in configuration rather than constants.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct EngineSettings {
    attribution: AttributionConfig,
    engagement: EngagementConfig,
}

/// JSON-file backed settings store. Unreadable or missing files fall back
/// to defaults instead of failing startup.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<EngineSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            EngineSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn attribution(&self) -> AttributionConfig {
        self.data.read().unwrap().attribution.clone()
    }

    pub fn engagement(&self) -> EngagementConfig {
        self.data.read().unwrap().engagement.clone()
    }

    pub fn update_attribution(&self, config: AttributionConfig) -> Result<()> {
        let mut guard = self.data.write().unwrap();
        guard.attribution = config;
        self.persist(&guard)
    }

    pub fn update_engagement(&self, config: EngagementConfig) -> Result<()> {
        let mut guard = self.data.write().unwrap();
        guard.engagement = config;
        self.persist(&guard)
    }

    fn persist(&self, data: &EngineSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
