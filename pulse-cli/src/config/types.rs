use pulse_learn::{LearnConfig, PolicyConfig, RewardWeights};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration as stored in TOML files (with optional fields for merging)
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RawPulseConfig {
    #[serde(default)]
    pub storage: RawStorageConfig,

    #[serde(default)]
    pub reward: RawRewardConfig,

    #[serde(default)]
    pub learning: RawLearningConfig,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RawStorageConfig {
    /// Directory holding history, state and recommendation files
    pub data_dir: Option<PathBuf>,
}

/// Engagement weights as stored in TOML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RawRewardConfig {
    pub version: Option<String>,
    pub replies: Option<f64>,
    pub bookmarks: Option<f64>,
    pub reshares: Option<f64>,
    pub likes: Option<f64>,
    pub profile_clicks: Option<f64>,
    pub link_clicks: Option<f64>,
}

/// Policy constants as stored in TOML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RawLearningConfig {
    pub prior_alpha: Option<f64>,
    pub prior_beta: Option<f64>,
    pub fresh_boost: Option<f64>,
    pub recent_penalty: Option<f64>,
    pub recent_window_days: Option<i64>,
    pub recommendation_max_age_days: Option<i64>,
    pub learnings_cap: Option<usize>,
    pub min_trials_for_verdict: Option<u64>,
}

/// Final configuration with defaults applied
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PulseConfig {
    pub storage: StorageConfig,

    #[serde(default)]
    pub reward: RewardWeights,

    #[serde(default)]
    pub learning: PolicyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl PulseConfig {
    /// Engine half of the configuration
    pub fn learn_config(&self) -> LearnConfig {
        LearnConfig {
            reward: self.reward.clone(),
            learning: self.learning.clone(),
        }
    }
}
