use super::types::{
    PulseConfig, RawLearningConfig, RawPulseConfig, RawRewardConfig, RawStorageConfig,
    StorageConfig,
};
use anyhow::{Context, Result};
use pulse_learn::{PolicyConfig, RewardWeights};
use std::path::{Path, PathBuf};

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load merged configuration (user + project)
    pub fn load() -> Result<PulseConfig> {
        Self::load_layers(&[Self::user_config_path(), Self::project_config_path()])
    }

    /// Merge the given files in order; missing files are skipped
    pub fn load_layers(paths: &[PathBuf]) -> Result<PulseConfig> {
        let mut raw = RawPulseConfig::default();
        for path in paths {
            if let Some(layer) = Self::read_layer(path)? {
                raw = Self::merge_raw(raw, layer);
            }
        }
        Self::finalize(raw)
    }

    fn read_layer(path: &Path) -> Result<Option<RawPulseConfig>> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let layer = toml::from_str(&contents)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        tracing::debug!(path = %path.display(), "Loaded config layer");
        Ok(Some(layer))
    }

    /// Get user config path (`$XDG_CONFIG_HOME/pulse/config.toml`)
    pub fn user_config_path() -> PathBuf {
        pulse_paths::config_dir().join("config.toml")
    }

    /// Get project config path
    /// Can be overridden with PULSE_PROJECT_CONFIG_DIR env var (useful for isolated tests)
    pub fn project_config_path() -> PathBuf {
        if let Ok(dir) = std::env::var("PULSE_PROJECT_CONFIG_DIR") {
            PathBuf::from(dir).join("config.toml")
        } else {
            PathBuf::from(".pulse/config.toml")
        }
    }

    /// Merge two raw configs (overlay values override base only if explicitly set)
    fn merge_raw(base: RawPulseConfig, overlay: RawPulseConfig) -> RawPulseConfig {
        RawPulseConfig {
            storage: RawStorageConfig {
                data_dir: overlay.storage.data_dir.or(base.storage.data_dir),
            },
            reward: RawRewardConfig {
                version: overlay.reward.version.or(base.reward.version),
                replies: overlay.reward.replies.or(base.reward.replies),
                bookmarks: overlay.reward.bookmarks.or(base.reward.bookmarks),
                reshares: overlay.reward.reshares.or(base.reward.reshares),
                likes: overlay.reward.likes.or(base.reward.likes),
                profile_clicks: overlay.reward.profile_clicks.or(base.reward.profile_clicks),
                link_clicks: overlay.reward.link_clicks.or(base.reward.link_clicks),
            },
            learning: RawLearningConfig {
                prior_alpha: overlay.learning.prior_alpha.or(base.learning.prior_alpha),
                prior_beta: overlay.learning.prior_beta.or(base.learning.prior_beta),
                fresh_boost: overlay.learning.fresh_boost.or(base.learning.fresh_boost),
                recent_penalty: overlay.learning.recent_penalty.or(base.learning.recent_penalty),
                recent_window_days: overlay
                    .learning
                    .recent_window_days
                    .or(base.learning.recent_window_days),
                recommendation_max_age_days: overlay
                    .learning
                    .recommendation_max_age_days
                    .or(base.learning.recommendation_max_age_days),
                learnings_cap: overlay.learning.learnings_cap.or(base.learning.learnings_cap),
                min_trials_for_verdict: overlay
                    .learning
                    .min_trials_for_verdict
                    .or(base.learning.min_trials_for_verdict),
            },
        }
    }

    /// Convert raw config to final config with defaults applied
    fn finalize(raw: RawPulseConfig) -> Result<PulseConfig> {
        let weights = RewardWeights::default();
        let policy = PolicyConfig::default();

        // PULSE_DATA_DIR beats the config files; XDG default comes last.
        let data_dir = std::env::var_os(pulse_paths::DATA_DIR_ENV)
            .map(PathBuf::from)
            .or(raw.storage.data_dir)
            .unwrap_or_else(pulse_paths::data_dir);

        let config = PulseConfig {
            storage: StorageConfig { data_dir },
            reward: RewardWeights {
                version: raw.reward.version.unwrap_or(weights.version),
                replies: raw.reward.replies.unwrap_or(weights.replies),
                bookmarks: raw.reward.bookmarks.unwrap_or(weights.bookmarks),
                reshares: raw.reward.reshares.unwrap_or(weights.reshares),
                likes: raw.reward.likes.unwrap_or(weights.likes),
                profile_clicks: raw.reward.profile_clicks.unwrap_or(weights.profile_clicks),
                link_clicks: raw.reward.link_clicks.unwrap_or(weights.link_clicks),
            },
            learning: PolicyConfig {
                prior_alpha: raw.learning.prior_alpha.unwrap_or(policy.prior_alpha),
                prior_beta: raw.learning.prior_beta.unwrap_or(policy.prior_beta),
                fresh_boost: raw.learning.fresh_boost.unwrap_or(policy.fresh_boost),
                recent_penalty: raw.learning.recent_penalty.unwrap_or(policy.recent_penalty),
                recent_window_days: raw
                    .learning
                    .recent_window_days
                    .unwrap_or(policy.recent_window_days),
                recommendation_max_age_days: raw
                    .learning
                    .recommendation_max_age_days
                    .unwrap_or(policy.recommendation_max_age_days),
                learnings_cap: raw.learning.learnings_cap.unwrap_or(policy.learnings_cap),
                min_trials_for_verdict: raw
                    .learning
                    .min_trials_for_verdict
                    .unwrap_or(policy.min_trials_for_verdict),
            },
        };

        config.learn_config().validate()?;
        Ok(config)
    }
}
