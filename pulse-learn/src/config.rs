//! Configuration for the learning engine.
//!
//! Two tables:
//! - `RewardWeights`: the versioned engagement weight table behind the reward
//! - `PolicyConfig`: bandit policy constants (priors, boosts, caps, staleness)

use serde::{Deserialize, Serialize};

use crate::error::{LearnError, Result};

/// Version tag of the built-in weight table
pub const DEFAULT_WEIGHTS_VERSION: &str = "xas-v1";

/// Engagement weights approximating a public ranking algorithm.
///
/// Stamped into every score via `version` so snapshots taken under
/// different tables can be told apart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardWeights {
    pub version: String,
    pub replies: f64,
    pub bookmarks: f64,
    pub reshares: f64,
    pub likes: f64,
    pub profile_clicks: f64,
    pub link_clicks: f64,
}

impl Default for RewardWeights {
    fn default() -> Self {
        Self {
            version: DEFAULT_WEIGHTS_VERSION.to_string(),
            replies: 13.5,
            bookmarks: 10.0,
            reshares: 1.0,
            likes: 0.5,
            profile_clicks: 12.0,
            link_clicks: 5.0,
        }
    }
}

/// Bandit policy constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Prior pseudo-successes for a newly created arm
    pub prior_alpha: f64,
    /// Prior pseudo-failures for a newly created arm
    pub prior_beta: f64,
    /// Multiplier for fresh / unsaturated arms during selection (capped at 1.0)
    pub fresh_boost: f64,
    /// Multiplier for arms used inside the recent window
    pub recent_penalty: f64,
    /// Days an arm counts as recently used
    pub recent_window_days: i64,
    /// Recommendations older than this are treated as absent
    pub recommendation_max_age_days: i64,
    /// Accumulated learnings kept in the hypothesis log
    pub learnings_cap: usize,
    /// Arm trials required before a hypothesis verdict is issued
    pub min_trials_for_verdict: u64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            prior_alpha: 0.3,
            prior_beta: 0.7,
            fresh_boost: 1.5,
            recent_penalty: 0.3,
            recent_window_days: 2,
            recommendation_max_age_days: 7,
            learnings_cap: 12,
            min_trials_for_verdict: 5,
        }
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LearnConfig {
    #[serde(default)]
    pub reward: RewardWeights,
    #[serde(default)]
    pub learning: PolicyConfig,
}

impl LearnConfig {
    /// Reject values that would break the Beta invariants or the policy math
    pub fn validate(&self) -> Result<()> {
        let policy = &self.learning;
        if policy.prior_alpha <= 0.0 || policy.prior_beta <= 0.0 {
            return Err(LearnError::Config(format!(
                "priors must be positive (alpha={}, beta={})",
                policy.prior_alpha, policy.prior_beta
            )));
        }
        if policy.fresh_boost < 1.0 {
            return Err(LearnError::Config(format!(
                "fresh_boost must be >= 1.0, got {}",
                policy.fresh_boost
            )));
        }
        if !(0.0..=1.0).contains(&policy.recent_penalty) {
            return Err(LearnError::Config(format!(
                "recent_penalty must be within [0, 1], got {}",
                policy.recent_penalty
            )));
        }
        if policy.learnings_cap == 0 {
            return Err(LearnError::Config("learnings_cap must be at least 1".into()));
        }
        let weights = [
            self.reward.replies,
            self.reward.bookmarks,
            self.reward.reshares,
            self.reward.likes,
            self.reward.profile_clicks,
            self.reward.link_clicks,
        ];
        if weights.iter().any(|w| *w < 0.0 || !w.is_finite()) {
            return Err(LearnError::Config(format!(
                "reward weights must be finite and non-negative ({})",
                self.reward.version
            )));
        }
        Ok(())
    }
}
