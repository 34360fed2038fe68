//! Engagement scoring
//!
//! Turns raw platform metrics into one reward scalar. The canonical reward
//! fed to every arm is `normalized_score` (weighted engagement per 1000
//! impressions); `composite_reach_score` is only reported.

use serde::{Deserialize, Serialize};

use crate::config::RewardWeights;
use crate::types::PostMetrics;

/// Score for one post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagementScore {
    pub weights_version: String,
    pub impressions: u64,
    pub total_engagements: u64,
    pub raw_score: f64,
    pub normalized_score: f64,
    pub engagement_rate: f64,
    pub amplification_rate: f64,
    pub conversation_rate: f64,
    pub save_rate: f64,
    pub composite_reach_score: f64,
}

impl EngagementScore {
    /// The bandit reward
    pub fn reward(&self) -> f64 {
        self.normalized_score
    }
}

/// Scores metrics against a weight table
#[derive(Debug, Clone, Default)]
pub struct EngagementScorer {
    weights: RewardWeights,
}

impl EngagementScorer {
    pub fn new(weights: RewardWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &RewardWeights {
        &self.weights
    }

    pub fn score(&self, metrics: &PostMetrics) -> EngagementScore {
        let w = &self.weights;
        let impressions = metrics.impressions.max(1);
        let imp = impressions as f64;

        let raw_score = metrics.replies as f64 * w.replies
            + metrics.bookmarks as f64 * w.bookmarks
            + metrics.reshares as f64 * w.reshares
            + metrics.likes as f64 * w.likes
            + metrics.profile_clicks as f64 * w.profile_clicks
            + metrics.link_clicks as f64 * w.link_clicks;
        let normalized_score = raw_score / imp * 1000.0;

        let total_engagements = metrics.likes
            + metrics.reshares
            + metrics.replies
            + metrics.bookmarks
            + metrics.profile_clicks
            + metrics.link_clicks;

        let composite_reach_score = imp * 0.4
            + normalized_score * 0.3
            + metrics.profile_clicks as f64 * 0.2
            + total_engagements as f64 * 0.1;

        EngagementScore {
            weights_version: w.version.clone(),
            impressions,
            total_engagements,
            raw_score,
            normalized_score,
            engagement_rate: round4(total_engagements as f64 / imp),
            amplification_rate: round4(metrics.reshares as f64 / imp),
            conversation_rate: round4(metrics.replies as f64 / imp),
            save_rate: round4(metrics.bookmarks as f64 / imp),
            composite_reach_score,
        }
    }
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
