//! The aggregate learning state

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use crate::config::PolicyConfig;
use crate::types::{Arm, ArmKey, BetaParams, Dimension};

/// Arms of one dimension, ordered by key
pub type ArmTable = BTreeMap<ArmKey, BetaParams>;

/// Read an arm table, normalizing keys as they load.
///
/// Stored keys that normalize to the same arm are merged, with the default
/// prior counted once, so no trials are lost.
fn merge_arm_keys<'de, D>(deserializer: D) -> Result<ArmTable, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, BetaParams>::deserialize(deserializer)?;
    let policy = PolicyConfig::default();
    let prior = (policy.prior_alpha, policy.prior_beta);

    let mut table = ArmTable::new();
    for (raw_key, params) in raw {
        let key = ArmKey::new(&raw_key).map_err(serde::de::Error::custom)?;
        match table.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(params);
            }
            Entry::Occupied(mut slot) => {
                warn!(
                    arm = %slot.key(),
                    stored_key = %raw_key,
                    trials = params.trials,
                    "Merging stored arms that normalize to the same key"
                );
                slot.get_mut().merge(&params, prior);
            }
        }
    }
    Ok(table)
}

/// Reference to a scored post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostRef {
    pub id: String,
    pub reward: f64,
}

/// Statistics across every post ever applied
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalStats {
    pub total_posts_analyzed: u64,
    /// Running mean of the canonical reward (normalized score)
    pub avg_reward: f64,
    pub best_post: Option<PostRef>,
    pub worst_post: Option<PostRef>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl GlobalStats {
    /// Fold one applied post into the running statistics
    pub fn record(&mut self, id: &str, reward: f64) {
        let n = self.total_posts_analyzed as f64;
        self.avg_reward = (self.avg_reward * n + reward) / (n + 1.0);
        self.total_posts_analyzed += 1;

        if self.best_post.as_ref().is_none_or(|best| reward > best.reward) {
            self.best_post = Some(PostRef {
                id: id.to_string(),
                reward,
            });
        }
        if self.worst_post.as_ref().is_none_or(|worst| reward < worst.reward) {
            self.worst_post = Some(PostRef {
                id: id.to_string(),
                reward,
            });
        }
    }
}

/// Per-dimension Beta arms plus global statistics
///
/// Arms are created lazily on first observation and never removed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LearningState {
    #[serde(default, deserialize_with = "merge_arm_keys")]
    pub theme_scores: ArmTable,
    #[serde(default, deserialize_with = "merge_arm_keys")]
    pub approach_scores: ArmTable,
    #[serde(default, deserialize_with = "merge_arm_keys")]
    pub slot_scores: ArmTable,
    #[serde(default, deserialize_with = "merge_arm_keys")]
    pub variant_scores: ArmTable,
    #[serde(default, deserialize_with = "merge_arm_keys")]
    pub feature_scores: ArmTable,
    #[serde(default, deserialize_with = "merge_arm_keys")]
    pub source_type_scores: ArmTable,
    #[serde(default)]
    pub global_stats: GlobalStats,
    /// Ids of posts already applied to the arms
    #[serde(default)]
    pub seen_posts: BTreeSet<String>,
}

impl LearningState {
    pub fn arms(&self, dimension: Dimension) -> &ArmTable {
        match dimension {
            Dimension::Theme => &self.theme_scores,
            Dimension::Approach => &self.approach_scores,
            Dimension::Slot => &self.slot_scores,
            Dimension::Variant => &self.variant_scores,
            Dimension::TextFeature => &self.feature_scores,
            Dimension::SourceType => &self.source_type_scores,
        }
    }

    pub fn arms_mut(&mut self, dimension: Dimension) -> &mut ArmTable {
        match dimension {
            Dimension::Theme => &mut self.theme_scores,
            Dimension::Approach => &mut self.approach_scores,
            Dimension::Slot => &mut self.slot_scores,
            Dimension::Variant => &mut self.variant_scores,
            Dimension::TextFeature => &mut self.feature_scores,
            Dimension::SourceType => &mut self.source_type_scores,
        }
    }

    pub fn arm(&self, arm: &Arm) -> Option<&BetaParams> {
        self.arms(arm.dimension).get(&arm.key)
    }

    /// Update an arm, creating it with the given prior first if needed
    pub fn observe(&mut self, arm: &Arm, normalized_reward: f64, prior: (f64, f64)) {
        self.arms_mut(arm.dimension)
            .entry(arm.key.clone())
            .or_insert_with(|| BetaParams::new_with_prior(prior.0, prior.1))
            .update(normalized_reward);
    }

    /// Total arms across all dimensions
    pub fn arm_count(&self) -> usize {
        Dimension::all().iter().map(|d| self.arms(*d).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.arm_count() == 0
    }

    /// Trials of an arm, 0 when it has never been observed
    pub fn trials(&self, dimension: Dimension, key: &str) -> u64 {
        ArmKey::new(key)
            .ok()
            .and_then(|key| self.arms(dimension).get(&key))
            .map_or(0, |params| params.trials)
    }
}
