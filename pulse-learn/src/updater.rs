//! Learning updater for the bandit feedback loop
//!
//! Scores posts, attributes them to arms in every dimension, and folds the
//! normalized reward into each arm. All dimensions learn from every post.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{LearnConfig, PolicyConfig};
use crate::error::Result;
use crate::features::{FeatureExtractor, TextFeatures};
use crate::scoring::{EngagementScore, EngagementScorer};
use crate::state::LearningState;
use crate::types::{Arm, Dimension, PostRecord, ThemeFreshness, normalize_reward};

/// What a post is credited to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribution {
    pub theme: String,
    pub approach: String,
    pub slot: String,
    pub weekday: String,
    pub variant: String,
    pub features: TextFeatures,
    pub theme_freshness: Option<ThemeFreshness>,
    pub source_type: String,
}

impl Attribution {
    pub fn from_post(post: &PostRecord) -> Self {
        Self {
            theme: post.theme.clone(),
            approach: post.approach.clone(),
            slot: post.effective_slot(),
            weekday: post.weekday(),
            variant: post.variant.clone(),
            features: FeatureExtractor::extract(&post.text),
            theme_freshness: post.theme_freshness,
            source_type: post.source_type.clone(),
        }
    }

    /// Every arm this post updates; fails if any key is invalid
    pub fn arms(&self) -> Result<Vec<Arm>> {
        let mut arms = vec![
            Arm::new(Dimension::Theme, &self.theme)?,
            Arm::new(Dimension::Approach, &self.approach)?,
            Arm::new(Dimension::Slot, &self.slot)?,
            Arm::new(Dimension::Variant, &self.variant)?,
            Arm::new(Dimension::SourceType, &self.source_type)?,
        ];
        for key in self.features.arm_keys() {
            arms.push(Arm::new(Dimension::TextFeature, &key)?);
        }
        Ok(arms)
    }
}

/// A history entry joined with its score and attribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzedPost {
    pub id: String,
    pub posted_at: DateTime<Utc>,
    pub text: String,
    pub score: EngagementScore,
    pub attribution: Attribution,
}

impl AnalyzedPost {
    pub fn reward(&self) -> f64 {
        self.score.reward()
    }
}

/// Counts from one `apply` call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyReport {
    pub applied: usize,
    pub already_seen: usize,
    pub rejected: usize,
}

/// Scores history and updates arms
#[derive(Debug, Clone, Default)]
pub struct LearningUpdater {
    scorer: EngagementScorer,
    policy: PolicyConfig,
}

impl LearningUpdater {
    pub fn new(config: &LearnConfig) -> Self {
        Self {
            scorer: EngagementScorer::new(config.reward.clone()),
            policy: config.learning.clone(),
        }
    }

    /// Score every post that carries metrics; the rest are left out entirely
    pub fn analyze(&self, history: &[PostRecord]) -> Vec<AnalyzedPost> {
        history
            .iter()
            .filter_map(|post| {
                let metrics = post.metrics.as_ref()?;
                Some(AnalyzedPost {
                    id: post.id.clone(),
                    posted_at: post.posted_at,
                    text: post.text.clone(),
                    score: self.scorer.score(metrics),
                    attribution: Attribution::from_post(post),
                })
            })
            .collect()
    }

    /// Fold a batch into the state.
    ///
    /// Rewards are normalized against the batch maximum. Posts applied in an
    /// earlier run are skipped, and a post with an invalid arm key updates
    /// nothing.
    pub fn apply(
        &self,
        state: &mut LearningState,
        batch: &[AnalyzedPost],
        now: DateTime<Utc>,
    ) -> ApplyReport {
        let mut report = ApplyReport::default();
        let batch_max = batch.iter().map(AnalyzedPost::reward).fold(0.0, f64::max);
        let prior = (self.policy.prior_alpha, self.policy.prior_beta);

        for post in batch {
            if state.seen_posts.contains(&post.id) {
                report.already_seen += 1;
                continue;
            }
            let arms = match post.attribution.arms() {
                Ok(arms) => arms,
                Err(e) => {
                    warn!(post = %post.id, error = %e, "Skipping post with invalid attribution");
                    report.rejected += 1;
                    continue;
                }
            };

            let normalized = normalize_reward(post.reward(), batch_max);
            for arm in &arms {
                state.observe(arm, normalized, prior);
            }
            state.global_stats.record(&post.id, post.reward());
            state.seen_posts.insert(post.id.clone());
            report.applied += 1;
            debug!(post = %post.id, reward = post.reward(), normalized, "Applied post");
        }

        if report.applied > 0 {
            state.global_stats.last_updated = Some(now);
        }
        report
    }
}
