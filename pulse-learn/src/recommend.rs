//! Recommendation snapshot for downstream generation
//!
//! Publishing is a pure read of the learning state: one Thompson draw per
//! known arm, no boosts or penalties, ranked per dimension.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::features::facet_of;
use crate::sampler::ThompsonSampler;
use crate::state::LearningState;
use crate::types::Dimension;

/// One arm's draw in a published ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedArm {
    pub dimension: Dimension,
    pub name: String,
    pub sample: f64,
    pub mean: f64,
    pub trials: u64,
}

/// The artifact consumed by the generation pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub generated_at: DateTime<Utc>,
    /// Top arm of every dimension that has arms
    pub best: Vec<RankedArm>,
    pub rankings: BTreeMap<Dimension, Vec<RankedArm>>,
    /// Top text-feature arm per facet (`length`, `hook`, ...)
    #[serde(default)]
    pub feature_profile: BTreeMap<String, RankedArm>,
    #[serde(default)]
    pub learnings: Vec<String>,
}

impl Recommendation {
    pub fn best_for(&self, dimension: Dimension) -> Option<&RankedArm> {
        self.best.iter().find(|arm| arm.dimension == dimension)
    }

    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.generated_at
    }

    pub fn is_stale(&self, now: DateTime<Utc>, max_age_days: i64) -> bool {
        self.age(now) > Duration::days(max_age_days)
    }
}

pub struct RecommendationPublisher;

impl RecommendationPublisher {
    /// Rank every arm by a fresh draw.
    ///
    /// Ties keep the arms' key order.
    pub fn publish<R: Rng>(
        state: &LearningState,
        learnings: &[String],
        sampler: &mut ThompsonSampler<R>,
        now: DateTime<Utc>,
    ) -> Recommendation {
        let mut rankings = BTreeMap::new();
        let mut best = Vec::new();

        for &dimension in Dimension::all() {
            let arms = state.arms(dimension);
            if arms.is_empty() {
                continue;
            }
            let mut ranked: Vec<RankedArm> = arms
                .iter()
                .map(|(key, params)| RankedArm {
                    dimension,
                    name: key.to_string(),
                    sample: sampler.sample_arm(params),
                    mean: params.mean,
                    trials: params.trials,
                })
                .collect();
            ranked.sort_by(|a, b| b.sample.total_cmp(&a.sample));
            debug!(dimension = %dimension, arms = ranked.len(), top = %ranked[0].name, "Ranked arms");
            best.push(ranked[0].clone());
            rankings.insert(dimension, ranked);
        }

        let mut feature_profile = BTreeMap::new();
        if let Some(features) = rankings.get(&Dimension::TextFeature) {
            for arm in features {
                feature_profile
                    .entry(facet_of(&arm.name).to_string())
                    .or_insert_with(|| arm.clone());
            }
        }

        Recommendation {
            generated_at: now,
            best,
            rankings,
            feature_profile,
            learnings: learnings.to_vec(),
        }
    }
}

/// Load a recommendation the way consumers must: absent, unreadable, or
/// older than `max_age_days` all mean "no recommendation"
pub fn load_fresh_recommendation(
    path: &Path,
    now: DateTime<Utc>,
    max_age_days: i64,
) -> Option<Recommendation> {
    let content = fs::read_to_string(path).ok()?;
    let recommendation: Recommendation = match serde_json::from_str(&content) {
        Ok(rec) => rec,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Ignoring malformed recommendation");
            return None;
        }
    };
    if recommendation.is_stale(now, max_age_days) {
        debug!(
            path = %path.display(),
            generated_at = %recommendation.generated_at,
            "Ignoring stale recommendation"
        );
        return None;
    }
    Some(recommendation)
}
