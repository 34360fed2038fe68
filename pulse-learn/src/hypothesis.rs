//! Hypothesis verification
//!
//! Each planning period records which theme/approach was bet on. Once posts
//! for that theme have metrics, the entry is verified exactly once: averages
//! are filled in, verdicts are drawn against the running average, and a
//! short learning is appended to the capped accumulated-learnings list.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::PolicyConfig;
use crate::state::{LearningState, PostRef};
use crate::types::{ArmKey, Dimension};
use crate::updater::AnalyzedPost;

/// Aggregate outcome of a period's posts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HypothesisResult {
    /// Mean normalized score
    pub avg_imp: Option<f64>,
    /// Mean composite reach
    pub avg_reach: Option<f64>,
    pub avg_engagement_rate: Option<f64>,
    pub sample_size: usize,
    pub best_post: Option<PostRef>,
    pub worst_post: Option<PostRef>,
}

/// Verdicts per hypothesis dimension; `None` means not enough data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verification {
    pub theme_outperformed: Option<bool>,
    pub approach_outperformed: Option<bool>,
    pub verified_at: DateTime<Utc>,
}

/// One planning period's bet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HypothesisEntry {
    #[serde(default)]
    pub period: String,
    pub theme: String,
    #[serde(default)]
    pub approach: Option<String>,
    #[serde(default)]
    pub hypothesis: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub result: Option<HypothesisResult>,
    #[serde(default)]
    pub verification: Option<Verification>,
    #[serde(default)]
    pub learning: Option<String>,
    /// Fields written by other tools, carried through untouched
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl HypothesisEntry {
    pub fn new(period: impl Into<String>, theme: impl Into<String>) -> Self {
        Self {
            period: period.into(),
            theme: theme.into(),
            approach: None,
            hypothesis: None,
            created_at: None,
            result: None,
            verification: None,
            learning: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn with_approach(mut self, approach: impl Into<String>) -> Self {
        self.approach = Some(approach.into());
        self
    }

    pub fn is_verified(&self) -> bool {
        self.result.as_ref().is_some_and(|r| r.avg_imp.is_some())
    }
}

/// The hypothesis log shared with the planning collaborator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HypothesisLog {
    pub entries: Vec<HypothesisEntry>,
    pub accumulated_learnings: Vec<String>,
}

impl HypothesisLog {
    pub fn pending(&self) -> usize {
        self.entries.iter().filter(|e| !e.is_verified()).count()
    }

    /// Append a learning, evicting the oldest beyond `cap`
    pub fn push_learning(&mut self, learning: String, cap: usize) {
        self.accumulated_learnings.push(learning);
        let excess = self.accumulated_learnings.len().saturating_sub(cap);
        if excess > 0 {
            self.accumulated_learnings.drain(..excess);
        }
    }

    /// Most recent `n` learnings, oldest first
    pub fn recent_learnings(&self, n: usize) -> &[String] {
        let start = self.accumulated_learnings.len().saturating_sub(n);
        &self.accumulated_learnings[start..]
    }
}

/// Counts from one verification pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyOutcome {
    pub verified: usize,
    pub still_pending: usize,
    pub already_verified: usize,
}

pub struct HypothesisVerifier {
    policy: PolicyConfig,
}

impl HypothesisVerifier {
    pub fn new(policy: PolicyConfig) -> Self {
        Self { policy }
    }

    /// Verify every pending entry that has matching posts
    pub fn verify(
        &self,
        log: &mut HypothesisLog,
        analyzed: &[AnalyzedPost],
        state: &LearningState,
        now: DateTime<Utc>,
    ) -> VerifyOutcome {
        let mut outcome = VerifyOutcome::default();
        let mut learnings = Vec::new();

        for entry in log.entries.iter_mut() {
            if entry.is_verified() {
                outcome.already_verified += 1;
                continue;
            }
            let matching = posts_for(analyzed, &entry.theme, None);
            if matching.is_empty() {
                outcome.still_pending += 1;
                continue;
            }

            let result = summarize(&matching);
            let verification = self.verdicts(entry, &result, analyzed, state, now);
            let learning = compose_learning(entry, &result, &verification, state, &self.policy);

            info!(
                period = %entry.period,
                theme = %entry.theme,
                posts = matching.len(),
                "Verified hypothesis"
            );
            entry.result = Some(result);
            entry.verification = Some(verification);
            entry.learning = Some(learning.clone());
            learnings.push(learning);
            outcome.verified += 1;
        }

        for learning in learnings {
            log.push_learning(learning, self.policy.learnings_cap);
        }
        outcome
    }

    fn verdicts(
        &self,
        entry: &HypothesisEntry,
        result: &HypothesisResult,
        analyzed: &[AnalyzedPost],
        state: &LearningState,
        now: DateTime<Utc>,
    ) -> Verification {
        let baseline = state.global_stats.avg_reward;
        let min_trials = self.policy.min_trials_for_verdict;

        let theme_outperformed = (state.trials(Dimension::Theme, &entry.theme) >= min_trials)
            .then(|| result.avg_imp.unwrap_or(0.0) > baseline);

        let approach_outperformed = entry.approach.as_deref().and_then(|approach| {
            if state.trials(Dimension::Approach, approach) < min_trials {
                debug!(approach, "Approach arm below verdict threshold");
                return None;
            }
            let posts = posts_for(analyzed, &entry.theme, Some(approach));
            mean(posts.iter().map(|p| p.reward())).map(|avg| avg > baseline)
        });

        Verification {
            theme_outperformed,
            approach_outperformed,
            verified_at: now,
        }
    }
}

fn same_key(a: &str, b: &str) -> bool {
    match (ArmKey::new(a), ArmKey::new(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn posts_for<'a>(
    analyzed: &'a [AnalyzedPost],
    theme: &str,
    approach: Option<&str>,
) -> Vec<&'a AnalyzedPost> {
    analyzed
        .iter()
        .filter(|p| same_key(&p.attribution.theme, theme))
        .filter(|p| approach.is_none_or(|a| same_key(&p.attribution.approach, a)))
        .collect()
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

fn summarize(posts: &[&AnalyzedPost]) -> HypothesisResult {
    let best = posts.iter().max_by(|a, b| a.reward().total_cmp(&b.reward()));
    let worst = posts.iter().min_by(|a, b| a.reward().total_cmp(&b.reward()));
    let to_ref = |p: &&AnalyzedPost| PostRef {
        id: p.id.clone(),
        reward: p.reward(),
    };

    HypothesisResult {
        avg_imp: mean(posts.iter().map(|p| p.reward())),
        avg_reach: mean(posts.iter().map(|p| p.score.composite_reach_score)),
        avg_engagement_rate: mean(posts.iter().map(|p| p.score.engagement_rate)),
        sample_size: posts.len(),
        best_post: best.map(to_ref),
        worst_post: worst.map(to_ref),
    }
}

fn compose_learning(
    entry: &HypothesisEntry,
    result: &HypothesisResult,
    verification: &Verification,
    state: &LearningState,
    policy: &PolicyConfig,
) -> String {
    let avg = result.avg_imp.unwrap_or(0.0);
    let baseline = state.global_stats.avg_reward;
    let mut sentences = Vec::new();

    match verification.theme_outperformed {
        Some(outperformed) => {
            let delta = if baseline > 0.0 {
                ((avg - baseline) / baseline * 100.0).abs()
            } else {
                0.0
            };
            let direction = if outperformed { "above" } else { "below" };
            sentences.push(format!(
                "Theme \"{}\" averaged {avg:.1} over {} posts, {delta:.0}% {direction} the running average of {baseline:.1}.",
                entry.theme, result.sample_size
            ));
        }
        None => sentences.push(format!(
            "Theme \"{}\" averaged {avg:.1} over {} posts; {} of {} trials so far, too early to call.",
            entry.theme,
            result.sample_size,
            state.trials(Dimension::Theme, &entry.theme),
            policy.min_trials_for_verdict
        )),
    }

    if let Some(approach) = &entry.approach {
        sentences.push(match verification.approach_outperformed {
            Some(true) => format!("Approach \"{approach}\" held up with this theme."),
            Some(false) => format!("Approach \"{approach}\" underperformed with this theme."),
            None => format!("Approach \"{approach}\" is still unproven."),
        });
    }

    if let Some(best) = &result.best_post {
        sentences.push(format!("Best post {} scored {:.1}.", best.id, best.reward));
    }

    let body = sentences.join(" ");
    if entry.period.is_empty() {
        body
    } else {
        format!("[{}] {body}", entry.period)
    }
}
