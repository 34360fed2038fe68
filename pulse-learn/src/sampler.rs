//! Thompson sampling over Beta arms
//!
//! Beta draws are built from two Gamma draws (Marsaglia–Tsang with
//! Box–Muller normals), so the only primitive needed is a uniform RNG.
//! The RNG is injected: tests seed it, the CLI seeds it from the OS.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::config::PolicyConfig;
use crate::types::{ArmKey, BetaParams, Dimension, PostRecord};

const EPSILON: f64 = 1e-12;
const MAX_GAMMA_ITERATIONS: usize = 1_000;
const MAX_GAMMA_RECURSION: usize = 8;

/// One arm offered to a selection
#[derive(Debug, Clone)]
pub struct Candidate {
    pub name: String,
    pub params: BetaParams,
    /// High freshness / low local-market saturation
    pub fresh: bool,
    /// Used inside the recent window
    pub recently_used: bool,
}

impl Candidate {
    pub fn new(name: impl Into<String>, params: BetaParams) -> Self {
        Self {
            name: name.into(),
            params,
            fresh: false,
            recently_used: false,
        }
    }

    pub fn fresh(mut self, fresh: bool) -> Self {
        self.fresh = fresh;
        self
    }

    pub fn recently_used(mut self, recently_used: bool) -> Self {
        self.recently_used = recently_used;
        self
    }
}

/// Deterministic post-sampling adjustments
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Adjustments {
    pub fresh_boost: f64,
    pub recent_penalty: f64,
}

impl Default for Adjustments {
    fn default() -> Self {
        Self::from(&PolicyConfig::default())
    }
}

impl From<&PolicyConfig> for Adjustments {
    fn from(policy: &PolicyConfig) -> Self {
        Self {
            fresh_boost: policy.fresh_boost,
            recent_penalty: policy.recent_penalty,
        }
    }
}

impl Adjustments {
    pub fn apply(&self, candidate: &Candidate, sample: f64) -> f64 {
        let mut value = sample;
        if candidate.fresh {
            value = (value * self.fresh_boost).min(1.0);
        }
        if candidate.recently_used {
            value *= self.recent_penalty;
        }
        value
    }
}

/// A candidate's draw in one selection round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampledArm {
    pub name: String,
    pub sample: f64,
    pub score: f64,
}

/// Outcome of one selection round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub chosen: String,
    /// Every candidate in input order
    pub draws: Vec<SampledArm>,
}

/// Thompson sampler over an injected RNG
pub struct ThompsonSampler<R> {
    rng: R,
}

impl ThompsonSampler<ChaCha8Rng> {
    /// Sampler seeded from the operating system
    pub fn from_os_rng() -> Self {
        Self::new(ChaCha8Rng::from_os_rng())
    }

    /// Reproducible sampler
    pub fn with_seed(seed: u64) -> Self {
        Self::new(ChaCha8Rng::seed_from_u64(seed))
    }
}

impl<R: Rng> ThompsonSampler<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Draw from Beta(alpha, beta) as Ga / (Ga + Gb)
    pub fn sample_beta(&mut self, alpha: f64, beta: f64) -> f64 {
        if alpha <= 0.0 && beta <= 0.0 {
            return 0.5;
        }
        let x = self.sample_gamma(alpha);
        let y = self.sample_gamma(beta);
        let sum = x + y;
        if sum > 0.0 && sum.is_finite() {
            (x / sum).clamp(0.0, 1.0)
        } else {
            0.5
        }
    }

    /// Draw from an arm's current belief
    pub fn sample_arm(&mut self, params: &BetaParams) -> f64 {
        self.sample_beta(params.alpha, params.beta)
    }

    /// Draw from Gamma(shape, 1); 0 for non-positive shapes
    pub fn sample_gamma(&mut self, shape: f64) -> f64 {
        self.sample_gamma_inner(shape, 0)
    }

    fn sample_gamma_inner(&mut self, shape: f64, depth: usize) -> f64 {
        if shape <= 0.0 || !shape.is_finite() {
            return 0.0;
        }
        if depth >= MAX_GAMMA_RECURSION {
            return shape;
        }

        // Boost shape < 1 to shape + 1 and scale back down by U^(1/shape).
        if shape < 1.0 {
            let u = self.rng.random::<f64>().max(EPSILON);
            return self.sample_gamma_inner(shape + 1.0, depth + 1) * u.powf(1.0 / shape);
        }

        let d = shape - 1.0 / 3.0;
        let c = 1.0 / (9.0 * d).sqrt();

        for _ in 0..MAX_GAMMA_ITERATIONS {
            let x = self.sample_normal();
            let t = 1.0 + c * x;
            if t <= 0.0 {
                continue;
            }
            let v = t * t * t;
            let u = self.rng.random::<f64>();
            let x2 = x * x;

            // Squeeze test, then the exact log test.
            if u < 1.0 - 0.0331 * x2 * x2 {
                return d * v;
            }
            if u.max(EPSILON).ln() < 0.5 * x2 + d * (1.0 - v + v.ln()) {
                return d * v;
            }
        }

        shape
    }

    /// Standard normal via Box–Muller
    fn sample_normal(&mut self) -> f64 {
        let u1 = self.rng.random::<f64>().max(EPSILON);
        let u2 = self.rng.random::<f64>();
        (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
    }

    /// Pick the highest sample; ties go to the earliest candidate
    pub fn select(&mut self, candidates: &[Candidate]) -> Option<Selection> {
        self.select_inner(candidates, None)
    }

    /// Pick with the freshness boost and recency penalty applied between
    /// sampling and ranking
    pub fn select_with_adjustments(
        &mut self,
        candidates: &[Candidate],
        adjustments: &Adjustments,
    ) -> Option<Selection> {
        self.select_inner(candidates, Some(adjustments))
    }

    fn select_inner(
        &mut self,
        candidates: &[Candidate],
        adjustments: Option<&Adjustments>,
    ) -> Option<Selection> {
        let mut draws = Vec::with_capacity(candidates.len());
        let mut best: Option<(usize, f64)> = None;

        for (idx, candidate) in candidates.iter().enumerate() {
            let sample = self.sample_arm(&candidate.params);
            let score = adjustments.map_or(sample, |adj| adj.apply(candidate, sample));
            if best.is_none_or(|(_, top)| score > top) {
                best = Some((idx, score));
            }
            draws.push(SampledArm {
                name: candidate.name.clone(),
                sample,
                score,
            });
        }

        best.map(|(idx, _)| Selection {
            chosen: candidates[idx].name.clone(),
            draws,
        })
    }
}

/// Arm keys of one dimension used by posts inside `[now - window_days, now]`
pub fn recently_used(
    history: &[PostRecord],
    dimension: Dimension,
    now: DateTime<Utc>,
    window_days: i64,
) -> BTreeSet<ArmKey> {
    let cutoff = now - Duration::days(window_days);
    history
        .iter()
        .filter(|post| post.posted_at >= cutoff && post.posted_at <= now)
        .filter_map(|post| {
            let raw = match dimension {
                Dimension::Theme => post.theme.clone(),
                Dimension::Approach => post.approach.clone(),
                Dimension::Slot => post.effective_slot(),
                Dimension::Variant => post.variant.clone(),
                Dimension::SourceType => post.source_type.clone(),
                Dimension::TextFeature => return None,
            };
            ArmKey::new(&raw).ok()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spread(draws: &mut [f64]) -> f64 {
        draws.sort_by(|a, b| a.total_cmp(b));
        let n = draws.len();
        draws[n * 3 / 4] - draws[n / 4]
    }

    #[test]
    fn test_sample_beta_in_unit_interval() {
        let mut sampler = ThompsonSampler::with_seed(42);
        for (alpha, beta) in [(0.3, 0.7), (1.0, 1.0), (0.01, 5.0), (50.0, 0.2), (1e-10, 1e-10)] {
            for _ in 0..200 {
                let s = sampler.sample_beta(alpha, beta);
                assert!((0.0..=1.0).contains(&s), "Beta({alpha},{beta}) gave {s}");
            }
        }
    }

    #[test]
    fn test_sample_beta_degenerate() {
        let mut sampler = ThompsonSampler::with_seed(7);
        assert_eq!(sampler.sample_beta(0.0, 0.0), 0.5);
        assert_eq!(sampler.sample_beta(-1.0, -2.0), 0.5);
        assert_eq!(sampler.sample_beta(0.0, 3.0), 0.0);
    }

    #[test]
    fn test_sample_beta_skew() {
        let mut sampler = ThompsonSampler::with_seed(42);
        let high: f64 = (0..500).map(|_| sampler.sample_beta(10.0, 1.0)).sum::<f64>() / 500.0;
        let low: f64 = (0..500).map(|_| sampler.sample_beta(1.0, 10.0)).sum::<f64>() / 500.0;
        assert!(high > 0.8, "mean {high}");
        assert!(low < 0.2, "mean {low}");
    }

    #[test]
    fn test_sample_gamma_mean() {
        let mut sampler = ThompsonSampler::with_seed(11);
        for shape in [0.3, 0.7, 1.0, 2.5, 9.0] {
            let n = 4000;
            let mean = (0..n).map(|_| sampler.sample_gamma(shape)).sum::<f64>() / n as f64;
            assert!(
                (mean - shape).abs() < 0.15 * shape.max(1.0),
                "Gamma({shape}) mean {mean}"
            );
        }
        assert_eq!(sampler.sample_gamma(0.0), 0.0);
    }

    #[test]
    fn test_seed_reproducibility() {
        let mut a = ThompsonSampler::with_seed(99);
        let mut b = ThompsonSampler::with_seed(99);
        for _ in 0..20 {
            assert_eq!(a.sample_beta(0.3, 0.7), b.sample_beta(0.3, 0.7));
        }
    }

    #[test]
    fn test_spread_shrinks_with_trials() {
        let mut sampler = ThompsonSampler::with_seed(3);
        let mut few = BetaParams::new_with_prior(0.3, 0.7);
        let mut many = few.clone();
        for _ in 0..3 {
            few.update(0.6);
        }
        for _ in 0..300 {
            many.update(0.6);
        }
        let mut few_draws: Vec<f64> = (0..2000).map(|_| sampler.sample_arm(&few)).collect();
        let mut many_draws: Vec<f64> = (0..2000).map(|_| sampler.sample_arm(&many)).collect();
        assert!(spread(&mut many_draws) < spread(&mut few_draws) / 3.0);
    }

    #[test]
    fn test_proven_arm_tight_cold_arm_explores() {
        let mut sampler = ThompsonSampler::with_seed(2024);
        let mut proven = BetaParams::new_with_prior(30.0, 20.0);
        proven.trials = 50;
        let cold = BetaParams::new_with_prior(0.3, 0.7);

        let mut proven_draws: Vec<f64> = (0..1000).map(|_| sampler.sample_arm(&proven)).collect();
        let mut cold_draws: Vec<f64> = (0..1000).map(|_| sampler.sample_arm(&cold)).collect();

        let proven_mean = proven_draws.iter().sum::<f64>() / 1000.0;
        assert!((proven_mean - 0.6).abs() < 0.03, "mean {proven_mean}");
        assert!(cold_draws.iter().any(|s| *s > 0.6), "cold arm never explored");
        assert!(spread(&mut proven_draws) * 2.0 < spread(&mut cold_draws));
    }

    #[test]
    fn test_select_prefers_strong_arm() {
        let mut sampler = ThompsonSampler::with_seed(5);
        let candidates = vec![
            Candidate::new("weak", BetaParams::new_with_prior(1.0, 100.0)),
            Candidate::new("strong", BetaParams::new_with_prior(100.0, 1.0)),
        ];
        let wins = (0..50)
            .filter(|_| sampler.select(&candidates).unwrap().chosen == "strong")
            .count();
        assert!(wins >= 48);
    }

    #[test]
    fn test_select_tie_goes_to_earliest() {
        let mut sampler = ThompsonSampler::with_seed(1);
        // Both shapes non-positive: every draw is the degenerate 0.5
        let degenerate = BetaParams {
            alpha: 0.0,
            beta: 0.0,
            trials: 0,
            mean: 0.5,
        };
        let candidates = vec![
            Candidate::new("first", degenerate.clone()),
            Candidate::new("second", degenerate),
        ];
        let selection = sampler.select(&candidates).unwrap();
        assert_eq!(selection.chosen, "first");
        assert_eq!(selection.draws.len(), 2);
    }

    #[test]
    fn test_select_empty() {
        let mut sampler = ThompsonSampler::with_seed(1);
        assert!(sampler.select(&[]).is_none());
    }

    #[test]
    fn test_adjustments() {
        let adj = Adjustments::default();
        let params = BetaParams::new_with_prior(1.0, 1.0);
        let fresh = Candidate::new("fresh", params.clone()).fresh(true);
        let recent = Candidate::new("recent", params.clone()).recently_used(true);
        assert!((adj.apply(&fresh, 0.4) - 0.6).abs() < 1e-12);
        assert_eq!(adj.apply(&fresh, 0.9), 1.0);
        assert!((adj.apply(&recent, 0.5) - 0.15).abs() < 1e-12);
        let plain = Candidate::new("plain", params);
        assert_eq!(adj.apply(&plain, 0.42), 0.42);
    }

    #[test]
    fn test_recency_penalty_steers_selection() {
        let mut sampler = ThompsonSampler::with_seed(8);
        let params = BetaParams::new_with_prior(20.0, 20.0);
        let candidates = vec![
            Candidate::new("yesterday", params.clone()).recently_used(true),
            Candidate::new("last_week", params),
        ];
        let adj = Adjustments::default();
        let picks_old = (0..100)
            .filter(|_| {
                sampler
                    .select_with_adjustments(&candidates, &adj)
                    .unwrap()
                    .chosen
                    == "last_week"
            })
            .count();
        assert!(picks_old > 95);
    }

    #[test]
    fn test_recently_used() {
        let now: DateTime<Utc> = "2026-03-10T12:00:00Z".parse().unwrap();
        let post = |id: &str, at: &str, theme: &str| PostRecord {
            id: id.into(),
            posted_at: at.parse().unwrap(),
            theme: theme.into(),
            approach: "story".into(),
            slot: None,
            variant: "a".into(),
            text: String::new(),
            source_type: "original".into(),
            theme_freshness: None,
            metrics: None,
        };
        let history = vec![
            post("1", "2026-03-09T08:00:00Z", "Career"),
            post("2", "2026-03-01T08:00:00Z", "Money"),
        ];
        let recent = recently_used(&history, Dimension::Theme, now, 2);
        assert_eq!(recent.len(), 1);
        assert!(recent.contains(&ArmKey::new("career").unwrap()));
        assert!(recently_used(&history, Dimension::TextFeature, now, 2).is_empty());
    }
}
