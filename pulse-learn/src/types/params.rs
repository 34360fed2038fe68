//! Beta-distributed arm beliefs

use serde::{Deserialize, Serialize};

/// Floor applied to alpha/beta so neither parameter ever reaches zero
pub const MIN_SHAPE: f64 = 1e-10;

/// One bandit arm's belief state
///
/// `mean` is cached for readers of the JSON snapshot and is always
/// recomputed from alpha/beta, including on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredBetaParams")]
pub struct BetaParams {
    pub alpha: f64,
    pub beta: f64,
    pub trials: u64,
    pub mean: f64,
}

#[derive(Deserialize)]
struct StoredBetaParams {
    alpha: f64,
    beta: f64,
    #[serde(default)]
    trials: u64,
}

impl From<StoredBetaParams> for BetaParams {
    fn from(stored: StoredBetaParams) -> Self {
        let mut params = Self::new_with_prior(stored.alpha, stored.beta);
        params.trials = stored.trials;
        params
    }
}

impl BetaParams {
    /// Create an arm with the given prior; non-positive shapes are floored
    pub fn new_with_prior(alpha: f64, beta: f64) -> Self {
        let alpha = sanitize_shape(alpha);
        let beta = sanitize_shape(beta);
        Self {
            alpha,
            beta,
            trials: 0,
            mean: alpha / (alpha + beta),
        }
    }

    /// Bayesian update from a reward already normalized to [0, 1]
    pub fn update(&mut self, normalized_reward: f64) {
        let r = if normalized_reward.is_finite() {
            normalized_reward.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.alpha += r;
        self.beta += 1.0 - r;
        self.trials += 1;
        self.mean = self.alpha / (self.alpha + self.beta);
    }

    /// Fold another arm's evidence into this one.
    ///
    /// Both arms are assumed to have started from `prior`, so it is counted
    /// once in the result.
    pub fn merge(&mut self, other: &BetaParams, prior: (f64, f64)) {
        self.alpha = sanitize_shape(self.alpha + other.alpha - prior.0);
        self.beta = sanitize_shape(self.beta + other.beta - prior.1);
        self.trials += other.trials;
        self.mean = self.alpha / (self.alpha + self.beta);
    }

    /// Variance of the Beta distribution
    pub fn variance(&self) -> f64 {
        let total = self.alpha + self.beta;
        (self.alpha * self.beta) / (total * total * (total + 1.0))
    }
}

fn sanitize_shape(value: f64) -> f64 {
    if value.is_finite() {
        value.max(MIN_SHAPE)
    } else {
        MIN_SHAPE
    }
}

/// Normalize a raw reward against the batch maximum.
///
/// `clamp(r / max(r_max, 1), 0, 1)`, and 0 for every post when the batch
/// maximum is 0.
pub fn normalize_reward(reward: f64, batch_max: f64) -> f64 {
    if batch_max <= 0.0 || !reward.is_finite() {
        return 0.0;
    }
    (reward / batch_max.max(1.0)).clamp(0.0, 1.0)
}
