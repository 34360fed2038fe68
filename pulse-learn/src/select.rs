//! Picking what to publish next
//!
//! Themes and approaches are chosen with the policy adjustments (fresh
//! themes boosted, recently used arms penalized). Variants are a plain A/B
//! draw. Options the state has never seen start from the prior.

use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::{debug, warn};

use crate::config::PolicyConfig;
use crate::sampler::{Adjustments, Candidate, Selection, ThompsonSampler, recently_used};
use crate::state::LearningState;
use crate::types::{ArmKey, BetaParams, Dimension, PostRecord, ThemeFreshness};

/// A theme offered by the planner
#[derive(Debug, Clone, PartialEq)]
pub struct ThemeOption {
    pub name: String,
    pub freshness: Option<ThemeFreshness>,
}

impl ThemeOption {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            freshness: None,
        }
    }

    pub fn with_freshness(mut self, freshness: ThemeFreshness) -> Self {
        self.freshness = Some(freshness);
        self
    }

    fn is_fresh(&self) -> bool {
        self.freshness == Some(ThemeFreshness::High)
    }
}

/// Thompson selection over the learning state
pub struct StrategySelector<'a> {
    state: &'a LearningState,
    policy: &'a PolicyConfig,
}

impl<'a> StrategySelector<'a> {
    pub fn new(state: &'a LearningState, policy: &'a PolicyConfig) -> Self {
        Self { state, policy }
    }

    /// Choose a theme; an empty option list means every known theme arm
    pub fn select_theme<R: Rng>(
        &self,
        sampler: &mut ThompsonSampler<R>,
        options: &[ThemeOption],
        history: &[PostRecord],
        now: DateTime<Utc>,
    ) -> Option<Selection> {
        let options: Vec<ThemeOption> = if options.is_empty() {
            self.known(Dimension::Theme)
                .into_iter()
                .map(ThemeOption::new)
                .collect()
        } else {
            options.to_vec()
        };
        let recent = recently_used(history, Dimension::Theme, now, self.policy.recent_window_days);

        let candidates: Vec<Candidate> = options
            .iter()
            .filter_map(|option| {
                let key = self.key(Dimension::Theme, &option.name)?;
                let recently = recent.contains(&key);
                Some(
                    Candidate::new(&option.name, self.params(Dimension::Theme, &key))
                        .fresh(option.is_fresh())
                        .recently_used(recently),
                )
            })
            .collect();

        let selection = sampler
            .select_with_adjustments(&candidates, &Adjustments::from(self.policy))?;
        debug!(theme = %selection.chosen, candidates = candidates.len(), "Selected theme");
        Some(selection)
    }

    /// Choose an approach; an empty option list means every known approach arm
    pub fn select_approach<R: Rng>(
        &self,
        sampler: &mut ThompsonSampler<R>,
        options: &[&str],
        history: &[PostRecord],
        now: DateTime<Utc>,
    ) -> Option<Selection> {
        let recent =
            recently_used(history, Dimension::Approach, now, self.policy.recent_window_days);
        let candidates = self.candidates(Dimension::Approach, options, |key| recent.contains(key));

        let selection = sampler
            .select_with_adjustments(&candidates, &Adjustments::from(self.policy))?;
        debug!(approach = %selection.chosen, candidates = candidates.len(), "Selected approach");
        Some(selection)
    }

    /// A/B draw over variants, no adjustments
    pub fn select_variant<R: Rng>(
        &self,
        sampler: &mut ThompsonSampler<R>,
        options: &[&str],
    ) -> Option<Selection> {
        let candidates = self.candidates(Dimension::Variant, options, |_| false);
        sampler.select(&candidates)
    }

    fn candidates(
        &self,
        dimension: Dimension,
        options: &[&str],
        is_recent: impl Fn(&ArmKey) -> bool,
    ) -> Vec<Candidate> {
        let names: Vec<String> = if options.is_empty() {
            self.known(dimension)
        } else {
            options.iter().map(|s| s.to_string()).collect()
        };
        names
            .iter()
            .filter_map(|name| {
                let key = self.key(dimension, name)?;
                Some(Candidate::new(name, self.params(dimension, &key)).recently_used(is_recent(&key)))
            })
            .collect()
    }

    fn known(&self, dimension: Dimension) -> Vec<String> {
        self.state
            .arms(dimension)
            .keys()
            .map(ToString::to_string)
            .collect()
    }

    fn key(&self, dimension: Dimension, name: &str) -> Option<ArmKey> {
        match ArmKey::new(name) {
            Ok(key) => Some(key),
            Err(e) => {
                warn!(dimension = %dimension, name, error = %e, "Skipping option");
                None
            }
        }
    }

    fn params(&self, dimension: Dimension, key: &ArmKey) -> BetaParams {
        self.state
            .arms(dimension)
            .get(key)
            .cloned()
            .unwrap_or_else(|| BetaParams::new_with_prior(self.policy.prior_alpha, self.policy.prior_beta))
    }
}
