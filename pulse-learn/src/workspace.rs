//! One data directory and the runs that operate on it
//!
//! Each run is load → compute → write. Mutating runs hold the state lock
//! for their whole duration. A run whose precondition is unmet returns
//! [`Outcome::Skipped`] and writes nothing.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::LearnConfig;
use crate::error::Result;
use crate::hypothesis::{HypothesisLog, HypothesisVerifier, VerifyOutcome};
use crate::recommend::{Recommendation, RecommendationPublisher};
use crate::report::{ReportInput, render_report};
use crate::sampler::ThompsonSampler;
use crate::state::{StateStore, load_json_or_default, write_json_atomic};
use crate::types::{HistoryFile, PostRecord};
use crate::updater::{AnalyzedPost, ApplyReport, LearningUpdater};

pub const POST_HISTORY_FILE: &str = "post_history.json";
pub const LEARNING_STATE_FILE: &str = "learning_state.json";
pub const ANALYZED_POSTS_FILE: &str = "analyzed_posts.json";
pub const RECOMMENDATION_FILE: &str = "recommendation.json";
pub const HYPOTHESES_FILE: &str = "hypotheses.json";

/// Result of a run that may have been skipped
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Done(T),
    Skipped(SkipReason),
}

impl<T> Outcome<T> {
    pub fn done(self) -> Option<T> {
        match self {
            Self::Done(value) => Some(value),
            Self::Skipped(_) => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped(_))
    }
}

/// Why a run did nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoScoreablePosts,
    NoLearningState,
    NoHypotheses,
    NoArms,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NoScoreablePosts => "no posts with metrics in the history; nothing to analyze",
            Self::NoLearningState => "no learning state yet; run `pulse analyze` first",
            Self::NoHypotheses => "no hypotheses recorded; nothing to verify",
            Self::NoArms => "learning state has no arms; run `pulse analyze` first",
        })
    }
}

/// What an analyze run did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzeReport {
    pub scored: usize,
    /// History entries without metrics
    pub unscored: usize,
    pub apply: ApplyReport,
    /// Version committed, `None` when the state was left as it was
    pub state_version: Option<u64>,
}

/// A data directory bound to its engine configuration
#[derive(Debug, Clone)]
pub struct Workspace {
    dir: PathBuf,
    config: LearnConfig,
    store: StateStore,
}

impl Workspace {
    pub fn new(dir: impl Into<PathBuf>, config: LearnConfig) -> Self {
        let dir = dir.into();
        let store = StateStore::new(dir.join(LEARNING_STATE_FILE));
        Self { dir, config, store }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn config(&self) -> &LearnConfig {
        &self.config
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn history_path(&self) -> PathBuf {
        self.dir.join(POST_HISTORY_FILE)
    }

    pub fn analyzed_path(&self) -> PathBuf {
        self.dir.join(ANALYZED_POSTS_FILE)
    }

    pub fn recommendation_path(&self) -> PathBuf {
        self.dir.join(RECOMMENDATION_FILE)
    }

    pub fn hypotheses_path(&self) -> PathBuf {
        self.dir.join(HYPOTHESES_FILE)
    }

    pub fn load_history(&self) -> Vec<PostRecord> {
        load_json_or_default::<Option<HistoryFile>>(&self.history_path())
            .map(HistoryFile::into_posts)
            .unwrap_or_default()
    }

    pub fn load_hypotheses(&self) -> HypothesisLog {
        load_json_or_default(&self.hypotheses_path())
    }

    /// Score history and fold new posts into the arms
    pub fn analyze(&self, now: DateTime<Utc>) -> Result<Outcome<AnalyzeReport>> {
        let history = self.load_history();
        let updater = LearningUpdater::new(&self.config);
        let analyzed = updater.analyze(&history);
        if analyzed.is_empty() {
            info!(posts = history.len(), "No scoreable posts");
            return Ok(Outcome::Skipped(SkipReason::NoScoreablePosts));
        }

        let lock = self.store.lock()?;
        let mut snapshot = self.store.load();
        let apply = updater.apply(&mut snapshot.state, &analyzed, now);
        write_json_atomic(&self.analyzed_path(), &analyzed)?;

        let state_version = if apply.applied > 0 {
            Some(self.store.commit(&lock, snapshot.version, &snapshot.state)?)
        } else {
            debug!("No new posts, learning state unchanged");
            None
        };

        info!(
            scored = analyzed.len(),
            applied = apply.applied,
            already_seen = apply.already_seen,
            rejected = apply.rejected,
            "Analysis complete"
        );
        Ok(Outcome::Done(AnalyzeReport {
            scored: analyzed.len(),
            unscored: history.len() - analyzed.len(),
            apply,
            state_version,
        }))
    }

    /// Verify pending hypotheses against the latest analysis
    pub fn verify(&self, now: DateTime<Utc>) -> Result<Outcome<VerifyOutcome>> {
        let _lock = self.store.lock()?;
        let snapshot = self.store.load();
        if !snapshot.existed {
            return Ok(Outcome::Skipped(SkipReason::NoLearningState));
        }
        let mut log = self.load_hypotheses();
        if log.entries.is_empty() {
            return Ok(Outcome::Skipped(SkipReason::NoHypotheses));
        }

        let analyzed: Vec<AnalyzedPost> = load_json_or_default(&self.analyzed_path());
        let verifier = HypothesisVerifier::new(self.config.learning.clone());
        let outcome = verifier.verify(&mut log, &analyzed, &snapshot.state, now);
        if outcome.verified > 0 {
            write_json_atomic(&self.hypotheses_path(), &log)?;
        }

        info!(
            verified = outcome.verified,
            pending = outcome.still_pending,
            "Verification complete"
        );
        Ok(Outcome::Done(outcome))
    }

    /// Publish a fresh recommendation
    pub fn recommend<R: Rng>(
        &self,
        sampler: &mut ThompsonSampler<R>,
        now: DateTime<Utc>,
    ) -> Result<Outcome<Recommendation>> {
        let _lock = self.store.lock()?;
        let snapshot = self.store.load();
        if snapshot.state.is_empty() {
            return Ok(Outcome::Skipped(SkipReason::NoArms));
        }

        let log = self.load_hypotheses();
        let learnings = log.recent_learnings(self.config.learning.learnings_cap);
        let recommendation = RecommendationPublisher::publish(&snapshot.state, learnings, sampler, now);
        write_json_atomic(&self.recommendation_path(), &recommendation)?;

        info!(
            dimensions = recommendation.best.len(),
            learnings = recommendation.learnings.len(),
            "Recommendation published"
        );
        Ok(Outcome::Done(recommendation))
    }

    /// Render the summary; reads only
    pub fn report(&self, now: DateTime<Utc>) -> String {
        let snapshot = self.store.load();
        let log = self.load_hypotheses();
        let recommendation: Option<Recommendation> =
            load_json_or_default(&self.recommendation_path());

        render_report(&ReportInput {
            state: &snapshot.state,
            hypotheses: &log,
            recommendation: recommendation.as_ref(),
            max_age_days: self.config.learning.recommendation_max_age_days,
            learnings_shown: self.config.learning.learnings_cap,
            now,
        })
    }
}
