//! pulse-learn - Adaptive content-strategy learning
//!
//! Scores published posts, keeps Beta arms per content dimension, and uses
//! Thompson sampling to rank what to publish next. State lives in plain JSON
//! files inside one data directory, shared with the external planning and
//! posting tools.

pub mod config;
pub mod error;
pub mod features;
pub mod hypothesis;
pub mod recommend;
pub mod report;
pub mod sampler;
pub mod scoring;
pub mod select;
pub mod state;
pub mod types;
pub mod updater;
pub mod workspace;

pub use config::{DEFAULT_WEIGHTS_VERSION, LearnConfig, PolicyConfig, RewardWeights};
pub use error::{LearnError, Result};
pub use types::*;

// Pipeline re-exports
pub use features::{FeatureExtractor, HookPattern, Sentiment, TextFeatures};
pub use hypothesis::{
    HypothesisEntry, HypothesisLog, HypothesisResult, HypothesisVerifier, Verification,
    VerifyOutcome,
};
pub use recommend::{RankedArm, Recommendation, RecommendationPublisher, load_fresh_recommendation};
pub use report::{ReportInput, render_report};
pub use sampler::{Adjustments, Candidate, SampledArm, Selection, ThompsonSampler};
pub use scoring::{EngagementScore, EngagementScorer};
pub use select::{StrategySelector, ThemeOption};
pub use state::{GlobalStats, LearningState, PostRef, Snapshot, StateLock, StateStore};
pub use updater::{AnalyzedPost, ApplyReport, Attribution, LearningUpdater};
pub use workspace::{AnalyzeReport, Outcome, SkipReason, Workspace};
