//! Core data types

mod arm;
mod params;
mod post;

pub use arm::{Arm, ArmKey, Dimension};
pub use params::{BetaParams, MIN_SHAPE, normalize_reward};
pub use post::{HistoryFile, PostMetrics, PostRecord, ThemeFreshness, slot_for_hour};
