//! Learning state and its durable store

mod learning;
mod store;

pub use learning::{ArmTable, GlobalStats, LearningState, PostRef};
pub use store::{
    STALE_LOCK_HOURS, Snapshot, StateLock, StateStore, load_json_or_default, write_json_atomic,
};
