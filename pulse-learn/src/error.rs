//! Error types for pulse-learn

use std::path::PathBuf;

use thiserror::Error;

/// Error type for learning-engine operations
#[derive(Debug, Error)]
pub enum LearnError {
    /// IO operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Another run holds the state lock
    #[error("Learning state is locked by another run: {}", .0.display())]
    Locked(PathBuf),

    /// Persisted state changed between load and commit
    #[error("Learning state changed on disk (expected version {expected}, found {found})")]
    Conflict { expected: u64, found: u64 },

    /// Arm key failed validation
    #[error("Invalid arm key: {0:?}")]
    InvalidArm(String),

    /// Configuration value out of range
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for LearnError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type alias for learning operations
pub type Result<T> = std::result::Result<T, LearnError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: LearnError = io_err.into();
        assert!(matches!(err, LearnError::Io(_)));
    }

    #[test]
    fn test_conflict_display() {
        let err = LearnError::Conflict {
            expected: 3,
            found: 4,
        };
        assert_eq!(
            err.to_string(),
            "Learning state changed on disk (expected version 3, found 4)"
        );
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<u32>("not json").unwrap_err();
        let err: LearnError = json_err.into();
        assert!(matches!(err, LearnError::Serialization(_)));
    }
}
