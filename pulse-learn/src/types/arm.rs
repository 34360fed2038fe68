//! Arm identity: bandit dimensions and validated arm keys

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LearnError;

/// The six independent bandit dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Theme,
    Approach,
    Slot,
    Variant,
    TextFeature,
    SourceType,
}

impl Dimension {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Theme => "theme",
            Self::Approach => "approach",
            Self::Slot => "slot",
            Self::Variant => "variant",
            Self::TextFeature => "text_feature",
            Self::SourceType => "source_type",
        }
    }

    /// All dimensions in snapshot order
    pub fn all() -> &'static [Dimension] {
        &[
            Self::Theme,
            Self::Approach,
            Self::Slot,
            Self::Variant,
            Self::TextFeature,
            Self::SourceType,
        ]
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dimension {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "theme" => Ok(Self::Theme),
            "approach" => Ok(Self::Approach),
            "slot" => Ok(Self::Slot),
            "variant" => Ok(Self::Variant),
            "text_feature" => Ok(Self::TextFeature),
            "source_type" => Ok(Self::SourceType),
            _ => Err(format!("unknown dimension: {s}")),
        }
    }
}

/// Normalized arm key.
///
/// Lower-cased and trimmed; whitespace runs and punctuation other than
/// `_ : - .` become `_`. "Morning ", "morning" and "MORNING" are the same arm.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ArmKey(String);

impl ArmKey {
    pub fn new(raw: &str) -> Result<Self, LearnError> {
        let mut key = String::with_capacity(raw.len());
        let mut pending_sep = false;
        for ch in raw.trim().chars() {
            if ch.is_alphanumeric() || matches!(ch, ':' | '-' | '.') {
                if pending_sep && !key.is_empty() {
                    key.push('_');
                }
                pending_sep = false;
                key.extend(ch.to_lowercase());
            } else {
                pending_sep = true;
            }
        }
        if key.is_empty() {
            return Err(LearnError::InvalidArm(raw.to_string()));
        }
        Ok(Self(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArmKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ArmKey {
    type Error = LearnError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<ArmKey> for String {
    fn from(key: ArmKey) -> Self {
        key.0
    }
}

/// One arm in one dimension
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Arm {
    pub dimension: Dimension,
    pub key: ArmKey,
}

impl Arm {
    pub fn new(dimension: Dimension, raw_key: &str) -> Result<Self, LearnError> {
        Ok(Self {
            dimension,
            key: ArmKey::new(raw_key)?,
        })
    }
}

impl fmt::Display for Arm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.dimension, self.key)
    }
}
