//! Critique value objects.
//!
//! A critique is produced exactly once per refinement round and is paired
//! 1:1 with the post it evaluates.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::ValidationError;

/// An integer quality score bounded to 1..=10.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QualityScore(u8);

impl QualityScore {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 10;

    /// Constructs a score, rejecting values outside 1..=10.
    pub fn new(value: u8) -> Result<Self, ValidationError> {
        if !(Self::MIN..=Self::MAX).contains(&value) {
            return Err(ValidationError::out_of_range(
                "score",
                Self::MIN as i32,
                Self::MAX as i32,
                value as i32,
            ));
        }
        Ok(Self(value))
    }

    /// Returns the raw score value.
    pub fn value(&self) -> u8 {
        self.0
    }

    /// True if the score meets or exceeds the pass threshold.
    pub fn passes(&self, threshold: u8) -> bool {
        self.0 >= threshold
    }
}

impl std::fmt::Display for QualityScore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/10", self.0)
    }
}

/// The four named sub-scores of a critique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubScores {
    pub clarity: QualityScore,
    pub engagement: QualityScore,
    pub structure: QualityScore,
    pub audience_fit: QualityScore,
}

/// A structured quality assessment of one generated post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CritiqueResult {
    /// Overall quality score driving the quality gate.
    pub overall: QualityScore,
    /// Named sub-scores.
    pub scores: SubScores,
    /// What the post does well.
    pub strengths: Vec<String>,
    /// What holds the post back.
    pub weaknesses: Vec<String>,
    /// Ordered, specific directives for the next refinement round.
    pub improvements: Vec<String>,
}

impl CritiqueResult {
    /// Constructs a critique from raw integer scores.
    pub fn new(
        overall: u8,
        clarity: u8,
        engagement: u8,
        structure: u8,
        audience_fit: u8,
        strengths: Vec<String>,
        weaknesses: Vec<String>,
        improvements: Vec<String>,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            overall: QualityScore::new(overall)?,
            scores: SubScores {
                clarity: QualityScore::new(clarity)?,
                engagement: QualityScore::new(engagement)?,
                structure: QualityScore::new(structure)?,
                audience_fit: QualityScore::new(audience_fit)?,
            },
            strengths,
            weaknesses,
            improvements,
        })
    }

    /// Validates the threshold-dependent invariant: a failing critique must
    /// carry at least one specific improvement directive.
    pub fn validate_against(&self, threshold: u8) -> Result<(), ValidationError> {
        if !self.overall.passes(threshold) && self.improvements.is_empty() {
            return Err(ValidationError::empty_field("improvements"));
        }
        Ok(())
    }
}
