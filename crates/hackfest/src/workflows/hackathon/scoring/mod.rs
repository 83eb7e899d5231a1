mod rubric;

pub use rubric::{round2, DIMENSION_COUNT, DIMENSION_MAX, REQUIRED_WEIGHT_SUM};

use serde::{Deserialize, Serialize};

use super::domain::{ScoreRound, TeamId, UserId};

/// Stateless validator and calculator for rubric sheets. Both the screening
/// and judging flows share this single engine so the weight rules cannot
/// diverge between rounds.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScoringEngine;

impl ScoringEngine {
    pub const fn new() -> Self {
        Self
    }

    /// Validate a sheet and compute its weighted total.
    pub fn score(
        &self,
        dimensions: &[f64; DIMENSION_COUNT],
        weights: &[u32; DIMENSION_COUNT],
    ) -> Result<f64, ScoringError> {
        rubric::validate(dimensions, weights)?;
        Ok(rubric::weighted_total(dimensions, weights))
    }
}

/// An evaluator's submitted sheet, before phase and lock checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreSubmission {
    pub evaluator_id: UserId,
    pub subject_id: TeamId,
    pub round: ScoreRound,
    pub dimensions: [f64; DIMENSION_COUNT],
    pub weights: [u32; DIMENSION_COUNT],
    /// Freeze the sheet after this write; locked sheets reject re-scoring.
    #[serde(default)]
    pub lock: bool,
}

/// Rubric validation failures. Always the caller's fault and fully
/// recoverable by correcting the sheet.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScoringError {
    #[error("rubric weights sum to {sum}, expected exactly 100")]
    WeightSum { sum: u32 },
    #[error("dimension {index} value {value} outside the [0, 10] range")]
    DimensionRange { index: usize, value: f64 },
}
