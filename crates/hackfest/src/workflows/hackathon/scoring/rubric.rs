use super::ScoringError;

/// Number of rubric dimensions on every score sheet.
pub const DIMENSION_COUNT: usize = 5;

/// Weights are percentages and must cover the full rubric.
pub const REQUIRED_WEIGHT_SUM: u32 = 100;

/// Inclusive upper bound for a single dimension value.
pub const DIMENSION_MAX: f64 = 10.0;

/// Validate one rubric sheet: weights must sum to exactly 100 and every
/// dimension must lie in [0, 10].
pub fn validate(
    dimensions: &[f64; DIMENSION_COUNT],
    weights: &[u32; DIMENSION_COUNT],
) -> Result<(), ScoringError> {
    let sum: u32 = weights.iter().sum();
    if sum != REQUIRED_WEIGHT_SUM {
        return Err(ScoringError::WeightSum { sum });
    }

    for (index, value) in dimensions.iter().enumerate() {
        if !value.is_finite() || *value < 0.0 || *value > DIMENSION_MAX {
            return Err(ScoringError::DimensionRange {
                index,
                value: *value,
            });
        }
    }

    Ok(())
}

/// Weighted total over a validated sheet: Σ(dimension × weight) / 100,
/// rounded half-up to two decimals. Both evaluation rounds share this exact
/// arithmetic so leaderboards stay reproducible.
pub fn weighted_total(
    dimensions: &[f64; DIMENSION_COUNT],
    weights: &[u32; DIMENSION_COUNT],
) -> f64 {
    let raw: f64 = dimensions
        .iter()
        .zip(weights.iter())
        .map(|(dimension, weight)| dimension * f64::from(*weight))
        .sum::<f64>()
        / f64::from(REQUIRED_WEIGHT_SUM);

    round2(raw)
}

/// Half-up rounding to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
