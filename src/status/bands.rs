/// Band classification of a concentration against a seasonal threshold set.
///
/// Bands are left-closed: a value equal to a boundary belongs to the band
/// above it. With strictly increasing boundaries every non-negative number
/// falls in exactly one band.
///
/// ```text
///   value <  b1        → Deficient
///   b1 <= value < b2   → Low
///   b2 <= value < b3   → Optimum
///   b3 <= value < b4   → High
///   b4 <= value        → Excess
/// ```

use crate::model::{InvalidValueError, SeasonalThresholdSet, StatusLabel};

/// Classifies `value` against `thresholds`.
///
/// NaN and negative concentrations are rejected rather than mapped to a
/// default label; what to do with the sample is the caller's decision.
pub fn classify(
    value: f64,
    thresholds: &SeasonalThresholdSet,
) -> Result<StatusLabel, InvalidValueError> {
    if value.is_nan() {
        return Err(InvalidValueError::NotANumber);
    }
    if value < 0.0 {
        return Err(InvalidValueError::Negative(value));
    }

    let [b1, b2, b3, b4] = thresholds.bounds;
    let label = if value < b1 {
        StatusLabel::Deficient
    } else if value < b2 {
        StatusLabel::Low
    } else if value < b3 {
        StatusLabel::Optimum
    } else if value < b4 {
        StatusLabel::High
    } else {
        StatusLabel::Excess
    };
    Ok(label)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
