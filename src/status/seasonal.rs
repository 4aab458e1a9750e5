/// Seasonally adjusted leaf nitrogen thresholds.
///
/// Leaf N concentration follows an annual cycle (diluted by spring flush,
/// concentrated in winter), so a fixed set of boundaries misclassifies most
/// of the year. The reference boundaries are defined for one anchor month
/// and scaled by a per-month factor; the same positive factor multiplies all
/// four, which preserves their order.
///
/// Only the month of a date matters. Year and day are ignored, so the
/// thresholds repeat annually.

use chrono::Datelike;

use crate::config::{AnalysisConfig, MonthlyFactors};
use crate::model::{ConfigurationError, ReferenceThresholds, SeasonalThresholdSet};

#[derive(Debug, Clone, PartialEq)]
pub struct SeasonalThresholdModel {
    reference: ReferenceThresholds,
    factors: MonthlyFactors,
}

impl SeasonalThresholdModel {
    /// Builds a model, rejecting non-monotonic reference thresholds and any
    /// factor that is not a positive finite number.
    ///
    /// A table missing some months is accepted here; lookups for those
    /// months fail with `MissingMonthFactor`.
    pub fn new(
        reference: ReferenceThresholds,
        factors: MonthlyFactors,
    ) -> Result<Self, ConfigurationError> {
        if !reference.is_strictly_increasing() {
            return Err(ConfigurationError::NonMonotonicThresholds(reference.as_array()));
        }
        for (month, factor) in factors.iter() {
            if !(1..=12).contains(&month) {
                return Err(ConfigurationError::InvalidMonth(month));
            }
            if !(factor.is_finite() && factor > 0.0) {
                return Err(ConfigurationError::InvalidFactor { month, factor });
            }
        }
        Ok(SeasonalThresholdModel { reference, factors })
    }

    pub fn from_config(config: &AnalysisConfig) -> Result<Self, ConfigurationError> {
        SeasonalThresholdModel::new(config.reference_thresholds, config.monthly_factors.clone())
    }

    pub fn reference(&self) -> &ReferenceThresholds {
        &self.reference
    }

    /// The four boundaries in effect on `date`.
    pub fn thresholds_for<D: Datelike>(
        &self,
        date: &D,
    ) -> Result<SeasonalThresholdSet, ConfigurationError> {
        self.thresholds_for_month(date.month())
    }

    pub fn thresholds_for_month(
        &self,
        month: u32,
    ) -> Result<SeasonalThresholdSet, ConfigurationError> {
        let factor = self
            .factors
            .get(month)
            .ok_or(ConfigurationError::MissingMonthFactor(month))?;
        Ok(SeasonalThresholdSet {
            month,
            factor,
            bounds: self.reference.as_array().map(|b| b * factor),
        })
    }

    /// Boundaries for January through December, in month order.
    pub fn monthly_table(&self) -> Result<Vec<SeasonalThresholdSet>, ConfigurationError> {
        (1..=12).map(|m| self.thresholds_for_month(m)).collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use chrono::NaiveDate;

    fn default_model() -> SeasonalThresholdModel {
        SeasonalThresholdModel::from_config(&AnalysisConfig::default())
            .expect("default config should build a model")
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn assert_bounds(actual: [f64; 4], expected: [f64; 4]) {
        for (a, e) in actual.iter().zip(expected.iter()) {
            assert_abs_diff_eq!(*a, *e, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_bounds_strictly_increasing_for_every_month() {
        for set in default_model().monthly_table().expect("table should be complete") {
            assert!(
                set.bounds.windows(2).all(|w| w[0] < w[1]),
                "bounds for month {} not strictly increasing: {:?}",
                set.month,
                set.bounds
            );
        }
    }

    #[test]
    fn test_anchor_month_returns_reference_bounds() {
        let set = default_model().thresholds_for(&date(2023, 10, 15)).unwrap();
        assert_bounds(set.bounds, [2.64, 2.88, 3.24, 3.48]);
    }

    #[test]
    fn test_december_bounds_scale_by_winter_factor() {
        let set = default_model().thresholds_for(&date(2022, 12, 3)).unwrap();
        assert_abs_diff_eq!(set.factor, 1.125);
        assert_bounds(set.bounds, [2.97, 3.24, 3.645, 3.915]);
    }

    #[test]
    fn test_april_bounds_scale_by_spring_factor() {
        let set = default_model().thresholds_for(&date(2023, 4, 20)).unwrap();
        assert_bounds(set.bounds, [2.62152, 2.85984, 3.21732, 3.45564]);
    }

    #[test]
    fn test_year_and_day_are_ignored() {
        let model = default_model();
        let a = model.thresholds_for(&date(2022, 8, 1)).unwrap();
        let b = model.thresholds_for(&date(2024, 8, 31)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_missing_month_is_a_configuration_error() {
        let factors = MonthlyFactors::from_pairs([(1, 1.1), (2, 1.0)]);
        let model = SeasonalThresholdModel::new(crate::crops::CITRUS_OCTOBER_THRESHOLDS, factors)
            .expect("partial table is accepted at construction");
        assert!(model.thresholds_for(&date(2023, 1, 5)).is_ok());
        assert_eq!(
            model.thresholds_for(&date(2023, 3, 5)),
            Err(ConfigurationError::MissingMonthFactor(3))
        );
        assert_eq!(
            model.monthly_table(),
            Err(ConfigurationError::MissingMonthFactor(3))
        );
    }

    #[test]
    fn test_negative_factor_rejected_at_construction() {
        let factors = MonthlyFactors::from_pairs([(6, -0.9)]);
        let result = SeasonalThresholdModel::new(crate::crops::CITRUS_OCTOBER_THRESHOLDS, factors);
        assert_eq!(
            result,
            Err(ConfigurationError::InvalidFactor { month: 6, factor: -0.9 })
        );
    }

    #[test]
    fn test_equal_reference_bounds_rejected_at_construction() {
        let reference = ReferenceThresholds {
            deficient_low: 2.64,
            low_optimum: 2.88,
            optimum_high: 2.88,
            high_excess: 3.48,
        };
        assert!(matches!(
            SeasonalThresholdModel::new(reference, MonthlyFactors::default()),
            Err(ConfigurationError::NonMonotonicThresholds(_))
        ));
    }
}
