/// Organizes flat sample lists into per-(treatment, month) buckets.
///
/// Bucket order is fixed: ascending month, then the configured treatment
/// order, so reports are identical across runs regardless of input order.

use std::collections::BTreeMap;

use tracing::debug;

use crate::config::SampleWindow;
use crate::logging::Stage;
use crate::model::{AggregateBucket, MonthBucket, Sample};

// ---------------------------------------------------------------------------
// Grouping keys
// ---------------------------------------------------------------------------

/// How samples are grouped within a month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupBy {
    /// One bucket per treatment per month.
    Treatment,
    /// All treatments pooled into one bucket per month (`treatment_id = None`).
    Pooled,
}

/// Sort position of a treatment under the canonical order.
///
/// Listed treatments come first in list order, then unlisted ones by name,
/// then samples with no treatment.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum TreatmentRank {
    Listed(usize),
    Unlisted(String),
    Unassigned,
}

pub fn treatment_rank(order: &[String], treatment_id: Option<&str>) -> TreatmentRank {
    match treatment_id {
        None => TreatmentRank::Unassigned,
        Some(id) => order
            .iter()
            .position(|t| t == id)
            .map(TreatmentRank::Listed)
            .unwrap_or_else(|| TreatmentRank::Unlisted(id.to_string())),
    }
}

/// Distinct treatments present in `samples`, in canonical order.
pub fn treatments_in_order(samples: &[Sample], order: &[String]) -> Vec<Option<String>> {
    let mut ranked: BTreeMap<TreatmentRank, Option<String>> = BTreeMap::new();
    for sample in samples {
        let id = sample.treatment_id.as_deref();
        ranked
            .entry(treatment_rank(order, id))
            .or_insert_with(|| sample.treatment_id.clone());
    }
    ranked.into_values().collect()
}

// ---------------------------------------------------------------------------
// Date window
// ---------------------------------------------------------------------------

/// Samples collected within `window` (inclusive on both ends).
pub fn filter_window(samples: &[Sample], window: &SampleWindow) -> Vec<Sample> {
    samples
        .iter()
        .filter(|s| window.contains(s.collection_date))
        .cloned()
        .collect()
}

// ---------------------------------------------------------------------------
// Monthly aggregation
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Accumulator {
    treatment_id: Option<String>,
    nitrogen_sum: f64,
    nitrogen_count: usize,
    starch_sum: f64,
    starch_count: usize,
}

impl Accumulator {
    fn add(&mut self, sample: &Sample) {
        if sample.nitrogen_value.is_finite() && sample.nitrogen_value >= 0.0 {
            self.nitrogen_sum += sample.nitrogen_value;
            self.nitrogen_count += 1;
        }
        if let Some(st) = sample.starch_value.filter(|v| v.is_finite() && *v >= 0.0) {
            self.starch_sum += st;
            self.starch_count += 1;
        }
    }

    fn into_bucket(self, month: MonthBucket) -> AggregateBucket {
        let mean = |sum: f64, n: usize| (n > 0).then(|| sum / n as f64);
        AggregateBucket {
            mean_nitrogen: mean(self.nitrogen_sum, self.nitrogen_count),
            mean_starch: mean(self.starch_sum, self.starch_count),
            nitrogen_count: self.nitrogen_count,
            starch_count: self.starch_count,
            treatment_id: self.treatment_id,
            month,
        }
    }
}

/// Reduces samples to per-bucket metric means.
///
/// Each mean is taken only over samples with a usable (finite, non-negative)
/// value for that metric, so nitrogen and starch means may cover different
/// subsets. A metric with no usable values yields `None`, never zero.
pub fn aggregate(
    samples: &[Sample],
    group_by: GroupBy,
    treatment_order: &[String],
) -> Vec<AggregateBucket> {
    let mut groups: BTreeMap<(MonthBucket, TreatmentRank), Accumulator> = BTreeMap::new();

    for sample in samples {
        let treatment_id = match group_by {
            GroupBy::Treatment => sample.treatment_id.clone(),
            GroupBy::Pooled => None,
        };
        let key = (
            MonthBucket::of(sample.collection_date),
            treatment_rank(treatment_order, treatment_id.as_deref()),
        );
        groups
            .entry(key)
            .or_insert_with(|| Accumulator {
                treatment_id,
                ..Accumulator::default()
            })
            .add(sample);
    }

    let buckets: Vec<AggregateBucket> = groups
        .into_iter()
        .map(|((month, _), acc)| acc.into_bucket(month))
        .collect();
    debug!(
        stage = %Stage::Aggregate,
        samples = samples.len(),
        buckets = buckets.len(),
        ?group_by,
        "aggregated samples into monthly buckets"
    );
    buckets
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Crop;
    use approx::assert_abs_diff_eq;
    use chrono::NaiveDate;

    fn order() -> Vec<String> {
        ["N10", "N40", "N60", "N100", "N150"].iter().map(|t| t.to_string()).collect()
    }

    fn sample(date: (i32, u32, u32), treatment: Option<&str>, n: f64, st: Option<f64>) -> Sample {
        Sample {
            collection_date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            treatment_id: treatment.map(String::from),
            crop: Crop::Citrus,
            nitrogen_value: n,
            starch_value: st,
        }
    }

    #[test]
    fn test_means_per_treatment_and_month() {
        let samples = vec![
            sample((2023, 4, 3), Some("N60"), 2.6, Some(40.0)),
            sample((2023, 4, 24), Some("N60"), 2.8, Some(60.0)),
            sample((2023, 4, 10), Some("N10"), 2.2, Some(80.0)),
        ];
        let buckets = aggregate(&samples, GroupBy::Treatment, &order());
        assert_eq!(buckets.len(), 2);

        let n60 = &buckets[1];
        assert_eq!(n60.treatment_id.as_deref(), Some("N60"));
        assert_eq!(n60.month, MonthBucket { year: 2023, month: 4 });
        assert_abs_diff_eq!(n60.mean_nitrogen.unwrap(), 2.7, epsilon = 1e-12);
        assert_abs_diff_eq!(n60.mean_starch.unwrap(), 50.0, epsilon = 1e-12);
        assert_eq!(n60.nitrogen_count, 2);
    }

    #[test]
    fn test_missing_starch_excluded_from_starch_mean_only() {
        let samples = vec![
            sample((2023, 5, 2), Some("N40"), 2.4, Some(30.0)),
            sample((2023, 5, 9), Some("N40"), 2.6, None),
            sample((2023, 5, 16), Some("N40"), 2.8, Some(f64::NAN)),
        ];
        let buckets = aggregate(&samples, GroupBy::Treatment, &order());
        assert_eq!(buckets.len(), 1);
        assert_abs_diff_eq!(buckets[0].mean_nitrogen.unwrap(), 2.6, epsilon = 1e-12);
        assert_eq!(buckets[0].mean_starch, Some(30.0));
        assert_eq!(buckets[0].nitrogen_count, 3);
        assert_eq!(buckets[0].starch_count, 1);
    }

    #[test]
    fn test_bucket_without_starch_has_missing_mean_not_zero() {
        let samples = vec![sample((2023, 6, 1), Some("N100"), 3.1, None)];
        let buckets = aggregate(&samples, GroupBy::Treatment, &order());
        assert_eq!(buckets[0].mean_starch, None);
        assert_eq!(buckets[0].starch_count, 0);
    }

    #[test]
    fn test_order_is_month_then_canonical_treatment() {
        // Deliberately shuffled input; N100 sorts after N60 by canonical
        // order even though "N100" < "N60" lexically.
        let samples = vec![
            sample((2023, 2, 1), Some("N100"), 3.0, Some(50.0)),
            sample((2023, 1, 1), Some("N150"), 3.2, Some(50.0)),
            sample((2023, 2, 1), Some("N60"), 2.9, Some(50.0)),
            sample((2023, 1, 1), Some("N10"), 2.3, Some(50.0)),
        ];
        let buckets = aggregate(&samples, GroupBy::Treatment, &order());
        let keys: Vec<(String, Option<&str>)> = buckets
            .iter()
            .map(|b| (b.month.to_string(), b.treatment_id.as_deref()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("2023-01".to_string(), Some("N10")),
                ("2023-01".to_string(), Some("N150")),
                ("2023-02".to_string(), Some("N60")),
                ("2023-02".to_string(), Some("N100")),
            ]
        );
    }

    #[test]
    fn test_same_month_different_years_are_separate_buckets() {
        let samples = vec![
            sample((2022, 9, 1), Some("N60"), 2.9, Some(100.0)),
            sample((2023, 9, 1), Some("N60"), 3.1, Some(120.0)),
        ];
        let buckets = aggregate(&samples, GroupBy::Treatment, &order());
        assert_eq!(buckets.len(), 2);
        assert!(buckets[0].month < buckets[1].month);
    }

    #[test]
    fn test_pooled_grouping_merges_treatments() {
        let samples = vec![
            sample((2023, 3, 1), Some("N10"), 2.0, Some(40.0)),
            sample((2023, 3, 2), Some("N150"), 3.0, Some(60.0)),
        ];
        let buckets = aggregate(&samples, GroupBy::Pooled, &order());
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].treatment_id, None);
        assert_abs_diff_eq!(buckets[0].mean_nitrogen.unwrap(), 2.5, epsilon = 1e-12);
    }

    #[test]
    fn test_negative_values_do_not_enter_means() {
        let samples = vec![
            sample((2023, 3, 1), Some("N10"), -1.0, Some(-5.0)),
            sample((2023, 3, 2), Some("N10"), 2.0, Some(40.0)),
        ];
        let buckets = aggregate(&samples, GroupBy::Treatment, &order());
        assert_eq!(buckets[0].nitrogen_count, 1);
        assert_eq!(buckets[0].starch_count, 1);
        assert_eq!(buckets[0].mean_nitrogen, Some(2.0));
    }

    #[test]
    fn test_treatment_rank_orders_listed_unlisted_unassigned() {
        let order = order();
        let mut ranks = vec![
            treatment_rank(&order, None),
            treatment_rank(&order, Some("Control")),
            treatment_rank(&order, Some("N150")),
            treatment_rank(&order, Some("N10")),
        ];
        ranks.sort();
        assert_eq!(
            ranks,
            vec![
                TreatmentRank::Listed(0),
                TreatmentRank::Listed(4),
                TreatmentRank::Unlisted("Control".to_string()),
                TreatmentRank::Unassigned,
            ]
        );
    }

    #[test]
    fn test_treatments_in_order_is_distinct_and_canonical() {
        let samples = vec![
            sample((2023, 3, 1), None, 2.0, None),
            sample((2023, 3, 1), Some("N150"), 2.0, None),
            sample((2023, 4, 1), Some("N40"), 2.0, None),
            sample((2023, 5, 1), Some("N150"), 2.0, None),
        ];
        assert_eq!(
            treatments_in_order(&samples, &order()),
            vec![Some("N40".to_string()), Some("N150".to_string()), None]
        );
    }

    #[test]
    fn test_filter_window_is_inclusive() {
        let samples = vec![
            sample((2023, 7, 31), Some("N60"), 2.9, None),
            sample((2023, 8, 1), Some("N60"), 2.9, None),
            sample((2024, 8, 31), Some("N60"), 2.9, None),
            sample((2024, 9, 1), Some("N60"), 2.9, None),
        ];
        let window = SampleWindow {
            start: NaiveDate::from_ymd_opt(2023, 8, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 8, 31).unwrap(),
        };
        let kept = filter_window(&samples, &window);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].collection_date, window.start);
        assert_eq!(kept[1].collection_date, window.end);
    }

    #[test]
    fn test_empty_input_yields_no_buckets() {
        assert!(aggregate(&[], GroupBy::Treatment, &order()).is_empty());
    }
}
