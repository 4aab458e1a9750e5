/// Descriptive statistics per treatment, per collection year, or per
/// calendar month pooled across years (the seasonal profile).
///
/// Count, mean, sample standard deviation, min and max for nitrogen and
/// starch. Values that the classifier would reject (non-finite or
/// negative) are left out, as they are from bucket means. Purely
/// descriptive; no tests of significance.

use std::collections::BTreeMap;

use chrono::Datelike;
use serde::Serialize;

use crate::analysis::groupings::{treatment_rank, TreatmentRank};
use crate::model::Sample;

/// Label used for samples with no treatment assigned.
pub const UNASSIGNED_LABEL: &str = "unassigned";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryKey {
    Treatment,
    Year,
    /// January..December, all years together.
    CalendarMonth,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricStats {
    pub count: usize,
    pub mean: f64,
    /// Sample (n-1) standard deviation; `None` for fewer than two values.
    pub std_dev: Option<f64>,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub group: String,
    pub samples: usize,
    pub nitrogen: Option<MetricStats>,
    pub starch: Option<MetricStats>,
}

fn is_usable(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

/// Statistics over the finite, non-negative values in `values`, or `None`
/// if there are none.
pub fn metric_stats(values: &[f64]) -> Option<MetricStats> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| is_usable(*v)).collect();
    let count = finite.len();
    if count == 0 {
        return None;
    }
    let mean = finite.iter().sum::<f64>() / count as f64;
    let std_dev = (count > 1).then(|| {
        let ss: f64 = finite.iter().map(|v| (v - mean).powi(2)).sum();
        (ss / (count - 1) as f64).sqrt()
    });
    let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    Some(MetricStats {
        count,
        mean,
        std_dev,
        min,
        max,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum GroupKey {
    Treatment(TreatmentRank),
    Year(i32),
    CalendarMonth(u32),
}

#[derive(Default)]
struct Collected {
    label: String,
    samples: usize,
    nitrogen: Vec<f64>,
    starch: Vec<f64>,
}

/// One summary per group: treatments in canonical order, years ascending,
/// or calendar months January first. `samples` counts every sample in the
/// group; each metric's `count` only the usable values.
pub fn summarize(samples: &[Sample], key: SummaryKey, treatment_order: &[String]) -> Vec<GroupSummary> {
    let mut groups: BTreeMap<GroupKey, Collected> = BTreeMap::new();

    for sample in samples {
        let (group_key, label) = match key {
            SummaryKey::Treatment => {
                let id = sample.treatment_id.as_deref();
                (
                    GroupKey::Treatment(treatment_rank(treatment_order, id)),
                    id.unwrap_or(UNASSIGNED_LABEL).to_string(),
                )
            }
            SummaryKey::Year => {
                let year = sample.collection_date.year();
                (GroupKey::Year(year), year.to_string())
            }
            SummaryKey::CalendarMonth => {
                let date = sample.collection_date;
                (GroupKey::CalendarMonth(date.month()), date.format("%b").to_string())
            }
        };
        let entry = groups.entry(group_key).or_insert_with(|| Collected {
            label,
            ..Collected::default()
        });
        entry.samples += 1;
        if is_usable(sample.nitrogen_value) {
            entry.nitrogen.push(sample.nitrogen_value);
        }
        if let Some(st) = sample.starch_value.filter(|v| is_usable(*v)) {
            entry.starch.push(st);
        }
    }

    groups
        .into_values()
        .map(|c| GroupSummary {
            nitrogen: metric_stats(&c.nitrogen),
            starch: metric_stats(&c.starch),
            group: c.label,
            samples: c.samples,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
