/// Report assembly: the operations exposed to presentation layers.
///
/// `NutrientAnalyzer` composes the status model with the aggregation and
/// event pipeline under one validated configuration:
///
/// - `classify_sample`: seasonal thresholds + band classifier
/// - `build_ratio_series`: monthly aggregation + N/ST ratio
/// - `normalize_for_display`: 0–100 rescaling
/// - `detect_events`: interior peaks and troughs of a ratio series
///
/// `build_report` runs all of them over one sample table and returns a
/// serializable summary. Each call builds fresh buckets and series and
/// shares nothing with other calls.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::info;

use crate::analysis::extrema::find_extrema;
use crate::analysis::groupings::{aggregate, filter_window, treatments_in_order, GroupBy};
use crate::analysis::normalize::normalize;
use crate::analysis::ratio::{bucket_ratio, ratio_series};
use crate::analysis::summary::{summarize, GroupSummary, SummaryKey};
use crate::config::AnalysisConfig;
use crate::logging::{log_rejected_sample, log_report_summary, Stage};
use crate::model::{
    AggregateBucket, AnalysisError, ConfigurationError, ExtremumEvent, MonthBucket, RatioSeries,
    Sample, SeasonalThresholdSet, StatusLabel,
};
use crate::status::{classify, SeasonalThresholdModel};

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

/// A ratio series rescaled to 0–100, point for point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedSeries {
    pub treatment_id: Option<String>,
    pub points: Vec<NormalizedPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NormalizedPoint {
    pub month: MonthBucket,
    pub value: f64,
}

/// Status of one monthly bucket's mean nitrogen.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketStatus {
    pub month: MonthBucket,
    pub mean_nitrogen: Option<f64>,
    pub status: Option<StatusLabel>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreatmentReport {
    pub treatment_id: Option<String>,
    pub status_timeline: Vec<BucketStatus>,
    pub ratio_series: RatioSeries,
    pub normalized_ratio: NormalizedSeries,
    pub events: Vec<ExtremumEvent>,
}

/// Pooled N, ST and N/ST per month, each rescaled over its own range.
///
/// A metric missing for a month is `None` in that row and does not take
/// part in that metric's rescaling.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub month: MonthBucket,
    pub nitrogen: Option<f64>,
    pub starch: Option<f64>,
    pub ratio: Option<f64>,
}

/// Months of the pooled extremes used to time fertilization: highest mean
/// N, lowest mean ST, highest N/ST. `None` when the metric is never
/// defined; ties go to the earliest month.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ComparisonMarkers {
    pub nitrogen_peak: Option<MonthBucket>,
    pub starch_low: Option<MonthBucket>,
    pub ratio_peak: Option<MonthBucket>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusCounts {
    pub counts: BTreeMap<StatusLabel, usize>,
    pub rejected: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NutrientReport {
    pub sample_count: usize,
    pub monthly_thresholds: Vec<SeasonalThresholdSet>,
    pub sample_status: StatusCounts,
    pub treatments: Vec<TreatmentReport>,
    pub comparison: Vec<ComparisonRow>,
    pub markers: ComparisonMarkers,
    pub summaries: Vec<GroupSummary>,
    /// Per calendar month across all years.
    pub seasonal_profile: Vec<GroupSummary>,
}

// ---------------------------------------------------------------------------
// Analyzer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct NutrientAnalyzer {
    config: AnalysisConfig,
    model: SeasonalThresholdModel,
}

impl NutrientAnalyzer {
    /// Validates the configuration and builds the threshold model.
    pub fn new(config: AnalysisConfig) -> Result<Self, ConfigurationError> {
        config.validate()?;
        let model = SeasonalThresholdModel::from_config(&config)?;
        Ok(NutrientAnalyzer { config, model })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn model(&self) -> &SeasonalThresholdModel {
        &self.model
    }

    /// Status of one sample against the thresholds of its collection month.
    pub fn classify_sample(&self, sample: &Sample) -> Result<StatusLabel, AnalysisError> {
        let thresholds = self.model.thresholds_for(&sample.collection_date)?;
        Ok(classify(sample.nitrogen_value, &thresholds)?)
    }

    /// Status of a bucket's mean nitrogen; `Ok(None)` if the mean is missing.
    pub fn classify_bucket(
        &self,
        bucket: &AggregateBucket,
    ) -> Result<Option<StatusLabel>, AnalysisError> {
        let Some(mean) = bucket.mean_nitrogen else {
            return Ok(None);
        };
        let thresholds = self.model.thresholds_for_month(bucket.month.month)?;
        Ok(Some(classify(mean, &thresholds)?))
    }

    /// Monthly N/ST ratio series for one treatment (`None` selects samples
    /// without a treatment).
    pub fn build_ratio_series(&self, samples: &[Sample], treatment_id: Option<&str>) -> RatioSeries {
        let selected: Vec<Sample> = samples
            .iter()
            .filter(|s| s.treatment_id.as_deref() == treatment_id)
            .cloned()
            .collect();
        let buckets = aggregate(&selected, GroupBy::Treatment, &self.config.treatment_order);
        let mut series = ratio_series(&buckets);
        series.treatment_id = treatment_id.map(String::from);
        series
    }

    pub fn normalize_for_display(&self, series: &RatioSeries) -> NormalizedSeries {
        let values = normalize(&series.values());
        NormalizedSeries {
            treatment_id: series.treatment_id.clone(),
            points: series
                .points
                .iter()
                .zip(values)
                .map(|(p, value)| NormalizedPoint {
                    month: p.month,
                    value,
                })
                .collect(),
        }
    }

    /// Peaks and troughs of the ratio series, by position.
    pub fn detect_events(&self, series: &RatioSeries) -> Vec<ExtremumEvent> {
        find_extrema(series)
    }

    /// Builds the full report over `samples`.
    ///
    /// The configured window, if any, is applied first. Samples that cannot
    /// be classified are counted as rejected and logged; the rest of the
    /// report is unaffected. A configuration error aborts the whole report.
    pub fn build_report(&self, samples: &[Sample]) -> Result<NutrientReport, AnalysisError> {
        let windowed;
        let samples = match &self.config.window {
            Some(window) => {
                windowed = filter_window(samples, window);
                windowed.as_slice()
            }
            None => samples,
        };

        let sample_status = self.count_statuses(samples)?;
        let order = &self.config.treatment_order;

        let mut treatments = Vec::new();
        for treatment_id in treatments_in_order(samples, order) {
            treatments.push(self.treatment_report(samples, treatment_id.as_deref())?);
        }

        let event_count: usize = treatments.iter().map(|t| t.events.len()).sum();
        info!(
            stage = %Stage::Events,
            treatments = treatments.len(),
            events = event_count,
            "detected ratio events"
        );

        let pooled = aggregate(samples, GroupBy::Pooled, order);
        Ok(NutrientReport {
            sample_count: samples.len(),
            monthly_thresholds: self.model.monthly_table()?,
            sample_status,
            treatments,
            comparison: pooled_comparison(&pooled),
            markers: comparison_markers(&pooled),
            summaries: summarize(samples, SummaryKey::Treatment, order),
            seasonal_profile: summarize(samples, SummaryKey::CalendarMonth, order),
        })
    }

    fn count_statuses(&self, samples: &[Sample]) -> Result<StatusCounts, AnalysisError> {
        let mut counts: BTreeMap<StatusLabel, usize> =
            StatusLabel::ALL.iter().map(|l| (*l, 0)).collect();
        let mut rejected = 0;

        for sample in samples {
            match self.classify_sample(sample) {
                Ok(label) => *counts.entry(label).or_insert(0) += 1,
                Err(err @ AnalysisError::InvalidValue(_)) => {
                    log_rejected_sample(sample, &err);
                    rejected += 1;
                }
                Err(err) => return Err(err),
            }
        }

        log_report_summary(Stage::Classify, samples.len(), samples.len() - rejected, rejected);
        Ok(StatusCounts { counts, rejected })
    }

    fn treatment_report(
        &self,
        samples: &[Sample],
        treatment_id: Option<&str>,
    ) -> Result<TreatmentReport, AnalysisError> {
        let selected: Vec<Sample> = samples
            .iter()
            .filter(|s| s.treatment_id.as_deref() == treatment_id)
            .cloned()
            .collect();
        let buckets = aggregate(&selected, GroupBy::Treatment, &self.config.treatment_order);

        let mut status_timeline = Vec::with_capacity(buckets.len());
        for bucket in &buckets {
            let status = match self.classify_bucket(bucket) {
                Ok(status) => status,
                Err(AnalysisError::InvalidValue(_)) => None,
                Err(err) => return Err(err),
            };
            status_timeline.push(BucketStatus {
                month: bucket.month,
                mean_nitrogen: bucket.mean_nitrogen,
                status,
            });
        }

        let mut series = ratio_series(&buckets);
        series.treatment_id = treatment_id.map(String::from);
        let normalized_ratio = self.normalize_for_display(&series);
        let events = self.detect_events(&series);

        Ok(TreatmentReport {
            treatment_id: treatment_id.map(String::from),
            status_timeline,
            ratio_series: series,
            normalized_ratio,
            events,
        })
    }
}

/// Rescales each pooled metric over the months where it is defined.
fn pooled_comparison(buckets: &[AggregateBucket]) -> Vec<ComparisonRow> {
    let rescale = |values: Vec<Option<f64>>| -> Vec<Option<f64>> {
        let defined: Vec<f64> = values.iter().flatten().copied().collect();
        let mut scaled = normalize(&defined).into_iter();
        values
            .into_iter()
            .map(|v| v.and_then(|_| scaled.next()))
            .collect()
    };

    let nitrogen = rescale(buckets.iter().map(|b| b.mean_nitrogen).collect());
    let starch = rescale(buckets.iter().map(|b| b.mean_starch).collect());
    let ratio = rescale(buckets.iter().map(bucket_ratio).collect());

    buckets
        .iter()
        .enumerate()
        .map(|(i, b)| ComparisonRow {
            month: b.month,
            nitrogen: nitrogen[i],
            starch: starch[i],
            ratio: ratio[i],
        })
        .collect()
}

fn extreme_month(
    buckets: &[AggregateBucket],
    value: impl Fn(&AggregateBucket) -> Option<f64>,
    beats: impl Fn(f64, f64) -> bool,
) -> Option<MonthBucket> {
    let mut best: Option<(MonthBucket, f64)> = None;
    for bucket in buckets {
        let Some(v) = value(bucket) else { continue };
        if best.is_none_or(|(_, current)| beats(v, current)) {
            best = Some((bucket.month, v));
        }
    }
    best.map(|(month, _)| month)
}

fn comparison_markers(buckets: &[AggregateBucket]) -> ComparisonMarkers {
    ComparisonMarkers {
        nitrogen_peak: extreme_month(buckets, |b| b.mean_nitrogen, |v, cur| v > cur),
        starch_low: extreme_month(buckets, |b| b.mean_starch, |v, cur| v < cur),
        ratio_peak: extreme_month(buckets, bucket_ratio, |v, cur| v > cur),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
