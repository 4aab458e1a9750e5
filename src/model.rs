/// Core data types for the leaf nutrient monitoring core.
///
/// This module defines the shared domain model imported by all other modules.
/// It contains no logic beyond small accessors, no I/O, and the only external
/// dependencies are chrono (dates), serde (report output) and thiserror.

use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Crops
// ---------------------------------------------------------------------------

/// Crop a sample was collected from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Crop {
    Citrus,
    Almond,
    Avocado,
    Vine,
}

impl Crop {
    /// Parses a crop name case-insensitively ("citrus", "Vine", ...).
    pub fn from_name(name: &str) -> Option<Crop> {
        match name.trim().to_ascii_lowercase().as_str() {
            "citrus" => Some(Crop::Citrus),
            "almond" => Some(Crop::Almond),
            "avocado" => Some(Crop::Avocado),
            "vine" => Some(Crop::Vine),
            _ => None,
        }
    }
}

impl fmt::Display for Crop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Crop::Citrus => write!(f, "Citrus"),
            Crop::Almond => write!(f, "Almond"),
            Crop::Avocado => write!(f, "Avocado"),
            Crop::Vine => write!(f, "Vine"),
        }
    }
}

// ---------------------------------------------------------------------------
// Sample types
// ---------------------------------------------------------------------------

/// A single leaf sample from the laboratory table.
///
/// Nitrogen is leaf nitrogen content in percent dry weight; starch is in
/// mg/g. Starch may be missing for samples that were only analysed for N.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub collection_date: NaiveDate,
    pub treatment_id: Option<String>,
    pub crop: Crop,
    pub nitrogen_value: f64,
    pub starch_value: Option<f64>,
}

impl Sample {
    /// The sample's N/ST ratio, or `None` when starch is missing or zero.
    pub fn nitrogen_starch_ratio(&self) -> Option<f64> {
        match self.starch_value {
            Some(st) if st > 0.0 && self.nitrogen_value.is_finite() => {
                Some(self.nitrogen_value / st)
            }
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Threshold types
// ---------------------------------------------------------------------------

/// Leaf nitrogen reference boundaries for the anchor month, in percent.
///
/// Boundary levels in ascending order:
///   deficient_low < low_optimum < optimum_high < high_excess
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferenceThresholds {
    pub deficient_low: f64,
    pub low_optimum: f64,
    pub optimum_high: f64,
    pub high_excess: f64,
}

impl ReferenceThresholds {
    pub fn as_array(&self) -> [f64; 4] {
        [
            self.deficient_low,
            self.low_optimum,
            self.optimum_high,
            self.high_excess,
        ]
    }

    /// True when all four boundaries are finite and strictly increasing.
    pub fn is_strictly_increasing(&self) -> bool {
        let b = self.as_array();
        b.iter().all(|v| v.is_finite()) && b.windows(2).all(|w| w[0] < w[1])
    }
}

/// The four boundaries in effect for one calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeasonalThresholdSet {
    pub month: u32,
    pub factor: f64,
    pub bounds: [f64; 4],
}

// ---------------------------------------------------------------------------
// Status labels
// ---------------------------------------------------------------------------

/// Nutrient sufficiency category, in ascending order of concentration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StatusLabel {
    Deficient,
    Low,
    Optimum,
    High,
    Excess,
}

impl StatusLabel {
    pub const ALL: [StatusLabel; 5] = [
        StatusLabel::Deficient,
        StatusLabel::Low,
        StatusLabel::Optimum,
        StatusLabel::High,
        StatusLabel::Excess,
    ];
}

impl fmt::Display for StatusLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusLabel::Deficient => write!(f, "Deficient"),
            StatusLabel::Low => write!(f, "Low"),
            StatusLabel::Optimum => write!(f, "Optimum"),
            StatusLabel::High => write!(f, "High"),
            StatusLabel::Excess => write!(f, "Excess"),
        }
    }
}

// ---------------------------------------------------------------------------
// Aggregates and derived series
// ---------------------------------------------------------------------------

/// One calendar month instance, e.g. April 2023.
///
/// Ordered by year, then month. The day of month carries no meaning; the
/// representative timestamp is the first of the month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MonthBucket {
    pub year: i32,
    pub month: u32,
}

impl MonthBucket {
    pub fn of(date: NaiveDate) -> Self {
        MonthBucket {
            year: date.year(),
            month: date.month(),
        }
    }

    /// First day of the month. `None` only for a hand-built bucket with an
    /// out-of-range month.
    pub fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }
}

impl fmt::Display for MonthBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for MonthBucket {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Per-month means for one treatment (or for all treatments pooled).
///
/// A mean is `None` when no sample in the bucket had a usable value for
/// that metric; it is never reported as zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateBucket {
    pub treatment_id: Option<String>,
    pub month: MonthBucket,
    pub mean_nitrogen: Option<f64>,
    pub mean_starch: Option<f64>,
    pub nitrogen_count: usize,
    pub starch_count: usize,
}

/// A single defined point of an N/ST ratio series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RatioPoint {
    pub month: MonthBucket,
    pub ratio: f64,
}

/// N/ST ratio per month for one treatment, ascending by month.
///
/// Months whose bucket lacked a usable ratio are absent, so consecutive
/// points are not necessarily one month apart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatioSeries {
    pub treatment_id: Option<String>,
    pub points: Vec<RatioPoint>,
}

impl RatioSeries {
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.ratio).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Whether an extremum is a local maximum or a local minimum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExtremumKind {
    Peak,
    Trough,
}

/// An interior local extremum found in a ratio series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExtremumEvent {
    /// Position in the series' `points`, not a month offset.
    pub index: usize,
    pub month: MonthBucket,
    pub value: f64,
    pub kind: ExtremumKind,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Broken configuration. Fatal: indicates a bad deployment, not bad data.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigurationError {
    #[error("no monthly factor configured for month {0}")]
    MissingMonthFactor(u32),
    #[error("monthly factor for month {month} must be positive and finite, got {factor}")]
    InvalidFactor { month: u32, factor: f64 },
    #[error("reference thresholds must be finite and strictly increasing, got {0:?}")]
    NonMonotonicThresholds([f64; 4]),
    #[error("unrecognised month key '{0}' in monthly factor table")]
    UnknownMonthKey(String),
    #[error("month must be in 1..=12, got {0}")]
    InvalidMonth(u32),
    #[error("month {0} appears more than once in monthly factor table")]
    DuplicateMonth(u32),
    #[error("sample window starts {start} after it ends {end}")]
    InvertedWindow { start: NaiveDate, end: NaiveDate },
    #[error("could not read configuration file {path}: {reason}")]
    Unreadable { path: String, reason: String },
    #[error("could not parse configuration: {0}")]
    Parse(String),
}

/// A concentration that cannot be classified.
#[derive(Debug, Error, PartialEq)]
pub enum InvalidValueError {
    #[error("concentration is not a number")]
    NotANumber,
    #[error("concentration must be non-negative, got {0}")]
    Negative(f64),
}

/// Failure of an operation composed from the threshold model and the
/// classifier.
#[derive(Debug, Error, PartialEq)]
pub enum AnalysisError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    InvalidValue(#[from] InvalidValueError),
}

/// Errors raised while reading sample tables.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("could not read sample table: {0}")]
    Csv(#[from] csv::Error),
    #[error("could not open sample table {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("line {line}: unparseable collection date '{value}'")]
    InvalidDate { line: usize, value: String },
    #[error("line {line}: unknown crop '{value}'")]
    UnknownCrop { line: usize, value: String },
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(n: f64, st: Option<f64>) -> Sample {
        Sample {
            collection_date: NaiveDate::from_ymd_opt(2023, 4, 12).unwrap(),
            treatment_id: Some("N60".to_string()),
            crop: Crop::Citrus,
            nitrogen_value: n,
            starch_value: st,
        }
    }

    #[test]
    fn test_ratio_undefined_without_starch() {
        assert_eq!(sample(2.5, None).nitrogen_starch_ratio(), None);
        assert_eq!(sample(2.5, Some(0.0)).nitrogen_starch_ratio(), None);
    }

    #[test]
    fn test_ratio_defined_with_positive_starch() {
        assert_eq!(sample(2.0, Some(50.0)).nitrogen_starch_ratio(), Some(0.04));
    }

    #[test]
    fn test_status_labels_are_totally_ordered() {
        for pair in StatusLabel::ALL.windows(2) {
            assert!(pair[0] < pair[1], "{} should sort before {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_month_buckets_order_by_year_then_month() {
        let dec_22 = MonthBucket { year: 2022, month: 12 };
        let jan_23 = MonthBucket { year: 2023, month: 1 };
        assert!(dec_22 < jan_23);
        assert_eq!(dec_22.to_string(), "2022-12");
        assert_eq!(
            jan_23.first_day(),
            NaiveDate::from_ymd_opt(2023, 1, 1)
        );
    }

    #[test]
    fn test_month_bucket_ignores_day_of_month() {
        let early = MonthBucket::of(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        let late = MonthBucket::of(NaiveDate::from_ymd_opt(2024, 3, 31).unwrap());
        assert_eq!(early, late);
    }

    #[test]
    fn test_reference_threshold_monotonicity_check() {
        let good = ReferenceThresholds {
            deficient_low: 2.64,
            low_optimum: 2.88,
            optimum_high: 3.24,
            high_excess: 3.48,
        };
        assert!(good.is_strictly_increasing());

        let flat = ReferenceThresholds { low_optimum: 2.64, ..good };
        assert!(!flat.is_strictly_increasing());

        let nan = ReferenceThresholds { high_excess: f64::NAN, ..good };
        assert!(!nan.is_strictly_increasing());
    }

    #[test]
    fn test_crop_from_name_is_case_insensitive() {
        assert_eq!(Crop::from_name("CITRUS"), Some(Crop::Citrus));
        assert_eq!(Crop::from_name(" vine "), Some(Crop::Vine));
        assert_eq!(Crop::from_name("banana"), None);
    }
}
