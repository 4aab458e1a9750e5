/// Analysis configuration: reference thresholds, monthly factors, and the
/// canonical treatment order.
///
/// Loaded once from a TOML file (or built from defaults) and passed
/// explicitly to every component; nothing in the core reads ambient state.
///
/// ```toml
/// anchor_month = 10
/// treatment_order = ["N10", "N40", "N60", "N100", "N150"]
///
/// [reference_thresholds]
/// deficient_low = 2.64
/// low_optimum = 2.88
/// optimum_high = 3.24
/// high_excess = 3.48
///
/// [monthly_factors]
/// jan = 1.125
/// feb = 1.081
/// # ... one entry per month, by number ("1") or short name ("jan")
///
/// [window]
/// start = "2022-08-01"
/// end = "2024-08-31"
/// ```

use std::collections::BTreeMap;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::crops::{find_crop, CITRUS_OCTOBER_THRESHOLDS};
use crate::logging::Stage;
use crate::model::{ConfigurationError, Crop, ReferenceThresholds};

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Month the reference thresholds are defined for (October).
pub const DEFAULT_ANCHOR_MONTH: u32 = 10;

/// Seasonal scale factors for citrus leaf N, January through December.
pub const CITRUS_MONTHLY_FACTORS: [f64; 12] = [
    1.125, 1.081, 1.024, 0.993, 0.910, 0.923, 0.973, 1.024, 1.024, 1.000, 1.088, 1.125,
];

/// Nitrogen rate treatments of the NPK experiment, lowest rate first.
pub const DEFAULT_TREATMENT_ORDER: [&str; 5] = ["N10", "N40", "N60", "N100", "N150"];

const MONTH_ABBREVIATIONS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

// ---------------------------------------------------------------------------
// Monthly factor table
// ---------------------------------------------------------------------------

/// Multiplicative threshold scale factor per calendar month.
///
/// The table is meant to be total over 1..=12 with the anchor month at 1.0,
/// but neither is enforced here: completeness is checked by
/// [`AnalysisConfig::validate`] and a lookup for an absent month fails at
/// the point of use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, f64>", into = "BTreeMap<String, f64>")]
pub struct MonthlyFactors(BTreeMap<u32, f64>);

impl MonthlyFactors {
    /// Builds a table from `(month, factor)` pairs. Later duplicates win.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (u32, f64)>) -> Self {
        MonthlyFactors(pairs.into_iter().collect())
    }

    pub fn get(&self, month: u32) -> Option<f64> {
        self.0.get(&month).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, f64)> + '_ {
        self.0.iter().map(|(m, f)| (*m, *f))
    }
}

impl Default for MonthlyFactors {
    fn default() -> Self {
        MonthlyFactors::from_pairs((1..=12).zip(CITRUS_MONTHLY_FACTORS))
    }
}

impl TryFrom<BTreeMap<String, f64>> for MonthlyFactors {
    type Error = ConfigurationError;

    fn try_from(raw: BTreeMap<String, f64>) -> Result<Self, Self::Error> {
        let mut table = BTreeMap::new();
        for (key, factor) in raw {
            let month = parse_month_key(&key)?;
            if table.insert(month, factor).is_some() {
                return Err(ConfigurationError::DuplicateMonth(month));
            }
        }
        Ok(MonthlyFactors(table))
    }
}

impl From<MonthlyFactors> for BTreeMap<String, f64> {
    fn from(factors: MonthlyFactors) -> Self {
        factors.0.into_iter().map(|(m, f)| (m.to_string(), f)).collect()
    }
}

/// Accepts "1".."12" or a three-letter English month name, any case.
pub fn parse_month_key(key: &str) -> Result<u32, ConfigurationError> {
    let trimmed = key.trim();
    if let Ok(month) = trimmed.parse::<u32>() {
        return if (1..=12).contains(&month) {
            Ok(month)
        } else {
            Err(ConfigurationError::InvalidMonth(month))
        };
    }
    let lower = trimmed.to_ascii_lowercase();
    MONTH_ABBREVIATIONS
        .iter()
        .position(|abbr| *abbr == lower)
        .map(|idx| idx as u32 + 1)
        .ok_or_else(|| ConfigurationError::UnknownMonthKey(key.to_string()))
}

// ---------------------------------------------------------------------------
// Sample window
// ---------------------------------------------------------------------------

/// Inclusive collection-date window applied to samples before reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl SampleWindow {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

// ---------------------------------------------------------------------------
// Analysis configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub reference_thresholds: ReferenceThresholds,
    pub anchor_month: u32,
    pub monthly_factors: MonthlyFactors,
    pub treatment_order: Vec<String>,
    pub window: Option<SampleWindow>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig::with_thresholds(CITRUS_OCTOBER_THRESHOLDS)
    }
}

impl AnalysisConfig {
    /// Default seasonal factors and treatment order around the given
    /// anchor-month thresholds.
    pub fn with_thresholds(reference_thresholds: ReferenceThresholds) -> Self {
        AnalysisConfig {
            reference_thresholds,
            anchor_month: DEFAULT_ANCHOR_MONTH,
            monthly_factors: MonthlyFactors::default(),
            treatment_order: DEFAULT_TREATMENT_ORDER.iter().map(|t| t.to_string()).collect(),
            window: None,
        }
    }

    /// Configuration for a registered crop, or `None` if the crop has no
    /// published reference thresholds.
    pub fn for_crop(crop: Crop) -> Option<Self> {
        find_crop(crop)?.thresholds.map(AnalysisConfig::with_thresholds)
    }

    /// Parses and validates a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigurationError> {
        let config: AnalysisConfig =
            toml::from_str(text).map_err(|e| ConfigurationError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks everything a report needs from the configuration.
    ///
    /// Fails on the first problem found. An anchor-month factor other than
    /// 1.0 is suspicious but legal, and is only logged.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !(1..=12).contains(&self.anchor_month) {
            return Err(ConfigurationError::InvalidMonth(self.anchor_month));
        }
        if !self.reference_thresholds.is_strictly_increasing() {
            return Err(ConfigurationError::NonMonotonicThresholds(
                self.reference_thresholds.as_array(),
            ));
        }
        for month in 1..=12 {
            let factor = self
                .monthly_factors
                .get(month)
                .ok_or(ConfigurationError::MissingMonthFactor(month))?;
            if !(factor.is_finite() && factor > 0.0) {
                return Err(ConfigurationError::InvalidFactor { month, factor });
            }
        }
        if let Some(window) = &self.window {
            if window.start > window.end {
                return Err(ConfigurationError::InvertedWindow {
                    start: window.start,
                    end: window.end,
                });
            }
        }
        if let Some(anchor_factor) = self.monthly_factors.get(self.anchor_month) {
            if (anchor_factor - 1.0).abs() > 1e-9 {
                warn!(
                    stage = %Stage::Config,
                    anchor_month = self.anchor_month,
                    factor = anchor_factor,
                    "anchor month factor is not 1.0; thresholds will not match the reference month"
                );
            }
        }
        Ok(())
    }
}

/// Reads, parses, and validates a configuration file.
pub fn load_config(path: &Path) -> Result<AnalysisConfig, ConfigurationError> {
    let text = std::fs::read_to_string(path).map_err(|e| ConfigurationError::Unreadable {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    let config = AnalysisConfig::from_toml_str(&text)?;
    info!(stage = %Stage::Config, path = %path.display(), "loaded analysis configuration");
    Ok(config)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
