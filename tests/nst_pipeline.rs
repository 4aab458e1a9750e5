/// Integration tests for the N/ST ratio pipeline
///
/// Tests verify:
/// 1. CSV sample table → report, end to end
/// 2. Incomplete buckets dropped from ratio series, not zero-filled
/// 3. Peak / trough detection on monthly ratio series
/// 4. Normalized display series and pooled comparison
/// 5. Config file (with sample window) driving a report
///
/// Run with: cargo test --test nst_pipeline

use std::io::Write;

use approx::assert_abs_diff_eq;
use serde_json::Value;

use nutrimon::analysis::normalize::{normalize, DEGENERATE_MIDPOINT};
use nutrimon::ingest::npk::load_samples;
use nutrimon::model::{Crop, ExtremumKind, MonthBucket};
use nutrimon::{load_config, AnalysisConfig, NutrientAnalyzer, Sample, StatusLabel};

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

const NPK_TABLE: &str = "\
ID,parsed_date,treatment,N_Value,ST_Value
CIT-1,2024-01-09,N60,2.0,0
CIT-2,2024-02-13,N60,2.0,50
CIT-3,2023-09-05,N10,3.0,100
CIT-4,2023-10-03,N10,2.9,40
CIT-5,2023-10-17,N10,3.1,60
CIT-6,2023-11-07,N10,3.0,80
CIT-7,2023-12-05,N10,3.0,40
CIT-8,2024-01-09,N10,3.0,60
CIT-9,2023-10-03,N60,-0.5,70
CIT-10,2023-10-03,N60,,70
";

fn samples() -> Vec<Sample> {
    load_samples(NPK_TABLE.as_bytes(), Crop::Citrus)
        .expect("table should parse")
        .samples
}

fn analyzer() -> NutrientAnalyzer {
    NutrientAnalyzer::new(AnalysisConfig::default()).expect("default config is valid")
}

fn month(year: i32, month: u32) -> MonthBucket {
    MonthBucket { year, month }
}

// ---------------------------------------------------------------------------
// Ratio series
// ---------------------------------------------------------------------------

#[test]
fn test_zero_starch_month_is_omitted() {
    let series = analyzer().build_ratio_series(&samples(), Some("N60"));
    // Jan has ST = 0 and is dropped; Oct has no usable N.
    assert_eq!(series.len(), 1);
    assert_eq!(series.points[0].month, month(2024, 2));
    assert_abs_diff_eq!(series.points[0].ratio, 0.04, epsilon = 1e-12);
}

#[test]
fn test_same_month_samples_are_averaged() {
    let series = analyzer().build_ratio_series(&samples(), Some("N10"));
    let months: Vec<MonthBucket> = series.points.iter().map(|p| p.month).collect();
    assert_eq!(
        months,
        vec![
            month(2023, 9),
            month(2023, 10),
            month(2023, 11),
            month(2023, 12),
            month(2024, 1)
        ]
    );
    // October: mean N 3.0, mean ST 50.
    assert_abs_diff_eq!(series.points[1].ratio, 0.06, epsilon = 1e-12);
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[test]
fn test_alternating_ratio_yields_peaks_and_trough() {
    let a = analyzer();
    let series = a.build_ratio_series(&samples(), Some("N10"));
    let events = a.detect_events(&series);

    let summary: Vec<(MonthBucket, ExtremumKind)> = events.iter().map(|e| (e.month, e.kind)).collect();
    assert_eq!(
        summary,
        vec![
            (month(2023, 10), ExtremumKind::Peak),
            (month(2023, 11), ExtremumKind::Trough),
            (month(2023, 12), ExtremumKind::Peak),
        ]
    );
    // The September start and January end are never reported.
    assert!(events.iter().all(|e| e.index > 0 && e.index < series.len() - 1));
}

#[test]
fn test_short_series_has_no_events() {
    let a = analyzer();
    let series = a.build_ratio_series(&samples(), Some("N60"));
    assert!(series.len() < 3);
    assert!(a.detect_events(&series).is_empty());
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

#[test]
fn test_normalized_ratio_spans_zero_to_hundred() {
    let a = analyzer();
    let series = a.build_ratio_series(&samples(), Some("N10"));
    let values: Vec<f64> = a
        .normalize_for_display(&series)
        .points
        .iter()
        .map(|p| p.value)
        .collect();

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    assert_abs_diff_eq!(min, 0.0);
    assert_abs_diff_eq!(max, 100.0, epsilon = 1e-9);
    // Dec (ratio 0.075) is the maximum.
    assert_abs_diff_eq!(values[3], 100.0, epsilon = 1e-9);
}

#[test]
fn test_constant_series_maps_to_midpoint() {
    assert_eq!(normalize(&[0.7]), vec![DEGENERATE_MIDPOINT]);
    assert_eq!(normalize(&[2.0, 2.0, 2.0]), vec![50.0, 50.0, 50.0]);
    assert!(normalize(&[]).is_empty());
}

// ---------------------------------------------------------------------------
// Full report
// ---------------------------------------------------------------------------

#[test]
fn test_report_from_csv() {
    let report = analyzer().build_report(&samples()).expect("report should build");

    // Ten rows, one skipped at ingest for missing N.
    assert_eq!(report.sample_count, 9);
    // The negative nitrogen value is rejected, not fatal.
    assert_eq!(report.sample_status.rejected, 1);
    let classified: usize = report.sample_status.counts.values().sum();
    assert_eq!(classified, 8);
    // N 2.0 in Jan/Feb is below the deficient boundary in both months;
    // N 3.0 is Optimum in Sep/Oct but Low under the higher winter bounds.
    assert_eq!(report.sample_status.counts[&StatusLabel::Deficient], 2);
    assert_eq!(report.sample_status.counts[&StatusLabel::Optimum], 3);
    assert_eq!(report.sample_status.counts[&StatusLabel::Low], 3);

    let ids: Vec<Option<&str>> = report.treatments.iter().map(|t| t.treatment_id.as_deref()).collect();
    assert_eq!(ids, vec![Some("N10"), Some("N60")]);
    assert_eq!(report.treatments[0].events.len(), 3);

    let summaries: Vec<&str> = report.summaries.iter().map(|s| s.group.as_str()).collect();
    assert_eq!(summaries, vec!["N10", "N60"]);
}

#[test]
fn test_report_serializes_months_as_text() {
    let report = analyzer().build_report(&samples()).unwrap();
    let json: Value = serde_json::to_value(&report).expect("report should serialize");

    assert_eq!(json["treatments"][0]["ratio_series"]["points"][0]["month"], "2023-09");
    assert_eq!(json["treatments"][0]["events"][0]["kind"], "Peak");
    assert_eq!(json["comparison"][0]["month"], "2023-09");
    assert!(json["sample_status"]["counts"]["Optimum"].is_number());
    assert_eq!(json["monthly_thresholds"].as_array().map(Vec::len), Some(12));
}

#[test]
fn test_config_file_window_limits_report() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(
        br#"
anchor_month = 10

[window]
start = "2023-10-01"
end = "2023-12-31"
"#,
    )
    .expect("write config");

    let config = load_config(file.path()).expect("config should load");
    let report = NutrientAnalyzer::new(config).unwrap().build_report(&samples()).unwrap();

    // Oct (2 N10 + 1 N60), Nov, Dec.
    assert_eq!(report.sample_count, 5);
    let n10 = &report.treatments[0];
    assert_eq!(n10.ratio_series.len(), 3);
    assert_eq!(n10.events.len(), 1);
    assert_eq!(n10.events[0].kind, ExtremumKind::Trough);
}
