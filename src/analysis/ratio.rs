/// N/ST ratio series.
///
/// The ratio of mean leaf nitrogen to mean starch rises as starch reserves
/// are mobilised for growth, which is the signal used to time fertilization.
///
/// # Incomplete buckets
/// A bucket whose starch mean is missing or zero (or whose nitrogen mean is
/// missing) has no ratio and is left out of the series entirely. Gaps are
/// not zero-filled or interpolated: either would invent a value that the
/// extremum detector could then report as an event. Consumers must not
/// assume consecutive points are one month apart.

use tracing::debug;

use crate::model::{AggregateBucket, RatioPoint, RatioSeries};

/// The bucket's N/ST ratio, if both means are present and starch is positive.
pub fn bucket_ratio(bucket: &AggregateBucket) -> Option<f64> {
    match (bucket.mean_nitrogen, bucket.mean_starch) {
        (Some(n), Some(st)) if st > 0.0 => Some(n / st),
        _ => None,
    }
}

/// Builds the ratio series from buckets, preserving their order.
///
/// Callers pass the buckets of a single treatment, already sorted by month
/// (as produced by `groupings::aggregate`). The series takes its treatment
/// from the first bucket.
pub fn ratio_series(buckets: &[AggregateBucket]) -> RatioSeries {
    let treatment_id = buckets.first().and_then(|b| b.treatment_id.clone());
    let mut points = Vec::with_capacity(buckets.len());

    for bucket in buckets {
        match bucket_ratio(bucket) {
            Some(ratio) => points.push(RatioPoint {
                month: bucket.month,
                ratio,
            }),
            None => debug!(
                treatment = ?bucket.treatment_id,
                month = %bucket.month,
                "no N/ST ratio for bucket; omitted from series"
            ),
        }
    }

    RatioSeries {
        treatment_id,
        points,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
