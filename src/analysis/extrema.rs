/// Strict interior local extrema of a ratio series.
///
/// A point at index i (1 <= i <= n-2) is a peak iff
/// `y[i] > y[i-1] && y[i] > y[i+1]`, and a trough under the mirrored rule.
///
/// - Equal neighbours never qualify, so a flat top or bottom produces no
///   event instead of one per plateau point.
/// - The first and last points are never reported: the series is an open
///   observation window and the neighbour outside it is unknown.
/// - No prominence, height, or distance filter is applied. On short monthly
///   series this is noise-sensitive; a prominence-aware detector would give
///   different events and must be introduced as a separate detector rather
///   than by changing this one.
/// - Fewer than three points yields no events.

use crate::model::{ExtremumEvent, ExtremumKind, RatioSeries};

/// Indices of strict interior local maxima.
pub fn local_maxima(values: &[f64]) -> Vec<usize> {
    interior_indices(values, |prev, here, next| here > prev && here > next)
}

/// Indices of strict interior local minima.
pub fn local_minima(values: &[f64]) -> Vec<usize> {
    interior_indices(values, |prev, here, next| here < prev && here < next)
}

fn interior_indices(values: &[f64], is_extremum: impl Fn(f64, f64, f64) -> bool) -> Vec<usize> {
    if values.len() < 3 {
        return Vec::new();
    }
    values
        .windows(3)
        .enumerate()
        .filter(|(_, w)| is_extremum(w[0], w[1], w[2]))
        .map(|(i, _)| i + 1)
        .collect()
}

fn events(series: &RatioSeries, indices: Vec<usize>, kind: ExtremumKind) -> Vec<ExtremumEvent> {
    indices
        .into_iter()
        .map(|index| {
            let point = series.points[index];
            ExtremumEvent {
                index,
                month: point.month,
                value: point.ratio,
                kind,
            }
        })
        .collect()
}

/// Every strict interior local maximum of the series.
pub fn find_peaks(series: &RatioSeries) -> Vec<ExtremumEvent> {
    events(series, local_maxima(&series.values()), ExtremumKind::Peak)
}

/// Every strict interior local minimum of the series.
pub fn find_troughs(series: &RatioSeries) -> Vec<ExtremumEvent> {
    events(series, local_minima(&series.values()), ExtremumKind::Trough)
}

/// Peaks and troughs together, ordered by position in the series.
pub fn find_extrema(series: &RatioSeries) -> Vec<ExtremumEvent> {
    let mut all = find_peaks(series);
    all.extend(find_troughs(series));
    all.sort_by_key(|e| e.index);
    all
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
