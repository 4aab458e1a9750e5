/// Min-max rescaling of series to a common 0–100 range.
///
/// N (%), starch (mg/g) and the N/ST ratio have unrelated units; rescaling
/// each over its own range lets their timing be compared on one axis.

/// Output for every element of a constant (or single-element) series.
pub const DEGENERATE_MIDPOINT: f64 = 50.0;

/// Rescales `values` so the minimum maps to 0 and the maximum to 100.
///
/// Min and max are taken over the whole input. A series whose min equals
/// its max maps every element to [`DEGENERATE_MIDPOINT`]. Empty input gives
/// empty output. The constant case compares min and max exactly.
#[allow(clippy::float_cmp)]
pub fn normalize(values: &[f64]) -> Vec<f64> {
    let Some(&first) = values.first() else {
        return Vec::new();
    };
    let (min, max) = values
        .iter()
        .fold((first, first), |(lo, hi), &v| (lo.min(v), hi.max(v)));

    if min == max {
        return vec![DEGENERATE_MIDPOINT; values.len()];
    }

    let span = max - min;
    values.iter().map(|v| (v - min) / span * 100.0).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
