/// Monthly aggregation and derived-series analysis.
///
/// Everything here is a pure function over in-memory samples or buckets;
/// there is no I/O and no shared state, so independent reports can be
/// computed side by side without coordination.
///
/// Submodules:
/// - `groupings`: date windows and (treatment, month) bucket means.
/// - `ratio`: N/ST ratio series from buckets.
/// - `normalize`: min-max rescaling to 0–100 for display.
/// - `extrema`: strict interior peaks and troughs.
/// - `summary`: descriptive per-treatment / per-year statistics.

pub mod extrema;
pub mod groupings;
pub mod normalize;
pub mod ratio;
pub mod summary;
