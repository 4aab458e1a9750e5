/// Nutrient status classification.
///
/// Submodules:
/// - `seasonal`: scales anchor-month reference thresholds to a given month.
/// - `bands`: maps a concentration onto one of the five status labels.

pub mod bands;
pub mod seasonal;

pub use bands::classify;
pub use seasonal::SeasonalThresholdModel;
