/// Leaf nutrient monitoring core.
///
/// Seasonal nitrogen status classification and N/ST ratio event detection
/// for monthly leaf samples of a nitrogen rate experiment.

pub mod analysis;
pub mod config;
pub mod crops;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod report;
pub mod status;

pub use config::{load_config, AnalysisConfig};
pub use model::{AnalysisError, ConfigurationError, IngestError, InvalidValueError, Sample, StatusLabel};
pub use report::{NutrientAnalyzer, NutrientReport};
