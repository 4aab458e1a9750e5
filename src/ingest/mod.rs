/// Sample table ingest.
///
/// Submodules:
/// - `npk`: laboratory CSV export of the nitrogen rate experiment.

pub mod npk;
