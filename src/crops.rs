/// Crop registry for the leaf nutrient monitoring core.
///
/// Defines the crops the sampling program covers, the sample-ID prefixes
/// the laboratory uses for each, and the anchor-month leaf nitrogen
/// reference thresholds where one has been published. This is the single
/// source of truth for crop metadata; other modules should look crops up
/// here rather than hardcoding prefixes.

use crate::model::{Crop, ReferenceThresholds};

// ---------------------------------------------------------------------------
// Crop metadata
// ---------------------------------------------------------------------------

/// Metadata for a single crop.
pub struct CropInfo {
    pub crop: Crop,
    /// Lower-case prefix of laboratory sample IDs, e.g. "cit" for CIT-GIL-20230412-07.
    pub id_prefix: &'static str,
    /// Human-readable description of the crop's role in the program.
    pub description: &'static str,
    /// Anchor-month (October) leaf N reference thresholds, if defined.
    /// Only citrus has a published reference; other crops are sampled for
    /// spectral work and are not classified.
    pub thresholds: Option<ReferenceThresholds>,
}

/// UC Davis October leaf N thresholds for citrus, scaled by 1.2.
pub const CITRUS_OCTOBER_THRESHOLDS: ReferenceThresholds = ReferenceThresholds {
    deficient_low: 2.64,
    low_optimum: 2.88,
    optimum_high: 3.24,
    high_excess: 3.48,
};

/// All crops in the sampling program.
pub static CROP_REGISTRY: &[CropInfo] = &[
    CropInfo {
        crop: Crop::Citrus,
        id_prefix: "cit",
        description: "Primary crop of the nitrogen rate experiment \
                      (five N treatments, monthly leaf sampling).",
        thresholds: Some(CITRUS_OCTOBER_THRESHOLDS),
    },
    CropInfo {
        crop: Crop::Almond,
        id_prefix: "alm",
        description: "Orchard survey samples; no seasonal reference available.",
        thresholds: None,
    },
    CropInfo {
        crop: Crop::Avocado,
        id_prefix: "avo",
        description: "Orchard survey samples; no seasonal reference available.",
        thresholds: None,
    },
    CropInfo {
        crop: Crop::Vine,
        id_prefix: "vin",
        description: "Vineyard survey samples; no seasonal reference available.",
        thresholds: None,
    },
];

/// Looks up a crop's registry entry. Every `Crop` variant has one.
pub fn find_crop(crop: Crop) -> Option<&'static CropInfo> {
    CROP_REGISTRY.iter().find(|c| c.crop == crop)
}

/// Infers the crop from a laboratory sample ID by its prefix,
/// case-insensitively. Returns `None` for unrecognised IDs.
pub fn crop_from_sample_id(id: &str) -> Option<Crop> {
    let lower = id.trim().to_ascii_lowercase();
    CROP_REGISTRY
        .iter()
        .find(|c| lower.starts_with(c.id_prefix))
        .map(|c| c.crop)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
