/// NPK experiment sample table (CSV)
///
/// Reads the laboratory export of the nitrogen rate experiment into
/// [`Sample`]s. Expected columns (extra columns are ignored):
///
/// | column        | meaning                                   |
/// |---------------|-------------------------------------------|
/// | `parsed_date` | collection date, `YYYY-MM-DD[ HH:MM:SS]`  |
/// | `treatment`   | treatment ID, e.g. `N60`; may be empty    |
/// | `N_Value`     | leaf nitrogen, % dry weight               |
/// | `ST_Value`    | leaf starch, mg/g; may be empty           |
/// | `ID`          | optional laboratory sample ID             |
/// | `crop`        | optional crop name                        |

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use tracing::info;

use crate::crops::crop_from_sample_id;
use crate::logging::{log_skipped, Stage};
use crate::model::{Crop, IngestError, Sample};

// ============================================================================
// Row Structures
// ============================================================================

#[derive(Debug, Deserialize)]
struct NpkRow {
    #[serde(rename = "ID", default)]
    id: Option<String>,
    #[serde(default)]
    crop: Option<String>,
    parsed_date: String,
    #[serde(default)]
    treatment: Option<String>,
    // Placeholders such as "-" or "n/a" read as missing rather than failing the table.
    #[serde(rename = "N_Value", default, deserialize_with = "csv::invalid_option")]
    n_value: Option<f64>,
    #[serde(rename = "ST_Value", default, deserialize_with = "csv::invalid_option")]
    st_value: Option<f64>,
}

/// Samples read from one table, with the count of rows left out.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleTable {
    pub samples: Vec<Sample>,
    pub rows_read: usize,
    /// Rows without a usable nitrogen value.
    pub rows_skipped: usize,
}

// ============================================================================
// Parsing
// ============================================================================

/// Parses a collection date, accepting a bare date or a date-time.
pub fn parse_collection_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"]
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
                .map(|dt| dt.date())
        })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn resolve_crop(row: &NpkRow, line: usize, default_crop: Crop) -> Result<Crop, IngestError> {
    if let Some(name) = row.crop.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        return Crop::from_name(name).ok_or_else(|| IngestError::UnknownCrop {
            line,
            value: name.to_string(),
        });
    }
    Ok(row
        .id
        .as_deref()
        .and_then(crop_from_sample_id)
        .unwrap_or(default_crop))
}

/// Reads a sample table from any CSV source.
///
/// Fails on the first malformed row (bad date, unknown crop, broken CSV).
/// Rows whose nitrogen value is missing or not finite are skipped and
/// counted; a missing or non-finite starch value is kept as `None`.
pub fn load_samples<R: Read>(reader: R, default_crop: Crop) -> Result<SampleTable, IngestError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = csv_reader.headers()?.clone();

    let mut samples = Vec::new();
    let mut rows_read = 0;
    let mut rows_skipped = 0;

    for result in csv_reader.records() {
        let record = result?;
        rows_read += 1;
        let line = record.position().map(|p| p.line() as usize).unwrap_or(rows_read + 1);
        let row: NpkRow = record.deserialize(Some(&headers))?;

        let collection_date =
            parse_collection_date(&row.parsed_date).ok_or_else(|| IngestError::InvalidDate {
                line,
                value: row.parsed_date.clone(),
            })?;

        let Some(nitrogen_value) = row.n_value.filter(|v| v.is_finite()) else {
            rows_skipped += 1;
            continue;
        };

        let crop = resolve_crop(&row, line, default_crop)?;
        samples.push(Sample {
            collection_date,
            treatment_id: non_empty(row.treatment),
            crop,
            nitrogen_value,
            starch_value: row.st_value.filter(|v| v.is_finite()),
        });
    }

    log_skipped(Stage::Ingest, rows_skipped, "rows without a nitrogen value skipped");
    info!(
        stage = %Stage::Ingest,
        rows = rows_read,
        samples = samples.len(),
        "loaded sample table"
    );

    Ok(SampleTable {
        samples,
        rows_read,
        rows_skipped,
    })
}

/// Opens and reads a sample table from disk.
pub fn load_samples_from_path(path: &Path, default_crop: Crop) -> Result<SampleTable, IngestError> {
    let file = File::open(path).map_err(|source| IngestError::Io {
        path: path.display().to_string(),
        source,
    })?;
    load_samples(file, default_crop)
}

// ============================================================================
// Tests
// ============================================================================
