/// Structured logging for the nutrient monitoring core
///
/// Call sites use `tracing` macros with a `stage` field; this module owns
/// subscriber setup (console plus optional append-only log file) and the
/// few helpers that decide the level of recurring events. Skipped buckets
/// and rows are expected data gaps and are only ever logged at DEBUG.

use std::fmt;
use std::fs::OpenOptions;
use std::sync::Mutex;

use tracing::{debug, error, info, warn};
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt as tracing_fmt, Layer, Registry};

use crate::model::{AnalysisError, Sample};

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warning => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline Stages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Ingest,
    Config,
    Aggregate,
    Classify,
    Events,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Ingest => write!(f, "INGEST"),
            Stage::Config => write!(f, "CONFIG"),
            Stage::Aggregate => write!(f, "AGG"),
            Stage::Classify => write!(f, "CLASSIFY"),
            Stage::Events => write!(f, "EVENTS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureType {
    /// Bad value in one sample; the rest of the report is unaffected.
    Expected,
    /// Broken configuration; every sample would fail the same way.
    Unexpected,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Expected => write!(f, "EXPECTED"),
            FailureType::Unexpected => write!(f, "UNEXPECTED"),
        }
    }
}

pub fn classify_failure(err: &AnalysisError) -> FailureType {
    match err {
        AnalysisError::InvalidValue(_) => FailureType::Expected,
        AnalysisError::Configuration(_) => FailureType::Unexpected,
    }
}

// ---------------------------------------------------------------------------
// Subscriber Setup
// ---------------------------------------------------------------------------

/// Initialize the global subscriber.
///
/// `RUST_LOG`, when set, overrides `min_level`. With `console_timestamps`
/// off the console output drops time and target for interactive use; the
/// log file always carries full timestamps. Calling this more than once is
/// harmless: later calls leave the first subscriber in place.
pub fn init_logger(min_level: LogLevel, log_file: Option<&str>, console_timestamps: bool) {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from(min_level).into())
        .from_env_lossy();

    let console: Box<dyn Layer<Registry> + Send + Sync> = if console_timestamps {
        tracing_fmt::layer().with_writer(std::io::stderr).boxed()
    } else {
        tracing_fmt::layer()
            .with_writer(std::io::stderr)
            .without_time()
            .with_target(false)
            .boxed()
    };

    let file_layer = log_file.and_then(|path| {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Some(
                tracing_fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            ),
            Err(e) => {
                eprintln!("Failed to open log file {}: {}", path, e);
                None
            }
        }
    });

    let _ = tracing_subscriber::registry()
        .with(console)
        .with(file_layer)
        .with(filter)
        .try_init();
}

// ---------------------------------------------------------------------------
// Event Helpers
// ---------------------------------------------------------------------------

/// Log a sample that could not be classified and was left out of a report.
pub fn log_rejected_sample(sample: &Sample, err: &AnalysisError) {
    let failure_type = classify_failure(err);
    let treatment = sample.treatment_id.as_deref().unwrap_or("-");
    match failure_type {
        FailureType::Expected => warn!(
            stage = %Stage::Classify,
            treatment,
            date = %sample.collection_date,
            "sample skipped [{}]: {}",
            failure_type,
            err
        ),
        FailureType::Unexpected => error!(
            stage = %Stage::Classify,
            treatment,
            date = %sample.collection_date,
            "sample skipped [{}]: {}",
            failure_type,
            err
        ),
    }
}

/// Log a count of rows or buckets dropped for missing inputs.
pub fn log_skipped(stage: Stage, skipped: usize, reason: &str) {
    if skipped > 0 {
        debug!(stage = %stage, skipped, "{}", reason);
    }
}

/// Log a summary of a stage's accepted / rejected counts.
pub fn log_report_summary(stage: Stage, total: usize, accepted: usize, rejected: usize) {
    let message = format!(
        "{}/{} accepted, {} rejected",
        accepted,
        total,
        rejected
    );

    if rejected == 0 {
        info!(stage = %stage, "{}", message);
    } else if accepted == 0 {
        error!(stage = %stage, "{}", message);
    } else {
        warn!(stage = %stage, "{}", message);
    }
}
