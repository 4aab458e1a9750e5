// Command-line report over an NPK sample table.
//
// Usage:
//   nutrimon <samples.csv> [config.toml]
//
// Without a config argument, NUTRIMON_CONFIG (from the environment or .env)
// is used; failing that, the built-in citrus defaults. NUTRIMON_LOG_FILE
// adds an append-only log file. The report is printed as JSON on stdout.

use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use tracing::error;

use nutrimon::ingest::npk::load_samples_from_path;
use nutrimon::logging::{init_logger, LogLevel};
use nutrimon::model::Crop;
use nutrimon::{load_config, AnalysisConfig, NutrientAnalyzer};

fn run(samples_path: &Path, config_path: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let config = match config_path {
        Some(path) => load_config(&path)?,
        None => AnalysisConfig::default(),
    };
    let analyzer = NutrientAnalyzer::new(config)?;

    let table = load_samples_from_path(samples_path, Crop::Citrus)?;
    let report = analyzer.build_report(&table.samples)?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let log_file = env::var("NUTRIMON_LOG_FILE").ok();
    init_logger(LogLevel::Info, log_file.as_deref(), false);

    let mut args = env::args().skip(1);
    let Some(samples_path) = args.next().map(PathBuf::from) else {
        eprintln!("usage: nutrimon <samples.csv> [config.toml]");
        return ExitCode::from(2);
    };
    let config_path = args
        .next()
        .or_else(|| env::var("NUTRIMON_CONFIG").ok())
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from);

    match run(&samples_path, config_path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
