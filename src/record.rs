use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{
    error::{Error, Result},
    history::{HistoryTable, RecordOutcome},
    metadata,
    report::ReportRenderer,
    results::{self, LogLayout},
};

/// The per-configuration result log written by the nightly benchmark run.
pub const RESULTS_FILE: &str = "pytest-results.txt";
/// Configuration directories are named like "2-GPU", "8-GPU".
pub const RUN_SUFFIX: &str = "-GPU";

/// Everything one recording pass needs; built once by the binary.
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    /// The "latest" results root, e.g. `.../latest` pointing at `.../20231101_040001_UTC`.
    pub latest_results: PathBuf,
    pub template_dir: PathBuf,
    pub run_date: String,
    pub layout: LogLayout,
    pub window: usize,
    pub write_metadata: bool,
}

impl RecorderConfig {
    /// `<latest>/benchmarks`, holding one directory per configuration.
    pub fn bench_dir(&self) -> PathBuf {
        self.latest_results.join("benchmarks")
    }

    /// `<latest>/benchmarks/results`, holding history tables and reports.
    pub fn results_dir(&self) -> PathBuf {
        self.bench_dir().join("results")
    }
}

/// The run date is the name of the directory `latest` resolves to.
pub fn run_date_of(latest_results: &Path) -> Result<String> {
    let resolved = fs::canonicalize(latest_results)?;
    resolved
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("{:?} has no directory name", resolved),
            ))
        })
}

/// What happened to one configuration's history this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunUpdate {
    Recorded(RecordOutcome),
    /// No result log this run.
    NoResults,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub updated: Vec<String>,
    pub skipped: Vec<String>,
    pub reports: Vec<PathBuf>,
    pub metadata: Option<PathBuf>,
    /// `(configuration or step, error)` for everything that was isolated and logged.
    pub failures: Vec<(String, String)>,
}

/// Configuration names under `bench_dir`, in name order.
pub fn discover_runs(bench_dir: &Path) -> Result<Vec<String>> {
    let mut runs = vec![];
    for entry in fs::read_dir(bench_dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.ends_with(RUN_SUFFIX) && entry.path().is_dir() {
            runs.push(name);
        }
    }
    runs.sort();
    Ok(runs)
}

/// Parses one configuration's result log and appends it to its history table.
pub fn record_run(config: &RecorderConfig, run_type: &str) -> Result<RunUpdate> {
    let results_file = config.bench_dir().join(run_type).join(RESULTS_FILE);
    if !results_file.is_file() {
        return Ok(RunUpdate::NoResults);
    }
    let row = results::parse_results(&results_file, &config.run_date, config.layout)?;
    let output = config.results_dir().join(format!("{}.csv", run_type));
    let outcome = HistoryTable::record(&output, row)?;
    Ok(RunUpdate::Recorded(outcome))
}

/// Every history table in `results_dir`, in name order.
pub fn history_files(results_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(results_dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && path.extension().map_or(false, |ext| ext == "csv"))
        .collect();
    files.sort();
    Ok(files)
}

/// Records every configuration found under the results root, then regenerates every report.
///
/// Failures are isolated per configuration. Only an unusable results root is an error.
pub fn run(config: &RecorderConfig) -> Result<RunSummary> {
    let results_dir = config.results_dir();
    fs::create_dir_all(&results_dir)?;
    let mut summary = RunSummary::default();

    if config.write_metadata {
        match metadata::write_metadata(&results_dir) {
            Ok(path) => summary.metadata = Some(path),
            Err(e) => {
                log::warn!("Could not write run metadata: {}", e);
                summary.failures.push(("metadata".to_string(), e.to_string()));
            }
        }
    }

    for run_type in discover_runs(&config.bench_dir())? {
        match record_run(config, &run_type) {
            Ok(RunUpdate::Recorded(RecordOutcome::Created)) => {
                log::info!(
                    "Creating a new results file for {} on {}",
                    run_type,
                    config.run_date
                );
                summary.updated.push(run_type);
            }
            Ok(RunUpdate::Recorded(RecordOutcome::Appended { rows })) => {
                log::info!(
                    "Appended {} results for {} ({} runs)",
                    config.run_date,
                    run_type,
                    rows
                );
                summary.updated.push(run_type);
            }
            Ok(RunUpdate::NoResults) => {
                log::info!("No {} for {}, skipping", RESULTS_FILE, run_type);
                summary.skipped.push(run_type);
            }
            Err(e) => {
                log::error!("Failed to record results for {}: {}", run_type, e);
                summary.failures.push((run_type, e.to_string()));
            }
        }
    }

    let renderer = match ReportRenderer::from_template_dir(&config.template_dir, config.window) {
        Ok(renderer) => renderer,
        Err(e) => {
            log::error!("Cannot render reports: {}", e);
            summary.failures.push(("report".to_string(), e.to_string()));
            return Ok(summary);
        }
    };

    for file in history_files(&results_dir)? {
        let run_type = file
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let rendered = HistoryTable::load(&file)
            .and_then(|table| renderer.render(&run_type, &table, &results_dir));
        match rendered {
            Ok(page) => {
                log::info!("Rendered report for {} at {:?}", run_type, page);
                summary.reports.push(page);
            }
            Err(e) => {
                log::error!("Failed to render report for {}: {}", run_type, e);
                summary.failures.push((run_type, e.to_string()));
            }
        }
    }

    Ok(summary)
}
