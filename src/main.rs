use std::{error::Error, path::PathBuf};

use clap::Parser;
use env_logger::Env;
use nightly_bench::{
    record::{self, RecorderConfig},
    report::DEFAULT_WINDOW,
    results::LogLayout,
};

/// Appends tonight's benchmark results to each configuration's history and regenerates the reports.
#[derive(Parser, Debug)]
pub struct Cli {
    /// The latest results directory. The name of the directory it resolves to is the run date.
    #[arg(long = "latest-results")]
    pub results_dir: PathBuf,
    /// Directory containing the benchmark-results-plot.html template.
    #[arg(long)]
    pub template_dir: PathBuf,
    /// Zero-based field of the test id in each result log line.
    #[arg(long, default_value = "2")]
    pub name_field: usize,
    /// Zero-based field of the PASSED/FAILED/SKIPPED status.
    #[arg(long, default_value = "1")]
    pub status_field: usize,
    /// Zero-based field of the duration.
    #[arg(long, default_value = "3")]
    pub value_field: usize,
    /// How many trailing runs to average in the report.
    #[arg(long, default_value_t = DEFAULT_WINDOW)]
    pub window: usize,
    /// If specified, does not write meta.yaml.
    #[arg(long)]
    pub skip_metadata: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let args = Cli::parse();

    let config = RecorderConfig {
        run_date: record::run_date_of(&args.results_dir)?,
        latest_results: args.results_dir,
        template_dir: args.template_dir,
        layout: LogLayout {
            status: args.status_field,
            name: args.name_field,
            value: args.value_field,
        },
        window: args.window,
        write_metadata: !args.skip_metadata,
    };

    let summary = record::run(&config)?;
    log::info!(
        "Recorded {} configurations, skipped {}, rendered {} reports, {} failures",
        summary.updated.len(),
        summary.skipped.len(),
        summary.reports.len(),
        summary.failures.len()
    );
    Ok(())
}
