use std::{error::Error, path::PathBuf, time::Duration};

use clap::Parser;
use env_logger::Env;
use nightly_bench::workers::{self, WaitPolicy};

/// Blocks until the cluster behind a scheduler file has at least the expected number of workers.
#[derive(Parser, Debug)]
pub struct Cli {
    /// The number of workers to wait for.
    pub expected_workers: usize,
    /// The scheduler file written by the cluster's scheduler.
    pub scheduler_file: PathBuf,
    /// Seconds to sleep between polls.
    #[arg(long, default_value = "5")]
    pub interval_secs: u64,
    /// If specified, gives up after this many seconds.
    #[arg(long)]
    pub timeout_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let args = Cli::parse();

    let url = workers::counts_url(&args.scheduler_file)?;
    let policy = WaitPolicy {
        expected: args.expected_workers,
        interval: Duration::from_secs(args.interval_secs),
        timeout: args.timeout_secs.map(Duration::from_secs),
    };
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()?;

    let (client, url) = (&client, url.as_str());
    workers::wait_for_workers(&policy, move || workers::query_worker_count(client, url)).await?;
    Ok(())
}
