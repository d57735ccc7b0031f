use std::{
    collections::HashMap,
    fs,
    future::Future,
    path::Path,
    time::{Duration, Instant},
};

use crate::error::{Error, Result};

/// The subset of a scheduler file needed to reach the scheduler dashboard.
#[derive(Debug, serde::Deserialize)]
struct SchedulerFile {
    address: String,
    #[serde(default)]
    services: HashMap<String, u16>,
}

#[derive(Debug, serde::Deserialize)]
struct Counts {
    workers: usize,
}

/// How long to wait, and for how many workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub expected: usize,
    pub interval: Duration,
    /// `None` waits forever.
    pub timeout: Option<Duration>,
}

/// Reads a scheduler file and returns the dashboard URL that reports worker counts.
pub fn counts_url(scheduler_file: &Path) -> Result<String> {
    let contents = fs::read_to_string(scheduler_file)?;
    counts_url_from_str(&contents, scheduler_file)
}

pub fn counts_url_from_str(contents: &str, origin: &Path) -> Result<String> {
    let invalid = |reason: String| Error::SchedulerFile {
        path: origin.to_path_buf(),
        reason,
    };
    let scheduler: SchedulerFile = serde_json::from_str(contents)?;
    let dashboard = scheduler
        .services
        .get("dashboard")
        .ok_or_else(|| invalid("no dashboard service listed".to_string()))?;
    // e.g. "tcp://10.33.227.161:8786" or "ucx://[fe80::1]:8786"
    let host_port = scheduler
        .address
        .split_once("://")
        .map_or(scheduler.address.as_str(), |(_, rest)| rest);
    let (host, _) = host_port
        .rsplit_once(':')
        .ok_or_else(|| invalid(format!("no port in address {:?}", scheduler.address)))?;
    Ok(format!("http://{}:{}/json/counts.json", host, dashboard))
}

/// Asks the scheduler dashboard how many workers are connected.
pub async fn query_worker_count(client: &reqwest::Client, url: &str) -> Result<usize> {
    let counts: Counts = client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    Ok(counts.workers)
}

/// Polls `query` until it reports at least `policy.expected` workers.
///
/// Failed queries are logged and retried after the same interval as a short count.
pub async fn wait_for_workers<F, Fut>(policy: &WaitPolicy, mut query: F) -> Result<usize>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<usize>>,
{
    let start = Instant::now();
    let mut seen = 0;
    loop {
        match query().await {
            Ok(n) if n >= policy.expected => {
                log::info!("Got {} workers, done.", n);
                return Ok(n);
            }
            Ok(n) => {
                seen = n;
                log::info!("Expected {} but got {}, waiting...", policy.expected, n);
            }
            Err(e) => log::warn!("Could not query the scheduler: {}", e),
        }
        if let Some(timeout) = policy.timeout {
            let waited = start.elapsed();
            if waited >= timeout {
                return Err(Error::WaitTimeout {
                    expected: policy.expected,
                    seen,
                    waited,
                });
            }
        }
        tokio::time::sleep(policy.interval).await;
    }
}
