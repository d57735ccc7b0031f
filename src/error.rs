use std::{io, path::PathBuf, time::Duration};

/// Errors produced while recording, reporting, or polling.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),
    #[error("failed to draw chart {path:?}: {message}")]
    Plot { path: PathBuf, message: String },
    #[error("{path:?} line {line}: expected at least {expected} fields, found {found}")]
    MalformedLog {
        path: PathBuf,
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("history table {path:?} is malformed: {reason}")]
    MalformedHistory { path: PathBuf, reason: String },
    #[error("template directory {0:?} does not contain benchmark-results-plot.html")]
    MissingTemplate(PathBuf),
    #[error("unknown option type {0:?}; expected one of str, int, float")]
    UnknownOptionType(String),
    #[error("invalid option description {0:?}")]
    InvalidOptionSpec(String),
    #[error("no accelerator devices available: {0}")]
    AcceleratorUnavailable(String),
    #[error("scheduler file {path:?} is unusable: {reason}")]
    SchedulerFile { path: PathBuf, reason: String },
    #[error("gave up after {waited:?}: expected {expected} workers, last saw {seen}")]
    WaitTimeout {
        expected: usize,
        seen: usize,
        waited: Duration,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
