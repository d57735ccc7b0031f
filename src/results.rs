use std::{fs, path::Path};

use crate::{
    error::{Error, Result},
    history::{Cell, ResultRow, FAILED, SKIPPED},
};

/// Zero-based positions of the interesting fields in a whitespace-separated result log line.
///
/// The default matches the pytest results file written by the nightly scripts:
/// `<index> <status> <test-id> <duration>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogLayout {
    pub status: usize,
    pub name: usize,
    pub value: usize,
}

impl Default for LogLayout {
    fn default() -> Self {
        LogLayout {
            status: 1,
            name: 2,
            value: 3,
        }
    }
}

impl LogLayout {
    fn min_fields(&self) -> usize {
        self.status.max(self.name).max(self.value) + 1
    }
}

/// Reads a result log into a single row dated `run_date`.
pub fn parse_results(path: &Path, run_date: &str, layout: LogLayout) -> Result<ResultRow> {
    let text = fs::read_to_string(path)?;
    parse_results_str(&text, path, run_date, layout)
}

/// Like [`parse_results`], for log text already in memory. `origin` is only used for errors.
pub fn parse_results_str(
    text: &str,
    origin: &Path,
    run_date: &str,
    layout: LogLayout,
) -> Result<ResultRow> {
    let mut row = ResultRow::new(run_date);
    for (i, line) in text.lines().enumerate() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.is_empty() {
            continue;
        }
        if fields.len() < layout.min_fields() {
            return Err(Error::MalformedLog {
                path: origin.to_path_buf(),
                line: i + 1,
                expected: layout.min_fields(),
                found: fields.len(),
            });
        }
        // A failed or skipped test still reports a duration; the status wins.
        let cell = match fields[layout.status] {
            FAILED => Cell::Failed,
            SKIPPED => Cell::Skipped,
            _ => Cell::parse(fields[layout.value]),
        };
        row.set(fields[layout.name], cell);
    }
    Ok(row)
}

#[cfg(test)]
mod test {
    use std::path::PathBuf;

    use super::*;

    fn origin() -> PathBuf {
        PathBuf::from("pytest-results.txt")
    }

    #[test]
    fn test_statuses_override_durations() {
        let log = "\
0 PASSED ./bench_algos.py::test_bfs[ds:karate] 0.5
1 FAILED ./bench_algos.py::test_sssp[ds:karate] 12.0
2 SKIPPED ./bench_algos.py::test_wcc[ds:karate] 0
";
        let row = parse_results_str(log, &origin(), "20231101_040001_UTC", LogLayout::default())
            .unwrap();
        assert_eq!(row.date, "20231101_040001_UTC");
        assert_eq!(
            row.cells,
            vec![
                (
                    "./bench_algos.py::test_bfs[ds:karate]".to_string(),
                    Cell::Value("0.5".to_string())
                ),
                ("./bench_algos.py::test_sssp[ds:karate]".to_string(), Cell::Failed),
                ("./bench_algos.py::test_wcc[ds:karate]".to_string(), Cell::Skipped),
            ]
        );
    }

    #[test]
    fn test_custom_layout_and_blank_lines() {
        let layout = LogLayout {
            name: 0,
            status: 1,
            value: 2,
        };
        let log = "testA pass 0.5\n\n   \ntestB FAILED 0\n";
        let row = parse_results_str(log, &origin(), "d", layout).unwrap();
        assert_eq!(row.get("testA"), Some(&Cell::Value("0.5".to_string())));
        assert_eq!(row.get("testB"), Some(&Cell::Failed));
        assert_eq!(row.cells.len(), 2);
    }

    #[test]
    fn test_repeated_test_keeps_last_outcome() {
        let log = "0 PASSED t 1.0\n1 FAILED t 2.0\n";
        let row = parse_results_str(log, &origin(), "d", LogLayout::default()).unwrap();
        assert_eq!(row.cells, vec![("t".to_string(), Cell::Failed)]);
    }

    #[test]
    fn test_short_line_is_malformed() {
        let log = "0 PASSED t 1.0\n1 PASSED\n";
        let err = parse_results_str(log, &origin(), "d", LogLayout::default()).unwrap_err();
        match err {
            Error::MalformedLog {
                line,
                expected,
                found,
                ..
            } => {
                assert_eq!(line, 2);
                assert_eq!(expected, 4);
                assert_eq!(found, 2);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }
}
