use crate::history::{Cell, HistoryTable};

/// One benchmark column of a history table, ready for plotting.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkSeries {
    /// The benchmark name with its structural prefix removed.
    pub name: String,
    /// One entry per run; `None` wherever the run has no usable number.
    pub values: Vec<Option<f64>>,
    /// Inclusive run ranges that failed or reported nothing.
    pub failed: Vec<(usize, usize)>,
    /// Inclusive run ranges that were skipped.
    pub skipped: Vec<(usize, usize)>,
}

impl BenchmarkSeries {
    pub fn from_cells(name: String, cells: &[Cell]) -> Self {
        let mut failed = vec![];
        let mut skipped = vec![];
        for (i, cell) in cells.iter().enumerate() {
            match cell {
                Cell::Failed | Cell::Missing => failed.push(i),
                Cell::Skipped => skipped.push(i),
                Cell::Value(_) => {}
            }
        }
        BenchmarkSeries {
            name,
            values: cells.iter().map(Cell::as_number).collect(),
            failed: collapse_ranges(&failed),
            skipped: collapse_ranges(&skipped),
        }
    }

    /// The value of the most recent run.
    pub fn last_value(&self) -> Option<f64> {
        self.values.last().copied().flatten()
    }

    /// Mean of the numeric values among the last `window` runs.
    pub fn trailing_mean(&self, window: usize) -> Option<f64> {
        let start = self.values.len().saturating_sub(window);
        let numbers: Vec<f64> = self.values[start..].iter().flatten().copied().collect();
        if numbers.is_empty() {
            return None;
        }
        Some(numbers.iter().sum::<f64>() / numbers.len() as f64)
    }
}

/// Builds one series per benchmark column, stripping each name's prefix.
pub fn series_from_table(table: &HistoryTable) -> Vec<BenchmarkSeries> {
    table
        .columns()
        .iter()
        .filter_map(|column| {
            let cells = table.column(column)?;
            Some(BenchmarkSeries::from_cells(strip_structural_prefix(column), &cells))
        })
        .collect()
}

/// Drops the leading path token (e.g. "./") that the result log puts in front of test ids.
pub fn strip_structural_prefix(name: &str) -> String {
    name.chars().skip(2).collect()
}

/// Collapses indices into maximal inclusive runs of consecutive integers.
pub fn collapse_ranges(indices: &[usize]) -> Vec<(usize, usize)> {
    let mut sorted = indices.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let mut ranges: Vec<(usize, usize)> = vec![];
    for i in sorted {
        match ranges.last_mut() {
            Some((_, end)) if *end + 1 == i => *end = i,
            _ => ranges.push((i, i)),
        }
    }
    ranges
}

/// Formats a statistic rounded to 4 decimal places, or "n/a".
pub fn display_stat(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{}", (v * 10_000.0).round() / 10_000.0),
        _ => "n/a".to_string(),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::history::ResultRow;

    fn cells(fields: &[&str]) -> Vec<Cell> {
        fields.iter().map(|f| Cell::parse(f)).collect()
    }

    #[test]
    fn test_collapse_ranges() {
        assert_eq!(
            collapse_ranges(&[2, 3, 4, 7, 9, 10]),
            vec![(2, 4), (7, 7), (9, 10)]
        );
        assert_eq!(collapse_ranges(&[]), Vec::<(usize, usize)>::new());
        assert_eq!(collapse_ranges(&[5, 1, 0, 5]), vec![(0, 1), (5, 5)]);
    }

    #[test]
    fn test_sentinels_are_flagged_and_ignored() {
        let s = BenchmarkSeries::from_cells(
            "bfs".to_string(),
            &cells(&["1.0", "FAILED", "2.0", "SKIPPED", "3.0"]),
        );
        assert_eq!(s.failed, vec![(1, 1)]);
        assert_eq!(s.skipped, vec![(3, 3)]);
        assert_relative_eq!(s.last_value().unwrap(), 3.0);
        assert_relative_eq!(s.trailing_mean(30).unwrap(), 2.0);
    }

    #[test]
    fn test_last_value_is_na_when_latest_run_is_not_numeric() {
        let s = BenchmarkSeries::from_cells(
            "bfs".to_string(),
            &cells(&["1.0", "2.0", "3.0", "FAILED", "SKIPPED"]),
        );
        assert_eq!(display_stat(s.last_value()), "n/a");
        assert_eq!(display_stat(s.trailing_mean(30)), "2");
    }

    #[test]
    fn test_all_non_numeric_is_na() {
        let s = BenchmarkSeries::from_cells(
            "bfs".to_string(),
            &cells(&["FAILED", "SKIPPED", "", "garbage"]),
        );
        assert_eq!(s.failed, vec![(0, 0), (2, 2)]);
        assert_eq!(display_stat(s.last_value()), "n/a");
        assert_eq!(display_stat(s.trailing_mean(30)), "n/a");
    }

    #[test]
    fn test_trailing_mean_uses_window() {
        let fields: Vec<String> = (1..=40).map(|i| i.to_string()).collect();
        let fields: Vec<&str> = fields.iter().map(String::as_str).collect();
        let s = BenchmarkSeries::from_cells("x".to_string(), &cells(&fields));
        // Runs 11..=40.
        assert_relative_eq!(s.trailing_mean(30).unwrap(), 25.5);
        assert_relative_eq!(s.trailing_mean(100).unwrap(), 20.5);
        assert_eq!(s.trailing_mean(0), None);
    }

    #[test]
    fn test_display_stat_rounds() {
        assert_eq!(display_stat(Some(0.123456)), "0.1235");
        assert_eq!(display_stat(Some(0.5)), "0.5");
        assert_eq!(display_stat(None), "n/a");
        assert_eq!(display_stat(Some(f64::NAN)), "n/a");
    }

    #[test]
    fn test_prefix_is_stripped_once_per_table() {
        let mut row = ResultRow::new("d1");
        row.set("./bfs", Cell::parse("1"));
        row.set("./sssp", Cell::parse("2"));
        let table = HistoryTable::from_row(row);

        let names: Vec<String> = series_from_table(&table)
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["bfs", "sssp"]);
        // The table keeps its raw names, so a second load strips from the raw names again.
        assert_eq!(table.columns(), &["./bfs", "./sssp"]);
        // Stripping is not idempotent, which is why it happens exactly once per load.
        assert_eq!(strip_structural_prefix("bfs"), "s");
    }
}
