use std::{
    fs,
    io::{Read, Write},
    path::Path,
};

use crate::error::{Error, Result};

/// Name of the column holding the run identifier of each row.
pub const DATE_COLUMN: &str = "date";
pub const FAILED: &str = "FAILED";
pub const SKIPPED: &str = "SKIPPED";

/// One benchmark measurement as it is stored in a history table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    /// The raw recorded text, normally a duration in seconds.
    Value(String),
    Failed,
    Skipped,
    /// The benchmark did not report anything for this run.
    Missing,
}

impl Cell {
    pub fn parse(field: &str) -> Self {
        match field.trim() {
            "" => Cell::Missing,
            FAILED => Cell::Failed,
            SKIPPED => Cell::Skipped,
            other => Cell::Value(other.to_string()),
        }
    }

    /// The numeric value of this cell, if it has one.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Value(raw) => raw.parse::<f64>().ok().filter(|v| !v.is_nan()),
            _ => None,
        }
    }

    fn as_field(&self) -> &str {
        match self {
            Cell::Value(raw) => raw.as_str(),
            Cell::Failed => FAILED,
            Cell::Skipped => SKIPPED,
            Cell::Missing => "",
        }
    }
}

/// The outcome of a single nightly run for one configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRow {
    pub date: String,
    /// Benchmark name and outcome, in the order the benchmarks were reported.
    pub cells: Vec<(String, Cell)>,
}

impl ResultRow {
    pub fn new(date: &str) -> Self {
        ResultRow {
            date: date.to_string(),
            cells: vec![],
        }
    }

    /// Sets the outcome of `name`, replacing an earlier outcome for the same benchmark.
    pub fn set(&mut self, name: &str, cell: Cell) {
        match self.cells.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => *existing = cell,
            None => self.cells.push((name.to_string(), cell)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Cell> {
        self.cells.iter().find(|(n, _)| n == name).map(|(_, c)| c)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct HistoryRow {
    date: String,
    /// Aligned with `HistoryTable::columns`; rows written before a column existed are shorter.
    cells: Vec<Cell>,
}

/// Whether [`HistoryTable::record`] created a new table or extended an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Created,
    Appended { rows: usize },
}

/// The accumulated nightly rows of one configuration, in run order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryTable {
    columns: Vec<String>,
    rows: Vec<HistoryRow>,
}

impl HistoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_row(row: ResultRow) -> Self {
        let mut table = Self::new();
        table.append(row);
        table
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = fs::File::open(path)?;
        Self::read_from(file, path)
    }

    /// Reads a table from CSV. `origin` is only used for error messages.
    pub fn read_from<R: Read>(reader: R, origin: &Path) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(reader);
        let headers = reader.headers()?.clone();
        let date_index = headers
            .iter()
            .position(|h| h == DATE_COLUMN)
            .ok_or_else(|| Error::MalformedHistory {
                path: origin.to_path_buf(),
                reason: format!("no {:?} column in header", DATE_COLUMN),
            })?;
        let columns: Vec<String> = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != date_index)
            .map(|(_, h)| h.to_string())
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let date = record.get(date_index).unwrap_or_default().to_string();
            let cells = record
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != date_index)
                .map(|(_, field)| Cell::parse(field))
                .collect();
            rows.push(HistoryRow { date, cells });
        }

        Ok(HistoryTable { columns, rows })
    }

    /// Overwrites `path` with the full table.
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = fs::File::create(path)?;
        self.write_to(file)
    }

    pub fn write_to<W: Write>(&self, writer: W) -> Result<()> {
        let mut writer = csv::Writer::from_writer(writer);
        let header = std::iter::once(DATE_COLUMN).chain(self.columns.iter().map(String::as_str));
        writer.write_record(header)?;
        for row in &self.rows {
            let fields = (0..self.columns.len()).map(|i| row.cell(i).as_field());
            writer.write_record(std::iter::once(row.date.as_str()).chain(fields))?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Adds `row` after every existing row. Benchmarks not seen before become new columns.
    pub fn append(&mut self, row: ResultRow) {
        for (name, _) in &row.cells {
            if !self.columns.contains(name) {
                self.columns.push(name.clone());
            }
        }
        let cells = self
            .columns
            .iter()
            .map(|column| row.get(column).cloned().unwrap_or(Cell::Missing))
            .collect();
        self.rows.push(HistoryRow {
            date: row.date,
            cells,
        });
    }

    /// Appends `row` to the table persisted at `path`, creating the file if needed.
    pub fn record(path: &Path, row: ResultRow) -> Result<RecordOutcome> {
        if !path.exists() {
            Self::from_row(row).save(path)?;
            return Ok(RecordOutcome::Created);
        }
        let mut table = Self::load(path)?;
        table.append(row);
        table.save(path)?;
        Ok(RecordOutcome::Appended { rows: table.len() })
    }

    /// Benchmark column names, excluding the date column.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn dates(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|r| r.date.as_str())
    }

    pub fn last_date(&self) -> Option<&str> {
        self.rows.last().map(|r| r.date.as_str())
    }

    /// Every row's cell for `column`, in run order.
    pub fn column(&self, column: &str) -> Option<Vec<Cell>> {
        let index = self.columns.iter().position(|c| c == column)?;
        Some(self.rows.iter().map(|r| r.cell(index).clone()).collect())
    }
}

impl HistoryRow {
    fn cell(&self, index: usize) -> &Cell {
        static MISSING: Cell = Cell::Missing;
        self.cells.get(index).unwrap_or(&MISSING)
    }
}

#[cfg(test)]
mod test {
    use std::path::PathBuf;

    use tempfile::TempDir;

    use super::*;

    fn row(date: &str, cells: &[(&str, &str)]) -> ResultRow {
        let mut row = ResultRow::new(date);
        for (name, field) in cells {
            row.set(name, Cell::parse(field));
        }
        row
    }

    fn to_csv(table: &HistoryTable) -> String {
        let mut out = Vec::new();
        table.write_to(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_cell_parse() {
        assert_eq!(Cell::parse("FAILED"), Cell::Failed);
        assert_eq!(Cell::parse("SKIPPED"), Cell::Skipped);
        assert_eq!(Cell::parse(""), Cell::Missing);
        assert_eq!(Cell::parse("0.25"), Cell::Value("0.25".to_string()));
        assert_eq!(Cell::parse("0.25").as_number(), Some(0.25));
        assert_eq!(Cell::parse("fast").as_number(), None);
        assert_eq!(Cell::Failed.as_number(), None);
    }

    #[test]
    fn test_appends_keep_order_and_union_columns() {
        let mut table = HistoryTable::new();
        table.append(row("d1", &[("a", "1"), ("b", "2")]));
        table.append(row("d2", &[("b", "3"), ("c", "FAILED")]));
        table.append(row("d3", &[("a", "4")]));

        assert_eq!(table.len(), 3);
        assert_eq!(table.columns(), &["a", "b", "c"]);
        assert_eq!(table.dates().collect::<Vec<_>>(), vec!["d1", "d2", "d3"]);
        assert_eq!(
            to_csv(&table),
            "date,a,b,c\nd1,1,2,\nd2,,3,FAILED\nd3,4,,\n"
        );
    }

    #[test]
    fn test_same_date_is_not_deduplicated() {
        let mut table = HistoryTable::new();
        table.append(row("d1", &[("a", "1")]));
        table.append(row("d1", &[("a", "2")]));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_reads_date_column_in_any_position() {
        let csv = "a,date,b\n1,d1,SKIPPED\n,d2,3\n";
        let table = HistoryTable::read_from(csv.as_bytes(), &PathBuf::from("x.csv")).unwrap();
        assert_eq!(table.columns(), &["a", "b"]);
        assert_eq!(table.last_date(), Some("d2"));
        assert_eq!(
            table.column("a").unwrap(),
            vec![Cell::Value("1".to_string()), Cell::Missing]
        );
        assert_eq!(
            table.column("b").unwrap(),
            vec![Cell::Skipped, Cell::Value("3".to_string())]
        );
        assert!(table.column("date").is_none());
    }

    #[test]
    fn test_missing_date_column_is_malformed() {
        let err = HistoryTable::read_from("a,b\n1,2\n".as_bytes(), &PathBuf::from("x.csv"))
            .unwrap_err();
        assert!(matches!(err, Error::MalformedHistory { .. }));
    }

    #[test]
    fn test_ragged_rows_are_rejected() {
        let err = HistoryTable::read_from("date,a\nd1,1,2\n".as_bytes(), &PathBuf::from("x.csv"))
            .unwrap_err();
        assert!(matches!(err, Error::Csv(_)));
    }

    #[test]
    fn test_record_creates_then_appends() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("2-GPU.csv");

        let outcome = HistoryTable::record(&path, row("d1", &[("a", "0.5")])).unwrap();
        assert_eq!(outcome, RecordOutcome::Created);
        let outcome = HistoryTable::record(&path, row("d2", &[("b", "0.7")])).unwrap();
        assert_eq!(outcome, RecordOutcome::Appended { rows: 2 });

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "date,a,b\nd1,0.5,\nd2,,0.7\n"
        );
    }
}
