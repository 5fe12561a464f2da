//! Record store abstraction.
//!
//! The office keeps every table in a spreadsheet-like store: named tables of
//! flat string records with a header row, plus single-cell memo tables. The
//! ledger only relies on whole-table reads and replacing writes, so any
//! backend that can do that atomically per call can sit behind
//! [`RecordStore`]. [`MemoryStore`] is the in-process backend; the SQLite
//! backend lives in [`crate::db`].

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use tracing::debug;

use crate::error::{StoreError, StoreResult};

/// One flat row, keyed by column name. Values always round-trip as strings.
pub type Record = BTreeMap<String, String>;

/// Table-oriented persistence used by the ledger, balance cache and memos.
///
/// Calls are atomic individually; nothing spans calls. Concurrent writers are
/// last-writer-wins.
pub trait RecordStore {
    /// Read every row of `table`. A table that does not exist reads as empty.
    fn read_all(&self, table: &str) -> StoreResult<Vec<Record>>;

    /// Replace the whole table. The header is written from `columns` even
    /// when `records` is empty; fields not named in `columns` are dropped and
    /// missing ones are written blank.
    fn write_all(&self, table: &str, records: &[Record], columns: &[&str]) -> StoreResult<()>;

    /// Read a single-value cell. Missing cells read as `None`.
    fn read_cell(&self, table: &str, cell: &str) -> StoreResult<Option<String>>;

    fn write_cell(&self, table: &str, cell: &str, value: &str) -> StoreResult<()>;
}

impl<T: RecordStore + ?Sized> RecordStore for &T {
    fn read_all(&self, table: &str) -> StoreResult<Vec<Record>> {
        (**self).read_all(table)
    }

    fn write_all(&self, table: &str, records: &[Record], columns: &[&str]) -> StoreResult<()> {
        (**self).write_all(table, records, columns)
    }

    fn read_cell(&self, table: &str, cell: &str) -> StoreResult<Option<String>> {
        (**self).read_cell(table, cell)
    }

    fn write_cell(&self, table: &str, cell: &str, value: &str) -> StoreResult<()> {
        (**self).write_cell(table, cell, value)
    }
}

/// Parse a stored amount defensively.
///
/// Accepts integers and decimals (truncated toward zero). Blank, non-numeric
/// and non-finite values become `0`.
pub fn parse_amount(raw: &str) -> i64 {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return 0;
    }
    if let Ok(n) = trimmed.parse::<i64>() {
        return n;
    }
    match trimmed.parse::<f64>() {
        Ok(f) if f.is_finite() => f.trunc() as i64,
        _ => 0,
    }
}

/// Project `record` onto `columns`, blank-filling missing fields.
pub(crate) fn project(record: &Record, columns: &[String]) -> Record {
    columns
        .iter()
        .map(|col| (col.clone(), record.get(col).cloned().unwrap_or_default()))
        .collect()
}

// ---------------------------------------------------------------------------
// In-memory backend
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Table {
    columns: Vec<String>,
    rows: Vec<Record>,
}

/// In-process [`RecordStore`].
///
/// Can be switched into a failing mode to exercise the recoverable
/// store-unavailable paths.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<String, Table>>,
    cells: Mutex<HashMap<(String, String), String>>,
    write_log: Mutex<Vec<String>>,
    failing: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with [`StoreError::Unavailable`]
    /// (or succeed again when `false`).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of successful `write_all` calls made against `table`.
    pub fn writes_to(&self, table: &str) -> usize {
        self.write_log
            .lock()
            .map(|log| log.iter().filter(|t| t.as_str() == table).count())
            .unwrap_or(0)
    }

    /// Header row of `table`, if it has ever been written.
    pub fn columns(&self, table: &str) -> Option<Vec<String>> {
        self.tables
            .lock()
            .ok()
            .and_then(|tables| tables.get(table).map(|t| t.columns.clone()))
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store set to fail".into()));
        }
        Ok(())
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StoreError {
    StoreError::Unavailable(format!("lock poisoned: {e}"))
}

impl RecordStore for MemoryStore {
    fn read_all(&self, table: &str) -> StoreResult<Vec<Record>> {
        self.check_available()?;
        let tables = self.tables.lock().map_err(poisoned)?;
        Ok(tables.get(table).map(|t| t.rows.clone()).unwrap_or_default())
    }

    fn write_all(&self, table: &str, records: &[Record], columns: &[&str]) -> StoreResult<()> {
        self.check_available()?;
        let columns: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
        let rows = records.iter().map(|r| project(r, &columns)).collect();
        {
            let mut tables = self.tables.lock().map_err(poisoned)?;
            tables.insert(table.to_string(), Table { columns, rows });
        }
        self.write_log
            .lock()
            .map_err(poisoned)?
            .push(table.to_string());
        debug!(table, rows = records.len(), "memory store table replaced");
        Ok(())
    }

    fn read_cell(&self, table: &str, cell: &str) -> StoreResult<Option<String>> {
        self.check_available()?;
        let cells = self.cells.lock().map_err(poisoned)?;
        Ok(cells.get(&(table.to_string(), cell.to_string())).cloned())
    }

    fn write_cell(&self, table: &str, cell: &str, value: &str) -> StoreResult<()> {
        self.check_available()?;
        let mut cells = self.cells.lock().map_err(poisoned)?;
        cells.insert((table.to_string(), cell.to_string()), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, &str)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_amount_accepts_integers_and_decimals() {
        assert_eq!(parse_amount("1500"), 1500);
        assert_eq!(parse_amount(" 42 "), 42);
        assert_eq!(parse_amount("-300"), -300);
        assert_eq!(parse_amount("12.9"), 12);
        assert_eq!(parse_amount("-3.5"), -3);
        assert_eq!(parse_amount("1e3"), 1000);
    }

    #[test]
    fn test_parse_amount_coerces_garbage_to_zero() {
        assert_eq!(parse_amount(""), 0);
        assert_eq!(parse_amount("   "), 0);
        assert_eq!(parse_amount("abc"), 0);
        assert_eq!(parse_amount("1,000"), 0);
        assert_eq!(parse_amount("NaN"), 0);
        assert_eq!(parse_amount("inf"), 0);
    }

    #[test]
    fn test_missing_table_reads_empty() {
        let store = MemoryStore::new();
        assert!(store.read_all("nothing").unwrap().is_empty());
        assert_eq!(store.read_cell("nothing", "A1").unwrap(), None);
    }

    #[test]
    fn test_write_all_projects_onto_columns() {
        let store = MemoryStore::new();
        let rows = vec![record(&[("a", "1"), ("extra", "x")])];
        store.write_all("t", &rows, &["a", "b"]).unwrap();

        let back = store.read_all("t").unwrap();
        assert_eq!(back, vec![record(&[("a", "1"), ("b", "")])]);
        assert_eq!(store.writes_to("t"), 1);
    }

    #[test]
    fn test_empty_write_keeps_header() {
        let store = MemoryStore::new();
        store.write_all("t", &[], &["key", "value"]).unwrap();
        assert!(store.read_all("t").unwrap().is_empty());
        assert_eq!(
            store.columns("t"),
            Some(vec!["key".to_string(), "value".to_string()])
        );
    }

    #[test]
    fn test_failing_store_reports_unavailable() {
        let store = MemoryStore::new();
        store.set_failing(true);
        let err = store.read_all("t").unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert!(store.write_cell("m", "A1", "x").is_err());

        store.set_failing(false);
        store.write_cell("m", "A1", "x").unwrap();
        assert_eq!(store.read_cell("m", "A1").unwrap().as_deref(), Some("x"));
    }
}
