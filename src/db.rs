//! SQLite-backed record store.
//!
//! Each logical table ("sheet") is a header row plus ordered data rows, and
//! memo tables hold single named cells. Uses rusqlite with WAL mode, runs
//! versioned migrations on open, and replaces whole tables inside one
//! `BEGIN IMMEDIATE` transaction so a failed write leaves the previous
//! contents untouched.

use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, error, info, warn};

use crate::error::{StoreError, StoreResult};
use crate::store::{Record, RecordStore};

/// Record store over a single SQLite connection.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    pub db_path: PathBuf,
}

/// Current schema version. Bump when adding new migrations.
const CURRENT_SCHEMA_VERSION: i32 = 2;

/// Open (or create) the store at `db_path`.
///
/// Creates the parent directory if needed, sets pragmas and runs pending
/// migrations. On open failure the file is deleted and opened once more.
pub fn init(db_path: &Path) -> StoreResult<SqliteStore> {
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent)?;
    }
    info!("Opening ledger database at {}", db_path.display());

    let conn = match open_and_configure(db_path) {
        Ok(c) => c,
        Err(first_err) => {
            warn!(
                "Database open failed ({}), deleting and retrying once",
                first_err
            );
            if db_path.exists() {
                let _ = fs::remove_file(db_path);
                let _ = fs::remove_file(db_path.with_extension("db-wal"));
                let _ = fs::remove_file(db_path.with_extension("db-shm"));
            }
            open_and_configure(db_path)?
        }
    };

    run_migrations(&conn)?;
    info!("Ledger database initialized (schema v{CURRENT_SCHEMA_VERSION})");

    Ok(SqliteStore {
        conn: Mutex::new(conn),
        db_path: db_path.to_path_buf(),
    })
}

/// Open a private in-memory store with the full schema applied.
pub fn open_in_memory() -> StoreResult<SqliteStore> {
    let conn = Connection::open_in_memory()?;
    conn.execute_batch(
        "PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;",
    )?;
    run_migrations(&conn)?;
    Ok(SqliteStore {
        conn: Mutex::new(conn),
        db_path: PathBuf::from(":memory:"),
    })
}

fn open_and_configure(path: &Path) -> StoreResult<Connection> {
    let conn = Connection::open(path)?;
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;
         PRAGMA synchronous = NORMAL;",
    )?;
    Ok(conn)
}

fn run_migrations(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT DEFAULT (datetime('now'))
        );",
    )?;

    let current: i32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    if current >= CURRENT_SCHEMA_VERSION {
        debug!("Database schema up to date (v{current})");
        return Ok(());
    }

    info!("Migrating database from v{current} to v{CURRENT_SCHEMA_VERSION}");

    if current < 1 {
        migrate_v1(conn)?;
    }
    if current < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

/// Migration v1: row tables.
fn migrate_v1(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS sheet_headers (
            sheet TEXT PRIMARY KEY,
            columns TEXT NOT NULL DEFAULT '[]',
            updated_at TEXT DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS sheet_rows (
            sheet TEXT NOT NULL REFERENCES sheet_headers(sheet) ON DELETE CASCADE,
            row_index INTEGER NOT NULL,
            cells TEXT NOT NULL DEFAULT '[]',
            PRIMARY KEY (sheet, row_index)
        );

        INSERT INTO schema_version (version) VALUES (1);
        ",
    )
    .map_err(|e| {
        error!("Migration v1 failed: {e}");
        StoreError::from(e)
    })?;

    info!("Applied migration v1 (sheet_headers, sheet_rows)");
    Ok(())
}

/// Migration v2: single-cell memo tables.
fn migrate_v2(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS sheet_cells (
            sheet TEXT NOT NULL,
            cell_ref TEXT NOT NULL,
            value TEXT NOT NULL DEFAULT '',
            updated_at TEXT DEFAULT (datetime('now')),
            PRIMARY KEY (sheet, cell_ref)
        );

        INSERT INTO schema_version (version) VALUES (2);
        ",
    )
    .map_err(|e| {
        error!("Migration v2 failed: {e}");
        StoreError::from(e)
    })?;

    info!("Applied migration v2 (sheet_cells)");
    Ok(())
}

impl SqliteStore {
    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Unavailable(format!("connection lock poisoned: {e}")))
    }
}

fn replace_table(
    conn: &Connection,
    table: &str,
    records: &[Record],
    columns: &[&str],
) -> StoreResult<()> {
    let header = serde_json::to_string(columns)?;
    conn.execute(
        "INSERT INTO sheet_headers (sheet, columns, updated_at)
         VALUES (?1, ?2, datetime('now'))
         ON CONFLICT(sheet) DO UPDATE SET
            columns = excluded.columns,
            updated_at = excluded.updated_at",
        params![table, header],
    )?;
    conn.execute("DELETE FROM sheet_rows WHERE sheet = ?1", params![table])?;

    let mut stmt =
        conn.prepare("INSERT INTO sheet_rows (sheet, row_index, cells) VALUES (?1, ?2, ?3)")?;
    for (idx, record) in records.iter().enumerate() {
        let cells: Vec<&str> = columns
            .iter()
            .map(|col| record.get(*col).map(String::as_str).unwrap_or(""))
            .collect();
        stmt.execute(params![table, idx as i64, serde_json::to_string(&cells)?])?;
    }
    Ok(())
}

impl RecordStore for SqliteStore {
    fn read_all(&self, table: &str) -> StoreResult<Vec<Record>> {
        let conn = self.lock()?;

        let header: Option<String> = conn
            .query_row(
                "SELECT columns FROM sheet_headers WHERE sheet = ?1",
                params![table],
                |row| row.get(0),
            )
            .optional()?;
        let Some(header) = header else {
            return Ok(Vec::new());
        };
        let columns: Vec<String> = serde_json::from_str(&header)?;

        let mut stmt =
            conn.prepare("SELECT cells FROM sheet_rows WHERE sheet = ?1 ORDER BY row_index")?;
        let rows = stmt.query_map(params![table], |row| row.get::<_, String>(0))?;

        let mut records = Vec::new();
        for row in rows {
            let raw = row?;
            let cells: Vec<String> = match serde_json::from_str(&raw) {
                Ok(c) => c,
                Err(e) => {
                    warn!(table, "skipping malformed stored row: {e}");
                    continue;
                }
            };
            let record = columns
                .iter()
                .enumerate()
                .map(|(i, col)| (col.clone(), cells.get(i).cloned().unwrap_or_default()))
                .collect();
            records.push(record);
        }
        Ok(records)
    }

    fn write_all(&self, table: &str, records: &[Record], columns: &[&str]) -> StoreResult<()> {
        let conn = self.lock()?;

        conn.execute_batch("BEGIN IMMEDIATE")?;
        match replace_table(&conn, table, records, columns) {
            Ok(()) => {
                conn.execute_batch("COMMIT")?;
            }
            Err(e) => {
                let _ = conn.execute_batch("ROLLBACK");
                error!(table, "table write rolled back: {e}");
                return Err(e);
            }
        }

        debug!(table, rows = records.len(), "table replaced");
        Ok(())
    }

    fn read_cell(&self, table: &str, cell: &str) -> StoreResult<Option<String>> {
        let conn = self.lock()?;
        let value = conn
            .query_row(
                "SELECT value FROM sheet_cells WHERE sheet = ?1 AND cell_ref = ?2",
                params![table, cell],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn write_cell(&self, table: &str, cell: &str, value: &str) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO sheet_cells (sheet, cell_ref, value, updated_at)
             VALUES (?1, ?2, ?3, datetime('now'))
             ON CONFLICT(sheet, cell_ref) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at",
            params![table, cell, value],
        )?;
        Ok(())
    }
}

// ===========================================================================
// Tests
// ===========================================================================
