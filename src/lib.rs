//! Office Ledger
//!
//! Daily cash-ledger for a small agency office: dated, timestamped income and
//! expense entries kept in a table-oriented record store, reconciled on every
//! view into day, month-to-date and cumulative cash figures, with the latest
//! close published to a small balance cache.

use chrono::Local;
use tracing::{info, warn};

pub mod balance;
pub mod config;
pub mod db;
pub mod entry;
pub mod error;
pub mod ledger;
pub mod logging;
pub mod memo;
pub mod monthly;
pub mod reconcile;
pub mod store;
pub mod tasks;

pub use balance::{BalanceCache, CacheRefresh};
pub use config::{AppConfig, SheetNames};
pub use db::SqliteStore;
pub use entry::{EntryDraft, LedgerEntry, LEDGER_COLUMNS};
pub use error::{LedgerError, StoreError};
pub use ledger::{parse_view_date, DailyView, Ledger};
pub use memo::MemoSlot;
pub use monthly::{monthly_summary, MonthSummary};
pub use reconcile::{reconcile, PeriodTotals, Reconciliation};
pub use store::{MemoryStore, Record, RecordStore};
pub use tasks::{ActiveTask, PlannedTask, TaskRow};

// ============================================================================
// Binary entry point
// ============================================================================

/// Run the command-line front end.
///
/// `office-ledger [YYYY-MM-DD]` prints the daily view for that date (default:
/// today); `office-ledger monthly` prints the per-month summary and
/// `office-ledger tasks` the planned and active task lists.
pub fn run() -> anyhow::Result<()> {
    let config = AppConfig::load();
    let _guard = logging::init(&config.log_dir(), &config.log_filter)?;

    info!(
        "Starting office-ledger v{} ({}, built {})",
        env!("CARGO_PKG_VERSION"),
        env!("BUILD_GIT_SHA"),
        env!("BUILD_TIMESTAMP")
    );
    if let Some(err) = &config.file_error {
        warn!("Ignoring unusable config file, using defaults: {err}");
    }

    let store = db::init(&config.db_path())?;
    let ledger = Ledger::new(store, config.sheets.clone());

    let arg = std::env::args().nth(1);
    let output = match arg.as_deref() {
        Some("monthly") => serde_json::to_string_pretty(&ledger.monthly_summary()?)?,
        Some("tasks") => serde_json::to_string_pretty(&serde_json::json!({
            "planned": ledger.tasks::<PlannedTask>()?,
            "active": ledger.tasks::<ActiveTask>()?,
        }))?,
        Some(raw) => serde_json::to_string_pretty(&ledger.view(parse_view_date(raw)?)?)?,
        None => serde_json::to_string_pretty(&ledger.view(Local::now().date_naive())?)?,
    };
    println!("{output}");
    Ok(())
}
