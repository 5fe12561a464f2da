//! Balance cache: the published "latest close" snapshot.
//!
//! Holds the office cash at the close of the most recent business day and
//! that month's net profit. It is derived data: every value can be rebuilt
//! from the ledger, so it is only ever overwritten, never patched.
//!
//! Stored as a two-column `key` / `value` table with one row per field.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::StoreResult;
use crate::reconcile::Reconciliation;
use crate::store::{Record, RecordStore};

pub const BALANCE_COLUMNS: [&str; 2] = ["key", "value"];

const KEY_CASH: &str = "cash";
const KEY_PROFIT: &str = "profit";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceCache {
    pub cash: i64,
    pub profit: i64,
}

/// What a refresh did to the stored cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheRefresh {
    /// Viewed day is the latest close and the stored values changed.
    Written,
    /// Viewed day is the latest close but the stored values already match.
    Unchanged,
    /// Viewed day is earlier than the latest entry; cache left alone.
    Skipped,
}

impl BalanceCache {
    fn to_records(self) -> Vec<Record> {
        [(KEY_CASH, self.cash), (KEY_PROFIT, self.profit)]
            .into_iter()
            .map(|(key, value)| {
                Record::from([
                    ("key".to_string(), key.to_string()),
                    ("value".to_string(), value.to_string()),
                ])
            })
            .collect()
    }

    fn from_records(records: &[Record]) -> Self {
        let mut cache = Self::default();
        for record in records {
            let Some(key) = record.get("key").map(|k| k.trim()) else {
                continue;
            };
            let slot = match key {
                KEY_CASH => &mut cache.cash,
                KEY_PROFIT => &mut cache.profit,
                _ => continue,
            };
            let raw = record.get("value").map(String::as_str).unwrap_or("").trim();
            *slot = if raw.is_empty() {
                0
            } else {
                raw.parse().unwrap_or_else(|_| {
                    warn!(key, value = raw, "balance value is not an integer, using 0");
                    0
                })
            };
        }
        cache
    }
}

/// Read the stored cache. A missing table reads as all zero.
pub fn load<S: RecordStore>(store: &S, table: &str) -> StoreResult<BalanceCache> {
    Ok(BalanceCache::from_records(&store.read_all(table)?))
}

pub fn save<S: RecordStore>(store: &S, table: &str, cache: BalanceCache) -> StoreResult<()> {
    store.write_all(table, &cache.to_records(), &BALANCE_COLUMNS)
}

/// Apply the latest-close policy for one reconciliation run.
///
/// When the viewed day is on or after the most recent entry date, the cache
/// is overwritten with the run's closing cash and whole-month profit; a run
/// that would write identical values over an existing table performs no
/// write. Otherwise the cache is only read. Returns the cache as it stands
/// afterwards.
pub fn refresh<S: RecordStore>(
    store: &S,
    table: &str,
    rec: &Reconciliation,
) -> StoreResult<(BalanceCache, CacheRefresh)> {
    let rows = store.read_all(table)?;
    let current = BalanceCache::from_records(&rows);
    if !rec.is_latest_date {
        return Ok((current, CacheRefresh::Skipped));
    }

    let closing = rec.closing_balance();
    if closing == current && !rows.is_empty() {
        return Ok((current, CacheRefresh::Unchanged));
    }

    save(store, table, closing)?;
    info!(
        view_date = %rec.view_date,
        cash = closing.cash,
        profit = closing.profit,
        "balance cache refreshed"
    );
    Ok((closing, CacheRefresh::Written))
}
