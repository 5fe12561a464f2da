//! Ledger service over a record store.
//!
//! Every operation reloads the full ledger table, so each call is
//! independently re-derivable from the store: there is no in-memory state
//! carried between calls. Mutations persist the whole table and leave
//! re-reconciliation to the caller, which normally follows with
//! [`Ledger::view`].
//!
//! Ledger deletes are final; there is no undo at this layer.

use chrono::{Local, NaiveDate, NaiveTime};
use serde::Serialize;
use tracing::{info, warn};

use crate::balance::{self, BalanceCache, CacheRefresh};
use crate::config::SheetNames;
use crate::entry::{self, EntryDraft, LedgerEntry, LEDGER_COLUMNS, TIME_FORMAT};
use crate::error::{LedgerError, Result, StoreError, StoreResult};
use crate::memo::{self, MemoSlot};
use crate::monthly::{self, MonthSummary};
use crate::reconcile::{reconcile, Reconciliation};
use crate::store::{Record, RecordStore};
use crate::tasks::{self, TaskRow};

/// Everything a daily-close screen shows for one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyView {
    pub reconciliation: Reconciliation,
    /// Stored cache after the refresh policy ran; `None` if the cache could
    /// not be read.
    pub balance: Option<BalanceCache>,
    pub cache_refresh: Option<CacheRefresh>,
    /// Set when reading or writing the cache failed. The reconciliation
    /// figures are still valid.
    pub cache_error: Option<String>,
}

/// Parse a user-supplied `YYYY-MM-DD` viewing date.
pub fn parse_view_date(raw: &str) -> Result<NaiveDate> {
    entry::parse_date(raw.trim()).ok_or_else(|| LedgerError::InvalidDate(raw.to_string()))
}

fn unsaved(entry: LedgerEntry, source: StoreError) -> LedgerError {
    warn!(entry_id = %entry.id, "ledger entry not saved: {source}");
    LedgerError::Unsaved {
        entry: Box::new(entry),
        source,
    }
}

pub struct Ledger<S> {
    store: S,
    sheets: SheetNames,
}

impl<S: RecordStore> Ledger<S> {
    pub fn new(store: S, sheets: SheetNames) -> Self {
        Self { store, sheets }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn sheets(&self) -> &SheetNames {
        &self.sheets
    }

    /// Load every stored entry.
    ///
    /// Rows stored without an id get one here, and the table is written back
    /// once so the assigned ids stay stable across reloads.
    pub fn load_entries(&self) -> Result<Vec<LedgerEntry>> {
        Ok(self.read_entries()?)
    }

    pub fn save_entries(&self, entries: &[LedgerEntry]) -> Result<()> {
        Ok(self.write_entries(entries)?)
    }

    fn read_entries(&self) -> StoreResult<Vec<LedgerEntry>> {
        let records = self.store.read_all(&self.sheets.daily)?;
        let entries: Vec<LedgerEntry> = records.iter().map(LedgerEntry::from_record).collect();

        let repaired = records
            .iter()
            .filter(|r| r.get("id").map_or(true, |id| id.trim().is_empty()))
            .count();
        if repaired > 0 {
            match self.write_entries(&entries) {
                Ok(()) => info!(repaired, "assigned ids to stored ledger rows"),
                Err(e) => warn!(repaired, "assigned ledger ids not persisted: {e}"),
            }
        }
        Ok(entries)
    }

    fn write_entries(&self, entries: &[LedgerEntry]) -> StoreResult<()> {
        let records: Vec<Record> = entries.iter().map(LedgerEntry::to_record).collect();
        self.store
            .write_all(&self.sheets.daily, &records, &LEDGER_COLUMNS)
    }

    /// Add an entry to `date`, stamped with the current local time.
    pub fn add_entry(&self, date: NaiveDate, draft: EntryDraft) -> Result<LedgerEntry> {
        self.add_entry_at(date, Local::now().time(), draft)
    }

    /// Add an entry to `date` at `time`.
    ///
    /// On a store failure the stamped entry comes back inside
    /// [`LedgerError::Unsaved`]; pass it to [`Ledger::insert_entry`] to retry.
    pub fn add_entry_at(
        &self,
        date: NaiveDate,
        time: NaiveTime,
        draft: EntryDraft,
    ) -> Result<LedgerEntry> {
        if draft.is_blank() {
            return Err(LedgerError::MissingNameOrTask);
        }

        let created = LedgerEntry::new(
            &entry::format_date(date),
            &time.format(TIME_FORMAT).to_string(),
            draft,
        );
        let created = self.insert_entry(created)?;

        info!(
            entry_id = %created.id,
            date = %created.date,
            time = %created.time,
            "ledger entry added"
        );
        Ok(created)
    }

    /// Persist an already-built entry, replacing any stored entry with the
    /// same id. Retrying an add after [`LedgerError::Unsaved`] never
    /// duplicates the entry.
    pub fn insert_entry(&self, entry: LedgerEntry) -> Result<LedgerEntry> {
        let mut entries = match self.read_entries() {
            Ok(entries) => entries,
            Err(source) => return Err(unsaved(entry, source)),
        };
        match entries.iter_mut().find(|e| e.id == entry.id) {
            Some(existing) => *existing = entry.clone(),
            None => entries.push(entry.clone()),
        }
        if let Err(source) = self.write_entries(&entries) {
            return Err(unsaved(entry, source));
        }
        Ok(entry)
    }

    /// Overwrite the editable fields of entry `id`.
    pub fn edit_entry(&self, id: &str, draft: EntryDraft) -> Result<LedgerEntry> {
        let mut entries = self.load_entries()?;
        let target = entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| LedgerError::EntryNotFound(id.to_string()))?;
        target.apply(draft);
        let updated = target.clone();
        self.save_entries(&entries)?;

        info!(entry_id = %id, date = %updated.date, "ledger entry edited");
        Ok(updated)
    }

    /// Remove entry `id`, returning what was removed.
    pub fn delete_entry(&self, id: &str) -> Result<LedgerEntry> {
        let mut entries = self.load_entries()?;
        let pos = entries
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| LedgerError::EntryNotFound(id.to_string()))?;
        let removed = entries.remove(pos);
        self.save_entries(&entries)?;

        info!(entry_id = %id, date = %removed.date, "ledger entry deleted");
        Ok(removed)
    }

    /// Reload the ledger and reconcile it for `date`.
    pub fn view(&self, date: NaiveDate) -> Result<DailyView> {
        let entries = self.load_entries()?;
        Ok(self.view_entries(&entries, date))
    }

    /// Reconcile an already-loaded collection and apply the cache policy.
    ///
    /// Cache failures are reported in the view, never returned as errors.
    pub fn view_entries(&self, entries: &[LedgerEntry], date: NaiveDate) -> DailyView {
        let reconciliation = reconcile(entries, date);
        match balance::refresh(&self.store, &self.sheets.balance, &reconciliation) {
            Ok((cache, outcome)) => DailyView {
                reconciliation,
                balance: Some(cache),
                cache_refresh: Some(outcome),
                cache_error: None,
            },
            Err(e) => {
                warn!(view_date = %date, "balance cache refresh failed: {e}");
                DailyView {
                    reconciliation,
                    balance: None,
                    cache_refresh: None,
                    cache_error: Some(e.to_string()),
                }
            }
        }
    }

    pub fn balance(&self) -> Result<BalanceCache> {
        Ok(balance::load(&self.store, &self.sheets.balance)?)
    }

    pub fn monthly_summary(&self) -> Result<Vec<MonthSummary>> {
        Ok(monthly::monthly_summary(&self.load_entries()?))
    }

    pub fn load_memo(&self, slot: MemoSlot) -> Result<String> {
        Ok(memo::load(&self.store, &self.sheets, slot)?)
    }

    pub fn save_memo(&self, slot: MemoSlot, content: &str) -> Result<()> {
        Ok(memo::save(&self.store, &self.sheets, slot, content)?)
    }

    /// Planned or active tasks, in display order.
    pub fn tasks<T: TaskRow>(&self) -> Result<Vec<T>> {
        Ok(tasks::load(&self.store, &self.sheets)?)
    }

    pub fn add_task<T: TaskRow>(&self, task: T) -> Result<T> {
        tasks::add(&self.store, &self.sheets, task)
    }

    pub fn update_task<T: TaskRow>(&self, task: T) -> Result<T> {
        tasks::update(&self.store, &self.sheets, task)
    }

    pub fn remove_task<T: TaskRow>(&self, id: &str) -> Result<T> {
        tasks::remove(&self.store, &self.sheets, id)
    }
}
