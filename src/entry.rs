//! Ledger entry model and its wire shape.
//!
//! An entry is one cash-register transaction on a business day. Cash
//! movements (`income_cash`, `exp_cash`, `cash_out`) go through the office
//! drawer; `income_etc` / `exp_etc` are transfers and other non-cash methods.
//! `cash_out` is a personal withdrawal and never counts as a business expense.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::store::{parse_amount, Record};

/// Column order of the ledger table.
pub const LEDGER_COLUMNS: [&str; 11] = [
    "id",
    "date",
    "time",
    "name",
    "task",
    "income_cash",
    "income_etc",
    "exp_cash",
    "cash_out",
    "exp_etc",
    "memo",
];

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M:%S";

/// One ledger row.
///
/// `date` and `time` are kept as stored (`YYYY-MM-DD`, `HH:MM:SS`): both are
/// fixed-width and zero-padded, so string order is chronological order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: String,
    pub date: String,
    pub time: String,
    pub name: String,
    pub task: String,
    pub income_cash: i64,
    pub income_etc: i64,
    pub exp_cash: i64,
    pub cash_out: i64,
    pub exp_etc: i64,
    pub memo: String,
}

/// The user-editable fields of an entry, as submitted by an add or edit form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryDraft {
    pub name: String,
    pub task: String,
    pub income_cash: i64,
    pub income_etc: i64,
    pub exp_cash: i64,
    pub cash_out: i64,
    pub exp_etc: i64,
    pub memo: String,
}

impl EntryDraft {
    /// An add needs at least a name or a task description.
    pub fn is_blank(&self) -> bool {
        self.name.trim().is_empty() && self.task.trim().is_empty()
    }
}

impl LedgerEntry {
    /// Create a new entry with a fresh id.
    pub fn new(date: &str, time: &str, draft: EntryDraft) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            date: date.to_string(),
            time: time.to_string(),
            name: draft.name,
            task: draft.task,
            income_cash: draft.income_cash,
            income_etc: draft.income_etc,
            exp_cash: draft.exp_cash,
            cash_out: draft.cash_out,
            exp_etc: draft.exp_etc,
            memo: draft.memo,
        }
    }

    /// Overwrite every editable field. `id`, `date` and `time` never change.
    pub fn apply(&mut self, draft: EntryDraft) {
        self.name = draft.name;
        self.task = draft.task;
        self.income_cash = draft.income_cash;
        self.income_etc = draft.income_etc;
        self.exp_cash = draft.exp_cash;
        self.cash_out = draft.cash_out;
        self.exp_etc = draft.exp_etc;
        self.memo = draft.memo;
    }

    /// Parsed business day, or `None` when the stored date is malformed.
    pub fn business_day(&self) -> Option<NaiveDate> {
        parse_date(&self.date)
    }

    // Stored amounts can sit at the i64 limits; sums saturate.

    /// Income from every method.
    pub fn income(&self) -> i64 {
        self.income_cash.saturating_add(self.income_etc)
    }

    /// Business expense from every method (personal withdrawals excluded).
    pub fn business_expense(&self) -> i64 {
        self.exp_cash.saturating_add(self.exp_etc)
    }

    /// Net movement of the physical cash drawer.
    pub fn cash_delta(&self) -> i64 {
        self.income_cash
            .saturating_sub(self.exp_cash)
            .saturating_sub(self.cash_out)
    }

    /// Read an entry from a stored row. Amounts are coerced, never rejected;
    /// a blank id is replaced with a fresh one.
    pub fn from_record(record: &Record) -> Self {
        let text = |key: &str| record.get(key).cloned().unwrap_or_default();
        let amount = |key: &str| record.get(key).map(|v| parse_amount(v)).unwrap_or(0);

        let mut id = text("id").trim().to_string();
        if id.is_empty() {
            id = Uuid::new_v4().to_string();
            debug!(entry_id = %id, "assigned id to stored ledger row without one");
        }

        Self {
            id,
            date: text("date").trim().to_string(),
            time: text("time").trim().to_string(),
            name: text("name"),
            task: text("task"),
            income_cash: amount("income_cash"),
            income_etc: amount("income_etc"),
            exp_cash: amount("exp_cash"),
            cash_out: amount("cash_out"),
            exp_etc: amount("exp_etc"),
            memo: text("memo"),
        }
    }

    pub fn to_record(&self) -> Record {
        let mut record = Record::new();
        record.insert("id".into(), self.id.clone());
        record.insert("date".into(), self.date.clone());
        record.insert("time".into(), self.time.clone());
        record.insert("name".into(), self.name.clone());
        record.insert("task".into(), self.task.clone());
        record.insert("income_cash".into(), self.income_cash.to_string());
        record.insert("income_etc".into(), self.income_etc.to_string());
        record.insert("exp_cash".into(), self.exp_cash.to_string());
        record.insert("cash_out".into(), self.cash_out.to_string());
        record.insert("exp_etc".into(), self.exp_etc.to_string());
        record.insert("memo".into(), self.memo.clone());
        record
    }
}

/// Strict `YYYY-MM-DD` parse.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    // chrono accepts unpadded fields, which would break string ordering.
    if raw.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(raw, DATE_FORMAT).ok()
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}
