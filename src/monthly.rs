//! Month-by-month summary over the whole ledger history.

use std::collections::BTreeMap;

use chrono::Datelike;
use serde::Serialize;

use crate::entry::LedgerEntry;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthSummary {
    /// `YYYY-MM`
    pub month: String,
    pub income: i64,
    /// Business expense only; personal withdrawals are not included.
    pub expense: i64,
    pub profit: i64,
}

/// Sum income, expense and profit per calendar month, newest month first.
/// Entries with malformed dates are skipped.
pub fn monthly_summary(entries: &[LedgerEntry]) -> Vec<MonthSummary> {
    let mut months: BTreeMap<(i32, u32), (i64, i64)> = BTreeMap::new();
    for entry in entries {
        let Some(day) = entry.business_day() else {
            continue;
        };
        let slot = months.entry((day.year(), day.month())).or_default();
        slot.0 = slot.0.saturating_add(entry.income());
        slot.1 = slot.1.saturating_add(entry.business_expense());
    }

    months
        .into_iter()
        .rev()
        .map(|((year, month), (income, expense))| MonthSummary {
            month: format!("{year:04}-{month:02}"),
            income,
            expense,
            profit: income.saturating_sub(expense),
        })
        .collect()
}
