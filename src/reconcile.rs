//! Daily cash-ledger reconciliation.
//!
//! Derives, for a viewed business day, the day's totals, the month-to-date
//! totals, the office cash position at the close of that day and the whole
//! month's net profit. Everything is recomputed from the full entry set on
//! every call; nothing is carried between calls.
//!
//! Two month figures are produced on purpose:
//! - `month_to_date` stops at the viewed day;
//! - `month_net_profit` covers the whole calendar month, including entries
//!   dated after the viewed day. It feeds the balance cache and is shown as
//!   the "whole month" caption.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use tracing::debug;

use crate::balance::BalanceCache;
use crate::entry::LedgerEntry;

/// Aggregates over a set of entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PeriodTotals {
    /// `income_cash + income_etc`
    pub income: i64,
    /// `exp_cash + exp_etc`
    pub business_expense: i64,
    /// `cash_out`
    pub personal_withdrawal: i64,
    /// Business expense plus personal withdrawals.
    pub total_outflow: i64,
    /// Income minus business expense. Withdrawals are not a business cost.
    pub net_profit: i64,
}

impl PeriodTotals {
    pub fn over<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = &'a LedgerEntry>,
    {
        let mut totals = Self::default();
        for e in entries {
            totals.income = totals.income.saturating_add(e.income());
            totals.business_expense = totals
                .business_expense
                .saturating_add(e.business_expense());
            totals.personal_withdrawal = totals.personal_withdrawal.saturating_add(e.cash_out);
        }
        totals.total_outflow = totals
            .business_expense
            .saturating_add(totals.personal_withdrawal);
        totals.net_profit = totals.income.saturating_sub(totals.business_expense);
        totals
    }
}

/// Figures derived for one viewed day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    pub view_date: NaiveDate,
    /// Entries of the viewed day, ordered by time.
    pub day_entries: Vec<LedgerEntry>,
    pub day: PeriodTotals,
    /// First of the month through the viewed day, inclusive.
    pub month_to_date: PeriodTotals,
    /// Office cash at the close of the viewed day, over all history.
    pub cumulative_cash: i64,
    /// Net profit of the viewed day's whole calendar month.
    pub month_net_profit: i64,
    /// The viewed day is on or after the most recent entry date.
    pub is_latest_date: bool,
}

impl Reconciliation {
    /// The cache values this run would publish as the latest close.
    pub fn closing_balance(&self) -> BalanceCache {
        BalanceCache {
            cash: self.cumulative_cash,
            profit: self.month_net_profit,
        }
    }
}

fn same_month(a: NaiveDate, b: NaiveDate) -> bool {
    a.year() == b.year() && a.month() == b.month()
}

/// Reconcile the complete, unordered entry set for `view_date`.
///
/// Total over any input. Entries whose date is not a valid `YYYY-MM-DD` are
/// left out of every figure.
pub fn reconcile(entries: &[LedgerEntry], view_date: NaiveDate) -> Reconciliation {
    let mut dated: Vec<(NaiveDate, &LedgerEntry)> = entries
        .iter()
        .filter_map(|e| e.business_day().map(|d| (d, e)))
        .collect();

    let skipped = entries.len() - dated.len();
    if skipped > 0 {
        debug!(skipped, "ledger entries with malformed dates left out");
    }

    // Chronological order; stable, so equal (date, time) keep input order.
    dated.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.time.cmp(&b.1.time)));

    let day_entries: Vec<LedgerEntry> = dated
        .iter()
        .filter(|(d, _)| *d == view_date)
        .map(|(_, e)| (*e).clone())
        .collect();
    let day = PeriodTotals::over(&day_entries);

    let month_to_date = PeriodTotals::over(
        dated
            .iter()
            .filter(|(d, _)| same_month(*d, view_date) && *d <= view_date)
            .map(|(_, e)| *e),
    );

    let mut cumulative_cash: i64 = 0;
    for (d, e) in &dated {
        if *d > view_date {
            break;
        }
        cumulative_cash = cumulative_cash.saturating_add(e.cash_delta());
    }

    let month_net_profit = PeriodTotals::over(
        dated
            .iter()
            .filter(|(d, _)| same_month(*d, view_date))
            .map(|(_, e)| *e),
    )
    .net_profit;

    let is_latest_date = dated.last().map_or(true, |(last, _)| view_date >= *last);

    debug!(
        view_date = %view_date,
        day_entries = day_entries.len(),
        cumulative_cash,
        month_net_profit,
        is_latest_date,
        "ledger reconciled"
    );

    Reconciliation {
        view_date,
        day_entries,
        day,
        month_to_date,
        cumulative_cash,
        month_net_profit,
        is_latest_date,
    }
}
