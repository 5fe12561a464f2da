use chrono::{NaiveDate, NaiveTime};
use office_ledger_lib::{
    db, parse_view_date, BalanceCache, CacheRefresh, EntryDraft, Ledger, LedgerEntry,
    MemoryStore, Record, RecordStore, SheetNames, LEDGER_COLUMNS,
};

fn date(s: &str) -> NaiveDate {
    parse_view_date(s).expect("valid date")
}

fn at(h: u32, m: u32, s: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, s).expect("valid time")
}

/// A week of office activity across two months.
fn seed<S: RecordStore>(ledger: &Ledger<S>) {
    let rows = [
        ("2024-02-29", at(17, 0, 0), "Choi", 50_000, 0, 0, 0, 0),
        ("2024-03-05", at(9, 0, 0), "Kim", 120_000, 0, 10_000, 0, 0),
        ("2024-03-05", at(14, 30, 0), "Lee", 0, 80_000, 0, 0, 5_000),
        ("2024-03-10", at(10, 0, 0), "Park", 60_000, 0, 0, 20_000, 0),
        ("2024-03-10", at(16, 45, 0), "Jung", 0, 40_000, 15_000, 0, 0),
        ("2024-03-20", at(11, 0, 0), "Han", 30_000, 10_000, 0, 0, 0),
    ];
    for (d, t, name, income_cash, income_etc, exp_cash, cash_out, exp_etc) in rows {
        ledger
            .add_entry_at(
                date(d),
                t,
                EntryDraft {
                    name: name.into(),
                    task: "visa".into(),
                    income_cash,
                    income_etc,
                    exp_cash,
                    cash_out,
                    exp_etc,
                    memo: String::new(),
                },
            )
            .expect("add entry");
    }
}

fn check_daily_close<S: RecordStore>(ledger: &Ledger<S>) {
    seed(ledger);

    // Browsing a past day: figures computed, cache untouched.
    let mid = ledger.view(date("2024-03-10")).expect("view");
    let rec = &mid.reconciliation;
    assert!(!rec.is_latest_date);
    assert_eq!(mid.cache_refresh, Some(CacheRefresh::Skipped));
    assert_eq!(mid.balance, Some(BalanceCache::default()));

    assert_eq!(rec.day_entries.len(), 2);
    assert_eq!(rec.day_entries[0].name, "Park");
    assert_eq!(rec.day.income, 100_000);
    assert_eq!(rec.day.business_expense, 15_000);
    assert_eq!(rec.day.personal_withdrawal, 20_000);
    assert_eq!(rec.day.total_outflow, 35_000);
    assert_eq!(rec.day.net_profit, 85_000);

    // 3/05 and 3/10 only.
    assert_eq!(rec.month_to_date.income, 300_000);
    assert_eq!(rec.month_to_date.business_expense, 30_000);
    assert_eq!(rec.month_to_date.net_profit, 270_000);
    // Whole March, including 3/20.
    assert_eq!(rec.month_net_profit, 310_000);

    // 50k + (120k - 10k) + (60k - 20k) + (-15k)
    assert_eq!(rec.cumulative_cash, 185_000);

    // Closing the latest day publishes the cache.
    let close = ledger.view(date("2024-03-20")).expect("view");
    assert!(close.reconciliation.is_latest_date);
    assert_eq!(close.cache_refresh, Some(CacheRefresh::Written));
    let published = BalanceCache {
        cash: 215_000,
        profit: 310_000,
    };
    assert_eq!(close.balance, Some(published));

    // Same inputs again: same result, no second write.
    let again = ledger.view(date("2024-03-20")).expect("view");
    assert_eq!(again.reconciliation, close.reconciliation);
    assert_eq!(again.cache_refresh, Some(CacheRefresh::Unchanged));

    // Past day still leaves the published cache alone.
    let past = ledger.view(date("2024-03-05")).expect("view");
    assert_eq!(past.balance, Some(published));

    // Deleting the latest entry moves the latest close back to 3/10.
    let latest = ledger
        .load_entries()
        .expect("load")
        .into_iter()
        .find(|e| e.name == "Han")
        .expect("Han entry");
    ledger.delete_entry(&latest.id).expect("delete");
    let reclosed = ledger.view(date("2024-03-10")).expect("view");
    assert!(reclosed.reconciliation.is_latest_date);
    assert_eq!(
        reclosed.balance,
        Some(BalanceCache {
            cash: 185_000,
            profit: 270_000,
        })
    );
}

#[test]
fn test_daily_close_memory_store() {
    let ledger = Ledger::new(MemoryStore::new(), SheetNames::default());
    check_daily_close(&ledger);
    assert_eq!(ledger.store().writes_to("잔액"), 2);
}

#[test]
fn test_daily_close_sqlite_store() {
    let dir = std::env::temp_dir().join("office_ledger_it_daily_close");
    let _ = std::fs::remove_dir_all(&dir);
    let store = db::init(&dir.join("ledger.db")).expect("init store");

    let ledger = Ledger::new(store, SheetNames::default());
    check_daily_close(&ledger);

    drop(ledger);
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_empty_ledger_closes_to_zero() {
    let store = MemoryStore::new();
    let sheets = SheetNames::default();
    store
        .write_all(
            &sheets.balance,
            &[Record::from([
                ("key".to_string(), "cash".to_string()),
                ("value".to_string(), "999".to_string()),
            ])],
            &["key", "value"],
        )
        .expect("seed stale cache");

    let ledger = Ledger::new(&store, sheets);
    let view = ledger.view(date("2024-03-10")).expect("view");
    assert_eq!(view.reconciliation.cumulative_cash, 0);
    assert_eq!(view.balance, Some(BalanceCache::default()));
    assert_eq!(view.cache_refresh, Some(CacheRefresh::Written));
}

#[test]
fn test_dirty_rows_from_store() {
    let store = MemoryStore::new();
    let sheets = SheetNames::default();
    let row = |pairs: &[(&str, &str)]| -> Record {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    };
    store
        .write_all(
            &sheets.daily,
            &[
                row(&[
                    ("id", "a"),
                    ("date", "2024-03-10"),
                    ("time", "09:00:00"),
                    ("income_cash", "1,000"),
                    ("exp_cash", "200"),
                ]),
                row(&[
                    ("id", ""),
                    ("date", "2024-03-10"),
                    ("time", "10:00:00"),
                    ("income_cash", "300.9"),
                ]),
                row(&[("id", "c"), ("date", "someday"), ("income_cash", "5000")]),
            ],
            &LEDGER_COLUMNS,
        )
        .expect("seed rows");

    let ledger = Ledger::new(&store, sheets);
    let entries: Vec<LedgerEntry> = ledger.load_entries().expect("load");
    assert_eq!(entries.len(), 3);
    assert!(!entries[1].id.is_empty());

    let view = ledger.view(date("2024-03-10")).expect("view");
    // "1,000" is not a number and counts as 0.
    assert_eq!(view.reconciliation.day.income, 300);
    assert_eq!(view.reconciliation.cumulative_cash, 100);
}
