//! Planned and in-progress office work.
//!
//! Two id-keyed task lists live next to the ledger in the same record store.
//! Planned tasks are ordered by their horizon (long, mid, short, done, on
//! hold), active tasks by case category; both then by date. Every mutation
//! reloads the list and writes the whole table back, like ledger entries.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::SheetNames;
use crate::entry::parse_date;
use crate::error::{LedgerError, Result, StoreResult};
use crate::store::{Record, RecordStore};

pub const PLANNED_TASK_COLUMNS: [&str; 5] = ["id", "date", "period", "content", "note"];
pub const ACTIVE_TASK_COLUMNS: [&str; 6] = ["id", "category", "date", "name", "work", "details"];

/// Planning horizons in display order.
pub const PERIOD_OPTIONS: [&str; 5] = ["장기🟢", "중기🟡", "단기🔴", "완료✅", "보류⏹️"];

/// Case categories in display order. A category may carry a suffix such as
/// `"기타 - 번역"`; only the part before `" - "` decides the order.
pub const CATEGORY_OPTIONS: [&str; 7] = ["출입국", "전자", "공증", "여권", "초청", "영주권", "기타"];

const CATEGORY_SEPARATOR: &str = " - ";

/// A row type of one of the task tables.
pub trait TaskRow: Clone {
    const COLUMNS: &'static [&'static str];

    fn table(sheets: &SheetNames) -> &str;
    fn id(&self) -> &str;
    fn set_id(&mut self, id: String);
    fn date(&self) -> &str;
    /// Position of the row's group in display order.
    fn rank(&self) -> usize;
    /// Reject rows a user form would not accept.
    fn validate(&self) -> Result<()>;
    fn from_record(record: &Record) -> Self;
    fn to_record(&self) -> Record;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedTask {
    pub id: String,
    pub date: String,
    pub period: String,
    pub content: String,
    pub note: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveTask {
    pub id: String,
    pub category: String,
    pub date: String,
    pub name: String,
    pub work: String,
    pub details: String,
}

fn rank_of(options: &[&str], value: &str) -> usize {
    options
        .iter()
        .position(|o| *o == value)
        .unwrap_or(options.len())
}

fn text(record: &Record, key: &str) -> String {
    record.get(key).cloned().unwrap_or_default()
}

fn record_of(pairs: &[(&str, &str)]) -> Record {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn check_date(date: &str) -> Result<()> {
    parse_date(date)
        .map(|_| ())
        .ok_or_else(|| LedgerError::InvalidDate(date.to_string()))
}

impl TaskRow for PlannedTask {
    const COLUMNS: &'static [&'static str] = &PLANNED_TASK_COLUMNS;

    fn table(sheets: &SheetNames) -> &str {
        &sheets.planned_tasks
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn date(&self) -> &str {
        &self.date
    }

    fn rank(&self) -> usize {
        rank_of(&PERIOD_OPTIONS, &self.period)
    }

    fn validate(&self) -> Result<()> {
        if self.content.trim().is_empty() {
            return Err(LedgerError::MissingField("content"));
        }
        check_date(&self.date)
    }

    fn from_record(record: &Record) -> Self {
        Self {
            id: text(record, "id").trim().to_string(),
            date: text(record, "date").trim().to_string(),
            period: text(record, "period"),
            content: text(record, "content"),
            note: text(record, "note"),
        }
    }

    fn to_record(&self) -> Record {
        record_of(&[
            ("id", self.id.as_str()),
            ("date", self.date.as_str()),
            ("period", self.period.as_str()),
            ("content", self.content.as_str()),
            ("note", self.note.as_str()),
        ])
    }
}

impl TaskRow for ActiveTask {
    const COLUMNS: &'static [&'static str] = &ACTIVE_TASK_COLUMNS;

    fn table(sheets: &SheetNames) -> &str {
        &sheets.active_tasks
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn date(&self) -> &str {
        &self.date
    }

    fn rank(&self) -> usize {
        let main = self
            .category
            .split(CATEGORY_SEPARATOR)
            .next()
            .unwrap_or_default();
        rank_of(&CATEGORY_OPTIONS, main)
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(LedgerError::MissingField("name"));
        }
        if self.work.trim().is_empty() {
            return Err(LedgerError::MissingField("work"));
        }
        check_date(&self.date)
    }

    fn from_record(record: &Record) -> Self {
        Self {
            id: text(record, "id").trim().to_string(),
            category: text(record, "category"),
            date: text(record, "date").trim().to_string(),
            name: text(record, "name"),
            work: text(record, "work"),
            details: text(record, "details"),
        }
    }

    fn to_record(&self) -> Record {
        record_of(&[
            ("id", self.id.as_str()),
            ("category", self.category.as_str()),
            ("date", self.date.as_str()),
            ("name", self.name.as_str()),
            ("work", self.work.as_str()),
            ("details", self.details.as_str()),
        ])
    }
}

/// Load a task list in display order.
///
/// Rows stored without an id get one, and the table is written back once so
/// the ids stay stable.
pub fn load<T: TaskRow, S: RecordStore>(store: &S, sheets: &SheetNames) -> StoreResult<Vec<T>> {
    let table = T::table(sheets);
    let mut tasks: Vec<T> = store
        .read_all(table)?
        .iter()
        .map(T::from_record)
        .collect();

    let mut repaired = 0;
    for task in tasks.iter_mut().filter(|t| t.id().is_empty()) {
        task.set_id(Uuid::new_v4().to_string());
        repaired += 1;
    }
    if repaired > 0 {
        match save(store, sheets, &tasks) {
            Ok(()) => info!(table, repaired, "assigned ids to stored task rows"),
            Err(e) => warn!(table, repaired, "assigned task ids not persisted: {e}"),
        }
    }

    sort(&mut tasks);
    Ok(tasks)
}

pub fn save<T: TaskRow, S: RecordStore>(
    store: &S,
    sheets: &SheetNames,
    tasks: &[T],
) -> StoreResult<()> {
    let records: Vec<Record> = tasks.iter().map(T::to_record).collect();
    store.write_all(T::table(sheets), &records, T::COLUMNS)
}

/// Group rank first, then date. Undated or malformed dates sort last within
/// their group; the sort is stable otherwise.
pub fn sort<T: TaskRow>(tasks: &mut [T]) {
    tasks.sort_by_key(|t| {
        let date = parse_date(t.date());
        (t.rank(), date.is_none(), date)
    });
}

/// Store `task` under a fresh id.
pub fn add<T: TaskRow, S: RecordStore>(store: &S, sheets: &SheetNames, mut task: T) -> Result<T> {
    task.validate()?;
    let mut tasks: Vec<T> = load(store, sheets)?;
    task.set_id(Uuid::new_v4().to_string());
    tasks.push(task.clone());
    save(store, sheets, &tasks)?;

    info!(table = T::table(sheets), task_id = %task.id(), "task added");
    Ok(task)
}

/// Replace the stored task that has `task`'s id.
pub fn update<T: TaskRow, S: RecordStore>(store: &S, sheets: &SheetNames, task: T) -> Result<T> {
    task.validate()?;
    let mut tasks: Vec<T> = load(store, sheets)?;
    let slot = tasks
        .iter_mut()
        .find(|t| t.id() == task.id())
        .ok_or_else(|| LedgerError::EntryNotFound(task.id().to_string()))?;
    *slot = task.clone();
    save(store, sheets, &tasks)?;

    info!(table = T::table(sheets), task_id = %task.id(), "task updated");
    Ok(task)
}

pub fn remove<T: TaskRow, S: RecordStore>(store: &S, sheets: &SheetNames, id: &str) -> Result<T> {
    let mut tasks: Vec<T> = load(store, sheets)?;
    let pos = tasks
        .iter()
        .position(|t| t.id() == id)
        .ok_or_else(|| LedgerError::EntryNotFound(id.to_string()))?;
    let removed = tasks.remove(pos);
    save(store, sheets, &tasks)?;

    info!(table = T::table(sheets), task_id = %id, "task removed");
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn planned(date: &str, period: &str, content: &str) -> PlannedTask {
        PlannedTask {
            date: date.into(),
            period: period.into(),
            content: content.into(),
            ..PlannedTask::default()
        }
    }

    fn active(category: &str, date: &str, name: &str) -> ActiveTask {
        ActiveTask {
            category: category.into(),
            date: date.into(),
            name: name.into(),
            work: "visa".into(),
            ..ActiveTask::default()
        }
    }

    #[test]
    fn test_add_assigns_id_and_persists() {
        let store = MemoryStore::new();
        let sheets = SheetNames::default();
        let added = add(
            &store,
            &sheets,
            planned("2024-03-10", "단기🔴", "file tax report"),
        )
        .unwrap();
        assert!(Uuid::parse_str(&added.id).is_ok());

        let stored: Vec<PlannedTask> = load(&store, &sheets).unwrap();
        assert_eq!(stored, vec![added]);
        assert_eq!(
            store.columns("예정업무").unwrap(),
            PLANNED_TASK_COLUMNS.map(String::from).to_vec()
        );
    }

    #[test]
    fn test_add_rejects_incomplete_rows() {
        let store = MemoryStore::new();
        let sheets = SheetNames::default();
        assert!(matches!(
            add(&store, &sheets, planned("2024-03-10", "장기🟢", " ")),
            Err(LedgerError::MissingField("content"))
        ));
        assert!(matches!(
            add(&store, &sheets, planned("2024-3-10", "장기🟢", "x")),
            Err(LedgerError::InvalidDate(_))
        ));
        let mut task = active("여권", "2024-03-10", "Kim");
        task.work.clear();
        assert!(matches!(
            add(&store, &sheets, task),
            Err(LedgerError::MissingField("work"))
        ));
        assert_eq!(store.writes_to("예정업무"), 0);
        assert_eq!(store.writes_to("진행업무"), 0);
    }

    #[test]
    fn test_planned_ordered_by_period_then_date() {
        let store = MemoryStore::new();
        let sheets = SheetNames::default();
        for task in [
            planned("2024-03-01", "완료✅", "done"),
            planned("2024-03-20", "장기🟢", "long later"),
            planned("2024-03-05", "단기🔴", "short"),
            planned("2024-03-02", "장기🟢", "long sooner"),
            planned("2024-03-01", "someday", "unknown period"),
        ] {
            add(&store, &sheets, task).unwrap();
        }

        let order: Vec<String> = load::<PlannedTask, _>(&store, &sheets)
            .unwrap()
            .into_iter()
            .map(|t| t.content)
            .collect();
        assert_eq!(
            order,
            vec!["long sooner", "long later", "short", "done", "unknown period"]
        );
    }

    #[test]
    fn test_active_ordered_by_main_category() {
        let mut tasks = vec![
            active("기타 - 번역", "2024-03-01", "A"),
            active("출입국", "2024-03-09", "B"),
            active("여권", "2024-03-02", "C"),
            active("출입국", "2024-03-03", "D"),
            active("출입국", "", "E"),
        ];
        sort(&mut tasks);
        let names: Vec<&str> = tasks.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["D", "B", "E", "C", "A"]);
    }

    #[test]
    fn test_update_and_remove_by_id() {
        let store = MemoryStore::new();
        let sheets = SheetNames::default();
        let kim = add(&store, &sheets, active("초청", "2024-03-10", "Kim")).unwrap();
        let lee = add(&store, &sheets, active("공증", "2024-03-11", "Lee")).unwrap();

        let mut edited = kim.clone();
        edited.details = "documents received".into();
        update(&store, &sheets, edited.clone()).unwrap();

        let removed: ActiveTask = remove(&store, &sheets, &lee.id).unwrap();
        assert_eq!(removed, lee);
        assert_eq!(load::<ActiveTask, _>(&store, &sheets).unwrap(), vec![edited]);

        assert!(matches!(
            remove::<ActiveTask, _>(&store, &sheets, &lee.id),
            Err(LedgerError::EntryNotFound(_))
        ));
        let mut ghost = kim;
        ghost.id = "missing".into();
        assert!(matches!(
            update(&store, &sheets, ghost),
            Err(LedgerError::EntryNotFound(id)) if id == "missing"
        ));
    }

    #[test]
    fn test_blank_ids_repaired_once() {
        let store = MemoryStore::new();
        let sheets = SheetNames::default();
        let row = record_of(&[("date", "2024-03-10"), ("content", "renew lease")]);
        store
            .write_all(&sheets.planned_tasks, &[row], &PLANNED_TASK_COLUMNS)
            .unwrap();

        let first: Vec<PlannedTask> = load(&store, &sheets).unwrap();
        let second: Vec<PlannedTask> = load(&store, &sheets).unwrap();
        assert!(!first[0].id.is_empty());
        assert_eq!(first, second);
        assert_eq!(store.writes_to(&sheets.planned_tasks), 2);

        let removed: PlannedTask = remove(&store, &sheets, &first[0].id).unwrap();
        assert_eq!(removed.content, "renew lease");
    }

    #[test]
    fn test_store_failure_propagates() {
        let store = MemoryStore::new();
        let sheets = SheetNames::default();
        store.set_failing(true);
        assert!(load::<ActiveTask, _>(&store, &sheets).is_err());
        assert!(matches!(
            add(&store, &sheets, active("전자", "2024-03-10", "Kim")),
            Err(LedgerError::Store(_))
        ));
    }
}
