//! Free-text office memos.
//!
//! Three independent notes (long-term, mid-term, short-term), each kept in
//! cell `A1` of its own table.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::SheetNames;
use crate::error::StoreResult;
use crate::store::RecordStore;

const MEMO_CELL: &str = "A1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoSlot {
    Long,
    Mid,
    Short,
}

impl MemoSlot {
    pub fn table(self, sheets: &SheetNames) -> &str {
        match self {
            MemoSlot::Long => &sheets.memo_long,
            MemoSlot::Mid => &sheets.memo_mid,
            MemoSlot::Short => &sheets.memo_short,
        }
    }
}

/// Memo text, or an empty string when nothing has been saved yet.
pub fn load<S: RecordStore>(store: &S, sheets: &SheetNames, slot: MemoSlot) -> StoreResult<String> {
    Ok(store
        .read_cell(slot.table(sheets), MEMO_CELL)?
        .unwrap_or_default())
}

pub fn save<S: RecordStore>(
    store: &S,
    sheets: &SheetNames,
    slot: MemoSlot,
    content: &str,
) -> StoreResult<()> {
    store.write_cell(slot.table(sheets), MEMO_CELL, content)?;
    info!(slot = ?slot, chars = content.chars().count(), "memo saved");
    Ok(())
}
