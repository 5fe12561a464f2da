//! Error types for the record store and the ledger service.
//!
//! The reconciliation engine itself never fails; these only surface from
//! persistence and from user-driven mutations.

use thiserror::Error;

use crate::entry::LedgerEntry;

/// Failure talking to a [`RecordStore`](crate::store::RecordStore).
///
/// Always recoverable from the caller's point of view: the in-memory entry
/// collection stays valid and the operation can be retried.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("row encoding: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("record store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The entry was built but the table write failed. Hand it back to
    /// [`Ledger::insert_entry`](crate::ledger::Ledger::insert_entry) to retry.
    #[error("ledger entry {} not saved: {source}", .entry.id)]
    Unsaved {
        entry: Box<LedgerEntry>,
        #[source]
        source: StoreError,
    },

    #[error("ledger entry not found: {0}")]
    EntryNotFound(String),

    #[error("either name or task must be filled in")]
    MissingNameOrTask,

    #[error("{0} must be filled in")]
    MissingField(&'static str),

    #[error("invalid date: {0}")]
    InvalidDate(String),
}

impl LedgerError {
    /// The entry a failed add carried, if any.
    pub fn unsaved_entry(&self) -> Option<&LedgerEntry> {
        match self {
            Self::Unsaved { entry, .. } => Some(entry),
            _ => None,
        }
    }

    /// The underlying store failure, if any.
    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            Self::Store(e) | Self::Unsaved { source: e, .. } => Some(e),
            _ => None,
        }
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
pub type Result<T> = std::result::Result<T, LedgerError>;
