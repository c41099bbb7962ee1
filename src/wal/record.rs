//! WAL record types
//!
//! A log holds two kinds of record:
//! - transaction records (START, INSERT, UPDATE, DELETE, COMMIT, ABORT),
//!   created by the executor and carrying the statement text and row images
//! - checkpoint records, created by the store and carrying the set of
//!   transactions active at that instant
//!
//! Records are immutable once built.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use super::errors::{WalError, WalResult};
use super::row::RowImage;

/// Transaction identifier assigned by the executor
pub type TransactionId = u64;

/// Kind of a transaction record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    /// Transaction began
    Start,
    /// Rows inserted
    Insert,
    /// Rows updated
    Update,
    /// Rows deleted
    Delete,
    /// Transaction committed (terminal)
    Commit,
    /// Transaction aborted (terminal)
    Abort,
}

impl RecordType {
    /// Token written to the log
    pub fn as_str(self) -> &'static str {
        match self {
            RecordType::Start => "START",
            RecordType::Insert => "INSERT",
            RecordType::Update => "UPDATE",
            RecordType::Delete => "DELETE",
            RecordType::Commit => "COMMIT",
            RecordType::Abort => "ABORT",
        }
    }

    /// True for INSERT, UPDATE and DELETE
    pub fn is_data(self) -> bool {
        matches!(self, RecordType::Insert | RecordType::Update | RecordType::Delete)
    }

    /// True for COMMIT and ABORT
    pub fn is_terminal(self) -> bool {
        matches!(self, RecordType::Commit | RecordType::Abort)
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "START" => Ok(RecordType::Start),
            "INSERT" => Ok(RecordType::Insert),
            "UPDATE" => Ok(RecordType::Update),
            "DELETE" => Ok(RecordType::Delete),
            "COMMIT" => Ok(RecordType::Commit),
            "ABORT" => Ok(RecordType::Abort),
            other => Err(format!("unknown record kind '{}'", other)),
        }
    }
}

/// One executor-produced log entry
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRecord {
    pub record_type: RecordType,
    pub transaction_id: TransactionId,
    pub timestamp: DateTime<Utc>,
    /// Original statement text, replayed verbatim during REDO
    pub statement: Option<String>,
    pub before: Option<RowImage>,
    pub after: Option<RowImage>,
}

impl TransactionRecord {
    /// Build a record stamped with the current time
    pub fn new(
        record_type: RecordType,
        transaction_id: TransactionId,
        statement: Option<String>,
        before: Option<RowImage>,
        after: Option<RowImage>,
    ) -> Self {
        Self {
            record_type,
            transaction_id,
            timestamp: Utc::now(),
            statement,
            before,
            after,
        }
    }

    /// START record
    pub fn start(transaction_id: TransactionId) -> Self {
        Self::new(RecordType::Start, transaction_id, None, None, None)
    }

    /// INSERT record; `after` holds the inserted rows
    pub fn insert(transaction_id: TransactionId, statement: impl Into<String>, after: RowImage) -> Self {
        Self::new(
            RecordType::Insert,
            transaction_id,
            Some(statement.into()),
            Some(RowImage::empty()),
            Some(after),
        )
    }

    /// UPDATE record; images are paired by position
    pub fn update(
        transaction_id: TransactionId,
        statement: impl Into<String>,
        before: RowImage,
        after: RowImage,
    ) -> Self {
        Self::new(
            RecordType::Update,
            transaction_id,
            Some(statement.into()),
            Some(before),
            Some(after),
        )
    }

    /// DELETE record; `before` holds the matched rows, `after` what survived
    pub fn delete(
        transaction_id: TransactionId,
        statement: impl Into<String>,
        before: RowImage,
        after: RowImage,
    ) -> Self {
        Self::new(
            RecordType::Delete,
            transaction_id,
            Some(statement.into()),
            Some(before),
            Some(after),
        )
    }

    /// COMMIT record
    pub fn commit(transaction_id: TransactionId) -> Self {
        Self::new(RecordType::Commit, transaction_id, None, None, None)
    }

    /// ABORT record
    pub fn abort(transaction_id: TransactionId) -> Self {
        Self::new(RecordType::Abort, transaction_id, None, None, None)
    }

    /// Override the timestamp
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Refuse images the log line cannot reproduce (NaN, infinities).
    pub fn validate(&self) -> WalResult<()> {
        for (side, image) in [("before", &self.before), ("after", &self.after)] {
            if let Some(column) = image.as_ref().and_then(|i| i.non_finite_column()) {
                return Err(WalError::invalid_record(
                    "Non-finite float in row image",
                    format!(
                        "transaction: {}, image: {}, column: {}",
                        self.transaction_id, side, column
                    ),
                ));
            }
        }
        Ok(())
    }
}

/// Checkpoint marker carrying the active set at the time it was written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointRecord {
    pub timestamp: DateTime<Utc>,
    pub active_transactions: BTreeSet<TransactionId>,
}

impl CheckpointRecord {
    /// Checkpoint stamped with the current time
    pub fn new(active_transactions: BTreeSet<TransactionId>) -> Self {
        Self {
            timestamp: Utc::now(),
            active_transactions,
        }
    }
}

/// Any record found in the persisted log
#[derive(Debug, Clone, PartialEq)]
pub enum LogRecord {
    Transaction(TransactionRecord),
    Checkpoint(CheckpointRecord),
}

impl LogRecord {
    /// Kind token as written to the log
    pub fn kind(&self) -> &'static str {
        match self {
            LogRecord::Transaction(r) => r.record_type.as_str(),
            LogRecord::Checkpoint(_) => "CHECKPOINT",
        }
    }

    /// Transaction id; absent for checkpoints
    pub fn transaction_id(&self) -> Option<TransactionId> {
        match self {
            LogRecord::Transaction(r) => Some(r.transaction_id),
            LogRecord::Checkpoint(_) => None,
        }
    }

    /// Timestamp of the record
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            LogRecord::Transaction(r) => r.timestamp,
            LogRecord::Checkpoint(c) => c.timestamp,
        }
    }

    /// The transaction record, if this is one
    pub fn as_transaction(&self) -> Option<&TransactionRecord> {
        match self {
            LogRecord::Transaction(r) => Some(r),
            LogRecord::Checkpoint(_) => None,
        }
    }
}

impl From<TransactionRecord> for LogRecord {
    fn from(record: TransactionRecord) -> Self {
        LogRecord::Transaction(record)
    }
}

impl From<CheckpointRecord> for LogRecord {
    fn from(record: CheckpointRecord) -> Self {
        LogRecord::Checkpoint(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wal::row::Row;
    use crate::wal::WalErrorCode;

    #[test]
    fn test_validate_rejects_non_finite_images() {
        let ok = TransactionRecord::insert(1, "INSERT", RowImage::new(vec![Row::new().with("x", 1.5)]));
        assert!(ok.validate().is_ok());
        assert!(TransactionRecord::commit(1).validate().is_ok());

        let bad = TransactionRecord::update(
            1,
            "UPDATE t SET x=0",
            RowImage::new(vec![Row::new().with("x", f64::INFINITY)]),
            RowImage::new(vec![Row::new().with("x", 0.0)]),
        );
        let err = bad.validate().unwrap_err();
        assert_eq!(err.code(), WalErrorCode::WalInvalidRecord);
        assert!(err.to_string().contains("image: before"));
    }

    #[test]
    fn test_record_type_round_trips_through_token() {
        for t in [
            RecordType::Start,
            RecordType::Insert,
            RecordType::Update,
            RecordType::Delete,
            RecordType::Commit,
            RecordType::Abort,
        ] {
            assert_eq!(t.as_str().parse::<RecordType>().unwrap(), t);
        }
        assert!("ACTIVE".parse::<RecordType>().is_err());
        assert!("start".parse::<RecordType>().is_err());
    }

    #[test]
    fn test_classification() {
        assert!(RecordType::Delete.is_data());
        assert!(!RecordType::Start.is_data());
        assert!(RecordType::Abort.is_terminal());
        assert!(!RecordType::Update.is_terminal());
    }

    #[test]
    fn test_insert_constructor_captures_after_image() {
        let after = RowImage::new(vec![Row::new().with("id", 2)]);
        let record = TransactionRecord::insert(7, "INSERT INTO t (id) VALUES (2);", after.clone());
        assert_eq!(record.record_type, RecordType::Insert);
        assert_eq!(record.after, Some(after));
        assert_eq!(record.before, Some(RowImage::empty()));
    }

    #[test]
    fn test_log_record_accessors() {
        let start: LogRecord = TransactionRecord::start(3).into();
        assert_eq!(start.kind(), "START");
        assert_eq!(start.transaction_id(), Some(3));

        let cp: LogRecord = CheckpointRecord::new(BTreeSet::from([1, 2])).into();
        assert_eq!(cp.kind(), "CHECKPOINT");
        assert_eq!(cp.transaction_id(), None);
        assert!(cp.as_transaction().is_none());
    }
}
