//! Rollback request and planned statements

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};

use crate::wal::TransactionId;

/// Which transactions to roll back
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoverCriteria {
    pub transaction_ids: BTreeSet<TransactionId>,
    /// Accepted and logged, but not used to bound the rollback
    pub timestamp: Option<DateTime<Utc>>,
}

impl RecoverCriteria {
    /// Criteria for the given transactions
    pub fn new(transaction_ids: impl IntoIterator<Item = TransactionId>) -> Self {
        Self {
            transaction_ids: transaction_ids.into_iter().collect(),
            timestamp: None,
        }
    }

    /// Attach a timestamp
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// True if no transaction is named
    pub fn is_empty(&self) -> bool {
        self.transaction_ids.is_empty()
    }
}

/// A statement for the executor, tagged with its transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedStatement {
    pub transaction_id: TransactionId,
    pub statement: String,
}

impl PlannedStatement {
    pub fn new(transaction_id: TransactionId, statement: impl Into<String>) -> Self {
        Self {
            transaction_id,
            statement: statement.into(),
        }
    }
}

impl fmt::Display for PlannedStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.transaction_id, self.statement)
    }
}

impl From<(TransactionId, &str)> for PlannedStatement {
    fn from((transaction_id, statement): (TransactionId, &str)) -> Self {
        Self::new(transaction_id, statement)
    }
}
