//! Crash recovery: REDO from the last checkpoint, then UNDO
//!
//! # REDO
//!
//! Forward over the records after the last CHECKPOINT, starting from its
//! active set. START adds, COMMIT/ABORT remove, and every data statement is
//! planned for replay in log order (history is repeated, including work of
//! transactions that are undone afterwards).
//!
//! # UNDO
//!
//! Backward over the whole log for every transaction still active, until
//! each reaches its START.
//!
//! The executor applies all of `redo` before any of `undo`, then appends
//! ABORT for every id in `aborted_transactions`.
//!
//! Only the file is planned over. Transactions with records still in the
//! staging buffer stay in the active set so a later rollback finds them.

use std::collections::BTreeSet;
use std::path::Path;

use super::criteria::PlannedStatement;
use super::errors::RecoveryResult;
use super::undo_pass::undo_pass;
use crate::observability::{log_event_with_fields, Event, WalMetrics};
use crate::wal::{read_all, LogRecord, RecordType, TransactionId, WalState};

/// Statements the executor must apply after a crash
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrashRecoveryPlan {
    /// Original statements to replay, in log order
    pub redo: Vec<PlannedStatement>,
    /// Inverse statements, newest change first
    pub undo: Vec<PlannedStatement>,
    /// Transactions rolled back by `undo`; each needs an ABORT record
    pub aborted_transactions: BTreeSet<TransactionId>,
}

impl CrashRecoveryPlan {
    /// True if there is nothing to apply
    pub fn is_empty(&self) -> bool {
        self.redo.is_empty() && self.undo.is_empty()
    }
}

pub(crate) fn plan_crash_recovery(
    log_path: &Path,
    metrics: &WalMetrics,
    state: &mut WalState,
) -> RecoveryResult<CrashRecoveryPlan> {
    let contents = read_all(log_path)?;
    metrics.add_lines_skipped(contents.skipped_lines as u64);

    let mut active = contents.checkpoint_snapshot.clone();
    let mut redo = Vec::new();

    for record in contents
        .since_last_checkpoint()
        .iter()
        .filter_map(LogRecord::as_transaction)
    {
        let transaction_id = record.transaction_id;
        match record.record_type {
            RecordType::Start => {
                active.insert(transaction_id);
            }
            RecordType::Commit | RecordType::Abort => {
                active.remove(&transaction_id);
            }
            kind if kind.is_data() => {
                if let Some(statement) = &record.statement {
                    redo.push(PlannedStatement::new(transaction_id, statement.clone()));
                }
            }
            _ => {}
        }
    }

    log_event_with_fields(
        Event::RecoveryRedoComplete,
        &[
            ("statements", &redo.len().to_string()),
            ("active", &format!("{:?}", active)),
        ],
    );

    let aborted_transactions = active.clone();
    let mut undo = Vec::new();
    let records = contents
        .records
        .iter()
        .rev()
        .filter_map(LogRecord::as_transaction);
    undo_pass(records, &mut active, &mut undo)?;

    log_event_with_fields(
        Event::RecoveryUndoComplete,
        &[
            ("statements", &undo.len().to_string()),
            ("unresolved", &format!("{:?}", active)),
        ],
    );

    // Staged records are not in the file; apply them as `append` did.
    for record in &state.staging {
        if record.record_type == RecordType::Abort {
            active.remove(&record.transaction_id);
        } else {
            active.insert(record.transaction_id);
        }
    }

    state.active = active;
    Ok(CrashRecoveryPlan {
        redo,
        undo,
        aborted_transactions,
    })
}
