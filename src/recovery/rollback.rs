//! Selective rollback of in-flight transactions
//!
//! 1. Keep only targets that are still active
//! 2. Scan the staging buffer newest first
//! 3. If some target has not reached its START, continue over the
//!    persisted log, last line first
//!
//! Targets whose START was reached leave the store's active set. Nothing
//! is written to the log; the caller applies the plan and appends ABORT.

use std::collections::BTreeSet;
use std::path::Path;

use super::criteria::PlannedStatement;
use super::errors::RecoveryResult;
use super::undo_pass::undo_pass;
use crate::observability::WalMetrics;
use crate::wal::{read_all, LogRecord, TransactionId, WalState};

pub(crate) fn plan_rollback(
    log_path: &Path,
    metrics: &WalMetrics,
    state: &mut WalState,
    targets: &BTreeSet<TransactionId>,
) -> RecoveryResult<Vec<PlannedStatement>> {
    let mut pending: BTreeSet<TransactionId> =
        targets.intersection(&state.active).copied().collect();
    if pending.is_empty() {
        return Ok(Vec::new());
    }

    let mut plan = Vec::new();
    let mut finished = undo_pass(state.staging.iter().rev(), &mut pending, &mut plan)?;

    if !pending.is_empty() {
        let contents = read_all(log_path)?;
        metrics.add_lines_skipped(contents.skipped_lines as u64);
        let persisted = contents
            .records
            .iter()
            .rev()
            .filter_map(LogRecord::as_transaction);
        finished.extend(undo_pass(persisted, &mut pending, &mut plan)?);
    }

    for transaction_id in &finished {
        state.active.remove(transaction_id);
    }
    Ok(plan)
}
