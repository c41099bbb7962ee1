//! Recovery manager
//!
//! Entry point for selective rollback and crash recovery on one store.
//! Every call runs inside the store's critical section, so no append or
//! checkpoint interleaves with a scan.

use std::collections::BTreeSet;
use std::sync::Arc;

use super::crash::{plan_crash_recovery, CrashRecoveryPlan};
use super::criteria::{PlannedStatement, RecoverCriteria};
use super::errors::RecoveryResult;
use super::rollback::plan_rollback;
use crate::observability::{log_event_with_fields, Event, Logger, ObservationScope};
use crate::wal::{format_timestamp, TransactionId, WalStore};

/// Plans undo/redo statements from a store's staging buffer and log
pub struct RecoveryManager {
    store: Arc<WalStore>,
}

impl RecoveryManager {
    pub fn new(store: Arc<WalStore>) -> Self {
        Self { store }
    }

    /// The store being recovered
    pub fn store(&self) -> &Arc<WalStore> {
        &self.store
    }

    /// Roll back the transactions named in `criteria`.
    ///
    /// An empty id set is not an error: it is logged and yields no
    /// statements. The timestamp is logged but not applied.
    pub fn recover(&self, criteria: &RecoverCriteria) -> RecoveryResult<Vec<PlannedStatement>> {
        if criteria.is_empty() {
            log_event_with_fields(
                Event::RollbackNoTargets,
                &[("reason", "no transaction ids supplied")],
            );
            return Ok(Vec::new());
        }
        if let Some(timestamp) = criteria.timestamp {
            Logger::info(
                "ROLLBACK_TIMESTAMP_IGNORED",
                &[("timestamp", &format_timestamp(&timestamp))],
            );
        }
        self.rollback(&criteria.transaction_ids)
    }

    /// Plan the undo of every active transaction in `targets`, newest
    /// change first.
    ///
    /// Targets that are not active are ignored; if none is, the result is
    /// empty and nothing is recorded. Transactions whose START is reached
    /// leave the active set.
    ///
    /// # Errors
    ///
    /// - `RECOVERY_MISSING_LOG_FILE` if the scan needs the persisted log
    ///   and it does not exist
    /// - `RECOVERY_LOG_UNREADABLE`, `RECOVERY_UNDO_FAILED`
    ///
    /// On error the active set is unchanged.
    pub fn rollback(
        &self,
        targets: &BTreeSet<TransactionId>,
    ) -> RecoveryResult<Vec<PlannedStatement>> {
        let store = &self.store;
        let result = store.critical_section(|state| {
            plan_rollback(store.log_path(), store.metrics(), state, targets)
        });

        match &result {
            Ok(plan) if plan.is_empty() => {}
            Ok(plan) => {
                store.metrics().record_rollback();
                log_event_with_fields(
                    Event::RollbackComplete,
                    &[
                        ("targets", &format!("{:?}", targets)),
                        ("statements", &plan.len().to_string()),
                    ],
                );
            }
            Err(err) => {
                store.metrics().record_recovery_failure();
                log_event_with_fields(
                    Event::RecoveryFailed,
                    &[
                        ("operation", "rollback"),
                        ("code", err.code().code()),
                        ("reason", &err.to_string()),
                    ],
                );
            }
        }
        result
    }

    /// Rebuild the plan after an unclean shutdown: REDO from the last
    /// checkpoint, then UNDO of everything left active.
    ///
    /// Reads only the persisted log. Afterwards the store's active set
    /// holds the transactions whose START could not be found, plus those
    /// with records still staged.
    pub fn recover_after_crash(&self) -> RecoveryResult<CrashRecoveryPlan> {
        let store = &self.store;
        let path = store.log_path().display().to_string();
        let scope = ObservationScope::with_fields("CRASH_RECOVERY", &[("path", &path)]);

        let result = store
            .critical_section(|state| plan_crash_recovery(store.log_path(), store.metrics(), state));

        match &result {
            Ok(plan) => {
                store.metrics().record_crash_recovery();
                scope.complete(&[
                    ("redo", &plan.redo.len().to_string()),
                    ("undo", &plan.undo.len().to_string()),
                    ("aborted", &format!("{:?}", plan.aborted_transactions)),
                ]);
            }
            Err(err) => {
                store.metrics().record_recovery_failure();
                scope.fail(&err.to_string());
            }
        }
        result
    }
}
