//! Observable events for the WAL and recovery subsystems
//!
//! Events are explicit and typed; the string form is what appears in the
//! `event` field of a log line.

use std::fmt;

/// Lifecycle events emitted by the store, recovery engine and scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Store
    /// Log file opened (created if missing)
    WalOpened,
    /// Staged records written to the log file
    WalFlush,
    /// A flush failed; records stay staged
    WalFlushFailed,
    /// A persisted line could not be decoded and was skipped
    WalLineSkipped,

    // Checkpoint
    /// Checkpoint started
    CheckpointStart,
    /// Checkpoint record durable and pages flushed
    CheckpointComplete,
    /// Checkpoint failed
    CheckpointFailed,
    /// Background checkpoint thread started
    SchedulerStarted,
    /// Background checkpoint thread stopped
    SchedulerStopped,

    // Selective rollback
    /// Rollback requested without any target ids
    RollbackNoTargets,
    /// Rollback planning complete
    RollbackComplete,

    // Crash recovery
    /// REDO pass complete
    RecoveryRedoComplete,
    /// UNDO pass complete
    RecoveryUndoComplete,
    /// A rollback or crash recovery call failed
    RecoveryFailed,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::WalOpened => "WAL_OPENED",
            Event::WalFlush => "WAL_FLUSH",
            Event::WalFlushFailed => "WAL_FLUSH_FAILED",
            Event::WalLineSkipped => "WAL_LINE_SKIPPED",

            Event::CheckpointStart => "CHECKPOINT_BEGIN",
            Event::CheckpointComplete => "CHECKPOINT_COMPLETE",
            Event::CheckpointFailed => "CHECKPOINT_FAILED",
            Event::SchedulerStarted => "CHECKPOINT_SCHEDULER_STARTED",
            Event::SchedulerStopped => "CHECKPOINT_SCHEDULER_STOPPED",

            Event::RollbackNoTargets => "ROLLBACK_NO_TARGETS",
            Event::RollbackComplete => "ROLLBACK_COMPLETE",

            Event::RecoveryRedoComplete => "RECOVERY_REDO_COMPLETE",
            Event::RecoveryUndoComplete => "RECOVERY_UNDO_COMPLETE",
            Event::RecoveryFailed => "RECOVERY_FAILED",
        }
    }

    /// Returns true if the event reports a failure
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Event::WalFlushFailed | Event::CheckpointFailed | Event::RecoveryFailed
        )
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
