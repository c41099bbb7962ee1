//! Recovery error types
//!
//! Error codes:
//! - RECOVERY_MISSING_LOG_FILE (ERROR: recovery needs the persisted log)
//! - RECOVERY_LOG_UNREADABLE (ERROR)
//! - RECOVERY_UNDO_FAILED (ERROR: an inverse statement could not be built)
//!
//! Any of these aborts the recovery call; no partial plan is returned and
//! the store's active set is left untouched.

use std::fmt;

use crate::undo::UndoError;
use crate::wal::{TransactionId, WalError};

/// Severity levels for recovery errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The recovery call failed and reported why
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// Recovery error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryErrorCode {
    /// The persisted log does not exist
    RecoveryMissingLogFile,
    /// The persisted log could not be read
    RecoveryLogUnreadable,
    /// Building an undo statement failed
    RecoveryUndoFailed,
}

impl RecoveryErrorCode {
    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            RecoveryErrorCode::RecoveryMissingLogFile => "RECOVERY_MISSING_LOG_FILE",
            RecoveryErrorCode::RecoveryLogUnreadable => "RECOVERY_LOG_UNREADABLE",
            RecoveryErrorCode::RecoveryUndoFailed => "RECOVERY_UNDO_FAILED",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        Severity::Error
    }
}

impl fmt::Display for RecoveryErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[derive(Debug)]
enum Cause {
    Wal(WalError),
    Undo(UndoError),
}

/// Recovery error type with full context
#[derive(Debug)]
pub struct RecoveryError {
    code: RecoveryErrorCode,
    message: String,
    transaction_id: Option<TransactionId>,
    cause: Cause,
}

impl RecoveryError {
    /// Undo construction failed for a record of `transaction_id`
    pub fn undo_failed(transaction_id: TransactionId, err: UndoError) -> Self {
        Self {
            code: RecoveryErrorCode::RecoveryUndoFailed,
            message: format!("Cannot undo transaction {}", transaction_id),
            transaction_id: Some(transaction_id),
            cause: Cause::Undo(err),
        }
    }

    /// Returns the error code
    pub fn code(&self) -> RecoveryErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Transaction whose record could not be undone, if any
    pub fn transaction_id(&self) -> Option<TransactionId> {
        self.transaction_id
    }

    /// True when recovery failed because the log file is absent
    pub fn is_missing_log_file(&self) -> bool {
        self.code == RecoveryErrorCode::RecoveryMissingLogFile
    }
}

impl From<WalError> for RecoveryError {
    fn from(err: WalError) -> Self {
        let (code, message) = if err.is_missing_log_file() {
            (
                RecoveryErrorCode::RecoveryMissingLogFile,
                "No log file, abort recovery",
            )
        } else {
            (RecoveryErrorCode::RecoveryLogUnreadable, "Log file could not be read")
        };
        Self {
            code,
            message: message.to_string(),
            transaction_id: None,
            cause: Cause::Wal(err),
        }
    }
}

impl fmt::Display for RecoveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )?;
        match &self.cause {
            Cause::Wal(err) => write!(f, " (caused by: {})", err),
            Cause::Undo(err) => write!(f, " (caused by: {})", err),
        }
    }
}

impl std::error::Error for RecoveryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.cause {
            Cause::Wal(err) => Some(err),
            Cause::Undo(err) => Some(err),
        }
    }
}

/// Result type for recovery operations
pub type RecoveryResult<T> = Result<T, RecoveryError>;
