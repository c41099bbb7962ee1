//! Checkpoint error types
//!
//! All checkpoint errors are ERROR severity. A failed checkpoint leaves the
//! staging buffer and the active set as they were, so it is always safe to
//! retry.

use std::fmt;
use std::io;

use crate::wal::WalError;

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Operation failed but the store is healthy
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// Checkpoint error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointErrorCode {
    /// General checkpoint failure (e.g. scheduler could not start)
    CheckpointFailed,
    /// Staged records could not be flushed
    CheckpointWalFlushFailed,
    /// The page buffer pool failed to flush dirty pages
    CheckpointPageFlushFailed,
    /// The CHECKPOINT record could not be written
    CheckpointRecordFailed,
}

impl CheckpointErrorCode {
    /// Returns the stable string code
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckpointErrorCode::CheckpointFailed => "CHECKPOINT_FAILED",
            CheckpointErrorCode::CheckpointWalFlushFailed => "CHECKPOINT_WAL_FLUSH_FAILED",
            CheckpointErrorCode::CheckpointPageFlushFailed => "CHECKPOINT_PAGE_FLUSH_FAILED",
            CheckpointErrorCode::CheckpointRecordFailed => "CHECKPOINT_RECORD_FAILED",
        }
    }

    /// Returns the severity level for this error code
    pub fn severity(&self) -> Severity {
        Severity::Error
    }
}

impl fmt::Display for CheckpointErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Checkpoint error with full context
#[derive(Debug)]
pub struct CheckpointError {
    code: CheckpointErrorCode,
    message: String,
    source: Option<io::Error>,
}

impl CheckpointError {
    fn new(code: CheckpointErrorCode, message: impl Into<String>, source: Option<io::Error>) -> Self {
        Self {
            code,
            message: message.into(),
            source,
        }
    }

    /// General checkpoint failure
    pub fn failed(message: impl Into<String>) -> Self {
        Self::new(CheckpointErrorCode::CheckpointFailed, message, None)
    }

    /// General checkpoint failure with source error
    pub fn failed_with_source(message: impl Into<String>, source: io::Error) -> Self {
        Self::new(CheckpointErrorCode::CheckpointFailed, message, Some(source))
    }

    /// Flushing the staged records failed
    pub fn wal_flush_failed(err: WalError) -> Self {
        Self::new(
            CheckpointErrorCode::CheckpointWalFlushFailed,
            format!("Staged records could not be flushed: {}", err),
            None,
        )
    }

    /// The page buffer pool reported an error
    pub fn page_flush_failed(source: io::Error) -> Self {
        Self::new(
            CheckpointErrorCode::CheckpointPageFlushFailed,
            "Dirty pages could not be flushed",
            Some(source),
        )
    }

    /// Writing the CHECKPOINT record failed
    pub fn record_failed(err: WalError) -> Self {
        Self::new(
            CheckpointErrorCode::CheckpointRecordFailed,
            format!("Checkpoint record could not be written: {}", err),
            None,
        )
    }

    /// Returns the error code
    pub fn code(&self) -> CheckpointErrorCode {
        self.code
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the severity of this error
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }
}

impl fmt::Display for CheckpointError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code.severity(), self.code, self.message)?;
        if let Some(ref source) = self.source {
            write!(f, " (caused by: {})", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for CheckpointError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Result type for checkpoint operations
pub type CheckpointResult<T> = Result<T, CheckpointError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_error_codes() {
        assert_eq!(CheckpointErrorCode::CheckpointFailed.as_str(), "CHECKPOINT_FAILED");
        assert_eq!(
            CheckpointErrorCode::CheckpointWalFlushFailed.as_str(),
            "CHECKPOINT_WAL_FLUSH_FAILED"
        );
        assert_eq!(
            CheckpointErrorCode::CheckpointPageFlushFailed.as_str(),
            "CHECKPOINT_PAGE_FLUSH_FAILED"
        );
        assert_eq!(
            CheckpointErrorCode::CheckpointRecordFailed.as_str(),
            "CHECKPOINT_RECORD_FAILED"
        );
    }

    #[test]
    fn test_page_flush_error_keeps_source() {
        let err = CheckpointError::page_flush_failed(io::Error::new(
            io::ErrorKind::Other,
            "device busy",
        ));
        assert_eq!(err.code(), CheckpointErrorCode::CheckpointPageFlushFailed);
        assert!(err.source().is_some());
        let display = err.to_string();
        assert!(display.contains("[ERROR] CHECKPOINT_PAGE_FLUSH_FAILED"));
        assert!(display.contains("device busy"));
    }

    #[test]
    fn test_wal_failure_is_wrapped_in_message() {
        let wal = WalError::io_failed("write failed", io::Error::new(io::ErrorKind::Other, "disk full"));
        let err = CheckpointError::wal_flush_failed(wal);
        assert_eq!(err.severity(), Severity::Error);
        assert!(err.message().contains("WAL_IO_FAILED"));
        assert!(err.message().contains("disk full"));
    }
}
