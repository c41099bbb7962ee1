//! WAL error types
//!
//! Error codes:
//! - WAL_IO_FAILED (ERROR)
//! - WAL_LOG_CORRUPTION (WARNING: the offending line is skipped)
//! - WAL_MISSING_LOG_FILE (ERROR: fatal precondition for recovery)
//! - WAL_INVALID_RECORD (ERROR: the record cannot be written faithfully)

use std::fmt;
use std::io;

/// Severity levels for WAL errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Reported, processing continues
    Warning,
    /// Operation fails and is reported to the caller
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "WARNING"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// WAL error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalErrorCode {
    /// Disk read or write failed
    WalIoFailed,
    /// A persisted line could not be decoded
    WalLogCorruption,
    /// The log file does not exist
    WalMissingLogFile,
    /// A record was refused before staging
    WalInvalidRecord,
}

impl WalErrorCode {
    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            WalErrorCode::WalIoFailed => "WAL_IO_FAILED",
            WalErrorCode::WalLogCorruption => "WAL_LOG_CORRUPTION",
            WalErrorCode::WalMissingLogFile => "WAL_MISSING_LOG_FILE",
            WalErrorCode::WalInvalidRecord => "WAL_INVALID_RECORD",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            WalErrorCode::WalIoFailed => Severity::Error,
            WalErrorCode::WalLogCorruption => Severity::Warning,
            WalErrorCode::WalMissingLogFile => Severity::Error,
            WalErrorCode::WalInvalidRecord => Severity::Error,
        }
    }
}

impl fmt::Display for WalErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// WAL error with code, message and optional context
#[derive(Debug)]
pub struct WalError {
    code: WalErrorCode,
    message: String,
    details: Option<String>,
    source: Option<io::Error>,
}

impl WalError {
    /// Disk I/O failed
    pub fn io_failed(message: impl Into<String>, source: io::Error) -> Self {
        Self {
            code: WalErrorCode::WalIoFailed,
            message: message.into(),
            details: None,
            source: Some(source),
        }
    }

    /// A line failed to decode
    pub fn corruption(message: impl Into<String>) -> Self {
        Self {
            code: WalErrorCode::WalLogCorruption,
            message: message.into(),
            details: None,
            source: None,
        }
    }

    /// A line failed to decode, with its 1-based line number
    pub fn corruption_at_line(line: usize, reason: impl Into<String>) -> Self {
        Self {
            code: WalErrorCode::WalLogCorruption,
            message: reason.into(),
            details: Some(format!("line: {}", line)),
            source: None,
        }
    }

    /// The log file is absent
    pub fn missing_log_file(path: &std::path::Path) -> Self {
        Self {
            code: WalErrorCode::WalMissingLogFile,
            message: "No log file, abort recovery".to_string(),
            details: Some(format!("path: {}", path.display())),
            source: None,
        }
    }

    /// A record that cannot be encoded without loss
    pub fn invalid_record(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            code: WalErrorCode::WalInvalidRecord,
            message: message.into(),
            details: Some(details.into()),
            source: None,
        }
    }

    /// Returns the error code
    pub fn code(&self) -> WalErrorCode {
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

    /// Returns additional error details
    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    /// True for a missing log file
    pub fn is_missing_log_file(&self) -> bool {
        self.code == WalErrorCode::WalMissingLogFile
    }
}

impl fmt::Display for WalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        if let Some(ref source) = self.source {
            write!(f, " caused by: {}", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for WalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Result type for WAL operations
pub type WalResult<T> = Result<T, WalError>;
