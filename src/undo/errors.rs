//! Undo statement builder errors

use thiserror::Error;

/// Why an inverse statement could not be built
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UndoError {
    /// UPDATE images are paired by position and must have equal length
    #[error("UPDATE images differ in length: {before} row(s) before, {after} row(s) after")]
    ImageLengthMismatch { before: usize, after: usize },

    /// No table name could be found in the statement text
    #[error("cannot determine target table of statement '{0}'")]
    UnknownTable(String),
}

/// Result type for undo construction
pub type UndoResult<T> = Result<T, UndoError>;
