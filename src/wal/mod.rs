//! Write-Ahead Log (WAL) subsystem
//!
//! The executor appends a record for every START, data mutation, COMMIT and
//! ABORT it performs. Records are staged in memory and written to an
//! append-only text log, one record per line.
//!
//! # Guarantees
//!
//! - A COMMIT is durable when `append` returns, together with every record
//!   staged before it (a global flush barrier, not per transaction)
//! - The active set holds every transaction with non-terminal history
//! - The persisted log is never rewritten or truncated
//! - Reading the log never evaluates its contents; malformed lines are
//!   reported and skipped

mod codec;
mod errors;
mod reader;
mod record;
mod row;
mod store;
mod writer;

pub use codec::{decode_line, encode_record, format_timestamp, parse_timestamp};
pub use errors::{Severity, WalError, WalErrorCode, WalResult};
pub use reader::{read_all, LogContents};
pub use record::{CheckpointRecord, LogRecord, RecordType, TransactionId, TransactionRecord};
pub use row::{decode_image, encode_image, LiteralError, Row, RowImage, Value, ABSENT};
pub use store::{FlushMode, WalStore};
pub(crate) use store::WalState;
pub use writer::LogWriter;
