//! Full-file reader for the persisted log
//!
//! Unlike the append path, reading is lenient: a line that fails to decode
//! is reported and skipped, and the scan continues with the next line.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use super::codec::decode_line;
use super::errors::{WalError, WalResult};
use super::record::{LogRecord, TransactionId};
use crate::observability::{log_event_with_fields, Event};

/// Everything decoded from one pass over the log file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogContents {
    /// Decoded records in file order
    pub records: Vec<LogRecord>,
    /// Active set carried by the last checkpoint (empty if none)
    pub checkpoint_snapshot: BTreeSet<TransactionId>,
    /// Index into `records` of the last checkpoint
    pub last_checkpoint: Option<usize>,
    /// Lines that failed to decode
    pub skipped_lines: usize,
}

impl LogContents {
    /// Records after the last checkpoint (all records if there is none)
    pub fn since_last_checkpoint(&self) -> &[LogRecord] {
        match self.last_checkpoint {
            Some(index) => &self.records[index + 1..],
            None => &self.records,
        }
    }
}

/// Parse the whole log at `path`.
///
/// # Errors
///
/// - `WAL_MISSING_LOG_FILE` if the file does not exist
/// - `WAL_IO_FAILED` if it cannot be read
///
/// Undecodable lines are not errors; they are logged and counted in
/// `skipped_lines`.
pub fn read_all(path: &Path) -> WalResult<LogContents> {
    let file = File::open(path).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            WalError::missing_log_file(path)
        } else {
            WalError::io_failed(format!("Failed to open log file: {}", path.display()), e)
        }
    })?;

    let mut contents = LogContents::default();
    for (index, line) in BufReader::new(file).split(b'\n').enumerate() {
        let bytes = line.map_err(|e| {
            WalError::io_failed(format!("Failed to read log file: {}", path.display()), e)
        })?;
        let Ok(line) = std::str::from_utf8(&bytes) else {
            skip_line(&mut contents, index, "line is not valid UTF-8");
            continue;
        };
        if line.trim().is_empty() {
            continue;
        }

        match decode_line(line) {
            Ok(record) => {
                if let LogRecord::Checkpoint(ref checkpoint) = record {
                    contents.checkpoint_snapshot = checkpoint.active_transactions.clone();
                    contents.last_checkpoint = Some(contents.records.len());
                }
                contents.records.push(record);
            }
            Err(e) => skip_line(&mut contents, index, e.message()),
        }
    }

    Ok(contents)
}

fn skip_line(contents: &mut LogContents, index: usize, reason: &str) {
    let err = WalError::corruption_at_line(index + 1, reason);
    log_event_with_fields(
        Event::WalLineSkipped,
        &[("line", &(index + 1).to_string()), ("reason", &err.to_string())],
    );
    contents.skipped_lines += 1;
}
