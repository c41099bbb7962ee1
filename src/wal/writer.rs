//! Append-only writer for the persisted log
//!
//! - Single file, opened in append mode
//! - A batch of lines goes out in one write
//! - `sync` batches are fsynced before the call returns
//! - A batch that fails is cut back off the file, so a retry never lands
//!   on a half-written line
//! - A log that ends without a newline (torn by a crash) gets one before
//!   the next batch; the torn line is then skipped by the reader

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use super::errors::{WalError, WalResult};

/// Byte-level destination of the log
pub(crate) trait LogSink: Send {
    /// Current length in bytes
    fn size(&self) -> io::Result<u64>;
    /// Write all of `bytes` at the end
    fn append(&mut self, bytes: &[u8]) -> io::Result<()>;
    /// Make appended bytes durable
    fn sync(&mut self) -> io::Result<()>;
    /// Cut the log back to `len` bytes
    fn truncate(&mut self, len: u64) -> io::Result<()>;
}

impl LogSink for File {
    fn size(&self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn append(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.write_all(bytes)?;
        self.flush()
    }

    fn sync(&mut self) -> io::Result<()> {
        self.sync_data()
    }

    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }
}

/// Appends encoded lines to the log file
pub struct LogWriter {
    path: PathBuf,
    sink: Box<dyn LogSink>,
    /// Last line in the file has no newline
    torn: bool,
}

impl LogWriter {
    /// Opens or creates the log at `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns `WAL_IO_FAILED` if the directory or file cannot be created,
    /// or an existing log cannot be inspected.
    pub fn open(path: &Path) -> WalResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    WalError::io_failed(
                        format!("Failed to create log directory: {}", parent.display()),
                        e,
                    )
                })?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| {
                WalError::io_failed(format!("Failed to open log file: {}", path.display()), e)
            })?;

        let mut writer = Self::with_sink(path, Box::new(file));
        writer.torn = ends_torn(path).map_err(|e| {
            WalError::io_failed(format!("Failed to inspect log tail: {}", path.display()), e)
        })?;
        Ok(writer)
    }

    /// Writer over an arbitrary sink, assumed to end on a line boundary
    pub(crate) fn with_sink(path: &Path, sink: Box<dyn LogSink>) -> Self {
        Self {
            path: path.to_path_buf(),
            sink,
            torn: false,
        }
    }

    /// Path of the log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `lines` (each without trailing newline) as one write.
    ///
    /// Returns the number of bytes written. With `sync`, the data is
    /// fsynced before returning.
    ///
    /// # Errors
    ///
    /// `WAL_IO_FAILED` if the write, flush or fsync fails. The file is then
    /// cut back to its length before the call; if even that fails, the next
    /// batch starts on a fresh line.
    pub fn append_lines(&mut self, lines: &[String], sync: bool) -> WalResult<u64> {
        if lines.is_empty() {
            return Ok(0);
        }

        let start = self.sink.size().map_err(|e| {
            WalError::io_failed(format!("Failed to stat {}", self.path.display()), e)
        })?;

        let capacity = lines.iter().map(|l| l.len() + 1).sum::<usize>() + 1;
        let mut batch = String::with_capacity(capacity);
        if self.torn {
            batch.push('\n');
        }
        for line in lines {
            batch.push_str(line);
            batch.push('\n');
        }

        if let Err(e) = self.sink.append(batch.as_bytes()) {
            let message = format!(
                "Failed to write {} record(s) to {}",
                lines.len(),
                self.path.display()
            );
            return Err(self.abandon_batch(start, message, e));
        }
        if sync {
            if let Err(e) = self.sink.sync() {
                let message = format!("fsync failed on {}", self.path.display());
                return Err(self.abandon_batch(start, message, e));
            }
        }

        self.torn = false;
        Ok(batch.len() as u64)
    }

    fn abandon_batch(&mut self, start: u64, message: String, err: io::Error) -> WalError {
        if self.sink.truncate(start).is_err() {
            self.torn = true;
        }
        WalError::io_failed(message, err)
    }
}

/// True if the file is non-empty and its last byte is not a newline
fn ends_torn(path: &Path) -> io::Result<bool> {
    let mut file = File::open(path)?;
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::Start(len - 1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}


#[cfg(test)]
mod tests {
    use super::testing::ShortWriteSink;
    use super::*;
    use std::sync::atomic::Ordering;
    use tempfile::TempDir;
    #[test]
    fn test_open_creates_file_and_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("wal.log");

        let writer = LogWriter::open(&path).unwrap();

        assert!(path.exists());
        assert_eq!(writer.path(), path.as_path());
    }

    #[test]
    fn test_append_lines_writes_one_line_each() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("wal.log");
        let mut writer = LogWriter::open(&path).unwrap();

        let bytes = writer
            .append_lines(&["a".to_string(), "bc".to_string()], true)
            .unwrap();

        assert_eq!(bytes, 5);
        assert_eq!(fs::read_to_string(&path).unwrap(), "a\nbc\n");
    }

    #[test]
    fn test_reopen_appends() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("wal.log");
        {
            let mut writer = LogWriter::open(&path).unwrap();
            writer.append_lines(&["first".to_string()], false).unwrap();
        }
        {
            let mut writer = LogWriter::open(&path).unwrap();
            writer.append_lines(&["second".to_string()], false).unwrap();
        }
        assert_eq!(fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }

    #[test]
    fn test_empty_batch_is_noop() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("wal.log");
        let mut writer = LogWriter::open(&path).unwrap();
        assert_eq!(writer.append_lines(&[], true).unwrap(), 0);
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn test_failed_batch_is_cut_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("wal.log");
        let (sink, limit) = ShortWriteSink::open(&path);
        let mut writer = LogWriter::with_sink(&path, Box::new(sink));

        writer.append_lines(&["first".to_string()], false).unwrap();

        limit.store(3, Ordering::SeqCst);
        let batch = vec!["second".to_string(), "third".to_string()];
        let err = writer.append_lines(&batch, true).unwrap_err();
        assert!(err.to_string().contains("no space left"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "first\n");

        limit.store(usize::MAX, Ordering::SeqCst);
        writer.append_lines(&batch, true).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "first\nsecond\nthird\n");
    }

    #[test]
    fn test_torn_tail_is_closed_before_next_batch() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("wal.log");
        fs::write(&path, "whole\nINSERT,1,2024-12-10T09:00:00Z,INS").unwrap();

        let mut writer = LogWriter::open(&path).unwrap();
        writer.append_lines(&["next".to_string()], false).unwrap();
        writer.append_lines(&["after".to_string()], false).unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "whole\nINSERT,1,2024-12-10T09:00:00Z,INS\nnext\nafter\n"
        );
    }
}
