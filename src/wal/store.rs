//! WAL store: staging buffer, persisted log and active-transaction set
//!
//! # Durability
//!
//! - A COMMIT forces the whole staging buffer to disk (every staged record,
//!   of every transaction) before `append` returns
//! - Other records are flushed once `wal_size` records are staged
//! - A flush that fails leaves every staged record staged
//!
//! # Linearization
//!
//! All operations on a store (append, checkpoint, rollback, crash recovery)
//! run inside `critical_section`, one at a time. Internal helpers take
//! `&mut WalState` so nothing ever re-acquires the lock.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use super::codec::{encode_checkpoint, encode_transaction};
use super::errors::WalResult;
use super::record::{CheckpointRecord, RecordType, TransactionId, TransactionRecord};
use super::writer::LogWriter;
use crate::checkpoint::{CheckpointError, CheckpointResult, PageFlush};
use crate::config::WalConfig;
use crate::observability::{log_event_with_fields, Event, WalMetrics};

/// Why a flush happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushMode {
    /// COMMIT or checkpoint; fsynced when `fsync_on_flush` is set
    Forced,
    /// Staging buffer reached `wal_size`
    Capacity,
}

impl FlushMode {
    fn as_str(self) -> &'static str {
        match self {
            FlushMode::Forced => "forced",
            FlushMode::Capacity => "capacity",
        }
    }
}

/// Mutable store state, only reachable inside the critical section
pub(crate) struct WalState {
    /// Unflushed records, newest last
    pub(crate) staging: Vec<TransactionRecord>,
    /// Transactions with outstanding non-terminal history
    pub(crate) active: BTreeSet<TransactionId>,
    writer: LogWriter,
}

/// Append-only log with an in-memory staging buffer
pub struct WalStore {
    config: WalConfig,
    pages: Arc<dyn PageFlush>,
    state: Mutex<WalState>,
    metrics: WalMetrics,
}

impl WalStore {
    /// Open the store, creating the log file if it does not exist.
    ///
    /// The active set starts empty; call crash recovery to rebuild it from
    /// an existing log.
    pub fn open(config: WalConfig, pages: Arc<dyn PageFlush>) -> WalResult<Self> {
        let writer = LogWriter::open(&config.log_file)?;
        Ok(Self::with_writer(config, pages, writer))
    }

    pub(crate) fn with_writer(
        config: WalConfig,
        pages: Arc<dyn PageFlush>,
        writer: LogWriter,
    ) -> Self {
        log_event_with_fields(
            Event::WalOpened,
            &[
                ("path", &config.log_file.display().to_string()),
                ("wal_size", &config.wal_size.to_string()),
            ],
        );

        Self {
            config,
            pages,
            state: Mutex::new(WalState {
                staging: Vec::new(),
                active: BTreeSet::new(),
                writer,
            }),
            metrics: WalMetrics::new(),
        }
    }

    /// Stage a record.
    ///
    /// - COMMIT: force-flush everything staged; the id leaves the active set
    ///   once the flush succeeds
    /// - ABORT: the id leaves the active set
    /// - anything else: the id joins the active set
    ///
    /// Non-COMMIT records trigger a capacity flush when the buffer holds
    /// `wal_size` records. A failed capacity flush is logged and the records
    /// stay staged; only a failed COMMIT flush is returned, since the commit
    /// is not durable.
    ///
    /// A record whose images hold NaN or infinite floats is refused with
    /// `WAL_INVALID_RECORD` and never staged.
    pub fn append(&self, record: TransactionRecord) -> WalResult<()> {
        record.validate()?;
        self.critical_section(|state| {
            let transaction_id = record.transaction_id;
            let record_type = record.record_type;
            state.staging.push(record);
            self.metrics.record_append();

            match record_type {
                RecordType::Commit => return self.flush_staged(state, FlushMode::Forced),
                RecordType::Abort => {
                    state.active.remove(&transaction_id);
                }
                _ => {
                    state.active.insert(transaction_id);
                }
            }

            if state.staging.len() >= self.config.wal_size {
                // Already logged as WAL_FLUSH_FAILED; the records stay staged
                // and the next append retries.
                let _ = self.flush_staged(state, FlushMode::Capacity);
            }
            Ok(())
        })
    }

    /// Write a checkpoint.
    ///
    /// 1. Force-flush staged records
    /// 2. Flush dirty pages through the buffer pool
    /// 3. Append a CHECKPOINT record with a copy of the active set, fsynced
    ///
    /// A CHECKPOINT record is only written once everything before it is
    /// durable. Any failure leaves the active set unchanged.
    pub fn checkpoint(&self) -> CheckpointResult<()> {
        self.critical_section(|state| {
            log_event_with_fields(
                Event::CheckpointStart,
                &[
                    ("staged", &state.staging.len().to_string()),
                    ("active", &state.active.len().to_string()),
                ],
            );

            match self.checkpoint_locked(state) {
                Ok(snapshot) => {
                    self.metrics.record_checkpoint();
                    log_event_with_fields(
                        Event::CheckpointComplete,
                        &[("active_transactions", &format!("{:?}", snapshot))],
                    );
                    Ok(())
                }
                Err(err) => {
                    self.metrics.record_checkpoint_failure();
                    log_event_with_fields(
                        Event::CheckpointFailed,
                        &[("code", err.code().as_str()), ("reason", &err.to_string())],
                    );
                    Err(err)
                }
            }
        })
    }

    fn checkpoint_locked(&self, state: &mut WalState) -> CheckpointResult<BTreeSet<TransactionId>> {
        self.flush_staged(state, FlushMode::Forced)
            .map_err(CheckpointError::wal_flush_failed)?;

        self.pages
            .flush_all_dirty()
            .map_err(CheckpointError::page_flush_failed)?;

        let record = CheckpointRecord::new(state.active.clone());
        state
            .writer
            .append_lines(&[encode_checkpoint(&record)], self.config.fsync_on_flush)
            .map_err(CheckpointError::record_failed)?;
        self.metrics.add_lines_written(1);

        Ok(record.active_transactions)
    }

    /// Write every staged record. On success the buffer is cleared and
    /// every id whose COMMIT was written leaves the active set.
    fn flush_staged(&self, state: &mut WalState, mode: FlushMode) -> WalResult<()> {
        if state.staging.is_empty() {
            return Ok(());
        }

        let lines: Vec<String> = state.staging.iter().map(encode_transaction).collect();
        let sync = mode == FlushMode::Forced && self.config.fsync_on_flush;

        match state.writer.append_lines(&lines, sync) {
            Ok(bytes) => {
                for record in state.staging.drain(..) {
                    if record.record_type == RecordType::Commit {
                        state.active.remove(&record.transaction_id);
                    }
                }
                self.metrics.add_lines_written(lines.len() as u64);
                match mode {
                    FlushMode::Forced => self.metrics.record_forced_flush(),
                    FlushMode::Capacity => self.metrics.record_capacity_flush(),
                }
                log_event_with_fields(
                    Event::WalFlush,
                    &[
                        ("mode", mode.as_str()),
                        ("records", &lines.len().to_string()),
                        ("bytes", &bytes.to_string()),
                    ],
                );
                Ok(())
            }
            Err(err) => {
                log_event_with_fields(
                    Event::WalFlushFailed,
                    &[
                        ("mode", mode.as_str()),
                        ("records", &lines.len().to_string()),
                        ("reason", &err.to_string()),
                    ],
                );
                Err(err)
            }
        }
    }

    /// Run `f` with exclusive access to the store state.
    ///
    /// A poisoned lock is taken over: every critical section leaves the
    /// state consistent before it can panic.
    pub(crate) fn critical_section<T>(&self, f: impl FnOnce(&mut WalState) -> T) -> T {
        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    /// Number of records waiting in the staging buffer
    pub fn staged_len(&self) -> usize {
        self.critical_section(|state| state.staging.len())
    }

    /// Copy of the active-transaction set
    pub fn active_transactions(&self) -> BTreeSet<TransactionId> {
        self.critical_section(|state| state.active.clone())
    }

    /// Path of the persisted log
    pub fn log_path(&self) -> &Path {
        &self.config.log_file
    }

    /// Store configuration
    pub fn config(&self) -> &WalConfig {
        &self.config
    }

    /// Counters for this store
    pub fn metrics(&self) -> &WalMetrics {
        &self.metrics
    }
}

impl std::fmt::Debug for WalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalStore")
            .field("log_file", &self.config.log_file)
            .field("wal_size", &self.config.wal_size)
            .finish_non_exhaustive()
    }
}
