//! aerolog - write-ahead log and ARIES-style recovery
//!
//! - `wal`: record model, line codec, staging buffer and persisted log
//! - `undo`: inverse statements from before/after row images
//! - `recovery`: selective rollback and crash recovery planning
//! - `checkpoint`: buffer-pool seam and background checkpoint scheduler
//! - `observability`: structured logging and counters
//!
//! The crate plans statements; applying them is the executor's job.

pub mod checkpoint;
pub mod config;
pub mod observability;
pub mod recovery;
pub mod undo;
pub mod wal;

pub use checkpoint::{CheckpointScheduler, NoDirtyPages, PageFlush};
pub use config::WalConfig;
pub use recovery::{CrashRecoveryPlan, PlannedStatement, RecoverCriteria, RecoveryManager};
pub use wal::{RecordType, Row, RowImage, TransactionId, TransactionRecord, Value, WalStore};
