//! Checkpoint subsystem
//!
//! A checkpoint bounds how far back crash recovery has to replay:
//!
//! 1. Force-flush the WAL staging buffer
//! 2. Flush all dirty pages through the buffer pool (`PageFlush`)
//! 3. Append a CHECKPOINT record carrying the active-transaction set
//!
//! The algorithm itself lives on `WalStore::checkpoint` so it runs inside
//! the store's critical section. This module holds the buffer-pool seam,
//! the error types and the background scheduler.
//!
//! Checkpoint never truncates the log.

mod errors;
mod pages;
mod scheduler;

pub use errors::{CheckpointError, CheckpointErrorCode, CheckpointResult, Severity};
pub use pages::{NoDirtyPages, PageFlush};
pub use scheduler::CheckpointScheduler;
