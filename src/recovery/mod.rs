//! Recovery engine
//!
//! Plans, never applies. Two operations, both on a `WalStore`:
//!
//! - `rollback`: undo selected in-flight transactions, scanning the
//!   staging buffer and then the persisted log backwards until each target
//!   reaches its START
//! - `recover_after_crash`: REDO from the last checkpoint, then UNDO of
//!   every transaction left without COMMIT or ABORT
//!
//! The executor applies the returned statements in order and records the
//! resulting ABORTs.

mod crash;
mod criteria;
mod errors;
mod manager;
mod rollback;
mod undo_pass;

pub use crash::CrashRecoveryPlan;
pub use criteria::{PlannedStatement, RecoverCriteria};
pub use errors::{RecoveryError, RecoveryErrorCode, RecoveryResult, Severity};
pub use manager::RecoveryManager;
