//! Background checkpoint tests
//!
//! The scheduler checkpoints every registered store on its interval, keeps
//! running when a checkpoint fails, and stops promptly on shutdown.

use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use aerolog::wal::read_all;
use aerolog::{CheckpointScheduler, PageFlush, TransactionRecord, WalConfig, WalStore};
use tempfile::TempDir;

/// Buffer pool double that can be switched into failure mode
struct SwitchablePages {
    failing: AtomicBool,
    flushes: AtomicUsize,
}

impl SwitchablePages {
    fn new(failing: bool) -> Self {
        Self {
            failing: AtomicBool::new(failing),
            flushes: AtomicUsize::new(0),
        }
    }
}

impl PageFlush for SwitchablePages {
    fn flush_all_dirty(&self) -> io::Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::Other, "pool unavailable"));
        }
        self.flushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn wait_until(condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

#[test]
fn test_background_checkpoint_persists_active_set() {
    let dir = TempDir::new().unwrap();
    let pages = Arc::new(SwitchablePages::new(false));
    let config = WalConfig::with_log_file(dir.path().join("wal.log"));
    let store = Arc::new(WalStore::open(config, pages.clone()).unwrap());

    store.append(TransactionRecord::start(11)).unwrap();

    let scheduler = CheckpointScheduler::new(Duration::from_millis(10));
    scheduler.register(&store).unwrap();

    assert!(wait_until(|| scheduler.checkpoints() >= 1));
    scheduler.shutdown();

    assert!(pages.flushes.load(Ordering::SeqCst) >= 1);
    assert_eq!(store.staged_len(), 0);
    let contents = read_all(store.log_path()).unwrap();
    assert!(contents.checkpoint_snapshot.contains(&11));
}

#[test]
fn test_scheduler_keeps_running_through_failures() {
    let dir = TempDir::new().unwrap();
    let pages = Arc::new(SwitchablePages::new(true));
    let config = WalConfig::with_log_file(dir.path().join("wal.log"));
    let store = Arc::new(WalStore::open(config, pages.clone()).unwrap());
    store.append(TransactionRecord::start(1)).unwrap();

    let scheduler = CheckpointScheduler::new(Duration::from_millis(10));
    scheduler.register(&store).unwrap();

    assert!(wait_until(|| scheduler.failures() >= 2));
    assert!(scheduler.is_running());
    assert!(
        read_all(store.log_path()).unwrap().last_checkpoint.is_none(),
        "no checkpoint record while pages cannot be flushed"
    );

    pages.failing.store(false, Ordering::SeqCst);
    assert!(wait_until(|| scheduler.checkpoints() >= 1));
    drop(scheduler);

    assert!(read_all(store.log_path()).unwrap().last_checkpoint.is_some());
    let metrics = store.metrics().snapshot();
    assert!(metrics.checkpoint_failures >= 2);
    assert!(metrics.checkpoints >= 1);
}

#[test]
fn test_dropped_store_is_pruned() {
    let dir = TempDir::new().unwrap();
    let config = WalConfig::with_log_file(dir.path().join("wal.log"));
    let store = Arc::new(WalStore::open(config, Arc::new(SwitchablePages::new(false))).unwrap());

    let scheduler = CheckpointScheduler::new(Duration::from_millis(10));
    scheduler.register(&store).unwrap();
    assert_eq!(scheduler.registered(), 1);

    drop(store);
    let passes = scheduler.passes();
    assert!(wait_until(|| scheduler.passes() > passes));
    assert_eq!(scheduler.registered(), 0);
    assert!(scheduler.is_running());
}

#[test]
fn test_scheduler_from_store_config() {
    let dir = TempDir::new().unwrap();
    let mut config = WalConfig::with_log_file(dir.path().join("wal.log"));
    config.checkpoint_interval_secs = 1;
    let store = Arc::new(WalStore::open(config, Arc::new(SwitchablePages::new(false))).unwrap());
    store.append(TransactionRecord::start(3)).unwrap();

    let scheduler = CheckpointScheduler::from_config(store.config());
    assert_eq!(scheduler.interval(), Duration::from_secs(1));
    scheduler.register(&store).unwrap();

    assert!(wait_until(|| scheduler.checkpoints() >= 1));
    scheduler.shutdown();
    assert!(read_all(store.log_path()).unwrap().checkpoint_snapshot.contains(&3));
}
