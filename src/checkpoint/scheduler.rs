//! Background checkpoint scheduler
//!
//! One thread checkpoints every registered store once per interval.
//!
//! - The thread starts on the first `register`, never earlier, and a
//!   scheduler never runs more than one thread
//! - Stores are held weakly; a dropped store is pruned on the next pass
//! - A failed checkpoint is logged and counted, and the loop keeps going
//! - `shutdown` (or dropping the scheduler) stops and joins the thread
//!   without waiting for the current interval to elapse
//!
//! The owner decides the lifetime: keep exactly one scheduler per process
//! and register every store with it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::errors::{CheckpointError, CheckpointResult};
use crate::config::WalConfig;
use crate::observability::{log_event_with_fields, Event};
use crate::wal::WalStore;

type StoreList = Arc<Mutex<Vec<Weak<WalStore>>>>;

/// Counters for the scheduler's own work
#[derive(Debug, Default)]
struct SchedulerCounters {
    passes: AtomicU64,
    checkpoints: AtomicU64,
    failures: AtomicU64,
}

struct Worker {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

/// Periodic checkpoint driver for a set of stores
pub struct CheckpointScheduler {
    interval: Duration,
    stores: StoreList,
    counters: Arc<SchedulerCounters>,
    worker: Mutex<Option<Worker>>,
}

impl CheckpointScheduler {
    /// Scheduler that checkpoints every `interval`; no thread runs until
    /// the first store is registered
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            stores: Arc::new(Mutex::new(Vec::new())),
            counters: Arc::new(SchedulerCounters::default()),
            worker: Mutex::new(None),
        }
    }

    /// Scheduler using `checkpoint_interval_secs` from `config`
    pub fn from_config(config: &WalConfig) -> Self {
        Self::new(config.checkpoint_interval())
    }

    /// Add a store, starting the background thread if it is not running.
    ///
    /// # Errors
    ///
    /// `CHECKPOINT_FAILED` if the thread cannot be spawned. The store stays
    /// registered and the next `register` tries again.
    pub fn register(&self, store: &Arc<WalStore>) -> CheckpointResult<()> {
        lock(&self.stores).push(Arc::downgrade(store));

        let mut worker = lock(&self.worker);
        if worker.is_some() {
            return Ok(());
        }

        let (stop, stop_rx) = mpsc::channel();
        let interval = self.interval;
        let stores = Arc::clone(&self.stores);
        let counters = Arc::clone(&self.counters);

        let handle = thread::Builder::new()
            .name("checkpoint-scheduler".to_string())
            .spawn(move || {
                loop {
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => checkpoint_all(&stores, &counters),
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            })
            .map_err(|e| {
                CheckpointError::failed_with_source("Failed to start checkpoint scheduler", e)
            })?;

        log_event_with_fields(
            Event::SchedulerStarted,
            &[("interval_ms", &self.interval.as_millis().to_string())],
        );
        *worker = Some(Worker { stop, handle });
        Ok(())
    }

    /// Checkpoint every live store now, on the calling thread
    pub fn run_once(&self) {
        checkpoint_all(&self.stores, &self.counters);
    }

    /// Stop and join the background thread. Idempotent.
    pub fn shutdown(&self) {
        let Some(worker) = lock(&self.worker).take() else {
            return;
        };
        // A closed channel also stops the loop.
        let _ = worker.stop.send(());
        let outcome = if worker.handle.join().is_ok() {
            "stopped"
        } else {
            "panicked"
        };
        log_event_with_fields(Event::SchedulerStopped, &[("outcome", outcome)]);
    }

    /// True while the background thread is running
    pub fn is_running(&self) -> bool {
        lock(&self.worker).is_some()
    }

    /// Stores still alive and registered
    pub fn registered(&self) -> usize {
        let mut stores = lock(&self.stores);
        stores.retain(|store| store.strong_count() > 0);
        stores.len()
    }

    /// Configured interval
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Completed passes over the registered stores
    pub fn passes(&self) -> u64 {
        self.counters.passes.load(Ordering::Relaxed)
    }

    /// Checkpoints that succeeded
    pub fn checkpoints(&self) -> u64 {
        self.counters.checkpoints.load(Ordering::Relaxed)
    }

    /// Checkpoints that failed
    pub fn failures(&self) -> u64 {
        self.counters.failures.load(Ordering::Relaxed)
    }
}

impl Drop for CheckpointScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn checkpoint_all(stores: &StoreList, counters: &SchedulerCounters) {
    let live: Vec<Arc<WalStore>> = {
        let mut stores = lock(stores);
        stores.retain(|store| store.strong_count() > 0);
        stores.iter().filter_map(Weak::upgrade).collect()
    };

    for store in live {
        // The store logs and counts its own failures.
        match store.checkpoint() {
            Ok(()) => counters.checkpoints.fetch_add(1, Ordering::Relaxed),
            Err(_) => counters.failures.fetch_add(1, Ordering::Relaxed),
        };
    }
    counters.passes.fetch_add(1, Ordering::Relaxed);
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
