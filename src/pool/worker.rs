//! Worker thread logic
//!
//! Each worker:
//! - Creates its own scratch directory at start (deleted at stop)
//! - Pulls tasks from the shared queue until it sees a stop sentinel
//! - Runs each task with an explicit [`TaskContext`]
//! - Contains panics and records the first failure, then stops its loop
//!
//! [`TaskContext`]: crate::pool::TaskContext

use crate::config::PoolConfig;
use crate::error::{PoolError, WorkerError};
use crate::gate::DirectoryGate;
use crate::pool::failure::FailureSlot;
use crate::pool::queue::{QueueItem, TaskReceiver};
use crate::pool::{Task, TaskContext};
use crate::scratch::ScratchSpace;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{info, trace, warn};

/// Statistics collected by a worker
#[derive(Debug, Default)]
pub struct WorkerStats {
    /// Tasks completed successfully
    pub completed: AtomicU64,

    /// Tasks that returned an error or panicked
    pub failed: AtomicU64,
}

/// A worker thread that executes queued tasks
pub(crate) struct Worker {
    /// Worker ID
    id: usize,

    /// Thread handle
    handle: Option<JoinHandle<()>>,

    /// Worker statistics
    stats: Arc<WorkerStats>,
}

impl Worker {
    /// Spawn a new worker thread
    pub fn spawn(
        id: usize,
        config: Arc<PoolConfig>,
        receiver: TaskReceiver,
        gate: Arc<DirectoryGate>,
        failures: Arc<FailureSlot>,
        active: Arc<AtomicUsize>,
    ) -> Result<Self, WorkerError> {
        let stats = Arc::new(WorkerStats::default());
        let stats_clone = Arc::clone(&stats);

        let handle = thread::Builder::new()
            .name(format!("{}-{}", config.thread_name_prefix, id))
            .spawn(move || {
                worker_loop(id, config, receiver, gate, failures, active, stats_clone)
            })
            .map_err(|e| WorkerError::SpawnFailed {
                id,
                reason: e.to_string(),
            })?;

        Ok(Self {
            id,
            handle: Some(handle),
            stats,
        })
    }

    /// Wait for the worker thread to terminate
    ///
    /// Task panics are contained inside the loop; a join error here means
    /// the loop itself panicked, which is reported but must not take the
    /// other joins down with it.
    pub fn join(mut self) -> Result<(), WorkerError> {
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|payload| WorkerError::Panicked {
                id: self.id,
                message: panic_message(payload.as_ref()),
            }),
            None => Ok(()),
        }
    }
}

/// Main worker loop: take, execute, repeat until the sentinel
fn worker_loop(
    id: usize,
    config: Arc<PoolConfig>,
    receiver: TaskReceiver,
    gate: Arc<DirectoryGate>,
    failures: Arc<FailureSlot>,
    active: Arc<AtomicUsize>,
    stats: Arc<WorkerStats>,
) {
    info!(worker = id, "Worker starting");

    let scratch = match ScratchSpace::new(id, config.scratch_root.as_deref()) {
        Ok(scratch) => scratch,
        Err(e) => {
            failures.record(PoolError::Worker(WorkerError::ScratchFailed {
                id,
                source: e,
            }));
            return;
        }
    };

    let ctx = TaskContext::new(id, scratch.path().to_path_buf(), gate);

    loop {
        let task = match receiver.take() {
            QueueItem::Run(task) => task,
            QueueItem::Stop => break,
        };

        active.fetch_add(1, Ordering::SeqCst);
        let keep_going = execute_task(id, task, &ctx, &failures, &stats);
        active.fetch_sub(1, Ordering::SeqCst);

        if !keep_going {
            break;
        }
    }

    scratch.close();

    info!(
        worker = id,
        completed = stats.completed.load(Ordering::Relaxed),
        failed = stats.failed.load(Ordering::Relaxed),
        "Worker stopped"
    );
}

/// Run one task with panic containment
///
/// A failure is recorded into the slot (first one wins) and the return
/// value tells the owning worker to terminate its loop without touching
/// further tasks.
pub(crate) fn execute_task(
    id: usize,
    task: Task,
    ctx: &TaskContext,
    failures: &FailureSlot,
    stats: &WorkerStats,
) -> bool {
    match catch_unwind(AssertUnwindSafe(|| task(ctx))) {
        Ok(Ok(())) => {
            stats.completed.fetch_add(1, Ordering::Relaxed);
            trace!(worker = id, "Task completed");
            true
        }
        Ok(Err(e)) => {
            stats.failed.fetch_add(1, Ordering::Relaxed);
            warn!(worker = id, error = %e, "Task failed, worker stopping");
            failures.record(PoolError::TaskFailed {
                worker: id,
                source: e,
            });
            false
        }
        Err(payload) => {
            stats.failed.fetch_add(1, Ordering::Relaxed);
            let message = panic_message(payload.as_ref());
            warn!(worker = id, panic = %message, "Task panicked, worker stopping");
            failures.record(PoolError::Worker(WorkerError::Panicked { id, message }));
            false
        }
    }
}

/// Best-effort extraction of a panic payload message
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Sum completed/failed counts across workers
pub(crate) fn aggregate_stats(workers: &[Worker]) -> (u64, u64) {
    let mut completed = 0u64;
    let mut failed = 0u64;

    for worker in workers {
        completed += worker.stats.completed.load(Ordering::Relaxed);
        failed += worker.stats.failed.load(Ordering::Relaxed);
    }

    (completed, failed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execute_task_success() {
        let ctx = TaskContext::for_tests();
        let failures = FailureSlot::new();
        let stats = WorkerStats::default();

        let keep_going = execute_task(0, Box::new(|_| Ok(())), &ctx, &failures, &stats);

        assert!(keep_going);
        assert!(!failures.is_set());
        assert_eq!(stats.completed.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_execute_task_error_stops_worker() {
        let ctx = TaskContext::for_tests();
        let failures = FailureSlot::new();
        let stats = WorkerStats::default();

        let keep_going = execute_task(
            3,
            Box::new(|_| Err("no .gcda produced".into())),
            &ctx,
            &failures,
            &stats,
        );

        assert!(!keep_going);
        assert_eq!(stats.failed.load(Ordering::Relaxed), 1);

        let captured = failures.take().unwrap();
        assert!(matches!(captured, PoolError::TaskFailed { worker: 3, .. }));
    }

    #[test]
    fn test_execute_task_contains_panic() {
        let ctx = TaskContext::for_tests();
        let failures = FailureSlot::new();
        let stats = WorkerStats::default();

        let keep_going = execute_task(
            1,
            Box::new(|_| panic!("unexpected tool output")),
            &ctx,
            &failures,
            &stats,
        );

        assert!(!keep_going);
        let captured = failures.take().unwrap();
        match captured {
            PoolError::Worker(WorkerError::Panicked { id, message }) => {
                assert_eq!(id, 1);
                assert_eq!(message, "unexpected tool output");
            }
            other => panic!("expected panic capture, got {other}"),
        }
    }

    #[test]
    fn test_panic_message_extraction() {
        let payload: Box<dyn Any + Send> = Box::new("static str panic");
        assert_eq!(panic_message(payload.as_ref()), "static str panic");

        let payload: Box<dyn Any + Send> = Box::new("owned".to_string());
        assert_eq!(panic_message(payload.as_ref()), "owned");

        let payload: Box<dyn Any + Send> = Box::new(17u32);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic payload");
    }
}
