//! Fixed-size worker pool for coverage-processing tasks
//!
//! The driver constructs a [`WorkerPool`], submits tasks, then calls
//! [`WorkerPool::wait`] to drain the queue, join every worker, and learn
//! about the first failure if one occurred.
//!
//! Tasks are closures taking an explicit [`TaskContext`], which carries the
//! executing worker's scratch directory and the shared [`DirectoryGate`].
//! The context appears in the task's own signature rather than being
//! injected behind its back.
//!
//! A pool configured with exactly one worker spawns no threads: tasks run
//! synchronously on the submitting thread with identical observable
//! semantics (scratch directory in the context, failures captured and
//! surfaced by `wait`).

mod failure;
pub mod queue;
pub mod worker;

use crate::config::PoolConfig;
use crate::error::{PoolError, Result, TaskResult, WorkerError};
use crate::gate::{DirectoryGate, DirectoryHold};
use crate::pool::failure::FailureSlot;
use crate::pool::queue::TaskQueue;
use crate::pool::worker::{aggregate_stats, execute_task, Worker, WorkerStats};
use crate::scratch::ScratchSpace;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, trace, warn};

/// One unit of dispatchable work
pub type Task = Box<dyn FnOnce(&TaskContext) -> TaskResult + Send + 'static>;

/// Per-execution context handed to every task body
///
/// Owned by the worker; one instance lives for the worker's whole lifetime.
#[derive(Debug)]
pub struct TaskContext {
    /// ID of the executing worker
    worker_id: usize,

    /// The worker's private scratch directory
    workdir: PathBuf,

    /// Gate shared by every worker of the pool
    gate: Arc<DirectoryGate>,
}

impl TaskContext {
    pub(crate) fn new(worker_id: usize, workdir: PathBuf, gate: Arc<DirectoryGate>) -> Self {
        Self {
            worker_id,
            workdir,
            gate,
        }
    }

    /// ID of the worker executing this task
    pub fn worker_id(&self) -> usize {
        self.worker_id
    }

    /// The executing worker's scratch directory
    ///
    /// Private to the worker; write temporary files here without colliding
    /// with other workers. Deleted when the worker stops.
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// The pool's directory gate
    pub fn gate(&self) -> &DirectoryGate {
        &self.gate
    }

    /// Hold `path` for the returned guard's lifetime
    ///
    /// Shorthand for `ctx.gate().lock(path)`. Wrap the directory-sensitive
    /// portion of the task in this hold; release happens on every exit
    /// path, including panics.
    pub fn lock_dir(&self, path: impl Into<PathBuf>) -> DirectoryHold<'_> {
        self.gate.lock(path)
    }

    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        Self {
            worker_id: 0,
            workdir: std::env::temp_dir(),
            gate: Arc::new(DirectoryGate::new()),
        }
    }
}

/// The single-worker degenerate mode: no threads, tasks run in `submit`
struct InlineWorker {
    scratch: ScratchSpace,
    ctx: TaskContext,
    stats: Arc<WorkerStats>,
}

/// Fixed-size pool of worker threads with failure capture
///
/// Lifecycle: construction spawns the workers; [`submit`](Self::submit)
/// enqueues work; [`wait`](Self::wait) consumes the pool, so submitting to
/// a joined pool is impossible by construction.
pub struct WorkerPool {
    /// Validated configuration
    config: Arc<PoolConfig>,

    /// Pending work
    queue: TaskQueue,

    /// Worker threads (empty in single-worker mode)
    workers: Vec<Worker>,

    /// Single-worker synchronous execution state
    inline: Option<InlineWorker>,

    /// Directory mutual exclusion, shared with every task context
    gate: Arc<DirectoryGate>,

    /// First captured failure
    failures: Arc<FailureSlot>,

    /// Workers currently executing a task
    active: Arc<AtomicUsize>,

    /// Tasks submitted so far
    submitted: AtomicU64,

    /// Pool construction time, for progress rates
    started: Instant,
}

impl WorkerPool {
    /// Create a pool with its own private directory gate
    pub fn new(config: PoolConfig) -> Result<Self> {
        Self::with_gate(config, Arc::new(DirectoryGate::new()))
    }

    /// Create a pool around an externally owned gate
    ///
    /// Use this when several pools (or the driver itself) must serialize on
    /// the same directories.
    pub fn with_gate(config: PoolConfig, gate: Arc<DirectoryGate>) -> Result<Self> {
        let config = Arc::new(config);
        let queue = TaskQueue::new();
        let failures = Arc::new(FailureSlot::new());
        let active = Arc::new(AtomicUsize::new(0));

        let mut workers = Vec::new();
        let mut inline = None;

        if config.workers == 1 {
            // No real concurrency with one worker; run tasks on the
            // submitting thread instead of paying for a thread handoff
            let scratch = ScratchSpace::new(0, config.scratch_root.as_deref())
                .map_err(|e| WorkerError::ScratchFailed { id: 0, source: e })?;
            let ctx = TaskContext::new(0, scratch.path().to_path_buf(), Arc::clone(&gate));
            inline = Some(InlineWorker {
                scratch,
                ctx,
                stats: Arc::new(WorkerStats::default()),
            });
            info!("Pool running in single-worker synchronous mode");
        } else {
            workers.reserve(config.workers);
            for id in 0..config.workers {
                workers.push(Worker::spawn(
                    id,
                    Arc::clone(&config),
                    queue.receiver(),
                    Arc::clone(&gate),
                    Arc::clone(&failures),
                    Arc::clone(&active),
                )?);
            }
            info!(count = workers.len(), "Workers spawned");
        }

        Ok(Self {
            config,
            queue,
            workers,
            inline,
            gate,
            failures,
            active,
            submitted: AtomicU64::new(0),
            started: Instant::now(),
        })
    }

    /// Enqueue a task; never blocks
    ///
    /// In single-worker mode the task runs to completion on the calling
    /// thread before `submit` returns; once a failure has been captured,
    /// later submissions are dropped, matching the threaded semantics of a
    /// worker that has terminated its loop.
    pub fn submit<F>(&self, task: F)
    where
        F: FnOnce(&TaskContext) -> TaskResult + Send + 'static,
    {
        self.submitted.fetch_add(1, Ordering::Relaxed);

        match &self.inline {
            Some(inline) => {
                if self.failures.is_set() {
                    trace!("Inline worker already failed, dropping task");
                    return;
                }
                self.active.fetch_add(1, Ordering::SeqCst);
                execute_task(0, Box::new(task), &inline.ctx, &self.failures, &inline.stats);
                self.active.fetch_sub(1, Ordering::SeqCst);
            }
            None => {
                if self.queue.submit(Box::new(task)).is_err() {
                    self.failures
                        .record(PoolError::Worker(WorkerError::QueueClosed));
                }
            }
        }
    }

    /// Configured worker count
    pub fn size(&self) -> usize {
        self.config.workers
    }

    /// The pool's directory gate
    pub fn gate(&self) -> Arc<DirectoryGate> {
        Arc::clone(&self.gate)
    }

    /// Failures recorded after the first one, and therefore discarded
    pub fn discarded_failures(&self) -> u64 {
        self.failures.discarded()
    }

    /// Point-in-time progress snapshot
    pub fn progress(&self) -> PoolProgress {
        let (completed, failed) = match &self.inline {
            Some(inline) => (
                inline.stats.completed.load(Ordering::Relaxed),
                inline.stats.failed.load(Ordering::Relaxed),
            ),
            None => aggregate_stats(&self.workers),
        };

        PoolProgress {
            submitted: self.submitted.load(Ordering::Relaxed),
            completed,
            failed,
            pending: self.queue.len(),
            active_workers: self.active.load(Ordering::SeqCst),
            total_workers: self.config.workers,
            elapsed: self.started.elapsed(),
        }
    }

    /// Drain the queue, join every worker, and surface the first failure
    ///
    /// Submits exactly one stop sentinel per worker; FIFO order guarantees
    /// every previously submitted task is dequeued first. Returns only
    /// after every worker thread has terminated and every scratch
    /// directory has been released - even when a task failed, no thread is
    /// left dangling.
    pub fn wait(mut self) -> Result<()> {
        match self.inline.take() {
            Some(inline) => {
                inline.scratch.close();
            }
            None => {
                for _ in 0..self.workers.len() {
                    if self.queue.submit_stop().is_err() {
                        self.failures
                            .record(PoolError::Worker(WorkerError::QueueClosed));
                        break;
                    }
                }

                let workers = std::mem::take(&mut self.workers);
                for worker in workers {
                    if let Err(e) = worker.join() {
                        warn!(error = %e, "Worker failed to join cleanly");
                        self.failures.record(PoolError::Worker(e));
                    }
                }
            }
        }

        let discarded = self.failures.discarded();
        if discarded > 0 {
            warn!(discarded, "Additional failures were discarded, only the first is surfaced");
        }

        info!(
            submitted = self.submitted.load(Ordering::Relaxed),
            "Pool drained and joined"
        );

        match self.failures.take() {
            Some(failure) => Err(failure),
            None => Ok(()),
        }
    }
}

/// Progress information for display by a collaborator
#[derive(Debug, Clone)]
pub struct PoolProgress {
    /// Tasks submitted
    pub submitted: u64,

    /// Tasks completed successfully
    pub completed: u64,

    /// Tasks that failed
    pub failed: u64,

    /// Tasks still queued
    pub pending: usize,

    /// Workers currently executing a task
    pub active_workers: usize,

    /// Total workers
    pub total_workers: usize,

    /// Time since the pool was constructed
    pub elapsed: Duration,
}

impl PoolProgress {
    /// Completed tasks per second since pool construction
    pub fn tasks_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.completed as f64 / secs
        } else {
            0.0
        }
    }
}
