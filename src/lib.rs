//! covpool - Worker-Pool Coordination Core for Coverage Processing
//!
//! A library for coordinating many independent units of coverage work -
//! each typically invoking an external instrumentation-report tool and
//! parsing its output - across a fixed-size pool of worker threads.
//!
//! # Features
//!
//! - **Directory mutual exclusion**: The external tool writes side-effect
//!   files into the directory it is pointed at, so the [`DirectoryGate`]
//!   serializes tasks touching the same directory while different
//!   directories run fully in parallel.
//!
//! - **Per-worker scratch directories**: Every task receives its worker's
//!   private temporary directory through an explicit [`TaskContext`],
//!   deleted (best-effort) when the worker stops.
//!
//! - **Merge-by-key aggregation**: Workers report into a shared
//!   [`ResultAggregator`]; fetch-or-create and mutation happen in one
//!   critical section, so per-key updates never interleave.
//!
//! - **First-failure propagation**: A failing or panicking task stops its
//!   worker; the remaining workers drain the queue, and
//!   [`WorkerPool::wait`] replays the first captured failure on the
//!   driver's thread after every join.
//!
//! # Architecture
//!
//! ```text
//!  driver ──submit()──► ┌──────────────────────────┐
//!                       │        TaskQueue         │
//!                       │   (crossbeam unbounded)  │
//!                       └──────────┬───────────────┘
//!                                  │ take()
//!          ┌───────────────┬───────┴───────┬───────────────┐
//!          ▼               ▼               ▼               ▼
//!     ┌─────────┐     ┌─────────┐     ┌─────────┐     ┌─────────┐
//!     │Worker 0 │     │Worker 1 │     │Worker 2 │ ... │Worker N │
//!     │ scratch │     │ scratch │     │ scratch │     │ scratch │
//!     └────┬────┘     └────┬────┘     └────┬────┘     └────┬────┘
//!          │               │               │               │
//!          ├──────── DirectoryGate (per-path exclusion) ───┤
//!          │               │               │               │
//!          └───────────────┴───────┬───────┴───────────────┘
//!                                  ▼
//!                     ┌──────────────────────────┐
//!                     │     ResultAggregator     │
//!                     │   (merge-by-key records) │
//!                     └──────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use covpool::{PoolConfig, ResultAggregator, WorkerPool};
//! use std::sync::Arc;
//!
//! let pool = WorkerPool::new(PoolConfig::new(4)?)?;
//! let coverage: Arc<ResultAggregator<String, u64>> = Arc::new(ResultAggregator::new());
//!
//! for unit in ["alpha.gcda", "beta.gcda"] {
//!     let coverage = Arc::clone(&coverage);
//!     pool.submit(move |ctx| {
//!         // Side-effect files from the external tool stay serialized
//!         // per directory; temporaries go to ctx.workdir()
//!         let _hold = ctx.lock_dir("build/objs");
//!         coverage.update(unit.to_string(), |lines| *lines += 1);
//!         Ok(())
//!     });
//! }
//!
//! pool.wait()?;
//! assert_eq!(coverage.get(&"alpha.gcda".to_string()), Some(1));
//! # Ok::<(), covpool::PoolError>(())
//! ```

pub mod aggregate;
pub mod config;
pub mod error;
pub mod gate;
pub mod pool;
pub mod scratch;

pub use aggregate::ResultAggregator;
pub use config::PoolConfig;
pub use error::{ConfigError, PoolError, Result, TaskError, TaskResult, WorkerError};
pub use gate::{DirectoryGate, DirectoryHold};
pub use pool::{PoolProgress, Task, TaskContext, WorkerPool};
pub use scratch::ScratchSpace;
