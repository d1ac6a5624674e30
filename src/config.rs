//! Configuration for the worker pool
//!
//! This module defines:
//! - Pool sizing with validation
//! - Scratch directory placement
//! - Worker thread naming

use crate::error::ConfigError;
use std::path::PathBuf;

/// Maximum reasonable worker count
const MAX_WORKERS: usize = 512;

/// Configuration for a [`WorkerPool`](crate::WorkerPool)
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Number of worker threads (always >= 1 after validation)
    pub workers: usize,

    /// Parent directory for per-worker scratch directories
    ///
    /// `None` uses the platform temporary directory.
    pub scratch_root: Option<PathBuf>,

    /// Prefix for worker thread names, e.g. "covpool" -> "covpool-0"
    pub thread_name_prefix: String,
}

impl PoolConfig {
    /// Create a validated configuration
    ///
    /// A request for zero workers resolves to one worker per logical CPU
    /// on the host. Counts above [`MAX_WORKERS`] are rejected.
    pub fn new(workers: usize) -> Result<Self, ConfigError> {
        let workers = if workers == 0 {
            default_workers()
        } else {
            workers
        };

        if workers > MAX_WORKERS {
            return Err(ConfigError::InvalidWorkerCount {
                count: workers,
                max: MAX_WORKERS,
            });
        }

        Ok(Self {
            workers,
            scratch_root: None,
            thread_name_prefix: "covpool".to_string(),
        })
    }

    /// Place worker scratch directories under `root` instead of the
    /// platform temporary directory
    ///
    /// `root` must already exist.
    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(ConfigError::InvalidScratchRoot { path: root });
        }
        self.scratch_root = Some(root);
        Ok(self)
    }

    /// Override the worker thread name prefix
    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            scratch_root: None,
            thread_name_prefix: "covpool".to_string(),
        }
    }
}

fn default_workers() -> usize {
    // Task bodies block on an external process, but unlike network I/O the
    // tool itself eats a core, so 1x CPU count is the right default
    num_cpus::get().max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_workers_resolves_to_cpu_count() {
        let config = PoolConfig::new(0).unwrap();
        assert!(config.workers >= 1);
        assert_eq!(config.workers, num_cpus::get().max(1));
    }

    #[test]
    fn test_explicit_worker_count() {
        let config = PoolConfig::new(4).unwrap();
        assert_eq!(config.workers, 4);
    }

    #[test]
    fn test_worker_count_upper_bound() {
        let result = PoolConfig::new(MAX_WORKERS + 1);
        assert!(matches!(
            result,
            Err(ConfigError::InvalidWorkerCount { .. })
        ));
    }

    #[test]
    fn test_scratch_root_must_exist() {
        let result = PoolConfig::new(2)
            .unwrap()
            .with_scratch_root("/nonexistent/covpool/scratch");
        assert!(matches!(result, Err(ConfigError::InvalidScratchRoot { .. })));
    }

    #[test]
    fn test_scratch_root_accepts_existing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = PoolConfig::new(2)
            .unwrap()
            .with_scratch_root(dir.path())
            .unwrap();
        assert_eq!(config.scratch_root.as_deref(), Some(dir.path()));
    }
}
