//! Per-worker scratch directories
//!
//! Each worker owns one private temporary directory for the lifetime of its
//! thread. Task bodies write their intermediate files there, so they never
//! collide with other workers or with the external tool's own directory.
//! Cleanup at worker stop is recursive and best-effort: a deletion failure
//! (file still open on a platform with mandatory locking, for instance) is
//! swallowed, never surfaced.

use std::io;
use std::path::Path;
use tempfile::TempDir;
use tracing::debug;

/// A worker-private temporary directory
///
/// 1:1 with a live worker, never shared. Deleted when closed or dropped.
#[derive(Debug)]
pub struct ScratchSpace {
    dir: TempDir,
}

impl ScratchSpace {
    /// Create a fresh empty scratch directory for `worker_id`
    ///
    /// `parent` overrides the platform temporary directory as the location.
    pub fn new(worker_id: usize, parent: Option<&Path>) -> io::Result<Self> {
        let builder_prefix = format!("covpool-worker-{}-", worker_id);
        let mut builder = tempfile::Builder::new();
        builder.prefix(&builder_prefix);

        let dir = match parent {
            Some(parent) => builder.tempdir_in(parent)?,
            None => builder.tempdir()?,
        };

        debug!(worker = worker_id, path = %dir.path().display(), "Scratch directory created");
        Ok(Self { dir })
    }

    /// Path of the scratch directory
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Delete the directory recursively, swallowing failures
    pub fn close(self) {
        let path = self.dir.path().to_path_buf();
        if let Err(e) = self.dir.close() {
            // Best-effort cleanup, not a correctness requirement
            debug!(path = %path.display(), error = %e, "Scratch cleanup failed");
        }
    }
}
