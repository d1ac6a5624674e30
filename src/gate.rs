//! Directory gate - mutual exclusion keyed by directory path
//!
//! The external instrumentation-report tool writes side-effect files into
//! the directory it is pointed at, so two concurrent invocations on one
//! directory corrupt each other. The gate serializes holders of the same
//! path while leaving different paths fully parallel.
//!
//! The gate is an explicitly constructed component, shared by `Arc` and
//! injected into the pool. Tests can instantiate independent gates without
//! cross-test interference.

use parking_lot::{Condvar, Mutex};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Mutual-exclusion registry keyed by directory path
///
/// Paths are compared as given; callers that mix relative and absolute
/// spellings of the same directory should canonicalize first.
#[derive(Debug, Default)]
pub struct DirectoryGate {
    /// Paths currently held by some thread
    held: Mutex<HashSet<PathBuf>>,

    /// Signaled whenever a path is released
    freed: Condvar,
}

impl DirectoryGate {
    /// Create a new, empty gate
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until `path` is free, then hold it
    ///
    /// The check and the insert happen inside one critical section, so two
    /// threads can never both observe "free" and both proceed. The returned
    /// guard releases the hold when dropped - on every exit path, including
    /// panics.
    pub fn lock(&self, path: impl Into<PathBuf>) -> DirectoryHold<'_> {
        let path = path.into();
        let mut held = self.held.lock();

        while held.contains(&path) {
            debug!(path = %path.display(), "Directory busy, waiting");
            // Releases the mutex while parked; re-checks on every wakeup
            // because the broadcast is not partitioned by path
            self.freed.wait(&mut held);
        }

        held.insert(path.clone());
        trace!(path = %path.display(), "Directory held");

        DirectoryHold { gate: self, path }
    }

    /// Hold `path` for the duration of `f`
    pub fn with_dir<T>(&self, path: impl Into<PathBuf>, f: impl FnOnce() -> T) -> T {
        let _hold = self.lock(path);
        f()
    }

    /// Check whether `path` is currently held by any thread
    pub fn is_held(&self, path: &Path) -> bool {
        self.held.lock().contains(path)
    }

    /// Number of paths currently held
    pub fn held_count(&self) -> usize {
        self.held.lock().len()
    }

    /// Remove the hold on `path` and wake every waiter
    ///
    /// The wake is a broadcast: the waiter set is not partitioned by path,
    /// so each waiter re-checks its own condition.
    fn release(&self, path: &Path) {
        let mut held = self.held.lock();
        held.remove(path);
        drop(held);

        trace!(path = %path.display(), "Directory released");
        self.freed.notify_all();
    }
}

/// RAII hold on a directory path
///
/// Created by [`DirectoryGate::lock`]; releases on drop.
#[must_use = "dropping the hold immediately releases the directory"]
pub struct DirectoryHold<'a> {
    gate: &'a DirectoryGate,
    path: PathBuf,
}

impl DirectoryHold<'_> {
    /// The held path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for DirectoryHold<'_> {
    fn drop(&mut self) {
        self.gate.release(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_hold_and_release() {
        let gate = DirectoryGate::new();
        assert!(!gate.is_held(Path::new("/build/objs")));

        let hold = gate.lock("/build/objs");
        assert!(gate.is_held(Path::new("/build/objs")));
        assert_eq!(gate.held_count(), 1);
        assert_eq!(hold.path(), Path::new("/build/objs"));

        drop(hold);
        assert!(!gate.is_held(Path::new("/build/objs")));
        assert_eq!(gate.held_count(), 0);
    }

    #[test]
    fn test_different_paths_are_independent() {
        let gate = DirectoryGate::new();
        let _a = gate.lock("/build/a");
        let _b = gate.lock("/build/b");
        assert_eq!(gate.held_count(), 2);
    }

    #[test]
    fn test_with_dir_returns_closure_result() {
        let gate = DirectoryGate::new();
        let result = gate.with_dir("/build/objs", || 42);
        assert_eq!(result, 42);
        assert!(!gate.is_held(Path::new("/build/objs")));
    }

    #[test]
    fn test_release_on_panic() {
        let gate = DirectoryGate::new();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _hold = gate.lock("/build/objs");
            panic!("task blew up");
        }));

        assert!(result.is_err());
        assert!(!gate.is_held(Path::new("/build/objs")));
    }

    #[test]
    fn test_second_locker_blocks_until_release() {
        let gate = Arc::new(DirectoryGate::new());
        let entered = Arc::new(AtomicBool::new(false));

        let hold = gate.lock("/build/objs");

        let gate2 = Arc::clone(&gate);
        let entered2 = Arc::clone(&entered);
        let waiter = thread::spawn(move || {
            let _hold = gate2.lock("/build/objs");
            entered2.store(true, Ordering::SeqCst);
        });

        // The waiter must not get through while the hold is live
        thread::sleep(Duration::from_millis(50));
        assert!(!entered.load(Ordering::SeqCst));

        drop(hold);
        waiter.join().unwrap();
        assert!(entered.load(Ordering::SeqCst));
    }
}
