//! Single-flight admission control for pipeline runs.

use std::sync::atomic::{AtomicBool, Ordering};

/// Process-wide "a run is in flight" flag.
///
/// `try_start` is a compare-and-set, so at most one run is ever admitted at
/// a time; a rejected caller is not queued. `finish` must be called on every
/// exit path of an admitted run so a failed run can never block future runs.
/// The flag lives only in memory and resets on process restart.
#[derive(Debug, Default)]
pub struct RunGuard {
    running: AtomicBool,
}

impl RunGuard {
    pub const fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
        }
    }

    /// Atomically transition idle → running. Returns whether this caller was
    /// admitted.
    pub fn try_start(&self) -> bool {
        self.running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Unconditionally release the flag.
    pub fn finish(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}
