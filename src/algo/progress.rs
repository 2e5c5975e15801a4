//! Progress reporting for background work.
//!
//! The index build coordinator reports one step per finished mesh build, so a caller
//! can drive a progress bar while the interactive thread keeps running.
//!
//! # Example
//!
//! ```
//! use chisel::algo::progress::Progress;
//!
//! let progress = Progress::new(|current, total, message| {
//!     eprintln!("[{}/{}] {}", current, total, message);
//! });
//! progress.report(1, 4, "Building index");
//! ```

/// A progress callback that may be invoked from the worker thread.
///
/// The callback receives:
/// - `current`: Steps finished so far
/// - `total`: Total number of steps known at this point
/// - `message`: Description of the current operation
pub struct Progress {
    callback: Box<dyn Fn(usize, usize, &str) + Send + Sync>,
}

impl Progress {
    /// Create a new progress reporter with the given callback.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(usize, usize, &str) + Send + Sync + 'static,
    {
        Self {
            callback: Box::new(callback),
        }
    }

    /// Report progress. `total == 0` is ignored.
    #[inline]
    pub fn report(&self, current: usize, total: usize, message: &str) {
        if total == 0 {
            return;
        }
        (self.callback)(current.min(total), total, message);
    }

    /// Create a no-op progress reporter that discards all updates.
    pub fn none() -> Self {
        Self::new(|_, _, _| {})
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::none()
    }
}

impl std::fmt::Debug for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Progress").finish_non_exhaustive()
    }
}
