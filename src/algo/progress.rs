//! Progress reporting for operators that run over many levels or passes.
//!
//! ```
//! use chisel::algo::progress::Progress;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! let seen = Arc::new(AtomicUsize::new(0));
//! let counter = Arc::clone(&seen);
//! let progress = Progress::new(move |step, total, stage| {
//!     assert!(step <= total);
//!     assert!(!stage.is_empty());
//!     counter.fetch_add(1, Ordering::Relaxed);
//! });
//! progress.report(1, 2, "level");
//! assert_eq!(seen.load(Ordering::Relaxed), 1);
//! ```

/// Callback receiving `(step, total, stage)` updates.
pub struct Progress {
    callback: Box<dyn Fn(usize, usize, &str) + Send + Sync>,
}

impl Progress {
    /// Wrap a callback.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(usize, usize, &str) + Send + Sync + 'static,
    {
        Self {
            callback: Box::new(callback),
        }
    }

    /// A reporter that drops every update.
    pub fn none() -> Self {
        Self::new(|_, _, _| {})
    }

    /// Report that `step` of `total` is reached in `stage`.
    #[inline]
    pub fn report(&self, step: usize, total: usize, stage: &str) {
        (self.callback)(step.min(total), total, stage);
    }

    /// Report `done` of `count` items inside outer step `step` of `steps`.
    ///
    /// Rescaled to a total of `steps * count` so nested loops report one
    /// monotonic sequence.
    pub fn report_nested(&self, done: usize, count: usize, step: usize, steps: usize, stage: &str) {
        if count == 0 || steps == 0 {
            return;
        }
        self.report(step * count + done.min(count), steps * count, stage);
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_report_nested_is_monotonic() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        let progress = Progress::new(move |step, total, _| sink.lock().unwrap().push((step, total)));

        for level in 0..2 {
            for done in 0..=3 {
                progress.report_nested(done, 3, level, 2, "faces");
            }
        }
        let log = log.lock().unwrap();
        assert!(log.windows(2).all(|w| w[0].0 <= w[1].0));
        assert!(log.iter().all(|&(_, total)| total == 6));
        assert_eq!(log.last(), Some(&(6, 6)));
    }

    #[test]
    fn test_report_clamps_step() {
        let last = Arc::new(Mutex::new((0, 0)));
        let sink = Arc::clone(&last);
        let progress = Progress::new(move |s, t, _| *sink.lock().unwrap() = (s, t));
        progress.report(9, 4, "x");
        assert_eq!(*last.lock().unwrap(), (4, 4));
        Progress::none().report_nested(1, 0, 0, 1, "empty");
    }
}
