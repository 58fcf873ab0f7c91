//! Progress reporting for a reconstruction run.
//!
//! Progress is delivered through an injected callback, never a global.
//! Workers finish tiles concurrently; an atomic step threshold decides when
//! an update is due (at least 5% apart) and a mutex serializes the callback
//! invocation so implementors never see overlapping calls.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Number of reporting steps across a full run (20 steps = 5% granularity).
const PROGRESS_STEPS: usize = 20;

/// A progress update event.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressUpdate {
    /// Reconstruction has started.
    Started {
        /// Human-readable label for the running operation.
        label: String,
    },
    /// Fraction of tiles completed, in `[0, 1]`. The final update is
    /// always exactly `1.0`.
    Progress {
        /// Completed fraction.
        fraction: f32,
    },
}

/// Callback type for progress updates.
pub type ProgressCallback = Box<dyn Fn(ProgressUpdate) + Send + Sync>;

/// Tracks tile completion and rate-limits callback invocations.
pub(crate) struct ProgressReporter<'a> {
    callback: Option<&'a ProgressCallback>,
    total: usize,
    done: AtomicUsize,
    reported_step: AtomicUsize,
    lock: Mutex<()>,
}

impl<'a> ProgressReporter<'a> {
    pub(crate) fn new(total: usize, callback: Option<&'a ProgressCallback>) -> Self {
        Self {
            callback,
            total: total.max(1),
            done: AtomicUsize::new(0),
            reported_step: AtomicUsize::new(0),
            lock: Mutex::new(()),
        }
    }

    /// Emit the start event with the given label.
    pub(crate) fn start(&self, label: &str) {
        if let Some(cb) = self.callback {
            let _guard = self.lock.lock();
            cb(ProgressUpdate::Started { label: label.to_string() });
        }
    }

    /// Record one finished tile; reports when a new 5% step is crossed.
    pub(crate) fn tile_done(&self) {
        let done = self.done.fetch_add(1, Ordering::AcqRel) + 1;
        let Some(cb) = self.callback else { return };
        if done >= self.total {
            // The terminal 1.0 is emitted once by finish().
            return;
        }
        let step = done * PROGRESS_STEPS / self.total;
        if step <= self.reported_step.load(Ordering::Relaxed) {
            return;
        }
        // Re-check under the lock so reported fractions stay monotonic.
        let _guard = self.lock.lock();
        if step > self.reported_step.load(Ordering::Relaxed) {
            self.reported_step.store(step, Ordering::Relaxed);
            cb(ProgressUpdate::Progress { fraction: done as f32 / self.total as f32 });
        }
    }

    /// Emit the terminal `1.0` update.
    pub(crate) fn finish(&self) {
        if let Some(cb) = self.callback {
            let _guard = self.lock.lock();
            cb(ProgressUpdate::Progress { fraction: 1.0 });
        }
    }
}
