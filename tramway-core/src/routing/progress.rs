use std::sync::atomic::{AtomicBool, Ordering};

/// Snapshot pushed to a [`CalculationProgress`] after every expanded segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressStatus {
    /// Elapsed seconds of the segment just expanded
    pub distance_from_begin: f64,
    pub frontier_size: usize,
    pub visited_segments: usize,
}

/// Cooperative cancellation and progress sink owned by the caller.
///
/// A cancelled search returns an empty result list, so callers tell it apart
/// from "no route" by checking their own flag.
pub trait CalculationProgress: Sync {
    fn is_cancelled(&self) -> bool;

    fn report_status(&self, _status: &ProgressStatus) {}
}

/// Thread-safe cancellation flag.
#[derive(Debug, Default)]
pub struct CancellationFlag {
    cancelled: AtomicBool,
}

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::Relaxed);
    }
}

impl CalculationProgress for CancellationFlag {
    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}
