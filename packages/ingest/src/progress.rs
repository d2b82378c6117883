//! Progress reporting for long-running ingestion runs.
//!
//! Defines a [`ProgressCallback`] trait that decouples progress
//! observation from any specific rendering backend. The pipeline calls
//! it once per processed record; implementations must not block.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Trait for reporting progress from long-running operations.
///
/// Implementations must be `Send + Sync` to support `Arc`-based sharing
/// across tasks.
pub trait ProgressCallback: Send + Sync {
    /// Advance progress by `delta` units.
    fn inc(&self, delta: u64);

    /// Current processed-record count. Monotonically increasing within
    /// one run.
    fn position(&self) -> u64;

    /// Mark progress as complete with a final message.
    fn finish(&self, msg: String);
}

/// A no-op implementation of [`ProgressCallback`] that silently ignores
/// all progress updates. Useful for tests.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn inc(&self, _delta: u64) {}
    fn position(&self) -> u64 {
        0
    }
    fn finish(&self, _msg: String) {}
}

/// Log-based progress: keeps a lock-free running counter and logs a
/// line every `every` records.
pub struct LogProgress {
    label: String,
    every: u64,
    count: AtomicU64,
}

impl LogProgress {
    /// Creates a reporter that logs every `every` processed records.
    /// An interval of zero is treated as one.
    #[must_use]
    pub const fn new(label: String, every: u64) -> Self {
        Self {
            label,
            every: if every == 0 { 1 } else { every },
            count: AtomicU64::new(0),
        }
    }
}

impl ProgressCallback for LogProgress {
    fn inc(&self, delta: u64) {
        let count = self.count.fetch_add(delta, Ordering::Relaxed) + delta;
        if count % self.every == 0 {
            log::info!("[{}] Processed {count} records", self.label);
        }
    }

    fn position(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    fn finish(&self, msg: String) {
        log::info!("{msg}");
    }
}

/// Returns a shared [`NullProgress`] instance for convenient use.
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_interval_is_clamped() {
        let progress = LogProgress::new("test".to_string(), 0);
        progress.inc(1);
        assert_eq!(progress.position(), 1);
    }

    #[test]
    fn log_progress_counter_is_monotonic() {
        let progress = LogProgress::new("test".to_string(), 10);
        progress.inc(3);
        progress.inc(4);
        assert_eq!(progress.position(), 7);
        progress.inc(3);
        assert_eq!(progress.position(), 10);
    }
}
