use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Minimal fetch counters for operational visibility.
#[derive(Clone, Default, Debug)]
pub struct FetchCounters {
    pub batches: Arc<AtomicU64>,
    pub requested: Arc<AtomicU64>,
    pub succeeded: Arc<AtomicU64>,

    // failure reasons
    pub failed_provider: Arc<AtomicU64>,
    pub failed_insufficient: Arc<AtomicU64>,
    pub failed_panic: Arc<AtomicU64>,
}

/// Point-in-time copy of [`FetchCounters`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FetchCountersSnapshot {
    pub batches: u64,
    pub requested: u64,
    pub succeeded: u64,
    pub failed: u64,
}

impl FetchCounters {
    pub(crate) fn bump(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> FetchCountersSnapshot {
        FetchCountersSnapshot {
            batches: self.batches.load(Ordering::Relaxed),
            requested: self.requested.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed_provider.load(Ordering::Relaxed)
                + self.failed_insufficient.load(Ordering::Relaxed)
                + self.failed_panic.load(Ordering::Relaxed),
        }
    }
}
