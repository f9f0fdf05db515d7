use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared by every pipeline stage.
#[derive(Debug, Default)]
pub struct PipelineStats {
    pub(crate) received: AtomicU64,
    pub(crate) filtered: AtomicU64,
    pub(crate) rate_limited: AtomicU64,
    pub(crate) duplicates: AtomicU64,
    pub(crate) admitted: AtomicU64,
    pub(crate) batches: AtomicU64,
    pub(crate) dispatched: AtomicU64,
    pub(crate) notifications: AtomicU64,
    pub(crate) quarantined: AtomicU64,
    pub(crate) failures: AtomicU64,
}

/// Point-in-time copy of [`PipelineStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub received: u64,
    pub filtered: u64,
    pub rate_limited: u64,
    pub duplicates: u64,
    pub admitted: u64,
    pub batches: u64,
    pub dispatched: u64,
    pub notifications: u64,
    pub quarantined: u64,
    pub failures: u64,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        StatsSnapshot {
            received: load(&self.received),
            filtered: load(&self.filtered),
            rate_limited: load(&self.rate_limited),
            duplicates: load(&self.duplicates),
            admitted: load(&self.admitted),
            batches: load(&self.batches),
            dispatched: load(&self.dispatched),
            notifications: load(&self.notifications),
            quarantined: load(&self.quarantined),
            failures: load(&self.failures),
        }
    }
}

pub(crate) fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}
