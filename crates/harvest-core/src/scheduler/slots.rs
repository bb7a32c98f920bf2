//! Worker slot counter and blocking-stage gauge.
//!
//! Both are lock-free counters that also remember their high-water mark, so
//! the concurrency bound can be checked after a run.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn raise_peak(peak: &AtomicUsize, value: usize) {
    peak.fetch_max(value, Ordering::AcqRel);
}

/// Fixed number of episode worker slots.
#[derive(Debug)]
pub struct WorkerSlots {
    capacity: usize,
    in_use: AtomicUsize,
    peak: AtomicUsize,
}

impl WorkerSlots {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            in_use: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn in_use(&self) -> usize {
        self.in_use.load(Ordering::Acquire)
    }

    /// Highest number of slots held at once.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::Acquire)
    }

    /// Claims a free slot, or None when all are taken.
    /// The slot is released when the guard drops.
    pub fn try_claim(self: &Arc<Self>) -> Option<SlotGuard> {
        let mut current = self.in_use.load(Ordering::Acquire);
        loop {
            if current >= self.capacity {
                return None;
            }
            match self.in_use.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    raise_peak(&self.peak, current + 1);
                    return Some(SlotGuard {
                        slots: Arc::clone(self),
                    });
                }
                Err(actual) => current = actual,
            }
        }
    }
}

/// Held for the lifetime of one episode pipeline.
#[derive(Debug)]
pub struct SlotGuard {
    slots: Arc<WorkerSlots>,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.slots.in_use.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Counts pipelines currently in a blocking stage (probing or downloading).
#[derive(Debug, Default)]
pub struct ActivityGauge {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl ActivityGauge {
    pub fn enter(self: &Arc<Self>) -> ActivityGuard {
        let now = self.current.fetch_add(1, Ordering::AcqRel) + 1;
        raise_peak(&self.peak, now);
        ActivityGuard {
            gauge: Arc::clone(self),
        }
    }

    pub fn current(&self) -> usize {
        self.current.load(Ordering::Acquire)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::Acquire)
    }
}

#[derive(Debug)]
pub struct ActivityGuard {
    gauge: Arc<ActivityGauge>,
}

impl Drop for ActivityGuard {
    fn drop(&mut self) {
        self.gauge.current.fetch_sub(1, Ordering::AcqRel);
    }
}
