//! Ongoing pipeline health counters.
//!
//! The loop runs unattended for long stretches; these counters are the
//! observable record of what it quietly survived. They are written from
//! the acquisition thread and snapshot from anywhere.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

#[derive(Debug, Default)]
pub struct PipelineHealth {
    cycles_published: AtomicU64,
    cycles_dropped: AtomicU64,
    invalid_channel_events: AtomicU64,
    consistency_violations: AtomicU64,
}

impl PipelineHealth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_published(&self) {
        self.cycles_published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.cycles_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invalid_channels(&self, count: u64) {
        if count > 0 {
            self.invalid_channel_events.fetch_add(count, Ordering::Relaxed);
        }
    }

    pub fn record_violations(&self, count: u64) {
        if count > 0 {
            self.consistency_violations.fetch_add(count, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> HealthSnapshot {
        HealthSnapshot {
            cycles_published: self.cycles_published.load(Ordering::Relaxed),
            cycles_dropped: self.cycles_dropped.load(Ordering::Relaxed),
            invalid_channel_events: self.invalid_channel_events.load(Ordering::Relaxed),
            consistency_violations: self.consistency_violations.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HealthSnapshot {
    pub cycles_published: u64,
    pub cycles_dropped: u64,
    pub invalid_channel_events: u64,
    pub consistency_violations: u64,
}
