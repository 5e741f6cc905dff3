//! Load and resource counters for developer diagnostics.
//!
//! The controller reports every load outcome and the materializer reports per-entry results.
//! Snapshots are serializable so a shell can surface them in a debug overlay.

use std::cmp::Ordering;
use std::collections::VecDeque;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tracing::warn;

const DEFAULT_SAMPLE_CAPACITY: usize = 64;

#[derive(Debug, Default)]
struct SampleWindow {
    samples: VecDeque<f32>,
    capacity: usize,
}

impl SampleWindow {
    fn new(capacity: usize) -> Self {
        Self { samples: VecDeque::with_capacity(capacity), capacity }
    }

    fn push(&mut self, value: f32) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(value);
    }

    fn percentile(&self, percentile: f32) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }

        let mut sorted: Vec<f32> = self.samples.iter().copied().collect();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

        let rank = percentile.clamp(0.0, 1.0) * (sorted.len() - 1) as f32;
        sorted.get(rank.round() as usize).copied().unwrap_or(0.0)
    }
}

/// How a load ended, as seen by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadResult {
    Ready,
    Failed,
    Superseded,
}

#[derive(Debug)]
struct StatsInner {
    started_at: Instant,
    load_times_ms: SampleWindow,
    loads_started: u64,
    loads_ready: u64,
    loads_failed: u64,
    loads_superseded: u64,
    entries_materialized: u64,
    entry_failures: u64,
    resident_bytes: u64,
    resident_handles: usize,
}

impl Default for StatsInner {
    fn default() -> Self {
        Self {
            started_at: Instant::now(),
            load_times_ms: SampleWindow::new(DEFAULT_SAMPLE_CAPACITY),
            loads_started: 0,
            loads_ready: 0,
            loads_failed: 0,
            loads_superseded: 0,
            entries_materialized: 0,
            entry_failures: 0,
            resident_bytes: 0,
            resident_handles: 0,
        }
    }
}

/// Thread-safe counter collection.
#[derive(Debug, Default)]
pub struct StatsCollector {
    inner: parking_lot::Mutex<StatsInner>,
}

impl StatsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_load_started(&self) {
        let mut guard = self.inner.lock();
        guard.loads_started = guard.loads_started.saturating_add(1);
    }

    /// Record the end of a load and how long it took from request to outcome.
    pub fn record_load_finished(&self, result: LoadResult, duration: Duration) {
        let mut guard = self.inner.lock();
        match result {
            LoadResult::Ready => guard.loads_ready = guard.loads_ready.saturating_add(1),
            LoadResult::Failed => guard.loads_failed = guard.loads_failed.saturating_add(1),
            LoadResult::Superseded => {
                guard.loads_superseded = guard.loads_superseded.saturating_add(1);
                return;
            }
        }
        guard.load_times_ms.push(duration.as_secs_f64() as f32 * 1_000.0);
    }

    /// Record whether a single entry was materialized or dropped after a read failure.
    pub fn record_entry(&self, materialized: bool) {
        let mut guard = self.inner.lock();
        if materialized {
            guard.entries_materialized = guard.entries_materialized.saturating_add(1);
        } else {
            guard.entry_failures = guard.entry_failures.saturating_add(1);
        }
    }

    /// Update the live resource counters.
    pub fn update_resident(&self, bytes: usize, handles: usize) {
        let mut guard = self.inner.lock();
        guard.resident_bytes = bytes as u64;
        guard.resident_handles = handles;
    }

    pub fn snapshot(&self) -> LoadSnapshot {
        let guard = self.inner.lock();

        LoadSnapshot {
            timestamp_ms: now_ms(),
            uptime_ms: guard.started_at.elapsed().as_millis() as u64,
            loads_started: guard.loads_started,
            loads_ready: guard.loads_ready,
            loads_failed: guard.loads_failed,
            loads_superseded: guard.loads_superseded,
            load_time_ms_p50: guard.load_times_ms.percentile(0.50),
            load_time_ms_p95: guard.load_times_ms.percentile(0.95),
            entries_materialized: guard.entries_materialized,
            entry_failures: guard.entry_failures,
            resident_bytes: guard.resident_bytes,
            resident_handles: guard.resident_handles,
        }
    }
}

fn now_ms() -> u64 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(delta) => delta.as_millis() as u64,
        Err(err) => {
            warn!("system clock error: {err}");
            0
        }
    }
}

/// Immutable snapshot handed to the UI layer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadSnapshot {
    pub timestamp_ms: u64,
    pub uptime_ms: u64,
    pub loads_started: u64,
    pub loads_ready: u64,
    pub loads_failed: u64,
    pub loads_superseded: u64,
    pub load_time_ms_p50: f32,
    pub load_time_ms_p95: f32,
    pub entries_materialized: u64,
    pub entry_failures: u64,
    pub resident_bytes: u64,
    pub resident_handles: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_outcomes_are_counted() {
        let collector = StatsCollector::new();
        for _ in 0..3 {
            collector.record_load_started();
        }
        collector.record_load_finished(LoadResult::Ready, Duration::from_millis(10));
        collector.record_load_finished(LoadResult::Failed, Duration::from_millis(30));
        collector.record_load_finished(LoadResult::Superseded, Duration::from_millis(500));

        let snap = collector.snapshot();
        assert_eq!(snap.loads_started, 3);
        assert_eq!((snap.loads_ready, snap.loads_failed, snap.loads_superseded), (1, 1, 1));
        // Superseded loads do not skew the timing window.
        assert!(snap.load_time_ms_p95 < 31.0);
        assert!(snap.load_time_ms_p50 > 9.0);
    }

    #[test]
    fn entry_and_resident_counters_are_tracked() {
        let collector = StatsCollector::new();
        collector.record_entry(true);
        collector.record_entry(true);
        collector.record_entry(false);
        collector.update_resident(4096, 2);

        let snap = collector.snapshot();
        assert_eq!(snap.entries_materialized, 2);
        assert_eq!(snap.entry_failures, 1);
        assert_eq!(snap.resident_bytes, 4096);
        assert_eq!(snap.resident_handles, 2);
    }
}
