//! Shared scan statistics.
//!
//! Counters are per-device atomics; the total is derived from them at read
//! time so `total == cpu + gpu` holds at every observation point. Each device
//! keeps a bounded rolling window of throughput samples for a smoothed rate.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::types::StatsSnapshot;

const RATE_WINDOW_SAMPLES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Cpu,
    Gpu,
}

/// Rolling throughput window: at most 10 samples of candidates/second.
#[derive(Debug, Default)]
pub struct RateWindow {
    samples: VecDeque<f64>,
    last_update: Option<Instant>,
}

impl RateWindow {
    fn record(&mut self, processed: u64) {
        let now = Instant::now();
        if let Some(prev) = self.last_update {
            let elapsed = now.duration_since(prev).as_secs_f64();
            if elapsed > 0.0 {
                if self.samples.len() == RATE_WINDOW_SAMPLES {
                    self.samples.pop_front();
                }
                self.samples.push_back(processed as f64 / elapsed);
            }
        }
        self.last_update = Some(now);
    }

    fn per_minute(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<f64>() / self.samples.len() as f64 * 60.0
    }

    fn reset(&mut self) {
        self.samples.clear();
        self.last_update = None;
    }
}

#[derive(Debug, Default)]
pub struct ScanStats {
    cpu_processed: AtomicU64,
    gpu_processed: AtomicU64,
    hits: AtomicU64,
    accel_faults: AtomicU64,
    cpu_rate: Mutex<RateWindow>,
    gpu_rate: Mutex<RateWindow>,
}

impl ScanStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_processed(&self, device: Device, count: u64) {
        let (counter, window) = match device {
            Device::Cpu => (&self.cpu_processed, &self.cpu_rate),
            Device::Gpu => (&self.gpu_processed, &self.gpu_rate),
        };
        counter.fetch_add(count, Ordering::Relaxed);
        if let Ok(mut window) = window.lock() {
            window.record(count);
        }
    }

    pub fn add_hits(&self, count: u64) {
        self.hits.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_accel_fault(&self) {
        self.accel_faults.fetch_add(1, Ordering::Relaxed);
    }

    pub fn cpu_processed(&self) -> u64 {
        self.cpu_processed.load(Ordering::Relaxed)
    }

    pub fn gpu_processed(&self) -> u64 {
        self.gpu_processed.load(Ordering::Relaxed)
    }

    pub fn total_scanned(&self) -> u64 {
        self.cpu_processed() + self.gpu_processed()
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn accel_faults(&self) -> u64 {
        self.accel_faults.load(Ordering::Relaxed)
    }

    pub fn cpu_rate_per_min(&self) -> f64 {
        self.cpu_rate
            .lock()
            .map(|w| w.per_minute())
            .unwrap_or(0.0)
    }

    pub fn gpu_rate_per_min(&self) -> f64 {
        self.gpu_rate
            .lock()
            .map(|w| w.per_minute())
            .unwrap_or(0.0)
    }

    /// Counters start from zero for every session.
    pub fn reset(&self) {
        self.cpu_processed.store(0, Ordering::Relaxed);
        self.gpu_processed.store(0, Ordering::Relaxed);
        self.hits.store(0, Ordering::Relaxed);
        self.accel_faults.store(0, Ordering::Relaxed);
        if let Ok(mut window) = self.cpu_rate.lock() {
            window.reset();
        }
        if let Ok(mut window) = self.gpu_rate.lock() {
            window.reset();
        }
    }
}

/// Throttles snapshot recomputation so pollers never hammer the oracle.
pub struct SnapshotCache {
    interval: Duration,
    cached: Mutex<Option<(Instant, StatsSnapshot)>>,
}

impl SnapshotCache {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            cached: Mutex::new(None),
        }
    }

    /// Return the cached snapshot if it is fresh enough, otherwise recompute.
    ///
    /// The cache lock is never held across `compute`, so the callback is free
    /// to take other locks (including ones whose holders invalidate this
    /// cache). Concurrent refreshes may race; the last store wins.
    pub fn get_or_refresh(&self, compute: impl FnOnce() -> StatsSnapshot) -> StatsSnapshot {
        {
            let slot = match self.cached.lock() {
                Ok(slot) => slot,
                Err(poisoned) => poisoned.into_inner(),
            };
            if let Some((at, snapshot)) = slot.as_ref() {
                if !self.interval.is_zero() && at.elapsed() < self.interval {
                    return snapshot.clone();
                }
            }
        }

        let snapshot = compute();

        let mut slot = match self.cached.lock() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        *slot = Some((Instant::now(), snapshot.clone()));
        snapshot
    }

    pub fn invalidate(&self) {
        if let Ok(mut slot) = self.cached.lock() {
            *slot = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ScanState;

    fn snapshot_with_total(total: u64) -> StatsSnapshot {
        StatsSnapshot {
            state: ScanState::Running,
            total_scanned: total,
            cpu_processed: total,
            gpu_processed: 0,
            hits: 0,
            accel_faults: 0,
            cpu_rate_per_min: 0.0,
            gpu_rate_per_min: 0.0,
            queue_depth: 0,
            active_workers: 0,
            gpu_worker: false,
            oracle_chain: None,
            oracle_height: None,
            last_error: None,
        }
    }

    #[test]
    fn total_is_sum_of_devices() {
        let stats = ScanStats::new();
        stats.record_processed(Device::Cpu, 100);
        stats.record_processed(Device::Gpu, 250);
        stats.record_processed(Device::Cpu, 50);
        assert_eq!(stats.cpu_processed(), 150);
        assert_eq!(stats.gpu_processed(), 250);
        assert_eq!(stats.total_scanned(), 400);
    }

    #[test]
    fn rate_window_is_bounded() {
        let mut window = RateWindow::default();
        for _ in 0..50 {
            window.record(10);
            std::thread::sleep(Duration::from_millis(1));
        }
        assert!(window.samples.len() <= RATE_WINDOW_SAMPLES);
        assert!(window.per_minute() > 0.0);
    }

    #[test]
    fn reset_zeroes_everything() {
        let stats = ScanStats::new();
        stats.record_processed(Device::Cpu, 10);
        stats.add_hits(2);
        stats.record_accel_fault();
        stats.reset();
        assert_eq!(stats.total_scanned(), 0);
        assert_eq!(stats.hits(), 0);
        assert_eq!(stats.accel_faults(), 0);
        assert_eq!(stats.cpu_rate_per_min(), 0.0);
    }

    #[test]
    fn cache_returns_stale_value_within_interval() {
        let cache = SnapshotCache::new(Duration::from_secs(60));
        let first = cache.get_or_refresh(|| snapshot_with_total(1));
        let second = cache.get_or_refresh(|| snapshot_with_total(2));
        assert_eq!(first.total_scanned, 1);
        assert_eq!(second.total_scanned, 1);
    }

    #[test]
    fn zero_interval_disables_caching() {
        let cache = SnapshotCache::new(Duration::ZERO);
        cache.get_or_refresh(|| snapshot_with_total(1));
        let second = cache.get_or_refresh(|| snapshot_with_total(2));
        assert_eq!(second.total_scanned, 2);
    }

    #[test]
    fn compute_may_take_the_cache_lock_itself() {
        let cache = SnapshotCache::new(Duration::from_secs(60));
        let snapshot = cache.get_or_refresh(|| {
            // A caller holding other locks during refresh may invalidate
            // concurrently; this must not deadlock against the refresh.
            cache.invalidate();
            snapshot_with_total(7)
        });
        assert_eq!(snapshot.total_scanned, 7);
        let second = cache.get_or_refresh(|| snapshot_with_total(9));
        assert_eq!(second.total_scanned, 7);
    }

    #[test]
    fn invalidate_forces_recompute() {
        let cache = SnapshotCache::new(Duration::from_secs(60));
        cache.get_or_refresh(|| snapshot_with_total(1));
        cache.invalidate();
        let second = cache.get_or_refresh(|| snapshot_with_total(2));
        assert_eq!(second.total_scanned, 2);
    }
}
