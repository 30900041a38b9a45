use std::sync::atomic::AtomicU64;

use prometheus_client::{
    encoding::text::encode,
    metrics::gauge::Gauge,
    registry::Registry,
};

use crate::types::StatsSnapshot;

/// Prometheus view of the pipeline.
///
/// Everything is a gauge: processed counters reset with each session, so
/// exporting them as monotonic counters would produce bogus rate() results
/// across restarts.
pub struct PrometheusMetrics {
    registry: Registry,

    cpu_processed: Gauge<i64>,
    gpu_processed: Gauge<i64>,
    total_scanned: Gauge<i64>,
    hits: Gauge<i64>,
    accel_faults: Gauge<i64>,
    queue_depth: Gauge<i64>,
    active_workers: Gauge<i64>,
    cpu_rate_per_min: Gauge<f64, AtomicU64>,
    gpu_rate_per_min: Gauge<f64, AtomicU64>,
    session_running: Gauge<i64>,
}

impl PrometheusMetrics {
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let cpu_processed = Gauge::default();
        let gpu_processed = Gauge::default();
        let total_scanned = Gauge::default();
        let hits = Gauge::default();
        let accel_faults = Gauge::default();
        let queue_depth = Gauge::default();
        let active_workers = Gauge::default();
        let cpu_rate_per_min: Gauge<f64, AtomicU64> = Gauge::default();
        let gpu_rate_per_min: Gauge<f64, AtomicU64> = Gauge::default();
        let session_running = Gauge::default();

        registry.register(
            "wallet_scanner_cpu_processed",
            "Candidates verified on the CPU path this session",
            cpu_processed.clone(),
        );
        registry.register(
            "wallet_scanner_gpu_processed",
            "Candidates verified on the accelerator path this session",
            gpu_processed.clone(),
        );
        registry.register(
            "wallet_scanner_total_scanned",
            "Total candidates verified this session",
            total_scanned.clone(),
        );
        registry.register(
            "wallet_scanner_hits",
            "Funded addresses found this session",
            hits.clone(),
        );
        registry.register(
            "wallet_scanner_accel_faults",
            "Accelerator batch faults this session",
            accel_faults.clone(),
        );
        registry.register(
            "wallet_scanner_queue_depth",
            "Batches currently waiting in the candidate queue",
            queue_depth.clone(),
        );
        registry.register(
            "wallet_scanner_active_workers",
            "Live verifier threads",
            active_workers.clone(),
        );
        registry.register(
            "wallet_scanner_cpu_rate_per_min",
            "CPU verification throughput, candidates per minute",
            cpu_rate_per_min.clone(),
        );
        registry.register(
            "wallet_scanner_gpu_rate_per_min",
            "Accelerator verification throughput, candidates per minute",
            gpu_rate_per_min.clone(),
        );
        registry.register(
            "wallet_scanner_session_running",
            "1 while a scan session is in the Running state",
            session_running.clone(),
        );

        Self {
            registry,
            cpu_processed,
            gpu_processed,
            total_scanned,
            hits,
            accel_faults,
            queue_depth,
            active_workers,
            cpu_rate_per_min,
            gpu_rate_per_min,
            session_running,
        }
    }

    pub fn update_from_snapshot(&self, snapshot: &StatsSnapshot) {
        self.cpu_processed.set(snapshot.cpu_processed as i64);
        self.gpu_processed.set(snapshot.gpu_processed as i64);
        self.total_scanned.set(snapshot.total_scanned as i64);
        self.hits.set(snapshot.hits as i64);
        self.accel_faults.set(snapshot.accel_faults as i64);
        self.queue_depth.set(snapshot.queue_depth as i64);
        self.active_workers.set(snapshot.active_workers as i64);
        self.cpu_rate_per_min.set(snapshot.cpu_rate_per_min);
        self.gpu_rate_per_min.set(snapshot.gpu_rate_per_min);
        self.session_running
            .set(i64::from(snapshot.state == crate::types::ScanState::Running));
    }

    pub fn export(&self) -> anyhow::Result<String> {
        let mut buffer = String::new();
        encode(&mut buffer, &self.registry)?;
        Ok(buffer)
    }
}

impl Default for PrometheusMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ScanState;

    #[test]
    fn exports_updated_gauges() {
        let metrics = PrometheusMetrics::new();
        metrics.update_from_snapshot(&StatsSnapshot {
            state: ScanState::Running,
            total_scanned: 300,
            cpu_processed: 100,
            gpu_processed: 200,
            hits: 1,
            accel_faults: 0,
            cpu_rate_per_min: 6000.0,
            gpu_rate_per_min: 12000.0,
            queue_depth: 4,
            active_workers: 3,
            gpu_worker: true,
            oracle_chain: Some("main".to_string()),
            oracle_height: Some(850_000),
            last_error: None,
        });
        let text = metrics.export().unwrap();
        assert!(text.contains("wallet_scanner_total_scanned 300"));
        assert!(text.contains("wallet_scanner_hits 1"));
        assert!(text.contains("wallet_scanner_session_running 1"));
    }
}
