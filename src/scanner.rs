//! Scan session controller.
//!
//! Owns the state machine `Stopped -> Initializing -> Running -> Stopping ->
//! Stopped`, with `Failed` reachable from `Initializing` and `Running` when
//! the oracle becomes unreachable. A session is the queue plus its worker
//! threads; configuration never changes under a live session, so resizing or
//! switching acceleration is a stop/start cycle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use tracing::{debug, error, info, warn};

use crate::config::ScanConfig;
use crate::entropy::CandidateSource;
use crate::error::ScanError;
use crate::generator::GeneratorWorker;
use crate::hasher::{self, BatchHasher};
use crate::instance::InstanceIdentity;
use crate::oracle::BalanceOracle;
use crate::queue::BatchQueue;
use crate::sink::ResultSink;
use crate::stats::{ScanStats, SnapshotCache};
use crate::types::{NodeInfo, ScanState, StatsSnapshot, VerificationHit};
use crate::verifier::{self, VerifierCtx};

/// A poisoned lock here only means a worker panicked mid-update; the guarded
/// data is still the best information available.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle shared by every worker of one session.
pub(crate) struct SessionShared {
    stop: Arc<AtomicBool>,
    state: Arc<Mutex<ScanState>>,
    last_error: Arc<Mutex<Option<String>>>,
}

impl SessionShared {
    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    /// Fatal worker error: record it, mark the session Failed and signal
    /// every worker to exit.
    pub fn fail(&self, err: &ScanError) {
        error!(error = %err, "session failing closed");
        *lock(&self.last_error) = Some(err.to_string());
        *lock(&self.state) = ScanState::Failed;
        self.request_stop();
    }
}

struct Session {
    shared: Arc<SessionShared>,
    queue: BatchQueue,
    /// `handles[0]` is the generator; the rest are verifiers.
    handles: Vec<JoinHandle<()>>,
    gpu_worker: bool,
}

pub struct Scanner {
    config: Mutex<ScanConfig>,
    oracle: Arc<dyn BalanceOracle>,
    accel: Mutex<Option<Arc<dyn BatchHasher>>>,
    identity: InstanceIdentity,
    sink: Arc<ResultSink>,
    stats: Arc<ScanStats>,
    hits: Arc<Mutex<Vec<VerificationHit>>>,
    node_info: Arc<Mutex<Option<NodeInfo>>>,
    snapshot_cache: SnapshotCache,
    session: Mutex<Option<Session>>,
    state: Arc<Mutex<ScanState>>,
    last_error: Arc<Mutex<Option<String>>>,
}

impl Scanner {
    /// Build a scanner, probing for a hardware hashing backend per the
    /// acceleration flags.
    pub fn new(config: ScanConfig, oracle: Arc<dyn BalanceOracle>) -> Self {
        let accel = hasher::select_backend(&config);
        Self::with_accelerator(config, oracle, accel)
    }

    /// Build a scanner around an explicit hashing backend (or none).
    pub fn with_accelerator(
        config: ScanConfig,
        oracle: Arc<dyn BalanceOracle>,
        accel: Option<Arc<dyn BatchHasher>>,
    ) -> Self {
        let identity = InstanceIdentity::next(&config.output_dir);
        let sink = Arc::new(ResultSink::new(&identity));
        let snapshot_cache = SnapshotCache::new(config.snapshot_interval());
        Self {
            config: Mutex::new(config),
            oracle,
            accel: Mutex::new(accel),
            identity,
            sink,
            stats: Arc::new(ScanStats::new()),
            hits: Arc::new(Mutex::new(Vec::new())),
            node_info: Arc::new(Mutex::new(None)),
            snapshot_cache,
            session: Mutex::new(None),
            state: Arc::new(Mutex::new(ScanState::Stopped)),
            last_error: Arc::new(Mutex::new(None)),
        }
    }

    /// Start a scan session. A start while one is already active is a no-op;
    /// oracle verification failure leaves the scanner Failed with no workers.
    pub fn start(&self) -> Result<(), ScanError> {
        let mut slot = lock(&self.session);
        match *lock(&self.state) {
            ScanState::Running | ScanState::Initializing => {
                info!("start requested while already active, ignoring");
                return Ok(());
            }
            ScanState::Stopping => {
                return Err(ScanError::Session("stop still in progress".to_string()));
            }
            ScanState::Stopped | ScanState::Failed => {}
        }

        // A failed session leaves its threads behind; reap them first.
        if let Some(old) = slot.take() {
            old.shared.request_stop();
            for handle in old.handles {
                if handle.join().is_err() {
                    warn!("scan worker panicked before restart");
                }
            }
        }

        *lock(&self.state) = ScanState::Initializing;
        if let Err(e) = self.oracle.verify_live_node() {
            let err = ScanError::OracleUnreachable(e.to_string());
            *lock(&self.last_error) = Some(err.to_string());
            *lock(&self.state) = ScanState::Failed;
            return Err(err);
        }
        match self.oracle.get_node_info() {
            Ok(info) => *lock(&self.node_info) = Some(info),
            Err(e) => warn!(error = %e, "node info unavailable at session start"),
        }

        let config = lock(&self.config).clone();
        self.stats.reset();
        *lock(&self.last_error) = None;
        self.snapshot_cache.invalidate();

        let accel = lock(&self.accel)
            .clone()
            .filter(|_| config.enable_gpu || config.enable_npu);
        let mut cpu_workers = if config.enable_cpu { config.cpu_threads } else { 0 };
        if cpu_workers == 0 && accel.is_none() {
            warn!("no verifier path enabled, falling back to CPU workers");
            cpu_workers = config.cpu_threads;
        }
        let batch_size = if accel.is_some() {
            config.batch_size_gpu
        } else {
            config.batch_size_cpu
        };

        let queue = BatchQueue::new(config.queue_capacity);
        let stop = Arc::new(AtomicBool::new(false));
        let shared = Arc::new(SessionShared {
            stop: Arc::clone(&stop),
            state: Arc::clone(&self.state),
            last_error: Arc::clone(&self.last_error),
        });

        let mut handles = Vec::with_capacity(1 + cpu_workers + usize::from(accel.is_some()));
        let generator = GeneratorWorker {
            queue: queue.clone(),
            stop,
            word_count: config.word_count,
            batch_size,
            refill_threshold: config.refill_threshold,
        };
        handles.push(thread::spawn(move || generator.run(CandidateSource::new())));

        let ctx = VerifierCtx {
            queue: queue.clone(),
            oracle: Arc::clone(&self.oracle),
            stats: Arc::clone(&self.stats),
            sink: Arc::clone(&self.sink),
            hits: Arc::clone(&self.hits),
            node_info: Arc::clone(&self.node_info),
            session: Arc::clone(&shared),
            dequeue_timeout: config.dequeue_timeout(),
        };
        for worker_index in 0..cpu_workers {
            let ctx = ctx.clone();
            handles.push(thread::spawn(move || {
                verifier::run_cpu_verifier(ctx, worker_index)
            }));
        }
        let gpu_worker = match accel {
            Some(hasher) => {
                let ctx = ctx.clone();
                handles.push(thread::spawn(move || verifier::run_gpu_verifier(ctx, hasher)));
                true
            }
            None => false,
        };

        *slot = Some(Session {
            shared,
            queue,
            handles,
            gpu_worker,
        });
        *lock(&self.state) = ScanState::Running;
        info!(
            instance = %self.identity.instance_id,
            cpu_workers,
            gpu_worker,
            "scan session started"
        );
        Ok(())
    }

    /// Stop the current session and join its workers. Idempotent; a Failed
    /// session keeps its state so the failure stays visible until restart.
    pub fn stop(&self) {
        let mut slot = lock(&self.session);
        let Some(session) = slot.take() else {
            debug!("stop requested with no active session");
            return;
        };
        if *lock(&self.state) != ScanState::Failed {
            *lock(&self.state) = ScanState::Stopping;
        }
        session.shared.request_stop();
        // Joins are bounded in practice by the dequeue timeout plus one
        // in-flight oracle call.
        for handle in session.handles {
            if handle.join().is_err() {
                warn!("scan worker panicked during shutdown");
            }
        }
        if *lock(&self.state) != ScanState::Failed {
            *lock(&self.state) = ScanState::Stopped;
        }
        self.snapshot_cache.invalidate();
        info!("scan session stopped");
    }

    /// Change the CPU verifier count. Takes effect through a stop/start cycle
    /// when a session is running.
    pub fn set_thread_count(&self, threads: usize) -> Result<(), ScanError> {
        if threads == 0 {
            return Err(ScanError::InvalidConfig(
                "thread count must be at least 1".to_string(),
            ));
        }
        let was_running = {
            let mut config = lock(&self.config);
            config.cpu_threads = threads;
            *lock(&self.state) == ScanState::Running
        };
        if was_running {
            info!(threads, "resizing scan session");
            self.stop();
            self.start()?;
        }
        Ok(())
    }

    /// Change the acceleration preferences, re-probing for a backend when one
    /// is newly wanted. Takes effect through a stop/start cycle when running.
    pub fn set_acceleration(&self, cpu: bool, gpu: bool, npu: bool) -> Result<(), ScanError> {
        let was_running = {
            let mut config = lock(&self.config);
            config.enable_cpu = cpu;
            config.enable_gpu = gpu;
            config.enable_npu = npu;
            let mut accel = lock(&self.accel);
            if (gpu || npu) && accel.is_none() {
                *accel = hasher::select_backend(&config);
            }
            *lock(&self.state) == ScanState::Running
        };
        if was_running {
            info!(cpu, gpu, npu, "switching acceleration");
            self.stop();
            self.start()?;
        }
        Ok(())
    }

    pub fn state(&self) -> ScanState {
        *lock(&self.state)
    }

    pub fn last_error(&self) -> Option<String> {
        lock(&self.last_error).clone()
    }

    pub fn hits(&self) -> Vec<VerificationHit> {
        lock(&self.hits).clone()
    }

    pub fn identity(&self) -> &InstanceIdentity {
        &self.identity
    }

    /// Live verifier threads, generator excluded.
    pub fn active_workers(&self) -> usize {
        lock(&self.session)
            .as_ref()
            .map(|s| {
                s.handles
                    .iter()
                    .skip(1)
                    .filter(|h| !h.is_finished())
                    .count()
            })
            .unwrap_or(0)
    }

    /// Point-in-time pipeline view, recomputed at most once per snapshot
    /// interval.
    pub fn snapshot(&self) -> StatsSnapshot {
        self.snapshot_cache.get_or_refresh(|| self.compute_snapshot())
    }

    fn compute_snapshot(&self) -> StatsSnapshot {
        if *lock(&self.state) == ScanState::Running {
            match self.oracle.get_node_info() {
                Ok(info) => *lock(&self.node_info) = Some(info),
                Err(e) => debug!(error = %e, "node info refresh failed, keeping last known"),
            }
        }

        let (queue_depth, active_workers, gpu_worker) = match lock(&self.session).as_ref() {
            Some(s) => (
                s.queue.depth(),
                s.handles
                    .iter()
                    .skip(1)
                    .filter(|h| !h.is_finished())
                    .count(),
                s.gpu_worker,
            ),
            None => (0, 0, false),
        };

        // Read each device counter once so the derived total always matches
        // the parts reported alongside it.
        let cpu_processed = self.stats.cpu_processed();
        let gpu_processed = self.stats.gpu_processed();
        let node = lock(&self.node_info).clone();
        StatsSnapshot {
            state: *lock(&self.state),
            total_scanned: cpu_processed + gpu_processed,
            cpu_processed,
            gpu_processed,
            hits: self.stats.hits(),
            accel_faults: self.stats.accel_faults(),
            cpu_rate_per_min: self.stats.cpu_rate_per_min(),
            gpu_rate_per_min: self.stats.gpu_rate_per_min(),
            queue_depth,
            active_workers,
            gpu_worker,
            oracle_chain: node.as_ref().map(|n| n.chain.clone()),
            oracle_height: node.as_ref().map(|n| n.block_height),
            last_error: lock(&self.last_error).clone(),
        }
    }
}

impl Drop for Scanner {
    fn drop(&mut self) {
        self.stop();
    }
}
