//! Verifier workers.
//!
//! Both worker kinds share one loop shape: claim a batch with a short
//! timeout, derive an address per candidate, ask the oracle about each one,
//! and record hits. The CPU worker hashes candidate-by-candidate; the GPU
//! worker delegates checksum hashing for the whole batch to the accelerator
//! and falls back to the scalar path for a batch whose accelerator call
//! faults. Only oracle connectivity loss is fatal to the session.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use crossbeam_channel::RecvTimeoutError;
use tracing::{debug, info, warn};

use crate::address;
use crate::error::ScanError;
use crate::hasher::BatchHasher;
use crate::oracle::{BalanceOracle, OracleError};
use crate::queue::BatchQueue;
use crate::scanner::SessionShared;
use crate::sink::ResultSink;
use crate::stats::{Device, ScanStats};
use crate::types::{Candidate, NodeInfo, VerificationHit};

/// Candidates per scalar sub-chunk, sized for cache locality.
const CPU_CHUNK: usize = 1000;

#[derive(Clone)]
pub(crate) struct VerifierCtx {
    pub queue: BatchQueue,
    pub oracle: Arc<dyn BalanceOracle>,
    pub stats: Arc<ScanStats>,
    pub sink: Arc<ResultSink>,
    pub hits: Arc<Mutex<Vec<VerificationHit>>>,
    pub node_info: Arc<Mutex<Option<NodeInfo>>>,
    pub session: Arc<SessionShared>,
    pub dequeue_timeout: Duration,
}

impl VerifierCtx {
    /// Oracle check for one derived address; a positive balance becomes a
    /// recorded hit. RPC-level errors are contained per candidate.
    fn check_candidate(&self, candidate: &Candidate, address: String) -> Result<(), ScanError> {
        let balance = match self.oracle.verify_wallet(&address) {
            Ok(balance) => balance,
            Err(OracleError::Unreachable(msg)) => {
                return Err(ScanError::OracleUnreachable(msg));
            }
            Err(e) => {
                warn!(address = %address, error = %e, "oracle rejected address query");
                return Ok(());
            }
        };
        if balance <= 0.0 {
            return Ok(());
        }

        let (network, block_height) = match self.node_info.lock() {
            Ok(info) => info
                .as_ref()
                .map(|i| (i.chain.clone(), i.block_height))
                .unwrap_or_else(|| ("unknown".to_string(), 0)),
            Err(_) => ("unknown".to_string(), 0),
        };
        let hit = VerificationHit {
            label: candidate.label.clone(),
            address,
            balance,
            network,
            block_height,
            found_at: Utc::now(),
        };
        info!(address = %hit.address, balance = hit.balance, "wallet with balance found");

        if let Err(e) = self.sink.append(&hit) {
            warn!(error = %e, "failed to persist hit, keeping it in memory only");
        }
        if let Ok(mut hits) = self.hits.lock() {
            hits.push(hit);
        }
        self.stats.add_hits(1);
        Ok(())
    }

    /// Scalar path over a slice of candidates, in cache-friendly sub-chunks.
    fn verify_scalar(&self, candidates: &[Candidate]) -> Result<(), ScanError> {
        for chunk in candidates.chunks(CPU_CHUNK) {
            for candidate in chunk {
                let payload = address::payload(address::VERSION_MAINNET, &candidate.entropy);
                let digest = address::double_sha256(&payload);
                self.check_candidate(candidate, address::encode(&payload, &digest))?;
            }
        }
        Ok(())
    }

    /// Accelerated path: one digest call for the whole batch.
    fn verify_batched(
        &self,
        candidates: &[Candidate],
        hasher: &dyn BatchHasher,
    ) -> Result<(), ScanError> {
        let payloads: Vec<Vec<u8>> = candidates
            .iter()
            .map(|c| address::payload(address::VERSION_MAINNET, &c.entropy))
            .collect();
        let digests = hasher.compute_digest_batch(&payloads)?;
        for ((candidate, payload), digest) in candidates.iter().zip(&payloads).zip(&digests) {
            self.check_candidate(candidate, address::encode(payload, digest))?;
        }
        Ok(())
    }
}

pub(crate) fn run_cpu_verifier(ctx: VerifierCtx, worker_index: usize) {
    info!(worker = worker_index, "scan worker started");
    loop {
        if ctx.session.stop_requested() {
            break;
        }
        match ctx.queue.pop(ctx.dequeue_timeout) {
            Ok(batch) => {
                match ctx.verify_scalar(&batch) {
                    Ok(()) => ctx.stats.record_processed(Device::Cpu, batch.len() as u64),
                    Err(e) => {
                        ctx.session.fail(&e);
                        break;
                    }
                }
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    debug!(worker = worker_index, "scan worker exiting");
}

pub(crate) fn run_gpu_verifier(ctx: VerifierCtx, hasher: Arc<dyn BatchHasher>) {
    info!(device = %hasher.device_info(), "accelerated scan worker started");
    loop {
        if ctx.session.stop_requested() {
            break;
        }
        match ctx.queue.pop(ctx.dequeue_timeout) {
            Ok(batch) => {
                let outcome = match ctx.verify_batched(&batch, hasher.as_ref()) {
                    Ok(()) => {
                        ctx.stats.record_processed(Device::Gpu, batch.len() as u64);
                        Ok(())
                    }
                    Err(ScanError::Accelerator(msg)) => {
                        // Per-batch degradation only; the accelerator stays
                        // enabled for the next batch.
                        warn!(error = %msg, "accelerator fault, reprocessing batch on scalar path");
                        ctx.stats.record_accel_fault();
                        ctx.verify_scalar(&batch).map(|()| {
                            ctx.stats.record_processed(Device::Cpu, batch.len() as u64)
                        })
                    }
                    Err(e) => Err(e),
                };
                if let Err(e) = outcome {
                    ctx.session.fail(&e);
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    debug!("accelerated scan worker exiting");
}
