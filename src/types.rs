use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One unit of generated key material awaiting verification.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Human-readable seed phrase for the entropy.
    pub label: String,
    pub entropy: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

/// A fixed-size group of candidates, owned by the queue until a single
/// verifier claims it.
pub type CandidateBatch = Vec<Candidate>;

/// A candidate whose derived address the oracle reported as funded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationHit {
    pub label: String,
    pub address: String,
    pub balance: f64,
    pub network: String,
    pub block_height: u64,
    pub found_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeInfo {
    pub chain: String,
    pub block_height: u64,
    pub peer_count: u64,
}

/// Session lifecycle. `Failed` is terminal per session and is only entered
/// when the oracle becomes unreachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanState {
    Stopped,
    Initializing,
    Running,
    Stopping,
    Failed,
}

impl std::fmt::Display for ScanState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanState::Stopped => write!(f, "stopped"),
            ScanState::Initializing => write!(f, "initializing"),
            ScanState::Running => write!(f, "running"),
            ScanState::Stopping => write!(f, "stopping"),
            ScanState::Failed => write!(f, "failed"),
        }
    }
}

/// Point-in-time view of the pipeline, cheap enough to poll.
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub state: ScanState,
    pub total_scanned: u64,
    pub cpu_processed: u64,
    pub gpu_processed: u64,
    pub hits: u64,
    pub accel_faults: u64,
    pub cpu_rate_per_min: f64,
    pub gpu_rate_per_min: f64,
    pub queue_depth: usize,
    pub active_workers: usize,
    pub gpu_worker: bool,
    pub oracle_chain: Option<String>,
    pub oracle_height: Option<u64>,
    pub last_error: Option<String>,
}
