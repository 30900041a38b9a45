use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

pub const VALID_WORD_COUNTS: [usize; 5] = [12, 15, 18, 21, 24];

/// Full configuration for one scanner instance.
///
/// A `ScanConfig` is read-only while a session is running; any change goes
/// through a full stop/restart cycle so no worker ever observes a torn value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    // Oracle (node RPC)
    pub rpc_url: String,
    pub rpc_user: Option<String>,
    pub rpc_pass: Option<String>,
    pub rpc_timeout_ms: u64,
    pub rpc_max_retries: u32,
    pub rpc_retry_delay_ms: u64,

    // Pipeline shape
    pub cpu_threads: usize,
    pub word_count: usize,
    pub batch_size_cpu: usize,
    pub batch_size_gpu: usize,
    pub queue_capacity: usize,
    /// Generator refills while queue occupancy is below this fraction.
    pub refill_threshold: f64,
    pub dequeue_timeout_ms: u64,

    // Acceleration preferences
    pub enable_cpu: bool,
    pub enable_gpu: bool,
    pub enable_npu: bool,

    // Output and observability
    pub output_dir: PathBuf,
    pub status_port: u16,
    /// Snapshot cache lifetime; 0 disables caching.
    pub snapshot_interval_ms: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://127.0.0.1:8332".to_string(),
            rpc_user: None,
            rpc_pass: None,
            rpc_timeout_ms: 10_000,
            rpc_max_retries: 3,
            rpc_retry_delay_ms: 500,

            cpu_threads: 1,
            word_count: 12,
            batch_size_cpu: 1_000,
            batch_size_gpu: 16_384,
            queue_capacity: 64,
            refill_threshold: 0.85,
            dequeue_timeout_ms: 50,

            enable_cpu: true,
            enable_gpu: true,
            enable_npu: false,

            output_dir: PathBuf::from("found_wallets"),
            status_port: 8090,
            snapshot_interval_ms: 1_000,
        }
    }
}

macro_rules! env_parse {
    ($config:ident . $field:ident, $var:expr) => {
        if let Ok(val) = env::var($var) {
            $config.$field = val
                .parse()
                .map_err(|_| ConfigError::InvalidEnvVar($var.to_string(), val))?;
        }
    };
}

impl ScanConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = ScanConfig::default();

        if let Ok(val) = env::var("RPC_URL") {
            config.rpc_url = val;
        }
        if let Ok(val) = env::var("RPC_USER") {
            config.rpc_user = Some(val);
        }
        if let Ok(val) = env::var("RPC_PASS") {
            config.rpc_pass = Some(val);
        }
        env_parse!(config.rpc_timeout_ms, "RPC_TIMEOUT_MS");
        env_parse!(config.rpc_max_retries, "RPC_MAX_RETRIES");
        env_parse!(config.rpc_retry_delay_ms, "RPC_RETRY_DELAY_MS");

        env_parse!(config.cpu_threads, "SCAN_THREADS");
        env_parse!(config.word_count, "WORD_COUNT");
        env_parse!(config.batch_size_cpu, "BATCH_SIZE_CPU");
        env_parse!(config.batch_size_gpu, "BATCH_SIZE_GPU");
        env_parse!(config.queue_capacity, "QUEUE_CAPACITY");
        env_parse!(config.refill_threshold, "REFILL_THRESHOLD");
        env_parse!(config.dequeue_timeout_ms, "DEQUEUE_TIMEOUT_MS");

        if let Ok(val) = env::var("ENABLE_CPU") {
            config.enable_cpu = val == "1";
        }
        if let Ok(val) = env::var("ENABLE_GPU") {
            config.enable_gpu = val == "1";
        }
        if let Ok(val) = env::var("ENABLE_NPU") {
            config.enable_npu = val == "1";
        }

        if let Ok(val) = env::var("OUTPUT_DIR") {
            config.output_dir = PathBuf::from(val);
        }
        env_parse!(config.status_port, "STATUS_PORT");
        env_parse!(config.snapshot_interval_ms, "SNAPSHOT_INTERVAL_MS");

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cpu_threads < 1 {
            return Err(ConfigError::ValidationError(
                "SCAN_THREADS must be at least 1".to_string(),
            ));
        }
        if !VALID_WORD_COUNTS.contains(&self.word_count) {
            return Err(ConfigError::ValidationError(format!(
                "WORD_COUNT must be one of {:?}",
                VALID_WORD_COUNTS
            )));
        }
        if self.batch_size_cpu == 0 || self.batch_size_gpu == 0 {
            return Err(ConfigError::ValidationError(
                "batch sizes must be greater than 0".to_string(),
            ));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "QUEUE_CAPACITY must be greater than 0".to_string(),
            ));
        }
        if !(self.refill_threshold > 0.0 && self.refill_threshold <= 1.0) {
            return Err(ConfigError::ValidationError(
                "REFILL_THRESHOLD must be within (0.0, 1.0]".to_string(),
            ));
        }
        if self.dequeue_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "DEQUEUE_TIMEOUT_MS must be greater than 0".to_string(),
            ));
        }
        if !self.rpc_url.starts_with("http") {
            return Err(ConfigError::ValidationError(
                "RPC_URL must be a valid HTTP URL".to_string(),
            ));
        }
        Ok(())
    }

    pub fn dequeue_timeout(&self) -> Duration {
        Duration::from_millis(self.dequeue_timeout_ms)
    }

    pub fn snapshot_interval(&self) -> Duration {
        Duration::from_millis(self.snapshot_interval_ms)
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }

    /// Bytes of entropy backing a seed phrase of the configured length.
    pub fn entropy_len(&self) -> usize {
        self.word_count / 3 * 4
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(ScanConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_zero_threads() {
        let config = ScanConfig {
            cpu_threads: 0,
            ..ScanConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn rejects_bad_word_count() {
        let config = ScanConfig {
            word_count: 13,
            ..ScanConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        for bad in [0.0, -0.5, 1.5] {
            let config = ScanConfig {
                refill_threshold: bad,
                ..ScanConfig::default()
            };
            assert!(config.validate().is_err(), "threshold {bad} should fail");
        }
    }

    #[test]
    fn entropy_len_follows_word_count() {
        for (words, bytes) in [(12, 16), (15, 20), (18, 24), (21, 28), (24, 32)] {
            let config = ScanConfig {
                word_count: words,
                ..ScanConfig::default()
            };
            assert_eq!(config.entropy_len(), bytes);
        }
    }
}
