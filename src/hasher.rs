//! Batch hashing backends.
//!
//! Both paths produce the double-SHA256 digest of each payload; address
//! encoding downstream is identical regardless of which backend ran.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::address;
use crate::config::ScanConfig;
use crate::error::ScanError;

pub trait BatchHasher: Send + Sync {
    /// One double-SHA256 digest per payload, same order.
    fn compute_digest_batch(&self, payloads: &[Vec<u8>]) -> Result<Vec<[u8; 32]>, ScanError>;

    fn is_available(&self) -> bool {
        true
    }

    fn device_info(&self) -> String;
}

/// Scalar sha2 path; always available.
pub struct ScalarHasher;

impl BatchHasher for ScalarHasher {
    fn compute_digest_batch(&self, payloads: &[Vec<u8>]) -> Result<Vec<[u8; 32]>, ScanError> {
        Ok(payloads
            .iter()
            .map(|p| address::double_sha256(p))
            .collect())
    }

    fn device_info(&self) -> String {
        "CPU scalar (sha2)".to_string()
    }
}

/// Probe for a hardware backend per the acceleration preferences.
///
/// Probe failure is not an error: the pipeline runs CPU-only and the session
/// simply spawns no accelerator verifier.
pub fn select_backend(config: &ScanConfig) -> Option<Arc<dyn BatchHasher>> {
    if !config.enable_gpu && !config.enable_npu {
        debug!("hardware acceleration disabled by configuration");
        return None;
    }

    #[cfg(feature = "opencl")]
    {
        match crate::gpu::ClHasher::new(config.enable_npu) {
            Ok(hasher) => {
                debug!(device = %hasher.device_info(), "OpenCL backend initialized");
                return Some(Arc::new(hasher));
            }
            Err(e) => {
                warn!(error = %e, "OpenCL initialization failed, continuing CPU-only");
            }
        }
    }
    #[cfg(not(feature = "opencl"))]
    {
        warn!("acceleration requested but the opencl feature is not compiled in");
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::VERSION_MAINNET;

    #[test]
    fn scalar_digests_match_derivation_path() {
        let payloads: Vec<Vec<u8>> = (0u8..5)
            .map(|i| address::payload(VERSION_MAINNET, &[i; 32]))
            .collect();
        let digests = ScalarHasher.compute_digest_batch(&payloads).unwrap();
        assert_eq!(digests.len(), payloads.len());
        for (payload, digest) in payloads.iter().zip(&digests) {
            assert_eq!(*digest, address::double_sha256(payload));
            // Address built from the batch digest equals the scalar derivation.
            let entropy = &payload[1..];
            assert_eq!(
                address::encode(payload, digest),
                address::derive(VERSION_MAINNET, entropy)
            );
        }
    }

    #[test]
    fn scalar_backend_is_always_available() {
        assert!(ScalarHasher.is_available());
    }
}
