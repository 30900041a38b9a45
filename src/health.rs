use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use crate::scanner::Scanner;
use crate::types::ScanState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub state: ScanState,
    pub uptime_seconds: u64,
    pub version: String,
    pub instance: String,
    pub timestamp: String,
    pub last_error: Option<String>,
}

pub struct HealthChecker {
    scanner: Arc<Scanner>,
    start_time: Instant,
}

impl HealthChecker {
    pub fn new(scanner: Arc<Scanner>) -> Self {
        Self {
            scanner,
            start_time: Instant::now(),
        }
    }

    /// The scanner is unhealthy only in the Failed state; an idle scanner is
    /// healthy and simply reports its state.
    pub fn is_healthy(&self) -> bool {
        self.scanner.state() != ScanState::Failed
    }

    pub fn get_health(&self) -> HealthResponse {
        let state = self.scanner.state();
        HealthResponse {
            status: if state == ScanState::Failed {
                "unhealthy".to_string()
            } else {
                "healthy".to_string()
            },
            state,
            uptime_seconds: self.start_time.elapsed().as_secs(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            instance: self.scanner.identity().instance_id.clone(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            last_error: self.scanner.last_error(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScanConfig;
    use crate::oracle::{BalanceOracle, OracleError};
    use crate::types::NodeInfo;

    struct DownOracle;

    impl BalanceOracle for DownOracle {
        fn verify_live_node(&self) -> Result<(), OracleError> {
            Err(OracleError::Unreachable("connection refused".to_string()))
        }
        fn get_node_info(&self) -> Result<NodeInfo, OracleError> {
            Err(OracleError::Unreachable("connection refused".to_string()))
        }
        fn verify_wallet(&self, _address: &str) -> Result<f64, OracleError> {
            Err(OracleError::Unreachable("connection refused".to_string()))
        }
    }

    fn test_config() -> ScanConfig {
        ScanConfig {
            output_dir: std::env::temp_dir().join("wallet-scanner-health-test"),
            ..ScanConfig::default()
        }
    }

    #[test]
    fn idle_scanner_is_healthy() {
        let scanner = Arc::new(Scanner::with_accelerator(
            test_config(),
            Arc::new(DownOracle),
            None,
        ));
        let checker = HealthChecker::new(scanner);
        assert!(checker.is_healthy());
        assert_eq!(checker.get_health().status, "healthy");
    }

    #[test]
    fn failed_start_reports_unhealthy() {
        let scanner = Arc::new(Scanner::with_accelerator(
            test_config(),
            Arc::new(DownOracle),
            None,
        ));
        assert!(scanner.start().is_err());
        let checker = HealthChecker::new(Arc::clone(&scanner));
        assert!(!checker.is_healthy());
        let health = checker.get_health();
        assert_eq!(health.status, "unhealthy");
        assert!(health.last_error.is_some());
    }
}
