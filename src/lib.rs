pub mod types;
pub mod error;
pub mod config;
pub mod instance;
pub mod entropy;
pub mod address;
pub mod hasher;
pub mod cl_kernels;
#[cfg(feature = "opencl")]
pub mod gpu;
pub mod oracle;
pub mod queue;
mod generator;
mod verifier;
pub mod stats;
pub mod sink;
pub mod scanner;
pub mod health;
pub mod server;
pub mod prometheus_metrics;

pub use config::ScanConfig;
pub use error::ScanError;
pub use scanner::Scanner;
pub use types::{ScanState, StatsSnapshot, VerificationHit};
