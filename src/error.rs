use thiserror::Error;

/// Error taxonomy for the scan pipeline.
///
/// Only `OracleUnreachable` is allowed to change session state; every other
/// kind is contained at the worker that produced it.
#[derive(Error, Debug)]
pub enum ScanError {
    /// The balance oracle cannot be reached. Fatal to the session: results
    /// produced without live confirmation cannot be trusted, so the pipeline
    /// fails closed instead of degrading into a local simulation.
    #[error("oracle unreachable: {0}")]
    OracleUnreachable(String),

    /// A batch-hashing backend fault. Non-fatal; the affected batch is
    /// reprocessed on the scalar path.
    #[error("accelerator fault: {0}")]
    Accelerator(String),

    /// A hit could not be written to the result sink. The hit stays in the
    /// in-memory list and the session continues.
    #[error("failed to persist hit: {0}")]
    Persistence(#[from] std::io::Error),

    /// Rejected synchronously at the configuration call site; no state change.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Lifecycle misuse, e.g. starting while a stop is still in flight.
    #[error("invalid session state: {0}")]
    Session(String),
}
