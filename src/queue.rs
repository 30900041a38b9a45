//! Bounded candidate queue.
//!
//! The single shared mutable structure between the generator and all
//! verifiers. Ownership of a batch transfers atomically on pop; occupancy
//! never exceeds the configured capacity.

use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError, bounded};

use crate::types::CandidateBatch;

#[derive(Clone)]
pub struct BatchQueue {
    tx: Sender<CandidateBatch>,
    rx: Receiver<CandidateBatch>,
    capacity: usize,
}

impl BatchQueue {
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = bounded(capacity);
        Self { tx, rx, capacity }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn depth(&self) -> usize {
        self.rx.len()
    }

    /// True when occupancy has reached `threshold` of capacity.
    pub fn is_above(&self, threshold: f64) -> bool {
        self.depth() as f64 >= threshold * self.capacity as f64
    }

    /// Non-blocking enqueue of a completed batch as one unit.
    pub fn push(&self, batch: CandidateBatch) -> Result<(), TrySendError<CandidateBatch>> {
        self.tx.try_send(batch)
    }

    /// Claim one batch, waiting at most `timeout`. The short timeout is the
    /// pipeline's primary cancellation-responsiveness mechanism: workers only
    /// observe the stop flag between pop attempts.
    pub fn pop(&self, timeout: Duration) -> Result<CandidateBatch, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}
