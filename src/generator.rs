//! Batch generator worker.
//!
//! Fills fixed-size batches from the candidate source and enqueues each one
//! as a unit, throttling while the queue is near capacity so generation
//! self-limits to consumption rate.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use crossbeam_channel::TrySendError;
use tracing::{debug, error, info};

use crate::entropy::CandidateSource;
use crate::queue::BatchQueue;

/// Pause between occupancy re-checks while the queue is near full.
const THROTTLE_SLEEP: Duration = Duration::from_millis(2);

pub(crate) struct GeneratorWorker {
    pub queue: BatchQueue,
    pub stop: Arc<AtomicBool>,
    pub word_count: usize,
    pub batch_size: usize,
    pub refill_threshold: f64,
}

impl GeneratorWorker {
    pub fn run(self, mut source: CandidateSource) {
        info!(batch_size = self.batch_size, "generator worker started");
        while !self.stop.load(Ordering::Relaxed) {
            if self.queue.is_above(self.refill_threshold) {
                thread::sleep(THROTTLE_SLEEP);
                continue;
            }

            let mut batch = Vec::with_capacity(self.batch_size);
            while batch.len() < self.batch_size {
                // The queue is torn down with the session, so a partial
                // batch is worthless once a stop is observed.
                if self.stop.load(Ordering::Relaxed) {
                    debug!(built = batch.len(), "discarding partial batch on stop");
                    return;
                }
                match source.generate(self.word_count) {
                    Ok(candidate) => batch.push(candidate),
                    Err(e) => {
                        error!(error = %e, "candidate generation failed");
                        thread::sleep(THROTTLE_SLEEP);
                    }
                }
            }

            // A completed batch survives losing the occupancy race; retry it
            // after the throttle sleep instead of regenerating.
            let mut batch = batch;
            while let Err(e) = self.queue.push(batch) {
                match e {
                    TrySendError::Full(returned) => {
                        if self.stop.load(Ordering::Relaxed) {
                            debug!("discarding batch on stop");
                            return;
                        }
                        batch = returned;
                        thread::sleep(THROTTLE_SLEEP);
                    }
                    TrySendError::Disconnected(_) => return,
                }
            }
        }
        debug!("generator worker exiting");
    }
}
