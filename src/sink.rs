//! Append-only result log, one file per scanner instance.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;

use tracing::{info, warn};

use crate::instance::InstanceIdentity;
use crate::types::VerificationHit;

pub struct ResultSink {
    path: PathBuf,
}

impl ResultSink {
    pub fn new(identity: &InstanceIdentity) -> Self {
        if let Some(parent) = identity.output_file.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                warn!(dir = %parent.display(), error = %e, "failed to create output directory");
            }
        }
        Self {
            path: identity.output_file.clone(),
        }
    }

    /// Append one hit record. Failures are reported to the caller, which logs
    /// and continues; the hit stays in the in-memory list either way.
    pub fn append(&self, hit: &VerificationHit) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(
            file,
            "\n=== Wallet found at {} ===",
            hit.found_at.format("%Y-%m-%d %H:%M:%S")
        )?;
        writeln!(file, "Seed Phrase: {}", hit.label)?;
        writeln!(file, "Address: {}", hit.address)?;
        writeln!(file, "Balance: {} BTC", hit.balance)?;
        writeln!(
            file,
            "Network: {} (block height {})",
            hit.network, hit.block_height
        )?;
        writeln!(file, "{}", "=".repeat(50))?;
        info!(address = %hit.address, balance = hit.balance, file = %self.path.display(),
            "hit persisted");
        Ok(())
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_hit() -> VerificationHit {
        VerificationHit {
            label: "abandon ability able".to_string(),
            address: "1111111111111111111114oLvT2".to_string(),
            balance: 1.25,
            network: "main".to_string(),
            block_height: 850_000,
            found_at: Utc::now(),
        }
    }

    #[test]
    fn appends_full_record() {
        let dir = tempfile::tempdir().unwrap();
        let identity = InstanceIdentity::next(dir.path());
        let sink = ResultSink::new(&identity);

        sink.append(&sample_hit()).unwrap();
        sink.append(&sample_hit()).unwrap();

        let contents = fs::read_to_string(sink.path()).unwrap();
        assert_eq!(contents.matches("=== Wallet found at").count(), 2);
        assert!(contents.contains("Address: 1111111111111111111114oLvT2"));
        assert!(contents.contains("Balance: 1.25 BTC"));
        assert!(contents.contains("Network: main (block height 850000)"));
    }

    #[test]
    fn append_fails_cleanly_on_bad_path() {
        // A regular file where the output directory should be fails the
        // append regardless of process privileges.
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not_a_dir");
        fs::write(&blocker, b"occupied").unwrap();
        let identity = InstanceIdentity {
            instance_id: "instance_test".to_string(),
            instance_number: 0,
            output_file: blocker.join("wallets.txt"),
        };
        let sink = ResultSink::new(&identity);
        assert!(sink.append(&sample_hit()).is_err());
    }
}
