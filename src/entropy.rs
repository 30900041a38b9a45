//! Candidate material generation.
//!
//! Entropy comes from a Xoshiro256++ stream seeded once from OS randomness,
//! which is cheap enough to keep a saturated queue ahead of many verifiers.
//! The label is the BIP39 phrase for the entropy.

use bip0039::{English, Mnemonic};
use chrono::Utc;
use rand::{RngCore, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::error::ScanError;
use crate::types::Candidate;

pub struct CandidateSource {
    rng: Xoshiro256PlusPlus,
}

impl CandidateSource {
    pub fn new() -> Self {
        let mut seed = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut seed);
        Self {
            rng: Xoshiro256PlusPlus::from_seed(seed),
        }
    }

    /// Deterministic stream for tests.
    #[cfg(test)]
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self {
            rng: Xoshiro256PlusPlus::from_seed(seed),
        }
    }

    /// Produce one labeled entropy value for a phrase of `word_count` words.
    pub fn generate(&mut self, word_count: usize) -> Result<Candidate, ScanError> {
        let mut entropy = vec![0u8; word_count / 3 * 4];
        self.rng.fill_bytes(&mut entropy);
        let mnemonic = Mnemonic::<English>::from_entropy(entropy.as_slice())
            .map_err(|e| ScanError::InvalidConfig(format!("{word_count}-word phrase: {e}")))?;
        Ok(Candidate {
            label: mnemonic.phrase().to_string(),
            entropy,
            created_at: Utc::now(),
        })
    }
}

impl Default for CandidateSource {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VALID_WORD_COUNTS;

    #[test]
    fn entropy_length_matches_word_count() {
        let mut source = CandidateSource::from_seed([7u8; 32]);
        for (words, bytes) in [(12, 16), (15, 20), (18, 24), (21, 28), (24, 32)] {
            let candidate = source.generate(words).unwrap();
            assert_eq!(candidate.entropy.len(), bytes);
            assert_eq!(candidate.label.split_whitespace().count(), words);
        }
    }

    #[test]
    fn all_supported_word_counts_generate() {
        let mut source = CandidateSource::from_seed([1u8; 32]);
        for words in VALID_WORD_COUNTS {
            assert!(source.generate(words).is_ok());
        }
    }

    #[test]
    fn candidates_differ_across_calls() {
        let mut source = CandidateSource::from_seed([9u8; 32]);
        let a = source.generate(12).unwrap();
        let b = source.generate(12).unwrap();
        assert_ne!(a.entropy, b.entropy);
        assert_ne!(a.label, b.label);
    }

    #[test]
    fn same_seed_yields_same_stream() {
        let mut a = CandidateSource::from_seed([3u8; 32]);
        let mut b = CandidateSource::from_seed([3u8; 32]);
        assert_eq!(
            a.generate(24).unwrap().entropy,
            b.generate(24).unwrap().entropy
        );
    }
}
