//! Base58Check address derivation.
//!
//! Pure functions shared by both execution paths: the scalar path hashes one
//! payload at a time, the accelerator path hashes a whole batch, and both
//! feed the same digests into [`encode`]. The two paths must be observably
//! equivalent for the same input.

use sha2::{Digest, Sha256};

/// Version byte for mainnet pay-to-pubkey-hash addresses.
pub const VERSION_MAINNET: u8 = 0x00;

/// Payloads use at most this many bytes of entropy after the version byte.
pub const ENTROPY_PREFIX_LEN: usize = 20;

pub fn double_sha256(payload: &[u8]) -> [u8; 32] {
    Sha256::digest(Sha256::digest(payload)).into()
}

/// First 4 bytes of the double hash over the payload.
pub fn checksum(payload: &[u8]) -> [u8; 4] {
    let digest = double_sha256(payload);
    [digest[0], digest[1], digest[2], digest[3]]
}

/// `version ‖ entropy[..20]` (shorter entropy is used whole).
pub fn payload(version: u8, entropy: &[u8]) -> Vec<u8> {
    let prefix = &entropy[..entropy.len().min(ENTROPY_PREFIX_LEN)];
    let mut out = Vec::with_capacity(1 + prefix.len());
    out.push(version);
    out.extend_from_slice(prefix);
    out
}

/// Base58Check-encode a payload given its precomputed double-SHA256 digest.
pub fn encode(payload: &[u8], digest: &[u8; 32]) -> String {
    let mut raw = Vec::with_capacity(payload.len() + 4);
    raw.extend_from_slice(payload);
    raw.extend_from_slice(&digest[..4]);
    bs58::encode(raw).into_string()
}

/// Derive the address for a candidate on the scalar path.
pub fn derive(version: u8, entropy: &[u8]) -> String {
    let payload = payload(version, entropy);
    let digest = double_sha256(&payload);
    encode(&payload, &digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    // version 0x00 over 20 zero bytes is the well-known all-zeros address.
    #[test]
    fn golden_vector_zero_entropy() {
        let entropy = [0u8; 32];
        let payload = payload(VERSION_MAINNET, &entropy);
        assert_eq!(payload.len(), 21);
        assert_eq!(checksum(&payload), [0x94, 0xa0, 0x09, 0x11]);
        assert_eq!(
            derive(VERSION_MAINNET, &entropy),
            "1111111111111111111114oLvT2"
        );
    }

    #[test]
    fn golden_vector_sequential_entropy() {
        let entropy: Vec<u8> = (0u8..32).collect();
        let payload = payload(VERSION_MAINNET, &entropy);
        assert_eq!(checksum(&payload), [0x8a, 0x65, 0x68, 0x46]);
        assert_eq!(
            derive(VERSION_MAINNET, &entropy),
            "112D2adLM3UKy4Z4giRbReR6gjWuvHUqB"
        );
    }

    // 16-byte entropy (12-word phrases) is shorter than the 20-byte prefix
    // and must be used whole.
    #[test]
    fn short_entropy_used_whole() {
        let entropy = [0xAB_u8; 16];
        let payload = payload(VERSION_MAINNET, &entropy);
        assert_eq!(payload.len(), 17);
        assert_eq!(checksum(&payload), [0x1a, 0xbd, 0x21, 0x78]);
        assert_eq!(
            derive(VERSION_MAINNET, &entropy),
            "13PiYXwv1NNiaM8BqDBFgzxX5vETy"
        );
    }

    #[test]
    fn derive_is_deterministic() {
        let entropy = [0x42_u8; 32];
        assert_eq!(
            derive(VERSION_MAINNET, &entropy),
            derive(VERSION_MAINNET, &entropy)
        );
    }

    #[test]
    fn double_sha256_known_value() {
        assert_eq!(
            hex::encode(double_sha256(b"hello")),
            "9595c9df90075148eb06860365df33584b75bff782a510c6cd4883a419833d50"
        );
    }
}
