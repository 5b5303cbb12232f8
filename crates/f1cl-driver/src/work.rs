//! Proof-of-work result checking
//!
//! The CL searches for an 8-byte work value whose blake2b-64 digest,
//! taken over the work (little-endian) followed by the 32-byte block hash,
//! exceeds a difficulty threshold. The result block carries the work
//! big-endian in bytes 8..16.

use blake2::digest::consts::U8;
use blake2::{Blake2b, Digest};

/// Default difficulty threshold for send/change blocks.
pub const SEND_THRESHOLD: u64 = 0xFFFF_FFC0_0000_0000;

/// Block hash the work is computed against.
pub type BlockHash = [u8; 32];

type Blake2b64 = Blake2b<U8>;

/// Difficulty value of a raw nonce against `hash`.
#[must_use]
pub fn nonce_value(nonce: u64, hash: &BlockHash) -> u64 {
    let digest = Blake2b64::new()
        .chain_update(nonce.to_le_bytes())
        .chain_update(hash)
        .finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest);
    u64::from_le_bytes(bytes)
}

/// Difficulty value of big-endian work bytes, as found in the result block.
#[must_use]
pub fn work_value(work: &[u8; 8], hash: &BlockHash) -> u64 {
    nonce_value(u64::from_be_bytes(*work), hash)
}

/// Whether `work` beats `threshold` for `hash`.
#[must_use]
pub fn validate_work(work: &[u8; 8], hash: &BlockHash, threshold: u64) -> bool {
    work_value(work, hash) > threshold
}

/// Outcome of a bounded nonce search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Solution {
    /// Last nonce tried (the winner when `found`)
    pub nonce: u64,
    /// Its difficulty value
    pub value: u64,
    /// Nonces tried
    pub iterations: u64,
    /// Whether `value` beats the threshold
    pub found: bool,
}

/// Try nonces from `start` upwards until one beats `threshold` or
/// `max_iterations` are spent.
#[must_use]
pub fn search(hash: &BlockHash, threshold: u64, start: u64, max_iterations: u64) -> Solution {
    let mut solution = Solution {
        nonce: start,
        value: 0,
        iterations: 0,
        found: false,
    };

    for nonce in (0..max_iterations).map(|i| start.wrapping_add(i)) {
        let value = nonce_value(nonce, hash);
        solution = Solution {
            nonce,
            value,
            iterations: solution.iterations + 1,
            found: value > threshold,
        };
        if solution.found {
            break;
        }
    }

    solution
}

#[cfg(test)]
mod tests {
    use super::*;

    const HASH: BlockHash = [
        0xC8, 0xE5, 0xB8, 0x75, 0x77, 0x87, 0x02, 0x44, 0x5B, 0x25, 0x65, 0x72, 0x76, 0xAB, 0xC5,
        0x6A, 0xA9, 0x91, 0x0B, 0x28, 0x35, 0x37, 0xCA, 0x43, 0x8B, 0x2C, 0xC5, 0x9B, 0x0C, 0xF9,
        0x37, 0x12,
    ];

    #[test]
    fn search_finds_valid_work() {
        let threshold = 0xF000_0000_0000_0000;
        let solution = search(&HASH, threshold, 0, 1 << 16);
        assert!(solution.found);
        assert!(validate_work(&solution.nonce.to_be_bytes(), &HASH, threshold));
        assert_eq!(work_value(&solution.nonce.to_be_bytes(), &HASH), solution.value);
    }

    #[test]
    fn value_depends_on_hash() {
        let mut other = HASH;
        other[0] ^= 1;
        assert_ne!(nonce_value(42, &HASH), nonce_value(42, &other));
    }

    #[test]
    fn exhausted_search_reports_not_found() {
        let solution = search(&HASH, u64::MAX, 7, 3);
        assert!(!solution.found);
        assert_eq!(solution.iterations, 3);
        assert_eq!(solution.nonce, 9);
    }
}
