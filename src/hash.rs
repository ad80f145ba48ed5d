//! Rolling hash and difficulty check
//!
//! A toy polynomial hash over `text || nonce`. It is not cryptographically
//! secure; it only defines which nonces count as proof of work.

/// Modulus of the rolling hash, a prime slightly below 2^30
pub const HASH_MODULUS: u64 = 999_999_937;

/// Multiplier applied to the running value before adding each byte
pub const HASH_BASE: u64 = 31;

/// Fold `bytes` into a running hash value
#[inline]
fn fold(mut hash: u64, bytes: &[u8]) -> u64 {
    for &byte in bytes {
        hash = (hash * HASH_BASE + u64::from(byte)) % HASH_MODULUS;
    }
    hash
}

/// Hash the text followed by the nonce
///
/// Text bytes are always folded before nonce bytes; the result is always
/// below [`HASH_MODULUS`].
pub fn compute_hash(text: &[u8], nonce: &[u8]) -> u64 {
    fold(fold(0, text), nonce)
}

/// Check that the lowest `difficulty` decimal digits of `hash` are zero
///
/// A zero hash meets every difficulty, so the loop ends there.
pub fn meets_difficulty(mut hash: u64, difficulty: u32) -> bool {
    for _ in 0..difficulty {
        if hash == 0 {
            return true;
        }
        if hash % 10 != 0 {
            return false;
        }
        hash /= 10;
    }
    true
}

/// Hasher with the text prefix folded once
///
/// The search loop hashes the same text with millions of nonces; folding the
/// prefix once gives the same value as [`compute_hash`] for every nonce.
#[derive(Debug, Clone, Copy)]
pub struct PrefixHasher {
    prefix: u64,
}

impl PrefixHasher {
    /// Fold the text prefix
    pub fn new(text: &[u8]) -> Self {
        Self {
            prefix: fold(0, text),
        }
    }

    /// Hash of `text || nonce`
    #[inline]
    pub fn hash(&self, nonce: &[u8]) -> u64 {
        fold(self.prefix, nonce)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_known_values() {
        assert_eq!(compute_hash(b"", b""), 0);
        assert_eq!(compute_hash(b"A", b""), 65);
        assert_eq!(compute_hash(b"", b"AB"), 65 * 31 + 66);
        assert_eq!(compute_hash(b"A", b"B"), compute_hash(b"AB", b""));
    }

    #[test]
    fn test_order_matters() {
        assert_ne!(compute_hash(b"hello", b"AB"), compute_hash(b"hello", b"BA"));
        assert_ne!(compute_hash(b"ab", b""), compute_hash(b"ba", b""));
    }

    #[test]
    fn test_hash_below_modulus() {
        let text = vec![0xFFu8; 4096];
        assert!(compute_hash(&text, b"ZZZZZZZZZ") < HASH_MODULUS);
    }

    #[test]
    fn test_meets_difficulty() {
        assert!(meets_difficulty(0, 0));
        assert!(meets_difficulty(7, 0));
        assert!(meets_difficulty(120, 1));
        assert!(!meets_difficulty(120, 2));
        assert!(meets_difficulty(1_000, 3));
        assert!(meets_difficulty(0, 12));
        assert!(!meets_difficulty(HASH_MODULUS - 1, 1));
    }

    #[test]
    fn test_large_difficulty_terminates() {
        let max = i32::MAX as u32;
        assert!(meets_difficulty(0, max));
        assert!(!meets_difficulty(1_000_000, max));
        assert!(!meets_difficulty(HASH_MODULUS - 1, max));
    }

    proptest! {
        #[test]
        fn hash_is_deterministic(
            text in prop::collection::vec(any::<u8>(), 0..256),
            nonce in prop::collection::vec(any::<u8>(), 0..10),
        ) {
            prop_assert_eq!(compute_hash(&text, &nonce), compute_hash(&text, &nonce));
        }

        #[test]
        fn prefix_hasher_matches_compute_hash(
            text in prop::collection::vec(any::<u8>(), 0..256),
            nonce in prop::collection::vec(any::<u8>(), 0..10),
        ) {
            prop_assert_eq!(PrefixHasher::new(&text).hash(&nonce), compute_hash(&text, &nonce));
        }

        #[test]
        fn difficulty_matches_modulus(hash in 0u64..HASH_MODULUS, difficulty in 0u32..12) {
            let expected = hash % 10u64.pow(difficulty) == 0;
            prop_assert_eq!(meets_difficulty(hash, difficulty), expected);
        }

        #[test]
        fn zero_difficulty_always_met(hash in any::<u64>()) {
            prop_assert!(meets_difficulty(hash, 0));
        }
    }
}
