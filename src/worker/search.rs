//! Brute-force search over one work range
//!
//! Compute-bound and synchronous: the loop never yields, so callers on an
//! async runtime run it on a blocking thread.

use crate::hash::{meets_difficulty, PrefixHasher};
use crate::nonce::NonceCodec;
use crate::types::{Candidate, SearchConfig, WorkRange};
use crate::utils::{compute_hash_rate, format_hash_rate};
use crate::{Error, Result};
use std::time::{Duration, Instant};
use tracing::{debug, info, info_span};

/// Attempts between progress log lines
pub const PROGRESS_INTERVAL: u64 = 100_000;

/// Outcome of searching one range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchResult {
    /// First candidate meeting the difficulty, if any
    pub found: Option<Candidate>,
    /// Nonces hashed, including the successful one
    pub attempts: u64,
    /// Wall time spent in the loop
    pub elapsed: Duration,
}

impl SearchResult {
    /// Hashes per second over the whole search
    pub fn hash_rate(&self) -> f64 {
        compute_hash_rate(self.attempts, self.elapsed)
    }
}

/// Try every nonce of `range` in rank order until one meets the difficulty
///
/// Stops at the first success. Fails if a range bound contains a symbol
/// outside the charset or the bounds are inverted.
pub fn search_range(config: &SearchConfig, range: &WorkRange) -> Result<SearchResult> {
    let codec = NonceCodec::new(config.nonce_length(), config.charset().clone())?;
    let start = codec.decode(range.start.as_bytes())?;
    let end = codec.decode(range.end.as_bytes())?;
    if start > end {
        return Err(Error::protocol(format!("Inverted work range {}", range)));
    }

    let _span = info_span!("search", start = %range.start, end = %range.end).entered();
    let hasher = PrefixHasher::new(config.text());
    let difficulty = config.difficulty();
    let started = Instant::now();
    let mut attempts = 0u64;

    info!("Searching {} nonces", end - start + 1);
    for rank in start..=end {
        let nonce = codec.encode(rank);
        let hash = hasher.hash(nonce.as_bytes());
        attempts += 1;

        if attempts % PROGRESS_INTERVAL == 0 {
            debug!(
                "Attempts: {} | Current nonce: {} | Rate: {}",
                attempts,
                nonce,
                format_hash_rate(compute_hash_rate(attempts, started.elapsed()))
            );
        }

        if meets_difficulty(hash, difficulty) {
            let elapsed = started.elapsed();
            info!(
                nonce = %nonce,
                hash,
                attempts,
                "Solution found in {:.2}s",
                elapsed.as_secs_f64()
            );
            return Ok(SearchResult {
                found: Some(Candidate::new(nonce, hash)),
                attempts,
                elapsed,
            });
        }
    }

    let elapsed = started.elapsed();
    info!(attempts, "Range completed without a solution in {:.2}s", elapsed.as_secs_f64());
    Ok(SearchResult {
        found: None,
        attempts,
        elapsed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::compute_hash;
    use crate::types::Charset;
    use assert_matches::assert_matches;

    fn range(start: &str, end: &str) -> WorkRange {
        WorkRange::new(start.parse().unwrap(), end.parse().unwrap())
    }

    #[test]
    fn test_zero_difficulty_takes_first_nonce() {
        let config = SearchConfig::new("hello", 2, 0, Charset::new("AB").unwrap()).unwrap();
        let result = search_range(&config, &range("BA", "BB")).unwrap();

        let found = result.found.unwrap();
        assert_eq!(found.nonce.to_string(), "BA");
        assert_eq!(found.hash, compute_hash(b"hello", b"BA"));
        assert_eq!(result.attempts, 1);
    }

    #[test]
    fn test_finds_first_match_in_rank_order() {
        let config = SearchConfig::new("block", 3, 1, Charset::alphanumeric()).unwrap();
        let result = search_range(&config, &range("000", "ZZZ")).unwrap();
        let found = result.found.unwrap();

        assert!(meets_difficulty(found.hash, 1));
        assert_eq!(found.hash, compute_hash(b"block", found.nonce.as_bytes()));

        let codec = NonceCodec::new(3, Charset::alphanumeric()).unwrap();
        let rank = codec.decode(found.nonce.as_bytes()).unwrap();
        assert_eq!(result.attempts, rank + 1);
        for earlier in 0..rank {
            let nonce = codec.encode(earlier);
            assert!(!meets_difficulty(compute_hash(b"block", nonce.as_bytes()), 1));
        }
    }

    #[test]
    fn test_exhausts_range_without_solution() {
        let config = SearchConfig::new("hello", 2, 10, Charset::new("AB").unwrap()).unwrap();
        let result = search_range(&config, &range("AA", "BB")).unwrap();

        assert_eq!(result.found, None);
        assert_eq!(result.attempts, 4);
    }

    #[test]
    fn test_rejects_bad_ranges() {
        let config = SearchConfig::new("hello", 2, 0, Charset::new("AB").unwrap()).unwrap();
        assert_matches!(
            search_range(&config, &range("BB", "AA")),
            Err(Error::Protocol { .. })
        );
        assert_matches!(
            search_range(&config, &range("AC", "BB")),
            Err(Error::InvalidCharacter { .. })
        );
    }
}
