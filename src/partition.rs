//! Splitting the nonce space between workers
//!
//! Every worker gets one contiguous block of ranks. Blocks are equal-sized
//! except for the last one, which also takes the remainder of the division.

use crate::nonce::NonceCodec;
use crate::types::WorkRange;
use crate::{Error, Result};
use std::ops::RangeInclusive;

/// Number of distinct nonces, `charset_size^nonce_length`
///
/// Fails with [`Error::SpaceOverflow`] when the count does not fit a `u64`.
pub fn total_space(charset_size: usize, nonce_length: usize) -> Result<u64> {
    let overflow = || Error::space_overflow(charset_size, nonce_length);
    let exponent = u32::try_from(nonce_length).map_err(|_| overflow())?;
    (charset_size as u64).checked_pow(exponent).ok_or_else(overflow)
}

/// Inclusive rank range of worker `ordinal` out of `total_workers`
pub fn rank_range(space: u64, total_workers: usize, ordinal: usize) -> Result<RangeInclusive<u64>> {
    if total_workers == 0 {
        return Err(Error::config("At least one worker is required"));
    }
    if ordinal >= total_workers {
        return Err(Error::invalid_state(format!(
            "Worker ordinal {} out of range for {} workers",
            ordinal, total_workers
        )));
    }
    if space < total_workers as u64 {
        return Err(Error::config(format!(
            "Search space of {} nonces cannot be split between {} workers",
            space, total_workers
        )));
    }

    let range_size = space / total_workers as u64;
    let start = ordinal as u64 * range_size;
    let end = if ordinal == total_workers - 1 {
        space
    } else {
        (ordinal as u64 + 1) * range_size
    };

    Ok(start..=end - 1)
}

/// Computes the work ranges of a fixed number of workers
#[derive(Debug, Clone)]
pub struct Partitioner {
    codec: NonceCodec,
    space: u64,
    total_workers: usize,
}

impl Partitioner {
    /// Create a partitioner for `total_workers` workers
    pub fn new(codec: NonceCodec, total_workers: usize) -> Result<Self> {
        let space = total_space(codec.charset().len(), codec.length())?;
        // Validates worker count against the space
        rank_range(space, total_workers, 0)?;

        Ok(Self {
            codec,
            space,
            total_workers,
        })
    }

    /// Size of the whole search space
    pub fn space(&self) -> u64 {
        self.space
    }

    /// Number of workers the space is split between
    pub fn total_workers(&self) -> usize {
        self.total_workers
    }

    /// Rank bounds of worker `ordinal`
    pub fn ranks(&self, ordinal: usize) -> Result<RangeInclusive<u64>> {
        rank_range(self.space, self.total_workers, ordinal)
    }

    /// Nonce bounds of worker `ordinal`
    pub fn work_range(&self, ordinal: usize) -> Result<WorkRange> {
        let ranks = self.ranks(ordinal)?;
        Ok(WorkRange::new(
            self.codec.encode(*ranks.start()),
            self.codec.encode(*ranks.end()),
        ))
    }
}
