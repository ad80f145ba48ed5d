//! Mixed-radix nonce codec
//!
//! A nonce of length `n` over a charset of size `b` is an `n`-digit base-`b`
//! numeral whose digits are the charset positions of its symbols, most
//! significant symbol first. Its value is the nonce's rank.

use crate::types::{Charset, Nonce, NONCE_BUFFER_SIZE};
use crate::{Error, Result};

/// Converts between nonce strings of one length and their ranks
#[derive(Debug, Clone)]
pub struct NonceCodec {
    length: usize,
    charset: Charset,
}

impl NonceCodec {
    /// Create a codec for nonces of `length` symbols
    pub fn new(length: usize, charset: Charset) -> Result<Self> {
        if length > NONCE_BUFFER_SIZE {
            return Err(Error::config(format!(
                "Nonce length {} exceeds the {} byte buffer",
                length, NONCE_BUFFER_SIZE
            )));
        }
        Ok(Self { length, charset })
    }

    /// Nonce length
    pub fn length(&self) -> usize {
        self.length
    }

    /// Nonce symbols
    pub fn charset(&self) -> &Charset {
        &self.charset
    }

    /// Nonce of the given rank
    ///
    /// High-order digits are silently dropped when `rank` is outside the
    /// search space.
    pub fn encode(&self, mut rank: u64) -> Nonce {
        let base = self.charset.len() as u64;
        let mut nonce = Nonce::filled(self.charset.symbol(0), self.length);

        for slot in nonce.as_bytes_mut().iter_mut().rev() {
            *slot = self.charset.symbol((rank % base) as usize);
            rank /= base;
        }
        nonce
    }

    /// Rank of a nonce
    ///
    /// Only the first `length` bytes are read. Fails with
    /// [`Error::InvalidCharacter`] on a byte outside the charset.
    pub fn decode(&self, nonce: &[u8]) -> Result<u64> {
        if nonce.len() < self.length {
            return Err(Error::config(format!(
                "Nonce has {} symbols, expected {}",
                nonce.len(),
                self.length
            )));
        }

        let base = self.charset.len() as u64;
        nonce[..self.length]
            .iter()
            .enumerate()
            .try_fold(0u64, |rank, (position, &byte)| {
                let digit = self
                    .charset
                    .digit(byte)
                    .ok_or_else(|| Error::invalid_character(byte, position))?;
                Ok(rank.wrapping_mul(base).wrapping_add(digit as u64))
            })
    }

    /// The nonce one rank higher
    ///
    /// Returns `carried = true` when every position wrapped around, i.e. the
    /// input was the largest nonce and the result is the smallest one.
    pub fn successor(&self, nonce: &Nonce) -> Result<(Nonce, bool)> {
        let last = self.charset.len() - 1;
        let mut next = *nonce;

        for (position, slot) in next.as_bytes_mut().iter_mut().enumerate().rev() {
            let digit = self
                .charset
                .digit(*slot)
                .ok_or_else(|| Error::invalid_character(*slot, position))?;

            if digit < last {
                *slot = self.charset.symbol(digit + 1);
                return Ok((next, false));
            }
            *slot = self.charset.symbol(0);
        }

        Ok((next, true))
    }

    /// Smallest nonce, rank 0
    pub fn first(&self) -> Nonce {
        Nonce::filled(self.charset.symbol(0), self.length)
    }

    /// Largest nonce, rank `charset_size^length - 1`
    pub fn last(&self) -> Nonce {
        Nonce::filled(self.charset.symbol(self.charset.len() - 1), self.length)
    }
}

/// Nonce of `rank` with `length` symbols
pub fn encode(rank: u64, length: usize, charset: &Charset) -> Result<Nonce> {
    Ok(NonceCodec::new(length, charset.clone())?.encode(rank))
}

/// Rank of the first `length` symbols of `nonce`
pub fn decode(nonce: &[u8], length: usize, charset: &Charset) -> Result<u64> {
    NonceCodec::new(length, charset.clone())?.decode(nonce)
}

/// Next nonce in rank order and whether the increment overflowed
pub fn successor(nonce: &Nonce, charset: &Charset) -> Result<(Nonce, bool)> {
    NonceCodec::new(nonce.len(), charset.clone())?.successor(nonce)
}
