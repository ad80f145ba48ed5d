//! Core types for the distributed proof-of-work search
//!
//! The search configuration and work range shared between coordinator and
//! workers, together with their byte-exact wire encoding.

use crate::{Error, Result};
use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};
use std::fmt;
use std::io::{Cursor, Read};
use std::str::FromStr;

/// Capacity of the text buffer in the configuration block
pub const MAX_TEXT_SIZE: usize = 10_000;

/// Longest text a search configuration may carry; the buffer keeps a NUL
pub const MAX_TEXT_LENGTH: usize = MAX_TEXT_SIZE - 1;

/// Capacity of one nonce buffer in the work range block
pub const NONCE_BUFFER_SIZE: usize = 10;

/// Longest nonce a search configuration may ask for
pub const MAX_NONCE_LENGTH: usize = NONCE_BUFFER_SIZE - 1;

/// Largest character set, one byte of the charset buffer stays a terminator
pub const MAX_CHARSET_SIZE: usize = 64;

/// Capacity of the charset buffer in the configuration block
pub const CHARSET_BUFFER_SIZE: usize = MAX_CHARSET_SIZE + 1;

/// The character set used by the coordinator binary
pub const DEFAULT_CHARSET: &str = "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Size of an encoded [`SearchConfig`]
pub const CONFIG_BLOCK_SIZE: usize = MAX_TEXT_SIZE + 4 + 4 + 4 + CHARSET_BUFFER_SIZE + 4;

/// Size of an encoded [`WorkRange`]
pub const RANGE_BLOCK_SIZE: usize = 2 * NONCE_BUFFER_SIZE;

const NOT_IN_CHARSET: u8 = u8::MAX;

/// Ordered set of distinct nonce symbols
///
/// The position of a symbol is its digit value in the mixed-radix ordering.
#[derive(Clone, PartialEq, Eq)]
pub struct Charset {
    symbols: Vec<u8>,
    digits: [u8; 256],
}

impl Charset {
    /// Create a charset from its symbols in digit order
    pub fn new(symbols: impl AsRef<[u8]>) -> Result<Self> {
        let symbols = symbols.as_ref();

        if symbols.is_empty() {
            return Err(Error::config("Character set must not be empty"));
        }
        if symbols.len() > MAX_CHARSET_SIZE {
            return Err(Error::config(format!(
                "Character set has {} symbols, at most {} are supported",
                symbols.len(),
                MAX_CHARSET_SIZE
            )));
        }

        let mut digits = [NOT_IN_CHARSET; 256];
        for (digit, &symbol) in symbols.iter().enumerate() {
            if symbol == 0 {
                return Err(Error::config("Character set must not contain NUL"));
            }
            if digits[symbol as usize] != NOT_IN_CHARSET {
                return Err(Error::config(format!(
                    "Character set repeats symbol {:?}",
                    char::from(symbol)
                )));
            }
            digits[symbol as usize] = digit as u8;
        }

        Ok(Self {
            symbols: symbols.to_vec(),
            digits,
        })
    }

    /// Digits `0-9` followed by uppercase `A-Z`
    pub fn alphanumeric() -> Self {
        Self::from_distinct(DEFAULT_CHARSET.as_bytes())
    }

    /// Build the digit table for symbols already known to be distinct,
    /// non-NUL and at most [`MAX_CHARSET_SIZE`] long
    fn from_distinct(symbols: &[u8]) -> Self {
        let mut digits = [NOT_IN_CHARSET; 256];
        for (digit, &symbol) in symbols.iter().enumerate() {
            digits[symbol as usize] = digit as u8;
        }
        Self {
            symbols: symbols.to_vec(),
            digits,
        }
    }

    /// Number of symbols
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Always false, a charset holds at least one symbol
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Symbol for a digit value
    ///
    /// Panics if `digit >= len()`.
    pub fn symbol(&self, digit: usize) -> u8 {
        self.symbols[digit]
    }

    /// Digit value of a symbol, `None` if it is not part of the set
    pub fn digit(&self, symbol: u8) -> Option<usize> {
        match self.digits[symbol as usize] {
            NOT_IN_CHARSET => None,
            digit => Some(digit as usize),
        }
    }

    /// Symbols in digit order
    pub fn as_bytes(&self) -> &[u8] {
        &self.symbols
    }
}

impl fmt::Debug for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Charset({:?})", String::from_utf8_lossy(&self.symbols))
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.symbols))
    }
}

impl FromStr for Charset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

/// A fixed-length nonce string
///
/// Stored inline so candidates can be produced in the search loop without
/// allocating.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Nonce {
    bytes: [u8; NONCE_BUFFER_SIZE],
    len: usize,
}

impl Nonce {
    /// Create a nonce from raw bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() > NONCE_BUFFER_SIZE {
            return Err(Error::config(format!(
                "Nonce of {} bytes exceeds the {} byte buffer",
                bytes.len(),
                NONCE_BUFFER_SIZE
            )));
        }

        let mut buffer = [0u8; NONCE_BUFFER_SIZE];
        buffer[..bytes.len()].copy_from_slice(bytes);
        Ok(Self {
            bytes: buffer,
            len: bytes.len(),
        })
    }

    /// A nonce of `len` copies of `symbol`
    pub(crate) fn filled(symbol: u8, len: usize) -> Self {
        debug_assert!(len <= NONCE_BUFFER_SIZE);
        let mut bytes = [0u8; NONCE_BUFFER_SIZE];
        bytes[..len].fill(symbol);
        Self { bytes, len }
    }

    /// Nonce bytes without padding
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    pub(crate) fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes[..self.len]
    }

    /// Number of symbols
    pub fn len(&self) -> usize {
        self.len
    }

    /// True for the zero-length nonce
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The zero-padded buffer as sent on the wire
    pub fn to_buffer(&self) -> [u8; NONCE_BUFFER_SIZE] {
        self.bytes
    }
}

impl fmt::Debug for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Nonce({:?})", String::from_utf8_lossy(self.as_bytes()))
    }
}

impl fmt::Display for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(self.as_bytes()))
    }
}

impl FromStr for Nonce {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_bytes(s.as_bytes())
    }
}

/// Immutable description of one proof-of-work search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchConfig {
    text: Vec<u8>,
    nonce_length: usize,
    difficulty: u32,
    charset: Charset,
}

impl SearchConfig {
    /// Create a validated search configuration
    pub fn new(
        text: impl Into<Vec<u8>>,
        nonce_length: usize,
        difficulty: u32,
        charset: Charset,
    ) -> Result<Self> {
        let text = text.into();

        if text.len() > MAX_TEXT_LENGTH {
            return Err(Error::config(format!(
                "Text of {} bytes exceeds the {} byte limit",
                text.len(),
                MAX_TEXT_LENGTH
            )));
        }
        if !(1..=MAX_NONCE_LENGTH).contains(&nonce_length) {
            return Err(Error::config(format!(
                "Nonce length must be between 1 and {}, got {}",
                MAX_NONCE_LENGTH, nonce_length
            )));
        }
        if difficulty > i32::MAX as u32 {
            return Err(Error::config("Difficulty does not fit the wire format"));
        }

        let config = Self {
            text,
            nonce_length,
            difficulty,
            charset,
        };
        config.search_space()?;
        Ok(config)
    }

    /// The fixed text every nonce is appended to
    pub fn text(&self) -> &[u8] {
        &self.text
    }

    /// Number of symbols in every nonce
    pub fn nonce_length(&self) -> usize {
        self.nonce_length
    }

    /// Required number of trailing zero decimal digits
    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    /// Nonce symbols in digit order
    pub fn charset(&self) -> &Charset {
        &self.charset
    }

    /// Number of distinct nonces, `charset_size^nonce_length`
    pub fn search_space(&self) -> Result<u64> {
        crate::partition::total_space(self.charset.len(), self.nonce_length)
    }

    /// Encode as a fixed-size little-endian block
    ///
    /// Layout: text buffer, text length, nonce length, difficulty, charset
    /// buffer, charset size. Buffers are zero-filled past their content.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![0u8; CONFIG_BLOCK_SIZE];
        let (text, rest) = bytes.split_at_mut(MAX_TEXT_SIZE);
        text[..self.text.len()].copy_from_slice(&self.text);

        LittleEndian::write_i32(&mut rest[0..4], self.text.len() as i32);
        LittleEndian::write_i32(&mut rest[4..8], self.nonce_length as i32);
        LittleEndian::write_i32(&mut rest[8..12], self.difficulty as i32);

        let (charset, size) = rest[12..].split_at_mut(CHARSET_BUFFER_SIZE);
        charset[..self.charset.len()].copy_from_slice(self.charset.as_bytes());
        LittleEndian::write_i32(size, self.charset.len() as i32);

        bytes
    }

    /// Decode and validate a configuration block
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != CONFIG_BLOCK_SIZE {
            return Err(Error::protocol(format!(
                "Invalid config block length: expected {} bytes, got {}",
                CONFIG_BLOCK_SIZE,
                bytes.len()
            )));
        }

        let mut cursor = Cursor::new(bytes);
        let mut text = [0u8; MAX_TEXT_SIZE];
        cursor.read_exact(&mut text)?;
        let text_length = cursor.read_i32::<LittleEndian>()?;
        let nonce_length = cursor.read_i32::<LittleEndian>()?;
        let difficulty = cursor.read_i32::<LittleEndian>()?;
        let mut charset = [0u8; CHARSET_BUFFER_SIZE];
        cursor.read_exact(&mut charset)?;
        let charset_size = cursor.read_i32::<LittleEndian>()?;

        let text_length = checked_length("text_length", text_length, MAX_TEXT_LENGTH)?;
        let nonce_length = checked_length("nonce_length", nonce_length, MAX_NONCE_LENGTH)?;
        let charset_size = checked_length("charset_size", charset_size, MAX_CHARSET_SIZE)?;
        if difficulty < 0 {
            return Err(Error::protocol(format!("Negative difficulty {}", difficulty)));
        }

        let charset = Charset::new(&charset[..charset_size])
            .map_err(|e| Error::protocol(format!("Invalid charset in config block: {}", e)))?;

        Self::new(&text[..text_length], nonce_length, difficulty as u32, charset)
            .map_err(|e| Error::protocol(format!("Invalid config block: {}", e)))
    }
}

fn checked_length(field: &str, value: i32, max: usize) -> Result<usize> {
    usize::try_from(value)
        .ok()
        .filter(|&v| v <= max)
        .ok_or_else(|| Error::protocol(format!("{} out of range: {}", field, value)))
}

/// Inclusive range of nonces assigned to one worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkRange {
    /// First nonce to try
    pub start: Nonce,
    /// Last nonce to try
    pub end: Nonce,
}

impl WorkRange {
    /// Create a range from its inclusive bounds
    pub fn new(start: Nonce, end: Nonce) -> Self {
        Self { start, end }
    }

    /// Encode as two zero-padded nonce buffers
    pub fn to_bytes(&self) -> [u8; RANGE_BLOCK_SIZE] {
        let mut bytes = [0u8; RANGE_BLOCK_SIZE];
        bytes[..NONCE_BUFFER_SIZE].copy_from_slice(&self.start.to_buffer());
        bytes[NONCE_BUFFER_SIZE..].copy_from_slice(&self.end.to_buffer());
        bytes
    }

    /// Decode a range block; both nonces are `nonce_length` symbols long
    pub fn from_bytes(bytes: &[u8], nonce_length: usize) -> Result<Self> {
        if bytes.len() != RANGE_BLOCK_SIZE {
            return Err(Error::protocol(format!(
                "Invalid range block length: expected {} bytes, got {}",
                RANGE_BLOCK_SIZE,
                bytes.len()
            )));
        }
        if nonce_length > NONCE_BUFFER_SIZE {
            return Err(Error::protocol(format!(
                "Nonce length {} exceeds the range buffer",
                nonce_length
            )));
        }

        let start = Nonce::from_bytes(&bytes[..nonce_length])?;
        let end = Nonce::from_bytes(&bytes[NONCE_BUFFER_SIZE..NONCE_BUFFER_SIZE + nonce_length])?;
        Ok(Self { start, end })
    }
}

impl fmt::Display for WorkRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} - {}]", self.start, self.end)
    }
}

/// A nonce together with the hash it produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    /// The nonce appended to the text
    pub nonce: Nonce,
    /// `compute_hash(text, nonce)`
    pub hash: u64,
}

impl Candidate {
    /// Create a candidate
    pub fn new(nonce: Nonce, hash: u64) -> Self {
        Self { nonce, hash }
    }
}

/// The single accepted candidate of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Solution {
    /// Ordinal of the worker whose report won arbitration
    pub worker: usize,
    /// The reported nonce and hash
    pub candidate: Candidate,
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_charset_digits() {
        let charset = Charset::alphanumeric();
        assert_eq!(charset.len(), 36);
        assert_eq!(charset.digit(b'0'), Some(0));
        assert_eq!(charset.digit(b'Z'), Some(35));
        assert_eq!(charset.digit(b'a'), None);
        assert_eq!(charset.symbol(10), b'A');
    }

    #[test]
    fn test_alphanumeric_matches_validated_charset() {
        let validated = Charset::new(DEFAULT_CHARSET).unwrap();
        assert_eq!(Charset::alphanumeric(), validated);
        assert_eq!(Charset::alphanumeric().to_string(), DEFAULT_CHARSET);
    }

    #[test]
    fn test_charset_validation() {
        assert!(Charset::new("").is_err());
        assert!(Charset::new("ABA").is_err());
        assert!(Charset::new([b'A', 0]).is_err());
        assert!(Charset::new(vec![b'x'; 65]).is_err());

        let all: Vec<u8> = (1..=64).collect();
        assert_eq!(Charset::new(&all).unwrap().len(), 64);
    }

    #[test]
    fn test_nonce_from_str() {
        let nonce: Nonce = "AB".parse().unwrap();
        assert_eq!(nonce.as_bytes(), b"AB");
        assert_eq!(nonce.len(), 2);
        assert_eq!(nonce.to_string(), "AB");
        assert!("ABCDEFGHIJK".parse::<Nonce>().is_err());
    }

    #[test]
    fn test_search_config_validation() {
        let charset = Charset::alphanumeric();
        assert!(SearchConfig::new("hello", 4, 2, charset.clone()).is_ok());
        assert!(SearchConfig::new("hello", 0, 2, charset.clone()).is_err());
        assert!(SearchConfig::new("hello", 10, 2, charset.clone()).is_err());
        assert!(SearchConfig::new(vec![b'a'; MAX_TEXT_SIZE + 1], 4, 2, charset).is_err());
    }

    #[test]
    fn test_text_keeps_terminator_room() {
        let charset = Charset::alphanumeric();
        assert!(SearchConfig::new(vec![b'a'; MAX_TEXT_LENGTH], 4, 2, charset.clone()).is_ok());
        assert_matches!(
            SearchConfig::new(vec![b'a'; MAX_TEXT_SIZE], 4, 2, charset.clone()),
            Err(Error::Config { .. })
        );

        // A full buffer announced on the wire is rejected as well
        let config = SearchConfig::new(vec![b'a'; MAX_TEXT_LENGTH], 4, 2, charset).unwrap();
        let mut bytes = config.to_bytes();
        assert_eq!(bytes[MAX_TEXT_LENGTH], 0);
        bytes[MAX_TEXT_LENGTH] = b'a';
        bytes[MAX_TEXT_SIZE..MAX_TEXT_SIZE + 4].copy_from_slice(&(MAX_TEXT_SIZE as i32).to_le_bytes());
        assert_matches!(SearchConfig::from_bytes(&bytes), Err(Error::Protocol { .. }));
    }

    #[test]
    fn test_config_block_layout() {
        let config = SearchConfig::new("hello", 2, 3, Charset::new("AB").unwrap()).unwrap();
        let bytes = config.to_bytes();

        assert_eq!(bytes.len(), CONFIG_BLOCK_SIZE);
        assert_eq!(&bytes[..5], b"hello");
        assert!(bytes[5..MAX_TEXT_SIZE].iter().all(|&b| b == 0));

        let ints = &bytes[MAX_TEXT_SIZE..MAX_TEXT_SIZE + 12];
        assert_eq!(ints, &[5, 0, 0, 0, 2, 0, 0, 0, 3, 0, 0, 0]);

        let charset_at = MAX_TEXT_SIZE + 12;
        assert_eq!(&bytes[charset_at..charset_at + 3], b"AB\0");
        assert_eq!(&bytes[CONFIG_BLOCK_SIZE - 4..], &[2, 0, 0, 0]);

        assert_eq!(SearchConfig::from_bytes(&bytes).unwrap(), config);
    }

    #[test]
    fn test_config_block_rejects_bad_fields() {
        let config = SearchConfig::new("hello", 2, 3, Charset::new("AB").unwrap()).unwrap();

        let mut bytes = config.to_bytes();
        bytes[MAX_TEXT_SIZE + 4] = 42; // nonce_length
        assert_matches!(SearchConfig::from_bytes(&bytes), Err(Error::Protocol { .. }));

        let mut bytes = config.to_bytes();
        bytes[MAX_TEXT_SIZE + 11] = 0x80; // difficulty sign bit
        assert_matches!(SearchConfig::from_bytes(&bytes), Err(Error::Protocol { .. }));

        let mut bytes = config.to_bytes();
        bytes[MAX_TEXT_SIZE + 13] = b'A'; // duplicate symbol
        assert_matches!(SearchConfig::from_bytes(&bytes), Err(Error::Protocol { .. }));

        assert_matches!(SearchConfig::from_bytes(&bytes[1..]), Err(Error::Protocol { .. }));
    }

    #[test]
    fn test_range_block_layout() {
        let range = WorkRange::new("0A".parse().unwrap(), "ZZ".parse().unwrap());
        let bytes = range.to_bytes();

        assert_eq!(&bytes[..3], b"0A\0");
        assert_eq!(&bytes[NONCE_BUFFER_SIZE..NONCE_BUFFER_SIZE + 3], b"ZZ\0");
        assert_eq!(WorkRange::from_bytes(&bytes, 2).unwrap(), range);
        assert_eq!(range.to_string(), "[0A - ZZ]");
    }
}
