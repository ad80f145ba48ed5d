//! Coordinator/worker wire protocol
//!
//! The stream carries no length prefixes, so both sides must agree on the
//! exact size of every message in advance:
//!
//! | direction | message | size |
//! |---|---|---|
//! | coordinator -> worker | search config | [`CONFIG_BLOCK_SIZE`] |
//! | coordinator -> worker | work range | [`RANGE_BLOCK_SIZE`] |
//! | worker -> coordinator | report (optional) | `nonce_length + 8` |
//! | coordinator -> worker | stop | 1 |
//!
//! All integers are little-endian. A worker that exhausts its range without a
//! solution shuts down its write half instead of reporting, so the
//! coordinator reads a clean end of stream at a frame boundary.

use crate::types::{
    Candidate, Nonce, SearchConfig, WorkRange, CONFIG_BLOCK_SIZE, RANGE_BLOCK_SIZE,
};
use crate::{Error, Result};
use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

/// Revision of the message layouts above; not transmitted
pub const WIRE_VERSION: u32 = 1;

/// Default coordinator port
pub const DEFAULT_PORT: u16 = 8080;

/// Value of the stop byte sent at session teardown
pub const STOP_SIGNAL: u8 = 0x01;

/// Message from the coordinator to a worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// Search parameters, sent first
    Config(SearchConfig),
    /// The worker's share of the nonce space, sent second
    Range(WorkRange),
    /// End of session, sent last
    Stop,
}

/// Size of a report frame for nonces of `nonce_length` symbols
pub fn report_size(nonce_length: usize) -> usize {
    nonce_length + std::mem::size_of::<u64>()
}

/// Coordinator side: writes [`ServerMessage`]s, reads reports
#[derive(Debug, Clone)]
pub struct CoordinatorCodec {
    nonce_length: usize,
}

impl CoordinatorCodec {
    /// Create a codec for reports with nonces of `nonce_length` symbols
    pub fn new(nonce_length: usize) -> Self {
        Self { nonce_length }
    }
}

impl Encoder<ServerMessage> for CoordinatorCodec {
    type Error = Error;

    fn encode(&mut self, message: ServerMessage, dst: &mut BytesMut) -> Result<()> {
        match &message {
            ServerMessage::Config(config) => dst.put_slice(&config.to_bytes()),
            ServerMessage::Range(range) => dst.put_slice(&range.to_bytes()),
            ServerMessage::Stop => dst.put_u8(STOP_SIGNAL),
        }
        trace!("TX: {:?}", message);
        Ok(())
    }
}

impl Decoder for CoordinatorCodec {
    type Item = Candidate;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Candidate>> {
        let frame_len = report_size(self.nonce_length);
        if src.len() < frame_len {
            src.reserve(frame_len - src.len());
            return Ok(None);
        }

        let nonce = Nonce::from_bytes(&src[..self.nonce_length])?;
        src.advance(self.nonce_length);
        let hash = src.get_u64_le();

        let candidate = Candidate::new(nonce, hash);
        trace!("RX: {:?}", candidate);
        Ok(Some(candidate))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Candidate>> {
        match self.decode(src)? {
            Some(candidate) => Ok(Some(candidate)),
            None if src.is_empty() => Ok(None),
            None => Err(Error::transport(format!(
                "Connection closed after {} of {} report bytes",
                src.len(),
                report_size(self.nonce_length)
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect {
    Config,
    Range { nonce_length: usize },
    Stop,
    Closed,
}

/// Worker side: reads [`ServerMessage`]s in order, writes reports
#[derive(Debug, Clone)]
pub struct WorkerCodec {
    expect: Expect,
}

impl WorkerCodec {
    /// Create a codec expecting the search config first
    pub fn new() -> Self {
        Self {
            expect: Expect::Config,
        }
    }
}

impl Default for WorkerCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for WorkerCodec {
    type Item = ServerMessage;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<ServerMessage>> {
        let message = match self.expect {
            Expect::Config => {
                let Some(frame) = take_frame(src, CONFIG_BLOCK_SIZE) else {
                    return Ok(None);
                };
                let config = SearchConfig::from_bytes(&frame)?;
                self.expect = Expect::Range {
                    nonce_length: config.nonce_length(),
                };
                ServerMessage::Config(config)
            }
            Expect::Range { nonce_length } => {
                let Some(frame) = take_frame(src, RANGE_BLOCK_SIZE) else {
                    return Ok(None);
                };
                self.expect = Expect::Stop;
                ServerMessage::Range(WorkRange::from_bytes(&frame, nonce_length)?)
            }
            Expect::Stop => {
                if src.is_empty() {
                    return Ok(None);
                }
                if src.get_u8() == 0 {
                    return Err(Error::protocol("Stop signal must be nonzero"));
                }
                self.expect = Expect::Closed;
                ServerMessage::Stop
            }
            Expect::Closed if src.is_empty() => return Ok(None),
            Expect::Closed => {
                return Err(Error::protocol(format!(
                    "Unexpected {} bytes after stop signal",
                    src.len()
                )))
            }
        };

        trace!("RX: {:?}", message);
        Ok(Some(message))
    }
}

/// Split off a fixed-size frame once it is fully buffered
fn take_frame(src: &mut BytesMut, frame_len: usize) -> Option<BytesMut> {
    if src.len() < frame_len {
        src.reserve(frame_len - src.len());
        return None;
    }
    Some(src.split_to(frame_len))
}

impl Encoder<Candidate> for WorkerCodec {
    type Error = Error;

    fn encode(&mut self, candidate: Candidate, dst: &mut BytesMut) -> Result<()> {
        dst.reserve(report_size(candidate.nonce.len()));
        dst.put_slice(candidate.nonce.as_bytes());
        dst.put_u64_le(candidate.hash);
        trace!("TX: {:?}", candidate);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Charset;
    use assert_matches::assert_matches;

    fn config() -> SearchConfig {
        SearchConfig::new("hello", 2, 0, Charset::new("AB").unwrap()).unwrap()
    }

    fn range() -> WorkRange {
        WorkRange::new("AA".parse().unwrap(), "AB".parse().unwrap())
    }

    fn coordinator_bytes(messages: Vec<ServerMessage>) -> BytesMut {
        let mut codec = CoordinatorCodec::new(2);
        let mut buf = BytesMut::new();
        for message in messages {
            codec.encode(message, &mut buf).unwrap();
        }
        buf
    }

    #[test]
    fn test_session_stream_layout() {
        let buf = coordinator_bytes(vec![
            ServerMessage::Config(config()),
            ServerMessage::Range(range()),
            ServerMessage::Stop,
        ]);
        assert_eq!(buf.len(), CONFIG_BLOCK_SIZE + RANGE_BLOCK_SIZE + 1);
        assert_eq!(buf[buf.len() - 1], STOP_SIGNAL);
    }

    #[test]
    fn test_worker_decodes_in_order() {
        let mut buf = coordinator_bytes(vec![
            ServerMessage::Config(config()),
            ServerMessage::Range(range()),
            ServerMessage::Stop,
        ]);
        let mut codec = WorkerCodec::new();

        assert_eq!(codec.decode(&mut buf).unwrap(), Some(ServerMessage::Config(config())));
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(ServerMessage::Range(range())));
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(ServerMessage::Stop));
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
    }

    #[test]
    fn test_worker_waits_for_full_block() {
        let full = coordinator_bytes(vec![ServerMessage::Config(config())]);
        let mut codec = WorkerCodec::new();

        let mut partial = BytesMut::from(&full[..CONFIG_BLOCK_SIZE - 1]);
        assert_eq!(codec.decode(&mut partial).unwrap(), None);
        partial.extend_from_slice(&full[CONFIG_BLOCK_SIZE - 1..]);
        assert_matches!(codec.decode(&mut partial).unwrap(), Some(ServerMessage::Config(_)));
    }

    #[test]
    fn test_worker_rejects_zero_stop() {
        let mut buf = coordinator_bytes(vec![
            ServerMessage::Config(config()),
            ServerMessage::Range(range()),
        ]);
        buf.put_u8(0);
        let mut codec = WorkerCodec::new();

        codec.decode(&mut buf).unwrap();
        codec.decode(&mut buf).unwrap();
        assert_matches!(codec.decode(&mut buf), Err(Error::Protocol { .. }));
    }

    #[test]
    fn test_report_frame() {
        let candidate = Candidate::new("AB".parse().unwrap(), 0x0102_0304_0506_0708);
        let mut buf = BytesMut::new();
        WorkerCodec::new().encode(candidate, &mut buf).unwrap();

        assert_eq!(buf.len(), report_size(2));
        assert_eq!(&buf[..2], b"AB");
        assert_eq!(&buf[2..], &[8, 7, 6, 5, 4, 3, 2, 1]);

        let mut codec = CoordinatorCodec::new(2);
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(candidate));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_report_eof_handling() {
        let mut codec = CoordinatorCodec::new(2);

        let mut empty = BytesMut::new();
        assert_eq!(codec.decode_eof(&mut empty).unwrap(), None);

        let mut truncated = BytesMut::from(&b"AB\x01\x02"[..]);
        assert_matches!(codec.decode_eof(&mut truncated), Err(Error::Transport { .. }));
    }
}
