//! Binary chunk frame: a 40-byte header followed by payload bytes.
//!
//! ```text
//! bytes 0..8   seq, u64 big-endian, per-file, starts at 0
//! bytes 8..40  chained hash value at this chunk
//! bytes 40..   payload (possibly compressed, possibly encrypted)
//! ```

use crate::error::{ProtocolError, Result};

pub const HEADER_LEN: usize = 40;

/// A parsed binary chunk frame. Borrows `payload` from the frame bytes
/// it was decoded from to avoid an extra copy on the hot path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkFrame<'a> {
    pub seq: u64,
    pub chain: [u8; 32],
    pub payload: &'a [u8],
}

impl<'a> ChunkFrame<'a> {
    /// Parse a binary frame received off the wire.
    pub fn decode(frame: &'a [u8]) -> Result<Self> {
        if frame.len() < HEADER_LEN {
            return Err(ProtocolError::TruncatedChunk(frame.len()));
        }
        let seq = u64::from_be_bytes(frame[0..8].try_into().expect("8 bytes"));
        let mut chain = [0u8; 32];
        chain.copy_from_slice(&frame[8..40]);
        Ok(Self {
            seq,
            chain,
            payload: &frame[HEADER_LEN..],
        })
    }

    /// Encode a chunk frame for the wire.
    pub fn encode(seq: u64, chain: &[u8; 32], payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
        out.extend_from_slice(&seq.to_be_bytes());
        out.extend_from_slice(chain);
        out.extend_from_slice(payload);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_seq_chain_and_payload() {
        let chain = [7u8; 32];
        let encoded = ChunkFrame::encode(42, &chain, b"payload bytes");
        let decoded = ChunkFrame::decode(&encoded).unwrap();
        assert_eq!(decoded.seq, 42);
        assert_eq!(decoded.chain, chain);
        assert_eq!(decoded.payload, b"payload bytes");
    }

    #[test]
    fn empty_payload_is_valid() {
        let encoded = ChunkFrame::encode(0, &[0u8; 32], b"");
        assert_eq!(encoded.len(), HEADER_LEN);
        let decoded = ChunkFrame::decode(&encoded).unwrap();
        assert_eq!(decoded.payload, b"");
    }

    #[test]
    fn truncated_frame_is_rejected() {
        let short = vec![0u8; 10];
        assert!(matches!(
            ChunkFrame::decode(&short),
            Err(ProtocolError::TruncatedChunk(10))
        ));
    }

    #[test]
    fn seq_is_big_endian() {
        let encoded = ChunkFrame::encode(1, &[0u8; 32], b"");
        assert_eq!(&encoded[0..8], &[0, 0, 0, 0, 0, 0, 0, 1]);
    }
}
