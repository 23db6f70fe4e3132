//! Per-chunk zstd compression and the `auto` ratio probe.
//!
//! Compression contexts are reset per chunk — each chunk frame must be
//! independently decompressible, so compression here is always a
//! one-shot `zstd::bulk` call rather than a streaming encoder.

use crate::error::TransferError;
use crate::wire::messages::CompressionTag;

const ZSTD_LEVEL: i32 = 3;
const AUTO_RATIO_THRESHOLD: f64 = 0.95;

/// The `--compress` mode requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressMode {
    Off,
    On,
    Auto,
}

/// The resolved per-file compression decision: whether to compress,
/// and the wire tag to put on the file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionDecision {
    pub use_compression: bool,
    pub tag: CompressionTag,
}

impl CompressionDecision {
    fn off() -> Self {
        Self {
            use_compression: false,
            tag: CompressionTag::None,
        }
    }

    fn on() -> Self {
        Self {
            use_compression: true,
            tag: CompressionTag::Zstd,
        }
    }
}

/// Decide whether to compress a file given `mode` and, for `auto`, a
/// probe over the first chunk of that file's body.
///
/// Returns the decision plus the (possibly already-compressed) bytes
/// for the probed chunk, since the probe already did the one
/// compression `auto` needs — the caller must send this chunk first
/// rather than recompressing it.
pub fn decide(
    mode: CompressMode,
    first_chunk: &[u8],
) -> Result<(CompressionDecision, Vec<u8>), TransferError> {
    match mode {
        CompressMode::Off => Ok((CompressionDecision::off(), first_chunk.to_vec())),
        CompressMode::On => {
            let compressed = compress(first_chunk)?;
            Ok((CompressionDecision::on(), compressed))
        }
        CompressMode::Auto => {
            if first_chunk.is_empty() {
                return Ok((CompressionDecision::off(), Vec::new()));
            }
            let compressed = compress(first_chunk)?;
            let ratio = compressed.len() as f64 / first_chunk.len() as f64;
            if ratio < AUTO_RATIO_THRESHOLD {
                Ok((CompressionDecision::on(), compressed))
            } else {
                Ok((CompressionDecision::off(), first_chunk.to_vec()))
            }
        }
    }
}

/// Compress one chunk with zstd at the transfer's fixed level.
pub fn compress(data: &[u8]) -> Result<Vec<u8>, TransferError> {
    zstd::bulk::compress(data, ZSTD_LEVEL).map_err(|e| TransferError::Compression(e.to_string()))
}

/// Decompress one chunk. `capacity_hint` bounds the output buffer;
/// callers pass the declared uncompressed chunk size.
pub fn decompress(data: &[u8], capacity_hint: usize) -> Result<Vec<u8>, TransferError> {
    zstd::bulk::decompress(data, capacity_hint)
        .map_err(|e| TransferError::Compression(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn off_mode_never_compresses() {
        let data = vec![0u8; 4096];
        let (decision, bytes) = decide(CompressMode::Off, &data).unwrap();
        assert!(!decision.use_compression);
        assert_eq!(decision.tag, CompressionTag::None);
        assert_eq!(bytes, data);
    }

    #[test]
    fn on_mode_always_compresses() {
        let data = vec![0u8; 4096];
        let (decision, bytes) = decide(CompressMode::On, &data).unwrap();
        assert!(decision.use_compression);
        assert_eq!(decision.tag, CompressionTag::Zstd);
        assert!(bytes.len() < data.len());
    }

    #[test]
    fn auto_mode_compresses_highly_compressible_data() {
        let data = b"AAAABBBBCCCCDDDDEEEE".repeat(1000);
        let (decision, _) = decide(CompressMode::Auto, &data).unwrap();
        assert!(decision.use_compression);
        assert_eq!(decision.tag, CompressionTag::Zstd);
    }

    #[test]
    fn auto_mode_skips_incompressible_data() {
        // Chained SHA-256 output has no short-range repetition, so it
        // compresses poorly enough to stay above the ratio threshold.
        let mut data = Vec::with_capacity(8192);
        let mut state = [0u8; 32];
        while data.len() < 8192 {
            state = relaycopy_crypto::sha256(&state);
            data.extend_from_slice(&state);
        }
        let (decision, _) = decide(CompressMode::Auto, &data).unwrap();
        assert!(!decision.use_compression);
        assert_eq!(decision.tag, CompressionTag::None);
    }

    #[test]
    fn compress_decompress_round_trips() {
        let data = b"round trip this payload".to_vec();
        let compressed = compress(&data).unwrap();
        let back = decompress(&compressed, data.len()).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn empty_first_chunk_under_auto_is_uncompressed() {
        let (decision, bytes) = decide(CompressMode::Auto, &[]).unwrap();
        assert!(!decision.use_compression);
        assert!(bytes.is_empty());
    }
}
