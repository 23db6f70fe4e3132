//! Error types for the wire protocol and transfer pipelines.

use thiserror::Error;

/// Result type alias using [`ProtocolError`].
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors surfaced while framing, parsing, or dispatching protocol
/// messages.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// A text frame was not a well-formed `Message`.
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    /// A binary chunk frame was shorter than the 40-byte header.
    #[error("truncated chunk frame: {0} bytes")]
    TruncatedChunk(usize),

    /// A message arrived that the current state does not expect.
    #[error("unexpected message: got {got}, expected {expected}")]
    UnexpectedMessage { got: String, expected: String },

    /// The channel closed before the expected message arrived.
    #[error("channel closed")]
    ChannelClosed,

    /// A handshake step (ready, resume manifest) exceeded its deadline.
    #[error("timed out waiting for {0}")]
    Timeout(&'static str),

    /// A handshake step saw the wrong frame (ready, resume manifest).
    #[error("handshake failure: {0}")]
    Handshake(String),

    /// Underlying channel I/O failure (relay disconnect, socket error).
    #[error("channel error: {0}")]
    Channel(String),
}

/// Errors surfaced while running a file transfer.
#[derive(Error, Debug)]
pub enum TransferError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Crypto(#[from] relaycopy_crypto::CryptoError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("compression error: {0}")]
    Compression(String),

    /// No manifest entries to send.
    #[error("no files to send")]
    NoFiles,

    /// A chunk's chained hash did not match the value carried in its
    /// frame.
    #[error("chunk integrity check failed at offset {offset}")]
    IntegrityMismatch { offset: u64 },

    /// The receiver's declared resume prefix did not match what the
    /// sender recomputes locally.
    #[error("resume prefix mismatch for {path}")]
    ResumeMismatch { path: String },

    /// Encryption was requested by one side but not the other.
    #[error("encryption mismatch: sender={sender}, receiver={receiver}")]
    EncryptionMismatch { sender: bool, receiver: bool },

    /// A `file_eof` arrived with the wrong number of bytes written.
    #[error("size mismatch for {path}: wrote {got}, expected {expected}")]
    SizeMismatch {
        path: String,
        got: u64,
        expected: u64,
    },
}

impl TransferError {
    /// Maps an error to the process exit code it should produce, per
    /// the `send` component contract (0 success, 3 connection/pairing
    /// including an empty manifest, 4 protocol or integrity failure
    /// mid-stream). `NoFiles` is a `send`-side failure, not a CLI usage
    /// error, so it exits 3 rather than the 2 a bare argument-parsing
    /// failure would use.
    pub fn exit_code(&self) -> i32 {
        match self {
            TransferError::NoFiles => 3,
            TransferError::Protocol(ProtocolError::ChannelClosed)
            | TransferError::Protocol(ProtocolError::Channel(_))
            | TransferError::Protocol(ProtocolError::Timeout(_))
            | TransferError::Protocol(ProtocolError::Handshake(_)) => 3,
            _ => 4,
        }
    }
}
