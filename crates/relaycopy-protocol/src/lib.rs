//! The endpoint transfer protocol: message taxonomy, chunked framing
//! with a chained integrity hash, the optional AEAD overlay, the
//! compression auto-detection policy, and the resume protocol.
//!
//! The relay pairing protocol lives in `relaycopy-relay`; this crate
//! only depends on the [`wire::Channel`] abstraction it implements.

#![forbid(unsafe_code)]

pub mod compression;
pub mod error;
pub mod manifest;
pub mod resume;
pub mod transfer;
pub mod wire;

pub use error::{ProtocolError, Result, TransferError};
