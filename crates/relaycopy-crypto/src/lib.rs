//! Cryptographic primitives for relaycopy: password hardening, the
//! chained-hash accumulator shared by file integrity and nonce
//! derivation, and AES-256-GCM authenticated encryption.

#![forbid(unsafe_code)]

pub mod aead;
pub mod chain;
pub mod error;
pub mod kdf;

pub use chain::{sha256, ChainedHash};
pub use error::{CryptoError, Result};
