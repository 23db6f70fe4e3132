//! The rendezvous relay: §4.1 of the transfer protocol.
//!
//! The relay pairs exactly one sender and one receiver that present
//! the same code fingerprint, then forwards whole frames between them
//! unchanged. It never parses, buffers across frame boundaries, or
//! inspects payloads beyond the first `hello`.

#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod pairing;
pub mod server;

pub use config::RelayConfig;
pub use error::RelayError;
pub use pairing::PairingTable;
