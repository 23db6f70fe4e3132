//! AES-256-GCM with a deterministic nonce chain.
//!
//! The 12-byte nonce for the i-th AEAD operation on a session is the
//! leading 12 bytes of the i-th value of a [`ChainedHash`] seeded by a
//! sender-chosen random 32-byte start nonce disclosed in the encrypted
//! manifest frame. Both endpoints advance the same chain in lockstep,
//! one call per AEAD operation, in the strict order operations appear
//! on the wire — so the nonce never needs to be transmitted.

use crate::chain::ChainedHash;
use crate::error::{CryptoError, Result};
use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::RngCore;

/// Per-session nonce chain. Not [`Clone`]: a chain must advance
/// exactly once per AEAD operation and sharing it across sites risks
/// nonce reuse.
pub struct NonceChain {
    chain: ChainedHash,
}

impl NonceChain {
    /// Generate a fresh random 32-byte start nonce and seed a chain
    /// from it. Returns the chain and the start nonce to disclose on
    /// the wire (in `enc_manifest`).
    pub fn generate() -> (Self, [u8; 32]) {
        let mut start = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut start);
        let chain = Self::from_start_nonce(start);
        (chain, start)
    }

    /// Seed a chain from a start nonce received on the wire.
    ///
    /// The chain starts empty and is immediately advanced once by the
    /// start nonce; this first advance is not itself used as a nonce —
    /// `next_nonce` always performs one further advance before handing
    /// out a value, so the start nonce is folded in but never directly
    /// reused as an AEAD nonce.
    pub fn from_start_nonce(start: [u8; 32]) -> Self {
        let mut chain = ChainedHash::new();
        chain.advance(&start);
        Self { chain }
    }

    /// Advance the chain and return the next 12-byte AEAD nonce.
    pub fn next_nonce(&mut self) -> [u8; 12] {
        let full = self.chain.advance(&[]);
        let mut nonce = [0u8; 12];
        nonce.copy_from_slice(&full[..12]);
        nonce
    }
}

/// Encrypt `plaintext` with AES-256-GCM, consuming the next nonce from
/// `chain`. No associated data is used (per spec).
pub fn encrypt(key: &[u8; 32], chain: &mut NonceChain, plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new(key.into());
    let nonce_bytes = chain.next_nonce();
    let nonce = Nonce::from_slice(&nonce_bytes);
    cipher
        .encrypt(
            nonce,
            Payload {
                msg: plaintext,
                aad: &[],
            },
        )
        .map_err(|e| CryptoError::Encryption(e.to_string()))
}

/// Decrypt `ciphertext` with AES-256-GCM, consuming the next nonce from
/// `chain`.
pub fn decrypt(key: &[u8; 32], chain: &mut NonceChain, ciphertext: &[u8]) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new(key.into());
    let nonce_bytes = chain.next_nonce();
    let nonce = Nonce::from_slice(&nonce_bytes);
    cipher
        .decrypt(
            nonce,
            Payload {
                msg: ciphertext,
                aad: &[],
            },
        )
        .map_err(|e| CryptoError::Decryption(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let key = [3u8; 32];
        let (mut send_chain, start) = NonceChain::generate();
        let mut recv_chain = NonceChain::from_start_nonce(start);

        let ct = encrypt(&key, &mut send_chain, b"hello world").unwrap();
        let pt = decrypt(&key, &mut recv_chain, &ct).unwrap();
        assert_eq!(pt, b"hello world");
    }

    #[test]
    fn lockstep_nonces_match_across_independent_chains() {
        let start = [9u8; 32];
        let mut a = NonceChain::from_start_nonce(start);
        let mut b = NonceChain::from_start_nonce(start);

        for _ in 0..5 {
            assert_eq!(a.next_nonce(), b.next_nonce());
        }
    }

    #[test]
    fn wrong_key_fails_authentication() {
        let (mut chain, start) = NonceChain::generate();
        let ct = encrypt(&[1u8; 32], &mut chain, b"secret").unwrap();

        let mut recv_chain = NonceChain::from_start_nonce(start);
        assert!(decrypt(&[2u8; 32], &mut recv_chain, &ct).is_err());
    }

    #[test]
    fn nonces_are_unique_across_many_calls() {
        let (mut chain, _start) = NonceChain::generate();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..1000 {
            assert!(seen.insert(chain.next_nonce()));
        }
    }
}
