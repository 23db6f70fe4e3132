//! Chained SHA-256 accumulator.
//!
//! The same primitive backs two independent uses at the protocol layer:
//! the per-file chunk integrity chain, and the per-session AEAD nonce
//! chain. Both are seeded and advanced independently (see
//! `relaycopy-protocol`); this type only implements the accumulator
//! itself.

use sha2::{Digest, Sha256};

/// Running SHA-256 accumulator: `state := SHA-256(state ∥ message)`.
///
/// Seeded with the true empty byte string, so the first `advance` call
/// hashes `message` alone — not `message` prefixed by 32 zero bytes.
/// `advance` returns the new accumulator value after each call, so
/// callers can embed it directly in a wire frame.
#[derive(Clone)]
pub struct ChainedHash {
    /// `None` until the first `advance`, standing in for the empty
    /// byte string so the first hash has nothing prepended to it.
    state: Option<[u8; 32]>,
}

impl ChainedHash {
    /// A fresh chain seeded with the empty accumulator.
    pub fn new() -> Self {
        Self { state: None }
    }

    /// A chain seeded with an explicit starting value (used for the
    /// nonce chain, which seeds from a sender-chosen random start nonce
    /// rather than from empty).
    pub fn seeded(seed: [u8; 32]) -> Self {
        Self { state: Some(seed) }
    }

    /// Advance the accumulator over `message`, returning the new value.
    pub fn advance(&mut self, message: &[u8]) -> [u8; 32] {
        let mut hasher = Sha256::new();
        if let Some(prev) = self.state {
            hasher.update(prev);
        }
        hasher.update(message);
        let next: [u8; 32] = hasher.finalize().into();
        self.state = Some(next);
        next
    }

    /// The current accumulator value without advancing it. Returns the
    /// all-zero value before the first `advance` — callers that need to
    /// distinguish "never advanced" should track that separately.
    pub fn current(&self) -> [u8; 32] {
        self.state.unwrap_or([0u8; 32])
    }
}

impl Default for ChainedHash {
    fn default() -> Self {
        Self::new()
    }
}

/// SHA-256 of `data`, used as the plain (non-Argon2) code fingerprint
/// when encryption is disabled.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_seed_first_advance_matches_sha256_of_message_alone() {
        let mut chain = ChainedHash::new();
        let got = chain.advance(b"hello");
        let want = sha256(b"hello");
        assert_eq!(got, want);
    }

    #[test]
    fn second_advance_prepends_prior_value() {
        let mut chain = ChainedHash::new();
        let h1 = chain.advance(b"one");
        let h2 = chain.advance(b"two");
        let want = sha256(&[h1.as_slice(), b"two"].concat());
        assert_eq!(h2, want);
    }

    #[test]
    fn chain_is_order_dependent_and_cumulative() {
        let mut a = ChainedHash::new();
        let h1 = a.advance(b"one");
        let h2 = a.advance(b"two");
        assert_ne!(h1, h2);

        let mut b = ChainedHash::new();
        let h1_again = b.advance(b"one");
        assert_eq!(h1, h1_again);
    }

    #[test]
    fn seeded_chain_differs_from_empty_chain() {
        let mut empty = ChainedHash::new();
        let mut seeded = ChainedHash::seeded([7u8; 32]);
        assert_ne!(empty.advance(b"x"), seeded.advance(b"x"));
    }

    #[test]
    fn seeded_first_advance_prepends_seed() {
        let mut chain = ChainedHash::seeded([7u8; 32]);
        let got = chain.advance(b"x");
        let want = sha256(&[[7u8; 32].as_slice(), b"x"].concat());
        assert_eq!(got, want);
    }
}
