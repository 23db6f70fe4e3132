//! Password hardening (Argon2id) with fixed, domain-separated salts.
//!
//! Two derivations share one code: the *pairing fingerprint* (relay
//! matching only) and the *content key* (AEAD key, only when
//! encryption is enabled). Both use the same Argon2id parameters and
//! differ only by salt.

use crate::error::{CryptoError, Result};
use argon2::{Algorithm, Argon2, Params, Version};

/// Salt for the code fingerprint used to match peers at the relay.
pub const CODE_HASH_SALT: &[u8] = b"code_hash used for hello-match";

/// Salt for the AEAD content key used for end-to-end encryption.
pub const CIPHER_SALT: &[u8] = b"cipher used for E2E-encryption";

const TIME_COST: u32 = 3;
const MEMORY_COST_KIB: u32 = 32 * 1024;
const PARALLELISM: u32 = 8;
const OUTPUT_LEN: usize = 32;

/// Harden `code` with Argon2id under the given fixed salt, producing a
/// 32-byte key. Argon2's salt parameter must be at least 8 bytes; both
/// fixed salts here satisfy that.
pub fn harden(code: &str, salt: &[u8]) -> Result<[u8; 32]> {
    let params = Params::new(MEMORY_COST_KIB, TIME_COST, PARALLELISM, Some(OUTPUT_LEN))
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut out = [0u8; OUTPUT_LEN];
    argon2
        .hash_password_into(code.as_bytes(), salt, &mut out)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    Ok(out)
}

/// Derive the code fingerprint used only for relay pairing.
pub fn code_fingerprint(code: &str) -> Result<[u8; 32]> {
    harden(code, CODE_HASH_SALT)
}

/// Derive the AEAD content key, only meaningful when encryption is on.
pub fn content_key(code: &str) -> Result<[u8; 32]> {
    harden(code, CIPHER_SALT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_code_same_salt_is_deterministic() {
        let a = code_fingerprint("correct horse").unwrap();
        let b = code_fingerprint("correct horse").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn fingerprint_and_content_key_differ() {
        let fp = code_fingerprint("correct horse").unwrap();
        let key = content_key("correct horse").unwrap();
        assert_ne!(fp, key);
    }

    #[test]
    fn different_codes_differ() {
        let a = code_fingerprint("alpha").unwrap();
        let b = code_fingerprint("bravo").unwrap();
        assert_ne!(a, b);
    }
}
