//! Error types for cryptographic operations

use thiserror::Error;

/// Result type alias using [`CryptoError`]
pub type Result<T> = std::result::Result<T, CryptoError>;

/// Errors that can occur during cryptographic operations
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Argon2id hardening failed (bad parameters, not a wrong-password case)
    #[error("password hardening failed: {0}")]
    KeyDerivation(String),

    /// AEAD encryption failed
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// AEAD decryption or authentication failed
    #[error("decryption failed: {0}")]
    Decryption(String),
}
