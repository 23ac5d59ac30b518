//! Error handling for KAP key management
//!
//! This module provides error types and utilities shared by the algorithm
//! registry, the key-pair model, and the generator factory.

use thiserror::Error;

/// Type alias for Results with KAP key errors
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for KAP key management
#[derive(Error, Debug)]
pub enum Error {
    /// The algorithm family (or family/variant combination) is not supported
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The algorithm family is known but its parameters cannot be resolved
    #[error("Invalid key spec: {0}")]
    InvalidKeySpec(String),

    /// A reconstructed public/private pair failed the pairing check
    #[error("Key pair mismatch: public and private keys are not a valid pair")]
    KeyMismatch,

    /// A stateful private key has no signing usages left
    #[error("Key exhausted: no signing usages remain")]
    KeyExhausted,

    /// Malformed encoded key container bytes
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Error reported by an underlying cryptographic primitive
    #[error("Crypto error: {0}")]
    Cryptography(String),

    /// The process-wide secure random source failed; fatal, not retried
    #[error("Entropy unavailable: {0}")]
    EntropyUnavailable(String),
}
