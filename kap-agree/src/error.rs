//! Error handling for the KAP agreement engine
//!
//! This module provides error types and utilities for the handshake engine
//! and the agreement message codec.

use thiserror::Error;

/// Type alias for Results with KAP agreement errors
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the KAP agreement engine
#[derive(Error, Debug)]
pub enum Error {
    /// Key-management errors
    #[error("Key error: {0}")]
    Keys(#[from] kap_keys::Error),

    /// A handshake step was invoked out of sequence
    #[error("Protocol state error: {0}")]
    ProtocolState(String),

    /// Malformed agreement message wire bytes
    #[error("Message format error: {0}")]
    MessageFormat(String),

    /// An agreement message carries a different algorithm than the session expects
    #[error("Algorithm mismatch: message carries {actual}, session expects {expected}")]
    AlgorithmMismatch {
        /// Algorithm the session was created for
        expected: String,
        /// Algorithm carried by the message
        actual: String,
    },

    /// A key pair supplied to the engine does not fit the agreement spec
    #[error("Key pair mismatch: {0}")]
    KeyPairMismatch(String),

    /// The responder's handshake signature failed to verify
    #[error("Handshake authentication failure: signature verification failed")]
    AuthenticationFailure,

    /// The confirmation tag did not match the local transcript
    #[error("Confirmation mismatch: confirmation tag verification failed")]
    ConfirmationMismatch,

    /// Error reported by an underlying cryptographic operation
    #[error("Crypto error: {0}")]
    Cryptography(String),
}
