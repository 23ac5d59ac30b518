//! KAP agreement engine
//!
//! This crate provides the handshake side of the Key Agreement Protocol
//! (KAP): the agreement message codec, KDF selection, and the protocol
//! engine driving the six handshake variants (anonymous, basic, signed,
//! unified, MQV, and KEM) over the key-pair families of `kap-keys`.

/// Handshake sessions and the protocol state machine
pub mod agreement;

/// Error types
pub mod error;

/// Session factory
pub mod factory;

/// Key derivation for agreed values
pub mod kdf;

/// Agreement message codec
pub mod message;

/// Agreement specifications
pub mod spec;

// Re-export key types for convenience
pub use agreement::{Agreement, Role, SessionState};
pub use error::{Error, Result};
pub use factory::AgreementFactory;
pub use kdf::KdfSpec;
pub use message::{AgreementMessage, MessageKind};
pub use spec::{AgreementSpec, AgreementVariant};

/// Version of the KAP agreement crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
