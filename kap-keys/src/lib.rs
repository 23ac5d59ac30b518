//! KAP key management
//!
//! This crate provides the key-pair side of the Key Agreement Protocol
//! (KAP): an algorithm registry over a closed set of key-pair families, a
//! key-pair model with per-family material variants, a cached generator
//! factory, and the two standard key-encoding containers (PKCS#8 private,
//! X.509 SubjectPublicKeyInfo public).

/// Standard key-encoding containers and PEM armoring
pub mod encoding;

/// Error types
pub mod error;

/// Generator factory and cache
pub mod factory;

/// Per-algorithm key-pair generators
pub mod generator;

/// Public/private key model
pub mod keypair;

/// Primitive provider bindings
pub mod primitives;

/// Algorithm registry
pub mod registry;

/// Algorithm specifications
pub mod spec;

/// Stateful hash-based private keys
pub mod stateful;

// Re-export key types for convenience
pub use error::{Error, Result};
pub use factory::KeyPairFactory;
pub use generator::KeyPairGenerator;
pub use keypair::{KeyPair, PrivateKey, PrivateKeyMaterial, PublicKey, PublicKeyMaterial};
pub use spec::{AlgorithmSpec, EcCurve, HssParams, MlKemLevel};
pub use stateful::{HssPrivateKey, HssPublicKey};

/// Version of the KAP key crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
