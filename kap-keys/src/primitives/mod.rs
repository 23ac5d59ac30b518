//! Primitive provider bindings for KAP
//!
//! This module wraps the per-family primitive backends (dalek curves,
//! RustCrypto Weierstrass curves, ML-KEM, and the hash-based HSS scheme)
//! behind small free functions. All algorithm-agnostic dispatch happens
//! above this layer by matching on the key material variants.

pub mod ec;
pub mod ed25519;
pub mod hss;
pub mod mlkem;
pub mod x25519;
