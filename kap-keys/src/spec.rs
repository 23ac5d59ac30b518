//! Algorithm specifications for KAP key pairs
//!
//! An [`AlgorithmSpec`] identifies a key-pair family plus its sub-parameters
//! (curve choice, ML-KEM level, hash-tree height). Specs are immutable
//! values with equality and hashing, used as cache keys by the generator
//! factory and as the algorithm tag carried by agreement messages.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Named Weierstrass curves supported for ECDH/ECDSA/MQV
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EcCurve {
    /// NIST P-256 (secp256r1)
    P256,
    /// secp256k1
    Secp256k1,
}

impl EcCurve {
    /// Returns the curve name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            EcCurve::P256 => "P-256",
            EcCurve::Secp256k1 => "secp256k1",
        }
    }

    /// Field element width in bytes (both supported curves are 256-bit)
    pub fn field_len(&self) -> usize {
        32
    }
}

/// ML-KEM (Kyber) parameter levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MlKemLevel {
    /// ML-KEM-512 (NIST level 1)
    MlKem512,
    /// ML-KEM-768 (NIST level 3)
    MlKem768,
    /// ML-KEM-1024 (NIST level 5)
    MlKem1024,
}

impl MlKemLevel {
    /// Returns the parameter-set name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            MlKemLevel::MlKem512 => "ML-KEM-512",
            MlKemLevel::MlKem768 => "ML-KEM-768",
            MlKemLevel::MlKem1024 => "ML-KEM-1024",
        }
    }
}

/// Parameters for the stateful hash-based signature family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HssParams {
    /// Merkle tree height; the key supports 2^tree_height one-time signatures
    pub tree_height: u8,
}

/// Maximum supported hash-tree height (2^10 = 1024 signing usages)
pub const MAX_HSS_TREE_HEIGHT: u8 = 10;

/// Structured identifier for a key-pair algorithm and its parameters
///
/// This is a closed set: the registry, the generator factory, and the
/// agreement engine all match exhaustively over these variants.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlgorithmSpec {
    /// X25519 Diffie-Hellman
    X25519,
    /// Ed25519 signatures
    Ed25519,
    /// ECDH/ECDSA over a named Weierstrass curve
    Ec(EcCurve),
    /// ML-KEM key encapsulation
    MlKem(MlKemLevel),
    /// Stateful hash-based one-time signatures over a Merkle tree
    Hss(HssParams),
    /// Composite of several component algorithms (e.g. classical/PQ hybrid)
    Composite(Vec<AlgorithmSpec>),
}

// Family bytes of the compact wire identifier. The identifier is carried in
// agreement messages and in logs; it must stay stable across releases.
const FAMILY_X25519: u8 = 0x01;
const FAMILY_ED25519: u8 = 0x02;
const FAMILY_EC: u8 = 0x03;
const FAMILY_ML_KEM: u8 = 0x04;
const FAMILY_HSS: u8 = 0x05;
const FAMILY_COMPOSITE: u8 = 0x06;

impl AlgorithmSpec {
    /// Returns a human-readable name for the spec
    pub fn name(&self) -> String {
        match self {
            AlgorithmSpec::X25519 => "X25519".to_string(),
            AlgorithmSpec::Ed25519 => "Ed25519".to_string(),
            AlgorithmSpec::Ec(curve) => format!("EC/{}", curve.as_str()),
            AlgorithmSpec::MlKem(level) => level.as_str().to_string(),
            AlgorithmSpec::Hss(params) => format!("HSS/h{}", params.tree_height),
            AlgorithmSpec::Composite(parts) => {
                let names: Vec<String> = parts.iter().map(|p| p.name()).collect();
                format!("Composite[{}]", names.join("+"))
            }
        }
    }

    /// Family discriminant byte of the wire identifier
    pub(crate) fn family_byte(&self) -> u8 {
        match self {
            AlgorithmSpec::X25519 => FAMILY_X25519,
            AlgorithmSpec::Ed25519 => FAMILY_ED25519,
            AlgorithmSpec::Ec(_) => FAMILY_EC,
            AlgorithmSpec::MlKem(_) => FAMILY_ML_KEM,
            AlgorithmSpec::Hss(_) => FAMILY_HSS,
            AlgorithmSpec::Composite(_) => FAMILY_COMPOSITE,
        }
    }

    /// Encodes the spec as its compact, deterministic wire identifier
    ///
    /// Layout: family byte followed by family-specific parameter bytes.
    /// Composite specs encode a component count and each component
    /// identifier prefixed with its one-byte length.
    pub fn wire_id(&self) -> Vec<u8> {
        match self {
            AlgorithmSpec::X25519 => vec![FAMILY_X25519],
            AlgorithmSpec::Ed25519 => vec![FAMILY_ED25519],
            AlgorithmSpec::Ec(curve) => {
                let param = match curve {
                    EcCurve::P256 => 0x01,
                    EcCurve::Secp256k1 => 0x02,
                };
                vec![FAMILY_EC, param]
            }
            AlgorithmSpec::MlKem(level) => {
                let param = match level {
                    MlKemLevel::MlKem512 => 0x01,
                    MlKemLevel::MlKem768 => 0x02,
                    MlKemLevel::MlKem1024 => 0x03,
                };
                vec![FAMILY_ML_KEM, param]
            }
            AlgorithmSpec::Hss(params) => vec![FAMILY_HSS, params.tree_height],
            AlgorithmSpec::Composite(parts) => {
                let mut id = vec![FAMILY_COMPOSITE, parts.len() as u8];
                for part in parts {
                    let part_id = part.wire_id();
                    id.push(part_id.len() as u8);
                    id.extend_from_slice(&part_id);
                }
                id
            }
        }
    }

    /// Decodes a wire identifier produced by [`wire_id`](Self::wire_id)
    ///
    /// The whole input must be consumed; trailing bytes are rejected.
    pub fn from_wire_id(bytes: &[u8]) -> Result<Self> {
        let (spec, used) = Self::parse_wire_id(bytes)?;
        if used != bytes.len() {
            return Err(Error::Encoding(
                "trailing bytes after algorithm identifier".to_string(),
            ));
        }
        Ok(spec)
    }

    fn parse_wire_id(bytes: &[u8]) -> Result<(Self, usize)> {
        let family = *bytes
            .first()
            .ok_or_else(|| Error::Encoding("empty algorithm identifier".to_string()))?;
        match family {
            FAMILY_X25519 => Ok((AlgorithmSpec::X25519, 1)),
            FAMILY_ED25519 => Ok((AlgorithmSpec::Ed25519, 1)),
            FAMILY_EC => {
                let curve = match bytes.get(1) {
                    Some(0x01) => EcCurve::P256,
                    Some(0x02) => EcCurve::Secp256k1,
                    Some(other) => {
                        return Err(Error::InvalidKeySpec(format!(
                            "unknown curve identifier: {:#04x}",
                            other
                        )))
                    }
                    None => {
                        return Err(Error::Encoding(
                            "truncated EC algorithm identifier".to_string(),
                        ))
                    }
                };
                Ok((AlgorithmSpec::Ec(curve), 2))
            }
            FAMILY_ML_KEM => {
                let level = match bytes.get(1) {
                    Some(0x01) => MlKemLevel::MlKem512,
                    Some(0x02) => MlKemLevel::MlKem768,
                    Some(0x03) => MlKemLevel::MlKem1024,
                    Some(other) => {
                        return Err(Error::InvalidKeySpec(format!(
                            "unknown ML-KEM level identifier: {:#04x}",
                            other
                        )))
                    }
                    None => {
                        return Err(Error::Encoding(
                            "truncated ML-KEM algorithm identifier".to_string(),
                        ))
                    }
                };
                Ok((AlgorithmSpec::MlKem(level), 2))
            }
            FAMILY_HSS => {
                let height = *bytes.get(1).ok_or_else(|| {
                    Error::Encoding("truncated HSS algorithm identifier".to_string())
                })?;
                Ok((AlgorithmSpec::Hss(HssParams { tree_height: height }), 2))
            }
            FAMILY_COMPOSITE => {
                let count = *bytes.get(1).ok_or_else(|| {
                    Error::Encoding("truncated composite algorithm identifier".to_string())
                })? as usize;
                let mut parts = Vec::with_capacity(count);
                let mut pos = 2;
                for _ in 0..count {
                    let part_len = *bytes.get(pos).ok_or_else(|| {
                        Error::Encoding("truncated composite component length".to_string())
                    })? as usize;
                    pos += 1;
                    let end = pos + part_len;
                    let part_bytes = bytes.get(pos..end).ok_or_else(|| {
                        Error::Encoding("truncated composite component identifier".to_string())
                    })?;
                    let (part, used) = Self::parse_wire_id(part_bytes)?;
                    if used != part_len {
                        return Err(Error::Encoding(
                            "composite component length mismatch".to_string(),
                        ));
                    }
                    parts.push(part);
                    pos = end;
                }
                Ok((AlgorithmSpec::Composite(parts), pos))
            }
            other => Err(Error::UnsupportedAlgorithm(format!(
                "unknown algorithm family byte: {:#04x}",
                other
            ))),
        }
    }
}
