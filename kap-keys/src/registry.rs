//! Algorithm registry for KAP
//!
//! The registry answers, for a given [`AlgorithmSpec`], whether the spec is
//! supported, which capabilities the family offers, and the structural
//! parameters needed to drive the primitive backends. It holds static
//! tables only; caching of generator objects is the factory's job.

use crate::error::{Error, Result};
use crate::spec::{AlgorithmSpec, MAX_HSS_TREE_HEIGHT};
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Static description of an algorithm family
#[derive(Debug, Clone, Copy)]
pub struct AlgorithmDescriptor {
    /// Family name used in logs and error messages
    pub name: &'static str,
    /// Supports two-party Diffie-Hellman agreement
    pub supports_agreement: bool,
    /// Supports the unified (static + ephemeral) combination
    pub supports_unified: bool,
    /// Supports the MQV combination
    pub supports_mqv: bool,
    /// Supports key encapsulation (KEM)
    pub supports_kem: bool,
    /// Supports signing
    pub supports_signing: bool,
    /// Private keys carry a limited, tracked number of signing usages
    pub stateful: bool,
    /// Fixed width of the raw agreed value, where applicable
    pub shared_value_len: Option<usize>,
}

static DESCRIPTORS: Lazy<HashMap<u8, AlgorithmDescriptor>> = Lazy::new(|| {
    let mut table = HashMap::new();
    table.insert(
        AlgorithmSpec::X25519.family_byte(),
        AlgorithmDescriptor {
            name: "X25519",
            supports_agreement: true,
            supports_unified: true,
            supports_mqv: false,
            supports_kem: false,
            supports_signing: false,
            stateful: false,
            shared_value_len: Some(32),
        },
    );
    table.insert(
        AlgorithmSpec::Ed25519.family_byte(),
        AlgorithmDescriptor {
            name: "Ed25519",
            supports_agreement: false,
            supports_unified: false,
            supports_mqv: false,
            supports_kem: false,
            supports_signing: true,
            stateful: false,
            shared_value_len: None,
        },
    );
    table.insert(
        AlgorithmSpec::Ec(crate::spec::EcCurve::P256).family_byte(),
        AlgorithmDescriptor {
            name: "EC",
            supports_agreement: true,
            supports_unified: true,
            supports_mqv: true,
            supports_kem: false,
            supports_signing: true,
            stateful: false,
            shared_value_len: Some(32),
        },
    );
    table.insert(
        AlgorithmSpec::MlKem(crate::spec::MlKemLevel::MlKem768).family_byte(),
        AlgorithmDescriptor {
            name: "ML-KEM",
            supports_agreement: false,
            supports_unified: false,
            supports_mqv: false,
            supports_kem: true,
            supports_signing: false,
            stateful: false,
            shared_value_len: Some(32),
        },
    );
    table.insert(
        AlgorithmSpec::Hss(crate::spec::HssParams { tree_height: 1 }).family_byte(),
        AlgorithmDescriptor {
            name: "HSS",
            supports_agreement: false,
            supports_unified: false,
            supports_mqv: false,
            supports_kem: false,
            supports_signing: true,
            stateful: true,
            shared_value_len: None,
        },
    );
    table
});

/// Looks up the static descriptor for a non-composite spec
///
/// Composite specs have no single descriptor; callers split them into
/// components first.
pub fn descriptor(spec: &AlgorithmSpec) -> Result<&'static AlgorithmDescriptor> {
    if matches!(spec, AlgorithmSpec::Composite(_)) {
        return Err(Error::UnsupportedAlgorithm(
            "composite specs have no single family descriptor".to_string(),
        ));
    }
    DESCRIPTORS.get(&spec.family_byte()).ok_or_else(|| {
        Error::UnsupportedAlgorithm(format!("no descriptor for {}", spec.name()))
    })
}

/// Validates the structure of a spec
///
/// Unknown families fail with [`Error::UnsupportedAlgorithm`]; resolvable
/// families with malformed parameters fail with [`Error::InvalidKeySpec`].
pub fn validate(spec: &AlgorithmSpec) -> Result<()> {
    match spec {
        AlgorithmSpec::X25519
        | AlgorithmSpec::Ed25519
        | AlgorithmSpec::Ec(_)
        | AlgorithmSpec::MlKem(_) => Ok(()),
        AlgorithmSpec::Hss(params) => {
            if params.tree_height == 0 || params.tree_height > MAX_HSS_TREE_HEIGHT {
                return Err(Error::InvalidKeySpec(format!(
                    "HSS tree height must be in 1..={}, got {}",
                    MAX_HSS_TREE_HEIGHT, params.tree_height
                )));
            }
            Ok(())
        }
        AlgorithmSpec::Composite(parts) => {
            if parts.is_empty() {
                return Err(Error::InvalidKeySpec(
                    "composite spec has no components".to_string(),
                ));
            }
            for part in parts {
                if matches!(part, AlgorithmSpec::Composite(_)) {
                    return Err(Error::InvalidKeySpec(
                        "composite specs cannot be nested".to_string(),
                    ));
                }
                validate(part)?;
            }
            let mut families: Vec<u8> = parts.iter().map(|p| p.family_byte()).collect();
            families.sort_unstable();
            families.dedup();
            if families.len() != parts.len() {
                return Err(Error::InvalidKeySpec(
                    "composite spec repeats an algorithm family".to_string(),
                ));
            }
            Ok(())
        }
    }
}

/// Returns true when the spec is structurally valid and supported
pub fn is_supported(spec: &AlgorithmSpec) -> bool {
    validate(spec).is_ok()
}
