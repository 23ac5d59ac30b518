//! Agreement specifications
//!
//! An [`AgreementSpec`] identifies the handshake variant, the underlying
//! key-pair spec, the KDF selection, and whether the handshake ends with a
//! confirmation exchange. Specs are validated up front so a session can
//! assume a coherent variant/family combination.

use crate::error::{Error, Result};
use crate::kdf::KdfSpec;
use kap_keys::{registry, AlgorithmSpec};
use serde::{Deserialize, Serialize};

/// The six handshake variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgreementVariant {
    /// One-shot ephemeral-static agreement; only the initiator is fresh
    Anonymous,
    /// Static-static agreement with a liveness acknowledgement
    Basic,
    /// Basic agreement with a signed ServerHello
    Signed,
    /// Unified static + ephemeral agreement with forward secrecy
    Unified,
    /// MQV combination over static and ephemeral keys
    Mqv,
    /// One-shot key encapsulation against the responder's static key
    Kem,
}

impl AgreementVariant {
    /// Returns the variant name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            AgreementVariant::Anonymous => "anonymous",
            AgreementVariant::Basic => "basic",
            AgreementVariant::Signed => "signed",
            AgreementVariant::Unified => "unified",
            AgreementVariant::Mqv => "mqv",
            AgreementVariant::Kem => "kem",
        }
    }

    /// Stable byte used to bind the variant into the KDF info
    pub(crate) fn wire_byte(&self) -> u8 {
        match self {
            AgreementVariant::Anonymous => 0x01,
            AgreementVariant::Basic => 0x02,
            AgreementVariant::Signed => 0x03,
            AgreementVariant::Unified => 0x04,
            AgreementVariant::Mqv => 0x05,
            AgreementVariant::Kem => 0x06,
        }
    }
}

/// Specification of one agreement session
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgreementSpec {
    /// Handshake variant
    pub variant: AgreementVariant,
    /// Key-pair family the handshake runs over
    pub key_spec: AlgorithmSpec,
    /// KDF applied to the raw agreed value
    pub kdf: KdfSpec,
    /// Whether the handshake ends with a confirmation exchange
    pub confirmation: bool,
}

impl AgreementSpec {
    /// Create a spec without confirmation
    pub fn new(variant: AgreementVariant, key_spec: AlgorithmSpec, kdf: KdfSpec) -> Self {
        Self {
            variant,
            key_spec,
            kdf,
            confirmation: false,
        }
    }

    /// Enable the confirmation exchange (Unified and MQV only)
    pub fn with_confirmation(mut self) -> Self {
        self.confirmation = true;
        self
    }

    /// Validate variant/family/KDF coherence
    pub fn validate(&self) -> Result<()> {
        registry::validate(&self.key_spec)?;
        self.kdf.validate()?;
        check_variant_support(&self.key_spec, self.variant)?;

        // The raw agreed value may only be requested where the variant
        // explicitly permits it; the other variants mandate a real KDF.
        if self.kdf.is_raw()
            && !matches!(
                self.variant,
                AgreementVariant::Signed | AgreementVariant::Kem
            )
        {
            return Err(Error::Keys(kap_keys::Error::InvalidKeySpec(format!(
                "the {} variant requires a key-derivation function",
                self.variant.as_str()
            ))));
        }

        if self.confirmation
            && !matches!(
                self.variant,
                AgreementVariant::Unified | AgreementVariant::Mqv
            )
        {
            return Err(Error::Keys(kap_keys::Error::InvalidKeySpec(format!(
                "the {} variant has no confirmation exchange",
                self.variant.as_str()
            ))));
        }
        Ok(())
    }

    /// For hybrid composites, the (DH component, KEM component) indices
    pub(crate) fn hybrid_components(&self) -> Option<(usize, usize)> {
        let parts = match &self.key_spec {
            AlgorithmSpec::Composite(parts) => parts,
            _ => return None,
        };
        let dh = parts
            .iter()
            .position(|p| matches!(p, AlgorithmSpec::X25519 | AlgorithmSpec::Ec(_)))?;
        let kem = parts
            .iter()
            .position(|p| matches!(p, AlgorithmSpec::MlKem(_)))?;
        Some((dh, kem))
    }
}

fn check_variant_support(key_spec: &AlgorithmSpec, variant: AgreementVariant) -> Result<()> {
    let supported = match key_spec {
        AlgorithmSpec::X25519 => matches!(
            variant,
            AgreementVariant::Anonymous
                | AgreementVariant::Basic
                | AgreementVariant::Signed
                | AgreementVariant::Unified
        ),
        AlgorithmSpec::Ec(_) => matches!(
            variant,
            AgreementVariant::Anonymous
                | AgreementVariant::Basic
                | AgreementVariant::Signed
                | AgreementVariant::Unified
                | AgreementVariant::Mqv
        ),
        AlgorithmSpec::MlKem(_) => {
            matches!(variant, AgreementVariant::Anonymous | AgreementVariant::Kem)
        }
        AlgorithmSpec::Composite(parts) => {
            let hybrid = parts.len() == 2
                && parts
                    .iter()
                    .any(|p| matches!(p, AlgorithmSpec::X25519 | AlgorithmSpec::Ec(_)))
                && parts.iter().any(|p| matches!(p, AlgorithmSpec::MlKem(_)));
            hybrid && matches!(variant, AgreementVariant::Anonymous | AgreementVariant::Kem)
        }
        AlgorithmSpec::Ed25519 | AlgorithmSpec::Hss(_) => false,
    };
    if !supported {
        return Err(Error::Keys(kap_keys::Error::UnsupportedAlgorithm(format!(
            "{} does not support the {} agreement variant",
            key_spec.name(),
            variant.as_str()
        ))));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use kap_keys::{EcCurve, HssParams, MlKemLevel};

    fn kdf() -> KdfSpec {
        KdfSpec::HkdfSha256 { length: 32 }
    }

    #[test]
    fn test_ec_supports_all_dh_variants() {
        for variant in [
            AgreementVariant::Anonymous,
            AgreementVariant::Basic,
            AgreementVariant::Signed,
            AgreementVariant::Unified,
            AgreementVariant::Mqv,
        ] {
            let spec = AgreementSpec::new(variant, AlgorithmSpec::Ec(EcCurve::P256), kdf());
            assert!(spec.validate().is_ok(), "{:?} rejected", variant);
        }
    }

    #[test]
    fn test_x25519_rejects_mqv() {
        let spec = AgreementSpec::new(AgreementVariant::Mqv, AlgorithmSpec::X25519, kdf());
        assert_matches!(
            spec.validate(),
            Err(Error::Keys(kap_keys::Error::UnsupportedAlgorithm(_)))
        );
    }

    #[test]
    fn test_signing_families_reject_agreement() {
        for key_spec in [
            AlgorithmSpec::Ed25519,
            AlgorithmSpec::Hss(HssParams { tree_height: 2 }),
        ] {
            let spec = AgreementSpec::new(AgreementVariant::Basic, key_spec, kdf());
            assert_matches!(
                spec.validate(),
                Err(Error::Keys(kap_keys::Error::UnsupportedAlgorithm(_)))
            );
        }
    }

    #[test]
    fn test_kem_family_supports_one_shot_variants_only() {
        let key_spec = AlgorithmSpec::MlKem(MlKemLevel::MlKem768);
        assert!(AgreementSpec::new(AgreementVariant::Kem, key_spec.clone(), kdf())
            .validate()
            .is_ok());
        assert!(
            AgreementSpec::new(AgreementVariant::Anonymous, key_spec.clone(), kdf())
                .validate()
                .is_ok()
        );
        assert_matches!(
            AgreementSpec::new(AgreementVariant::Basic, key_spec, kdf()).validate(),
            Err(Error::Keys(kap_keys::Error::UnsupportedAlgorithm(_)))
        );
    }

    #[test]
    fn test_raw_kdf_only_where_permitted() {
        let raw_basic = AgreementSpec::new(
            AgreementVariant::Basic,
            AlgorithmSpec::Ec(EcCurve::P256),
            KdfSpec::Raw,
        );
        assert_matches!(
            raw_basic.validate(),
            Err(Error::Keys(kap_keys::Error::InvalidKeySpec(_)))
        );

        let raw_kem = AgreementSpec::new(
            AgreementVariant::Kem,
            AlgorithmSpec::MlKem(MlKemLevel::MlKem768),
            KdfSpec::Raw,
        );
        assert!(raw_kem.validate().is_ok());
    }

    #[test]
    fn test_confirmation_only_for_two_key_variants() {
        let confirmed_unified = AgreementSpec::new(
            AgreementVariant::Unified,
            AlgorithmSpec::Ec(EcCurve::P256),
            kdf(),
        )
        .with_confirmation();
        assert!(confirmed_unified.validate().is_ok());

        let confirmed_basic = AgreementSpec::new(
            AgreementVariant::Basic,
            AlgorithmSpec::Ec(EcCurve::P256),
            kdf(),
        )
        .with_confirmation();
        assert_matches!(
            confirmed_basic.validate(),
            Err(Error::Keys(kap_keys::Error::InvalidKeySpec(_)))
        );
    }

    #[test]
    fn test_hybrid_composite_validates() {
        let spec = AgreementSpec::new(
            AgreementVariant::Kem,
            AlgorithmSpec::Composite(vec![
                AlgorithmSpec::X25519,
                AlgorithmSpec::MlKem(MlKemLevel::MlKem768),
            ]),
            kdf(),
        );
        assert!(spec.validate().is_ok());
        assert_eq!(spec.hybrid_components(), Some((0, 1)));
    }

    #[test]
    fn test_spec_serde_roundtrip() {
        let spec = AgreementSpec::new(
            AgreementVariant::Mqv,
            AlgorithmSpec::Ec(EcCurve::Secp256k1),
            KdfSpec::ConcatKdfSha256 { length: 32 },
        )
        .with_confirmation();
        let json = serde_json::to_string(&spec).unwrap();
        let back: AgreementSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(spec, back);
    }
}
