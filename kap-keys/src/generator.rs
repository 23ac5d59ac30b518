//! Per-algorithm key-pair generators
//!
//! A [`KeyPairGenerator`] is bound to one [`AlgorithmSpec`] and produces,
//! encodes, and reconstructs key pairs for it. Generators are created and
//! cached by the [`KeyPairFactory`](crate::factory::KeyPairFactory);
//! composite generators are assembled from cached component generators.

use crate::encoding;
use crate::error::{Error, Result};
use crate::keypair::{KeyPair, PrivateKey, PrivateKeyMaterial, PublicKey, PublicKeyMaterial};
use crate::primitives::{ec, ed25519, hss, mlkem, x25519};
use crate::spec::{AlgorithmSpec, EcCurve};
use std::sync::Arc;
use tracing::debug;

/// Generator for key pairs of a single algorithm spec
#[derive(Debug)]
pub struct KeyPairGenerator {
    spec: AlgorithmSpec,
    components: Vec<Arc<KeyPairGenerator>>,
}

impl KeyPairGenerator {
    /// Create a generator for a validated non-composite spec
    pub(crate) fn new(spec: AlgorithmSpec) -> Self {
        Self {
            spec,
            components: Vec::new(),
        }
    }

    /// Create a composite generator over cached component generators
    pub(crate) fn composite(spec: AlgorithmSpec, components: Vec<Arc<KeyPairGenerator>>) -> Self {
        Self { spec, components }
    }

    /// The algorithm spec this generator serves
    pub fn spec(&self) -> &AlgorithmSpec {
        &self.spec
    }

    /// Generate a fresh random key pair
    pub fn generate_key_pair(&self) -> Result<KeyPair> {
        debug!(target: "kap::keys", spec = %self.spec.name(), "generating key pair");
        let (public, private) = match &self.spec {
            AlgorithmSpec::X25519 => {
                let (sk, pk) = x25519::generate();
                (
                    PublicKeyMaterial::X25519(pk),
                    PrivateKeyMaterial::X25519(sk),
                )
            }
            AlgorithmSpec::Ed25519 => {
                let (sk, pk) = ed25519::generate();
                (
                    PublicKeyMaterial::Ed25519(pk),
                    PrivateKeyMaterial::Ed25519(sk),
                )
            }
            AlgorithmSpec::Ec(EcCurve::P256) => {
                let (sk, pk) = ec::generate_p256();
                (PublicKeyMaterial::P256(pk), PrivateKeyMaterial::P256(sk))
            }
            AlgorithmSpec::Ec(EcCurve::Secp256k1) => {
                let (sk, pk) = ec::generate_k256();
                (
                    PublicKeyMaterial::Secp256k1(pk),
                    PrivateKeyMaterial::Secp256k1(sk),
                )
            }
            AlgorithmSpec::MlKem(level) => {
                let (sk, pk) = mlkem::generate(*level);
                (PublicKeyMaterial::MlKem(pk), PrivateKeyMaterial::MlKem(sk))
            }
            AlgorithmSpec::Hss(params) => {
                let (sk, pk) = hss::generate(*params)?;
                (PublicKeyMaterial::Hss(pk), PrivateKeyMaterial::Hss(sk))
            }
            AlgorithmSpec::Composite(_) => {
                let mut publics = Vec::with_capacity(self.components.len());
                let mut privates = Vec::with_capacity(self.components.len());
                for component in &self.components {
                    let mut pair = component.generate_key_pair()?;
                    let private = pair.take_private().ok_or_else(|| {
                        Error::Cryptography(
                            "component generator produced a public-only pair".to_string(),
                        )
                    })?;
                    publics.push(pair.public().clone());
                    privates.push(private);
                }
                (
                    PublicKeyMaterial::Composite(publics),
                    PrivateKeyMaterial::Composite(privates),
                )
            }
        };
        KeyPair::new(
            PublicKey::new(self.spec.clone(), public),
            PrivateKey::new(self.spec.clone(), private),
        )
    }

    /// Encode the public half as X.509 SubjectPublicKeyInfo
    pub fn spki_encoding(&self, pair: &KeyPair) -> Result<Vec<u8>> {
        self.check_pair_spec(pair)?;
        encoding::encode_spki(pair.public())
    }

    /// Encode the private half as PKCS#8 PrivateKeyInfo
    pub fn pkcs8_encoding(&self, pair: &KeyPair) -> Result<Vec<u8>> {
        self.check_pair_spec(pair)?;
        let private = pair.private().ok_or_else(|| {
            Error::Cryptography("public-only key pair has no PKCS#8 encoding".to_string())
        })?;
        encoding::encode_pkcs8(private)
    }

    /// Reconstruct a key pair from its two standard encodings
    ///
    /// The pairing check always runs before the pair is returned; a
    /// mismatched pair fails with [`Error::KeyMismatch`]. Stateful keys are
    /// reconstructed a second time after validation so the returned usage
    /// counter cannot have been advanced by the validation pass.
    pub fn derive_key_pair(&self, spki: &[u8], pkcs8: &[u8]) -> Result<KeyPair> {
        let public = encoding::decode_spki(&self.spec, spki)?;
        let private = encoding::decode_pkcs8(&self.spec, pkcs8)?;

        let candidate = KeyPair::new(public.clone(), private)?;
        if !candidate.is_valid() {
            debug!(target: "kap::keys", spec = %self.spec.name(), "derived pair failed pairing check");
            return Err(Error::KeyMismatch);
        }

        if spec_is_stateful(&self.spec) {
            drop(candidate);
            let fresh = encoding::decode_pkcs8(&self.spec, pkcs8)?;
            return KeyPair::new(public, fresh);
        }
        Ok(candidate)
    }

    /// Reconstruct a public-only key pair from its X.509 encoding
    pub fn derive_public_key_pair(&self, spki: &[u8]) -> Result<KeyPair> {
        let public = encoding::decode_spki(&self.spec, spki)?;
        Ok(KeyPair::public_only(public))
    }

    fn check_pair_spec(&self, pair: &KeyPair) -> Result<()> {
        if pair.spec() != &self.spec {
            return Err(Error::InvalidKeySpec(format!(
                "key pair spec {} does not match generator spec {}",
                pair.spec().name(),
                self.spec.name()
            )));
        }
        Ok(())
    }
}

/// True when the spec (or any composite component) signs statefully
fn spec_is_stateful(spec: &AlgorithmSpec) -> bool {
    match spec {
        AlgorithmSpec::Hss(_) => true,
        AlgorithmSpec::Composite(parts) => parts.iter().any(spec_is_stateful),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{HssParams, MlKemLevel};
    use assert_matches::assert_matches;

    fn generator(spec: AlgorithmSpec) -> KeyPairGenerator {
        crate::registry::validate(&spec).unwrap();
        KeyPairGenerator::new(spec)
    }

    #[test]
    fn test_generate_encode_derive_roundtrip() {
        for spec in [
            AlgorithmSpec::X25519,
            AlgorithmSpec::Ed25519,
            AlgorithmSpec::Ec(EcCurve::P256),
            AlgorithmSpec::Ec(EcCurve::Secp256k1),
            AlgorithmSpec::MlKem(MlKemLevel::MlKem512),
            AlgorithmSpec::Hss(HssParams { tree_height: 2 }),
        ] {
            let generator = generator(spec.clone());
            let pair = generator.generate_key_pair().unwrap();
            let spki = generator.spki_encoding(&pair).unwrap();
            let pkcs8 = generator.pkcs8_encoding(&pair).unwrap();

            let derived = generator.derive_key_pair(&spki, &pkcs8).unwrap();
            assert!(derived.is_valid(), "derived pair invalid for {}", spec.name());
            assert_eq!(derived.public().raw_bytes(), pair.public().raw_bytes());
        }
    }

    #[test]
    fn test_derive_rejects_mismatched_halves() {
        let generator = generator(AlgorithmSpec::X25519);
        let pair_a = generator.generate_key_pair().unwrap();
        let pair_b = generator.generate_key_pair().unwrap();

        let spki_a = generator.spki_encoding(&pair_a).unwrap();
        let pkcs8_b = generator.pkcs8_encoding(&pair_b).unwrap();
        assert_matches!(
            generator.derive_key_pair(&spki_a, &pkcs8_b),
            Err(Error::KeyMismatch)
        );
    }

    #[test]
    fn test_derive_public_only() {
        let generator = generator(AlgorithmSpec::Ec(EcCurve::P256));
        let pair = generator.generate_key_pair().unwrap();
        let spki = generator.spki_encoding(&pair).unwrap();

        let public_only = generator.derive_public_key_pair(&spki).unwrap();
        assert!(public_only.private().is_none());
        assert!(public_only.is_valid());
        assert_eq!(public_only.public().raw_bytes(), pair.public().raw_bytes());
    }

    #[test]
    fn test_derive_preserves_stateful_usage_counter() {
        let spec = AlgorithmSpec::Hss(HssParams { tree_height: 2 });
        let generator = generator(spec.clone());
        let mut pair = generator.generate_key_pair().unwrap();

        // Consume one usage before encoding so the range is mid-life.
        pair.sign(b"first message").unwrap();
        let spki = generator.spki_encoding(&pair).unwrap();
        let pkcs8 = generator.pkcs8_encoding(&pair).unwrap();

        let derived = generator.derive_key_pair(&spki, &pkcs8).unwrap();
        let (next, remaining) = match derived.private().unwrap().material() {
            PrivateKeyMaterial::Hss(sk) => (sk.next_index(), sk.remaining_usages()),
            _ => unreachable!(),
        };
        assert_eq!(next, 1);
        assert_eq!(remaining, 3);

        // An actual signature moves the counter; validation did not.
        let mut derived = derived;
        derived.sign(b"second message").unwrap();
        let next_after_sign = match derived.private().unwrap().material() {
            PrivateKeyMaterial::Hss(sk) => sk.next_index(),
            _ => unreachable!(),
        };
        assert_eq!(next_after_sign, 2);
    }

    #[test]
    fn test_public_only_pair_has_no_pkcs8() {
        let generator = generator(AlgorithmSpec::X25519);
        let pair = generator.generate_key_pair().unwrap();
        let spki = generator.spki_encoding(&pair).unwrap();
        let public_only = generator.derive_public_key_pair(&spki).unwrap();
        assert!(generator.pkcs8_encoding(&public_only).is_err());
    }
}
