//! Key-pair model for KAP
//!
//! Public and private keys are value objects over a closed set of
//! per-family material variants. The material owns the opaque handle of the
//! underlying primitive backend and is never exposed for independent
//! mutation; all algorithm dispatch happens by exhaustive matching.

use crate::error::{Error, Result};
use crate::primitives::{ec, ed25519, hss, mlkem, x25519};
use crate::spec::AlgorithmSpec;
use crate::stateful::{HssPrivateKey, HssPublicKey};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use std::fmt;
use zeroize::Zeroizing;

/// Public key material, tagged by algorithm family
#[derive(Debug, Clone, PartialEq)]
pub enum PublicKeyMaterial {
    /// X25519 point
    X25519(x25519_dalek::PublicKey),
    /// Ed25519 verifying key
    Ed25519(ed25519_dalek::VerifyingKey),
    /// P-256 point
    P256(p256::PublicKey),
    /// secp256k1 point
    Secp256k1(k256::PublicKey),
    /// ML-KEM public key bytes (length-validated)
    MlKem(Vec<u8>),
    /// HSS Merkle root
    Hss(HssPublicKey),
    /// Component public keys of a composite spec
    Composite(Vec<PublicKey>),
}

/// Private key material, tagged by algorithm family
pub enum PrivateKeyMaterial {
    /// X25519 scalar
    X25519(x25519_dalek::StaticSecret),
    /// Ed25519 signing key
    Ed25519(ed25519_dalek::SigningKey),
    /// P-256 scalar
    P256(p256::SecretKey),
    /// secp256k1 scalar
    Secp256k1(k256::SecretKey),
    /// ML-KEM secret key bytes (length-validated, zeroized on drop)
    MlKem(Zeroizing<Vec<u8>>),
    /// Stateful HSS signing key
    Hss(HssPrivateKey),
    /// Component private keys of a composite spec
    Composite(Vec<PrivateKey>),
}

/// A public key bound to its algorithm spec
#[derive(Debug, Clone, PartialEq)]
pub struct PublicKey {
    spec: AlgorithmSpec,
    material: PublicKeyMaterial,
}

impl PublicKey {
    /// Create a public key from spec and matching material
    pub fn new(spec: AlgorithmSpec, material: PublicKeyMaterial) -> Self {
        Self { spec, material }
    }

    /// The algorithm spec this key belongs to
    pub fn spec(&self) -> &AlgorithmSpec {
        &self.spec
    }

    /// The tagged key material
    pub fn material(&self) -> &PublicKeyMaterial {
        &self.material
    }

    /// Encode the key in its family-native raw form
    ///
    /// Composite keys encode each component prefixed with a two-byte
    /// big-endian length.
    pub fn raw_bytes(&self) -> Vec<u8> {
        match &self.material {
            PublicKeyMaterial::X25519(pk) => pk.as_bytes().to_vec(),
            PublicKeyMaterial::Ed25519(pk) => pk.to_bytes().to_vec(),
            PublicKeyMaterial::P256(pk) => pk.to_encoded_point(false).as_bytes().to_vec(),
            PublicKeyMaterial::Secp256k1(pk) => pk.to_encoded_point(false).as_bytes().to_vec(),
            PublicKeyMaterial::MlKem(bytes) => bytes.clone(),
            PublicKeyMaterial::Hss(pk) => pk.to_bytes(),
            PublicKeyMaterial::Composite(parts) => {
                let mut out = Vec::new();
                for part in parts {
                    let raw = part.raw_bytes();
                    out.extend_from_slice(&(raw.len() as u16).to_be_bytes());
                    out.extend_from_slice(&raw);
                }
                out
            }
        }
    }

    /// Decode a public key from its family-native raw form
    pub fn from_raw(spec: &AlgorithmSpec, bytes: &[u8]) -> Result<Self> {
        let material = match spec {
            AlgorithmSpec::X25519 => PublicKeyMaterial::X25519(x25519::decode_public(bytes)?),
            AlgorithmSpec::Ed25519 => PublicKeyMaterial::Ed25519(ed25519::decode_public(bytes)?),
            AlgorithmSpec::Ec(curve) => match curve {
                crate::spec::EcCurve::P256 => {
                    PublicKeyMaterial::P256(ec::decode_public_p256(bytes)?)
                }
                crate::spec::EcCurve::Secp256k1 => {
                    PublicKeyMaterial::Secp256k1(ec::decode_public_k256(bytes)?)
                }
            },
            AlgorithmSpec::MlKem(level) => {
                mlkem::check_public_len(*level, bytes)?;
                PublicKeyMaterial::MlKem(bytes.to_vec())
            }
            AlgorithmSpec::Hss(params) => {
                let public = HssPublicKey::from_bytes(bytes)?;
                if public.tree_height() != params.tree_height {
                    return Err(Error::Encoding(format!(
                        "HSS public key height {} does not match spec height {}",
                        public.tree_height(),
                        params.tree_height
                    )));
                }
                PublicKeyMaterial::Hss(public)
            }
            AlgorithmSpec::Composite(parts) => {
                let mut components = Vec::with_capacity(parts.len());
                let mut pos = 0;
                for part in parts {
                    let len_bytes = bytes.get(pos..pos + 2).ok_or_else(|| {
                        Error::Encoding("truncated composite public key".to_string())
                    })?;
                    let len = u16::from_be_bytes(len_bytes.try_into().expect("sliced 2 bytes"))
                        as usize;
                    pos += 2;
                    let raw = bytes.get(pos..pos + len).ok_or_else(|| {
                        Error::Encoding("truncated composite public key component".to_string())
                    })?;
                    components.push(PublicKey::from_raw(part, raw)?);
                    pos += len;
                }
                if pos != bytes.len() {
                    return Err(Error::Encoding(
                        "trailing bytes after composite public key".to_string(),
                    ));
                }
                PublicKeyMaterial::Composite(components)
            }
        };
        Ok(Self {
            spec: spec.clone(),
            material,
        })
    }

    /// Verify a signature made by the corresponding private key
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<()> {
        match &self.material {
            PublicKeyMaterial::Ed25519(pk) => ed25519::verify(pk, message, signature),
            PublicKeyMaterial::P256(pk) => ec::verify_p256(pk, message, signature),
            PublicKeyMaterial::Secp256k1(pk) => ec::verify_k256(pk, message, signature),
            PublicKeyMaterial::Hss(pk) => hss::verify(pk, message, signature),
            PublicKeyMaterial::X25519(_)
            | PublicKeyMaterial::MlKem(_)
            | PublicKeyMaterial::Composite(_) => Err(Error::UnsupportedAlgorithm(format!(
                "{} keys cannot verify signatures",
                self.spec.name()
            ))),
        }
    }
}

/// A private key bound to its algorithm spec
pub struct PrivateKey {
    spec: AlgorithmSpec,
    material: PrivateKeyMaterial,
}

impl PrivateKey {
    /// Create a private key from spec and matching material
    pub fn new(spec: AlgorithmSpec, material: PrivateKeyMaterial) -> Self {
        Self { spec, material }
    }

    /// The algorithm spec this key belongs to
    pub fn spec(&self) -> &AlgorithmSpec {
        &self.spec
    }

    /// The tagged key material
    pub fn material(&self) -> &PrivateKeyMaterial {
        &self.material
    }

    /// Mutable access to the material, required for stateful signing
    pub fn material_mut(&mut self) -> &mut PrivateKeyMaterial {
        &mut self.material
    }

    /// Derive the public key belonging to this private key
    ///
    /// ML-KEM secret keys do not expose their public half; pairing for that
    /// family is checked with an encapsulation round trip instead.
    pub fn derive_public(&self) -> Result<PublicKey> {
        let material = match &self.material {
            PrivateKeyMaterial::X25519(sk) => {
                PublicKeyMaterial::X25519(x25519::public_from_private(sk))
            }
            PrivateKeyMaterial::Ed25519(sk) => PublicKeyMaterial::Ed25519(sk.verifying_key()),
            PrivateKeyMaterial::P256(sk) => PublicKeyMaterial::P256(sk.public_key()),
            PrivateKeyMaterial::Secp256k1(sk) => PublicKeyMaterial::Secp256k1(sk.public_key()),
            PrivateKeyMaterial::Hss(sk) => PublicKeyMaterial::Hss(hss::public_from_private(sk)),
            PrivateKeyMaterial::MlKem(_) => {
                return Err(Error::UnsupportedAlgorithm(
                    "ML-KEM public keys cannot be derived from the secret key".to_string(),
                ))
            }
            PrivateKeyMaterial::Composite(parts) => {
                let mut components = Vec::with_capacity(parts.len());
                for part in parts {
                    components.push(part.derive_public()?);
                }
                PublicKeyMaterial::Composite(components)
            }
        };
        Ok(PublicKey {
            spec: self.spec.clone(),
            material,
        })
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("spec", &self.spec)
            .finish_non_exhaustive()
    }
}

/// An ownership pair of public and (optionally) private key
#[derive(Debug)]
pub struct KeyPair {
    public: PublicKey,
    private: Option<PrivateKey>,
}

impl KeyPair {
    /// Create a full key pair; the two halves must share one spec
    pub fn new(public: PublicKey, private: PrivateKey) -> Result<Self> {
        if public.spec() != private.spec() {
            return Err(Error::InvalidKeySpec(format!(
                "public key spec {} does not match private key spec {}",
                public.spec().name(),
                private.spec().name()
            )));
        }
        Ok(Self {
            public,
            private: Some(private),
        })
    }

    /// Create a public-only key pair
    pub fn public_only(public: PublicKey) -> Self {
        Self {
            public,
            private: None,
        }
    }

    /// The algorithm spec of this pair
    pub fn spec(&self) -> &AlgorithmSpec {
        self.public.spec()
    }

    /// The public half
    pub fn public(&self) -> &PublicKey {
        &self.public
    }

    /// The private half, when present
    pub fn private(&self) -> Option<&PrivateKey> {
        self.private.as_ref()
    }

    /// Mutable access to the private half, required for stateful signing
    pub fn private_mut(&mut self) -> Option<&mut PrivateKey> {
        self.private.as_mut()
    }

    /// Take ownership of the private half, leaving a public-only pair
    pub fn take_private(&mut self) -> Option<PrivateKey> {
        self.private.take()
    }

    /// Run the algorithm's pairing check
    ///
    /// Public-only pairs are trivially valid. For stateful keys this is a
    /// pure recomputation and never consumes a signing usage.
    pub fn is_valid(&self) -> bool {
        match &self.private {
            Some(private) => halves_match(&self.public, private),
            None => true,
        }
    }

    /// Sign a message with the private half
    ///
    /// Takes `&mut self` because stateful keys consume a signing usage.
    pub fn sign(&mut self, message: &[u8]) -> Result<Vec<u8>> {
        let private = self.private.as_mut().ok_or_else(|| {
            Error::Cryptography("public-only key pair cannot sign".to_string())
        })?;
        match &mut private.material {
            PrivateKeyMaterial::Ed25519(sk) => Ok(ed25519::sign(sk, message)),
            PrivateKeyMaterial::P256(sk) => ec::sign_p256(sk, message),
            PrivateKeyMaterial::Secp256k1(sk) => ec::sign_k256(sk, message),
            PrivateKeyMaterial::Hss(sk) => hss::sign(sk, message),
            PrivateKeyMaterial::X25519(_)
            | PrivateKeyMaterial::MlKem(_)
            | PrivateKeyMaterial::Composite(_) => Err(Error::UnsupportedAlgorithm(format!(
                "{} keys cannot sign",
                self.public.spec().name()
            ))),
        }
    }
}

// The pairing check, shared by full pairs and composite components.
// ML-KEM pairs prove possession with an encapsulation round trip; every
// other family re-derives the public key and compares encodings.
fn halves_match(public: &PublicKey, private: &PrivateKey) -> bool {
    match (&public.material, &private.material) {
        (PublicKeyMaterial::MlKem(pk), PrivateKeyMaterial::MlKem(sk)) => {
            let level = match public.spec() {
                AlgorithmSpec::MlKem(level) => *level,
                _ => return false,
            };
            match mlkem::encapsulate(level, pk) {
                Ok((ct, ss_enc)) => match mlkem::decapsulate(level, sk, &ct) {
                    Ok(ss_dec) => *ss_enc == *ss_dec,
                    Err(_) => false,
                },
                Err(_) => false,
            }
        }
        (PublicKeyMaterial::Composite(publics), PrivateKeyMaterial::Composite(privates)) => {
            publics.len() == privates.len()
                && publics
                    .iter()
                    .zip(privates.iter())
                    .all(|(pk, sk)| halves_match(pk, sk))
        }
        _ => match private.derive_public() {
            Ok(derived) => derived.raw_bytes() == public.raw_bytes(),
            Err(_) => false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{EcCurve, HssParams, MlKemLevel};

    #[test]
    fn test_x25519_pair_is_valid() {
        let (sk, pk) = x25519::generate();
        let pair = KeyPair::new(
            PublicKey::new(AlgorithmSpec::X25519, PublicKeyMaterial::X25519(pk)),
            PrivateKey::new(AlgorithmSpec::X25519, PrivateKeyMaterial::X25519(sk)),
        )
        .unwrap();
        assert!(pair.is_valid());
    }

    #[test]
    fn test_mismatched_x25519_pair_is_invalid() {
        let (_, pk) = x25519::generate();
        let (other_sk, _) = x25519::generate();
        let pair = KeyPair::new(
            PublicKey::new(AlgorithmSpec::X25519, PublicKeyMaterial::X25519(pk)),
            PrivateKey::new(AlgorithmSpec::X25519, PrivateKeyMaterial::X25519(other_sk)),
        )
        .unwrap();
        assert!(!pair.is_valid());
    }

    #[test]
    fn test_mlkem_pair_is_valid() {
        let (sk, pk) = mlkem::generate(MlKemLevel::MlKem512);
        let spec = AlgorithmSpec::MlKem(MlKemLevel::MlKem512);
        let pair = KeyPair::new(
            PublicKey::new(spec.clone(), PublicKeyMaterial::MlKem(pk)),
            PrivateKey::new(spec, PrivateKeyMaterial::MlKem(sk)),
        )
        .unwrap();
        assert!(pair.is_valid());
    }

    #[test]
    fn test_mismatched_mlkem_pair_is_invalid() {
        let (_, pk) = mlkem::generate(MlKemLevel::MlKem512);
        let (other_sk, _) = mlkem::generate(MlKemLevel::MlKem512);
        let spec = AlgorithmSpec::MlKem(MlKemLevel::MlKem512);
        let pair = KeyPair::new(
            PublicKey::new(spec.clone(), PublicKeyMaterial::MlKem(pk)),
            PrivateKey::new(spec, PrivateKeyMaterial::MlKem(other_sk)),
        )
        .unwrap();
        assert!(!pair.is_valid());
    }

    #[test]
    fn test_hss_validity_does_not_consume_usages() {
        let (sk, pk) = hss::generate(HssParams { tree_height: 2 }).unwrap();
        let spec = AlgorithmSpec::Hss(HssParams { tree_height: 2 });
        let pair = KeyPair::new(
            PublicKey::new(spec.clone(), PublicKeyMaterial::Hss(pk)),
            PrivateKey::new(spec, PrivateKeyMaterial::Hss(sk)),
        )
        .unwrap();

        let before = match pair.private().unwrap().material() {
            PrivateKeyMaterial::Hss(sk) => sk.remaining_usages(),
            _ => unreachable!(),
        };
        assert!(pair.is_valid());
        let after = match pair.private().unwrap().material() {
            PrivateKeyMaterial::Hss(sk) => sk.remaining_usages(),
            _ => unreachable!(),
        };
        assert_eq!(before, after);
    }

    #[test]
    fn test_hss_sign_consumes_usage() {
        let (sk, pk) = hss::generate(HssParams { tree_height: 2 }).unwrap();
        let spec = AlgorithmSpec::Hss(HssParams { tree_height: 2 });
        let mut pair = KeyPair::new(
            PublicKey::new(spec.clone(), PublicKeyMaterial::Hss(pk)),
            PrivateKey::new(spec, PrivateKeyMaterial::Hss(sk)),
        )
        .unwrap();

        let signature = pair.sign(b"stateful message").unwrap();
        assert!(pair.public().verify(b"stateful message", &signature).is_ok());
        let after = match pair.private().unwrap().material() {
            PrivateKeyMaterial::Hss(sk) => sk.next_index(),
            _ => unreachable!(),
        };
        assert_eq!(after, 1);
    }

    #[test]
    fn test_ec_public_raw_roundtrip() {
        let (_, pk) = ec::generate_p256();
        let public = PublicKey::new(
            AlgorithmSpec::Ec(EcCurve::P256),
            PublicKeyMaterial::P256(pk),
        );
        let decoded =
            PublicKey::from_raw(&AlgorithmSpec::Ec(EcCurve::P256), &public.raw_bytes()).unwrap();
        assert_eq!(public, decoded);
    }

    #[test]
    fn test_composite_public_raw_roundtrip() {
        let (_, x_pk) = x25519::generate();
        let (_, kem_pk) = mlkem::generate(MlKemLevel::MlKem768);
        let spec = AlgorithmSpec::Composite(vec![
            AlgorithmSpec::X25519,
            AlgorithmSpec::MlKem(MlKemLevel::MlKem768),
        ]);
        let public = PublicKey::new(
            spec.clone(),
            PublicKeyMaterial::Composite(vec![
                PublicKey::new(AlgorithmSpec::X25519, PublicKeyMaterial::X25519(x_pk)),
                PublicKey::new(
                    AlgorithmSpec::MlKem(MlKemLevel::MlKem768),
                    PublicKeyMaterial::MlKem(kem_pk),
                ),
            ]),
        );
        let decoded = PublicKey::from_raw(&spec, &public.raw_bytes()).unwrap();
        assert_eq!(public, decoded);
    }

    #[test]
    fn test_pair_spec_mismatch_rejected() {
        let (sk, _) = x25519::generate();
        let (_, ed_pk) = ed25519::generate();
        let result = KeyPair::new(
            PublicKey::new(AlgorithmSpec::Ed25519, PublicKeyMaterial::Ed25519(ed_pk)),
            PrivateKey::new(AlgorithmSpec::X25519, PrivateKeyMaterial::X25519(sk)),
        );
        assert!(result.is_err());
    }
}
