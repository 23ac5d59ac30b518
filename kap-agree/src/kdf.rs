//! Key derivation for agreed values
//!
//! Every derived value passes through the KDF selected by the
//! [`AgreementSpec`](crate::spec::AgreementSpec) before it is exposed as
//! the session secret; `Raw` passes the agreed value through unchanged and
//! is only selectable where the spec permits it. Two derivation functions
//! are offered: the single-step Concat KDF per NIST SP 800-56A with
//! SHA-256, and HKDF-SHA256.

use crate::error::{Error, Result};
use hkdf::Hkdf;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

/// Maximum output length of one HKDF-SHA256 expansion
const MAX_OUTPUT_LEN: usize = 255 * 32;

/// Key-derivation function selection
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KdfSpec {
    /// Expose the unprocessed agreed value
    Raw,
    /// Concat KDF (NIST SP 800-56A single-step, SHA-256)
    ConcatKdfSha256 {
        /// Output length in bytes
        length: usize,
    },
    /// HKDF-SHA256 with empty salt
    HkdfSha256 {
        /// Output length in bytes
        length: usize,
    },
}

impl KdfSpec {
    /// True for the raw passthrough selection
    pub fn is_raw(&self) -> bool {
        matches!(self, KdfSpec::Raw)
    }

    /// Validate the requested output length
    pub fn validate(&self) -> Result<()> {
        let length = match self {
            KdfSpec::Raw => return Ok(()),
            KdfSpec::ConcatKdfSha256 { length } | KdfSpec::HkdfSha256 { length } => *length,
        };
        if length == 0 || length > MAX_OUTPUT_LEN {
            return Err(Error::Keys(kap_keys::Error::InvalidKeySpec(format!(
                "KDF output length must be in 1..={}, got {}",
                MAX_OUTPUT_LEN, length
            ))));
        }
        Ok(())
    }
}

/// Derive the session secret from a raw agreed value
///
/// `info` binds the derivation to the agreement variant and algorithm; both
/// parties must supply identical info bytes.
pub fn derive(kdf: &KdfSpec, shared: &[u8], info: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    kdf.validate()?;
    match kdf {
        KdfSpec::Raw => Ok(Zeroizing::new(shared.to_vec())),
        KdfSpec::ConcatKdfSha256 { length } => Ok(concat_kdf_sha256(shared, info, *length)),
        KdfSpec::HkdfSha256 { length } => {
            let hk = Hkdf::<Sha256>::new(None, shared);
            let mut okm = Zeroizing::new(vec![0u8; *length]);
            hk.expand(info, &mut okm)
                .map_err(|e| Error::Cryptography(format!("HKDF expansion failed: {}", e)))?;
            Ok(okm)
        }
    }
}

/// Concat KDF per NIST SP 800-56A Section 5.8.1 with SHA-256
///
/// OtherInfo is the length-prefixed info bytes followed by the output
/// length in bits as a big-endian u32.
///
/// DerivedKey = Hash(counter || Z || OtherInfo) for each round
fn concat_kdf_sha256(shared: &[u8], info: &[u8], length: usize) -> Zeroizing<Vec<u8>> {
    let mut other_info = Vec::with_capacity(info.len() + 8);
    other_info.extend_from_slice(&(info.len() as u32).to_be_bytes());
    other_info.extend_from_slice(info);
    other_info.extend_from_slice(&((length * 8) as u32).to_be_bytes());

    let hash_len = 32;
    let reps = (length + hash_len - 1) / hash_len;
    let mut derived = Zeroizing::new(Vec::with_capacity(reps * hash_len));
    for counter in 1..=reps {
        let mut hasher = Sha256::new();
        hasher.update((counter as u32).to_be_bytes());
        hasher.update(shared);
        hasher.update(&other_info);
        derived.extend_from_slice(&hasher.finalize());
    }
    derived.truncate(length);
    derived
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_concat_kdf_produces_requested_length() {
        let secret = [0x42u8; 32];
        for length in [16, 32, 48, 64] {
            let spec = KdfSpec::ConcatKdfSha256 { length };
            let derived = derive(&spec, &secret, b"info").unwrap();
            assert_eq!(derived.len(), length);
        }
    }

    #[test]
    fn test_hkdf_produces_requested_length() {
        let secret = [0x42u8; 32];
        let spec = KdfSpec::HkdfSha256 { length: 42 };
        let derived = derive(&spec, &secret, b"info").unwrap();
        assert_eq!(derived.len(), 42);
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let secret = [0x42u8; 32];
        for spec in [
            KdfSpec::ConcatKdfSha256 { length: 32 },
            KdfSpec::HkdfSha256 { length: 32 },
        ] {
            let first = derive(&spec, &secret, b"info").unwrap();
            let second = derive(&spec, &secret, b"info").unwrap();
            assert_eq!(&*first, &*second);
        }
    }

    #[test]
    fn test_info_separates_outputs() {
        let secret = [0x42u8; 32];
        let spec = KdfSpec::ConcatKdfSha256 { length: 32 };
        let first = derive(&spec, &secret, b"info-a").unwrap();
        let second = derive(&spec, &secret, b"info-b").unwrap();
        assert_ne!(&*first, &*second);
    }

    #[test]
    fn test_kdfs_differ_from_each_other() {
        let secret = [0x42u8; 32];
        let concat = derive(&KdfSpec::ConcatKdfSha256 { length: 32 }, &secret, b"i").unwrap();
        let hkdf = derive(&KdfSpec::HkdfSha256 { length: 32 }, &secret, b"i").unwrap();
        assert_ne!(&*concat, &*hkdf);
    }

    #[test]
    fn test_raw_passthrough() {
        let secret = [0x42u8; 32];
        let derived = derive(&KdfSpec::Raw, &secret, b"ignored").unwrap();
        assert_eq!(&*derived, &secret);
    }

    #[test]
    fn test_invalid_length_rejected() {
        let secret = [0x42u8; 32];
        assert_matches!(
            derive(&KdfSpec::ConcatKdfSha256 { length: 0 }, &secret, b""),
            Err(Error::Keys(kap_keys::Error::InvalidKeySpec(_)))
        );
        assert_matches!(
            derive(&KdfSpec::HkdfSha256 { length: 255 * 32 + 1 }, &secret, b""),
            Err(Error::Keys(kap_keys::Error::InvalidKeySpec(_)))
        );
    }
}
