//! X25519 Diffie-Hellman bindings

use crate::error::{Error, Result};
use rand::rngs::OsRng;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroizing;

/// Length of X25519 public and private keys in bytes
pub const KEY_LEN: usize = 32;

/// Generate a fresh X25519 key pair
pub fn generate() -> (StaticSecret, PublicKey) {
    let secret = StaticSecret::random_from_rng(OsRng);
    let public = PublicKey::from(&secret);
    (secret, public)
}

/// Derive the public key from a private key
pub fn public_from_private(secret: &StaticSecret) -> PublicKey {
    PublicKey::from(secret)
}

/// Perform the X25519 agreement
///
/// The all-zero output of a small-order peer point is rejected so a
/// malicious peer cannot force a predictable shared value.
pub fn agree(secret: &StaticSecret, peer: &PublicKey) -> Result<Zeroizing<Vec<u8>>> {
    let shared = secret.diffie_hellman(peer);
    if shared.as_bytes().iter().all(|&b| b == 0) {
        return Err(Error::Cryptography(
            "X25519 agreement produced the all-zero value".to_string(),
        ));
    }
    Ok(Zeroizing::new(shared.as_bytes().to_vec()))
}

/// Decode a public key from its raw 32-byte form
pub fn decode_public(bytes: &[u8]) -> Result<PublicKey> {
    let raw: [u8; KEY_LEN] = bytes.try_into().map_err(|_| {
        Error::Encoding(format!(
            "X25519 public key must be {} bytes, got {}",
            KEY_LEN,
            bytes.len()
        ))
    })?;
    Ok(PublicKey::from(raw))
}

/// Decode a private key from its raw 32-byte form
pub fn decode_private(bytes: &[u8]) -> Result<StaticSecret> {
    let raw: [u8; KEY_LEN] = bytes.try_into().map_err(|_| {
        Error::Encoding(format!(
            "X25519 private key must be {} bytes, got {}",
            KEY_LEN,
            bytes.len()
        ))
    })?;
    Ok(StaticSecret::from(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agreement_is_symmetric() {
        let (a_priv, a_pub) = generate();
        let (b_priv, b_pub) = generate();

        let ab = agree(&a_priv, &b_pub).unwrap();
        let ba = agree(&b_priv, &a_pub).unwrap();
        assert_eq!(&*ab, &*ba);
        assert_eq!(ab.len(), 32);
    }

    #[test]
    fn test_public_roundtrip() {
        let (_, public) = generate();
        let decoded = decode_public(public.as_bytes()).unwrap();
        assert_eq!(public, decoded);
    }

    #[test]
    fn test_decode_rejects_wrong_length() {
        assert!(decode_public(&[0u8; 31]).is_err());
        assert!(decode_private(&[0u8; 33]).is_err());
    }

    #[test]
    fn test_small_order_peer_rejected() {
        let (secret, _) = generate();
        // The identity point is small-order; the agreement output is all zero.
        let identity = PublicKey::from([0u8; 32]);
        assert!(agree(&secret, &identity).is_err());
    }
}
