//! Weierstrass curve bindings (P-256 and secp256k1)
//!
//! Provides ECDH agreement, ECDSA signatures, and the MQV combination for
//! the two supported named curves. Shared values are always the fixed-width
//! x-coordinate field element, never a stripped variable-length integer.

use crate::error::{Error, Result};
use p256::elliptic_curve::ops::Reduce;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::elliptic_curve::Group;
use rand::rngs::OsRng;
use zeroize::Zeroizing;

/// Uncompressed SEC1 point length for 256-bit curves
pub const POINT_LEN: usize = 65;

/// Scalar length for 256-bit curves
pub const SCALAR_LEN: usize = 32;

// --- P-256 ---

/// Generate a fresh P-256 key pair
pub fn generate_p256() -> (p256::SecretKey, p256::PublicKey) {
    let secret = p256::SecretKey::random(&mut OsRng);
    let public = secret.public_key();
    (secret, public)
}

/// Perform the P-256 ECDH agreement
pub fn agree_p256(secret: &p256::SecretKey, peer: &p256::PublicKey) -> Result<Zeroizing<Vec<u8>>> {
    let shared = p256::ecdh::diffie_hellman(secret.to_nonzero_scalar(), peer.as_affine());
    Ok(Zeroizing::new(shared.raw_secret_bytes().to_vec()))
}

/// Associate value function for MQV: (x mod 2^128) + 2^128
fn avf_p256(public: &p256::PublicKey) -> p256::Scalar {
    let point = public.to_encoded_point(false);
    let x = point.x().expect("uncompressed point has an x coordinate");
    let mut buf = [0u8; 32];
    buf[15] = 0x01;
    buf[16..].copy_from_slice(&x[16..]);
    <p256::Scalar as Reduce<p256::U256>>::reduce_bytes(&buf.into())
}

/// Perform the P-256 MQV combination
///
/// Both parties evaluate the same formula over their own (static, ephemeral)
/// private keys and the peer's (static, ephemeral) public keys, so the
/// output is independent of which side initiated.
pub fn agree_mqv_p256(
    static_secret: &p256::SecretKey,
    ephemeral_secret: &p256::SecretKey,
    own_ephemeral_public: &p256::PublicKey,
    peer_static_public: &p256::PublicKey,
    peer_ephemeral_public: &p256::PublicKey,
) -> Result<Zeroizing<Vec<u8>>> {
    let d_static = *static_secret.to_nonzero_scalar().as_ref();
    let d_ephemeral = *ephemeral_secret.to_nonzero_scalar().as_ref();

    let implicit = d_ephemeral + avf_p256(own_ephemeral_public) * d_static;
    let peer_point = peer_ephemeral_public.to_projective()
        + peer_static_public.to_projective() * avf_p256(peer_ephemeral_public);
    let shared_point = peer_point * implicit;

    if bool::from(shared_point.is_identity()) {
        return Err(Error::Cryptography(
            "MQV combination produced the identity point".to_string(),
        ));
    }
    let encoded = shared_point.to_affine().to_encoded_point(false);
    let x = encoded.x().expect("non-identity point has an x coordinate");
    Ok(Zeroizing::new(x.to_vec()))
}

/// Sign a message with ECDSA over P-256
pub fn sign_p256(secret: &p256::SecretKey, message: &[u8]) -> Result<Vec<u8>> {
    use p256::ecdsa::signature::Signer;
    let signing_key = p256::ecdsa::SigningKey::from_bytes(&secret.to_bytes())
        .map_err(|e| Error::Cryptography(format!("invalid P-256 signing key: {}", e)))?;
    let signature: p256::ecdsa::Signature = signing_key.sign(message);
    Ok(signature.to_bytes().to_vec())
}

/// Verify an ECDSA signature over P-256
pub fn verify_p256(public: &p256::PublicKey, message: &[u8], signature: &[u8]) -> Result<()> {
    use p256::ecdsa::signature::Verifier;
    let verifying_key =
        p256::ecdsa::VerifyingKey::from_sec1_bytes(public.to_encoded_point(false).as_bytes())
            .map_err(|e| Error::Cryptography(format!("invalid P-256 verifying key: {}", e)))?;
    let signature = p256::ecdsa::Signature::from_slice(signature)
        .map_err(|e| Error::Encoding(format!("malformed P-256 signature: {}", e)))?;
    verifying_key
        .verify(message, &signature)
        .map_err(|_| Error::Cryptography("P-256 signature verification failed".to_string()))
}

/// Decode a P-256 public key from its uncompressed SEC1 form
pub fn decode_public_p256(bytes: &[u8]) -> Result<p256::PublicKey> {
    p256::PublicKey::from_sec1_bytes(bytes)
        .map_err(|e| Error::Encoding(format!("invalid P-256 public key: {}", e)))
}

/// Decode a P-256 private key from its raw scalar form
pub fn decode_private_p256(bytes: &[u8]) -> Result<p256::SecretKey> {
    p256::SecretKey::from_slice(bytes)
        .map_err(|e| Error::Encoding(format!("invalid P-256 private key: {}", e)))
}

// --- secp256k1 ---

/// Generate a fresh secp256k1 key pair
pub fn generate_k256() -> (k256::SecretKey, k256::PublicKey) {
    let secret = k256::SecretKey::random(&mut OsRng);
    let public = secret.public_key();
    (secret, public)
}

/// Perform the secp256k1 ECDH agreement
pub fn agree_k256(secret: &k256::SecretKey, peer: &k256::PublicKey) -> Result<Zeroizing<Vec<u8>>> {
    let shared = k256::ecdh::diffie_hellman(secret.to_nonzero_scalar(), peer.as_affine());
    Ok(Zeroizing::new(shared.raw_secret_bytes().to_vec()))
}

/// Associate value function for MQV: (x mod 2^128) + 2^128
fn avf_k256(public: &k256::PublicKey) -> k256::Scalar {
    let point = public.to_encoded_point(false);
    let x = point.x().expect("uncompressed point has an x coordinate");
    let mut buf = [0u8; 32];
    buf[15] = 0x01;
    buf[16..].copy_from_slice(&x[16..]);
    <k256::Scalar as Reduce<k256::U256>>::reduce_bytes(&buf.into())
}

/// Perform the secp256k1 MQV combination
pub fn agree_mqv_k256(
    static_secret: &k256::SecretKey,
    ephemeral_secret: &k256::SecretKey,
    own_ephemeral_public: &k256::PublicKey,
    peer_static_public: &k256::PublicKey,
    peer_ephemeral_public: &k256::PublicKey,
) -> Result<Zeroizing<Vec<u8>>> {
    let d_static = *static_secret.to_nonzero_scalar().as_ref();
    let d_ephemeral = *ephemeral_secret.to_nonzero_scalar().as_ref();

    let implicit = d_ephemeral + avf_k256(own_ephemeral_public) * d_static;
    let peer_point = peer_ephemeral_public.to_projective()
        + peer_static_public.to_projective() * avf_k256(peer_ephemeral_public);
    let shared_point = peer_point * implicit;

    if bool::from(shared_point.is_identity()) {
        return Err(Error::Cryptography(
            "MQV combination produced the identity point".to_string(),
        ));
    }
    let encoded = shared_point.to_affine().to_encoded_point(false);
    let x = encoded.x().expect("non-identity point has an x coordinate");
    Ok(Zeroizing::new(x.to_vec()))
}

/// Sign a message with ECDSA over secp256k1
pub fn sign_k256(secret: &k256::SecretKey, message: &[u8]) -> Result<Vec<u8>> {
    use k256::ecdsa::signature::Signer;
    let signing_key = k256::ecdsa::SigningKey::from_bytes(&secret.to_bytes())
        .map_err(|e| Error::Cryptography(format!("invalid secp256k1 signing key: {}", e)))?;
    let signature: k256::ecdsa::Signature = signing_key.sign(message);
    Ok(signature.to_bytes().to_vec())
}

/// Verify an ECDSA signature over secp256k1
pub fn verify_k256(public: &k256::PublicKey, message: &[u8], signature: &[u8]) -> Result<()> {
    use k256::ecdsa::signature::Verifier;
    let verifying_key =
        k256::ecdsa::VerifyingKey::from_sec1_bytes(public.to_encoded_point(false).as_bytes())
            .map_err(|e| Error::Cryptography(format!("invalid secp256k1 verifying key: {}", e)))?;
    let signature = k256::ecdsa::Signature::from_slice(signature)
        .map_err(|e| Error::Encoding(format!("malformed secp256k1 signature: {}", e)))?;
    verifying_key
        .verify(message, &signature)
        .map_err(|_| Error::Cryptography("secp256k1 signature verification failed".to_string()))
}

/// Decode a secp256k1 public key from its uncompressed SEC1 form
pub fn decode_public_k256(bytes: &[u8]) -> Result<k256::PublicKey> {
    k256::PublicKey::from_sec1_bytes(bytes)
        .map_err(|e| Error::Encoding(format!("invalid secp256k1 public key: {}", e)))
}

/// Decode a secp256k1 private key from its raw scalar form
pub fn decode_private_k256(bytes: &[u8]) -> Result<k256::SecretKey> {
    k256::SecretKey::from_slice(bytes)
        .map_err(|e| Error::Encoding(format!("invalid secp256k1 private key: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_p256_agreement_is_symmetric() {
        let (a_priv, a_pub) = generate_p256();
        let (b_priv, b_pub) = generate_p256();

        let ab = agree_p256(&a_priv, &b_pub).unwrap();
        let ba = agree_p256(&b_priv, &a_pub).unwrap();
        assert_eq!(&*ab, &*ba);
        assert_eq!(ab.len(), 32);
    }

    #[test]
    fn test_k256_agreement_is_symmetric() {
        let (a_priv, a_pub) = generate_k256();
        let (b_priv, b_pub) = generate_k256();

        let ab = agree_k256(&a_priv, &b_pub).unwrap();
        let ba = agree_k256(&b_priv, &a_pub).unwrap();
        assert_eq!(&*ab, &*ba);
    }

    #[test]
    fn test_p256_mqv_both_sides_agree() {
        let (a_static, a_static_pub) = generate_p256();
        let (a_eph, a_eph_pub) = generate_p256();
        let (b_static, b_static_pub) = generate_p256();
        let (b_eph, b_eph_pub) = generate_p256();

        let za = agree_mqv_p256(&a_static, &a_eph, &a_eph_pub, &b_static_pub, &b_eph_pub).unwrap();
        let zb = agree_mqv_p256(&b_static, &b_eph, &b_eph_pub, &a_static_pub, &a_eph_pub).unwrap();
        assert_eq!(&*za, &*zb);
        assert_eq!(za.len(), 32);
    }

    #[test]
    fn test_k256_mqv_both_sides_agree() {
        let (a_static, a_static_pub) = generate_k256();
        let (a_eph, a_eph_pub) = generate_k256();
        let (b_static, b_static_pub) = generate_k256();
        let (b_eph, b_eph_pub) = generate_k256();

        let za = agree_mqv_k256(&a_static, &a_eph, &a_eph_pub, &b_static_pub, &b_eph_pub).unwrap();
        let zb = agree_mqv_k256(&b_static, &b_eph, &b_eph_pub, &a_static_pub, &a_eph_pub).unwrap();
        assert_eq!(&*za, &*zb);
    }

    #[test]
    fn test_mqv_differs_from_plain_ecdh() {
        let (a_static, _) = generate_p256();
        let (a_eph, a_eph_pub) = generate_p256();
        let (_, b_static_pub) = generate_p256();
        let (_, b_eph_pub) = generate_p256();

        let mqv =
            agree_mqv_p256(&a_static, &a_eph, &a_eph_pub, &b_static_pub, &b_eph_pub).unwrap();
        let plain = agree_p256(&a_static, &b_static_pub).unwrap();
        assert_ne!(&*mqv, &*plain);
    }

    #[test]
    fn test_p256_sign_verify_roundtrip() {
        let (secret, public) = generate_p256();
        let signature = sign_p256(&secret, b"kap transcript").unwrap();
        assert!(verify_p256(&public, b"kap transcript", &signature).is_ok());
        assert!(verify_p256(&public, b"other transcript", &signature).is_err());
    }

    #[test]
    fn test_k256_sign_verify_roundtrip() {
        let (secret, public) = generate_k256();
        let signature = sign_k256(&secret, b"kap transcript").unwrap();
        assert!(verify_k256(&public, b"kap transcript", &signature).is_ok());
        assert!(verify_k256(&public, b"other transcript", &signature).is_err());
    }

    #[test]
    fn test_public_key_sec1_roundtrip() {
        let (_, public) = generate_p256();
        let bytes = public.to_encoded_point(false);
        let decoded = decode_public_p256(bytes.as_bytes()).unwrap();
        assert_eq!(public, decoded);
    }
}
