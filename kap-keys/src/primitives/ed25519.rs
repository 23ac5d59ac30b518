//! Ed25519 signature bindings

use crate::error::{Error, Result};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;

/// Length of Ed25519 public keys and private seeds in bytes
pub const KEY_LEN: usize = 32;

/// Generate a fresh Ed25519 key pair
pub fn generate() -> (SigningKey, VerifyingKey) {
    let mut csprng = OsRng;
    let signing_key = SigningKey::generate(&mut csprng);
    let verifying_key = signing_key.verifying_key();
    (signing_key, verifying_key)
}

/// Sign a message
pub fn sign(signing_key: &SigningKey, message: &[u8]) -> Vec<u8> {
    signing_key.sign(message).to_bytes().to_vec()
}

/// Verify a signature
pub fn verify(verifying_key: &VerifyingKey, message: &[u8], signature: &[u8]) -> Result<()> {
    let signature = Signature::from_slice(signature)
        .map_err(|e| Error::Encoding(format!("malformed Ed25519 signature: {}", e)))?;
    verifying_key
        .verify(message, &signature)
        .map_err(|_| Error::Cryptography("Ed25519 signature verification failed".to_string()))
}

/// Decode a public key from its raw 32-byte form
pub fn decode_public(bytes: &[u8]) -> Result<VerifyingKey> {
    let raw: [u8; KEY_LEN] = bytes.try_into().map_err(|_| {
        Error::Encoding(format!(
            "Ed25519 public key must be {} bytes, got {}",
            KEY_LEN,
            bytes.len()
        ))
    })?;
    VerifyingKey::from_bytes(&raw)
        .map_err(|e| Error::Encoding(format!("invalid Ed25519 public key: {}", e)))
}

/// Decode a private key from its raw 32-byte seed
pub fn decode_private(bytes: &[u8]) -> Result<SigningKey> {
    let raw: [u8; KEY_LEN] = bytes.try_into().map_err(|_| {
        Error::Encoding(format!(
            "Ed25519 private key must be {} bytes, got {}",
            KEY_LEN,
            bytes.len()
        ))
    })?;
    Ok(SigningKey::from_bytes(&raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_verify_roundtrip() {
        let (signing, verifying) = generate();
        let signature = sign(&signing, b"kap test message");
        assert!(verify(&verifying, b"kap test message", &signature).is_ok());
    }

    #[test]
    fn test_verify_rejects_wrong_message() {
        let (signing, verifying) = generate();
        let signature = sign(&signing, b"message one");
        assert!(verify(&verifying, b"message two", &signature).is_err());
    }

    #[test]
    fn test_verify_rejects_wrong_key() {
        let (signing, _) = generate();
        let (_, other_verifying) = generate();
        let signature = sign(&signing, b"message");
        assert!(verify(&other_verifying, b"message", &signature).is_err());
    }

    #[test]
    fn test_private_roundtrip_preserves_public() {
        let (signing, verifying) = generate();
        let decoded = decode_private(&signing.to_bytes()).unwrap();
        assert_eq!(decoded.verifying_key(), verifying);
    }
}
