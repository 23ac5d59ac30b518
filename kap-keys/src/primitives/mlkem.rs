//! ML-KEM (Kyber) key-encapsulation bindings
//!
//! Key material crosses this boundary as validated raw byte strings; the
//! pqcrypto types are rebuilt per operation.

use crate::error::{Error, Result};
use crate::spec::MlKemLevel;
use pqcrypto_kyber::{kyber1024, kyber512, kyber768};
use pqcrypto_traits::kem::{Ciphertext as _, PublicKey as _, SecretKey as _, SharedSecret as _};
use zeroize::Zeroizing;

/// Length of the encapsulated shared secret in bytes
pub const SHARED_SECRET_LEN: usize = 32;

/// Public key length for a parameter level
pub fn public_key_len(level: MlKemLevel) -> usize {
    match level {
        MlKemLevel::MlKem512 => kyber512::public_key_bytes(),
        MlKemLevel::MlKem768 => kyber768::public_key_bytes(),
        MlKemLevel::MlKem1024 => kyber1024::public_key_bytes(),
    }
}

/// Secret key length for a parameter level
pub fn secret_key_len(level: MlKemLevel) -> usize {
    match level {
        MlKemLevel::MlKem512 => kyber512::secret_key_bytes(),
        MlKemLevel::MlKem768 => kyber768::secret_key_bytes(),
        MlKemLevel::MlKem1024 => kyber1024::secret_key_bytes(),
    }
}

/// Ciphertext length for a parameter level
pub fn ciphertext_len(level: MlKemLevel) -> usize {
    match level {
        MlKemLevel::MlKem512 => kyber512::ciphertext_bytes(),
        MlKemLevel::MlKem768 => kyber768::ciphertext_bytes(),
        MlKemLevel::MlKem1024 => kyber1024::ciphertext_bytes(),
    }
}

/// Generate a fresh key pair, returned as (secret, public) raw bytes
pub fn generate(level: MlKemLevel) -> (Zeroizing<Vec<u8>>, Vec<u8>) {
    match level {
        MlKemLevel::MlKem512 => {
            let (pk, sk) = kyber512::keypair();
            (Zeroizing::new(sk.as_bytes().to_vec()), pk.as_bytes().to_vec())
        }
        MlKemLevel::MlKem768 => {
            let (pk, sk) = kyber768::keypair();
            (Zeroizing::new(sk.as_bytes().to_vec()), pk.as_bytes().to_vec())
        }
        MlKemLevel::MlKem1024 => {
            let (pk, sk) = kyber1024::keypair();
            (Zeroizing::new(sk.as_bytes().to_vec()), pk.as_bytes().to_vec())
        }
    }
}

/// Encapsulate a fresh shared secret under the peer's public key
///
/// Returns (ciphertext, shared secret).
pub fn encapsulate(level: MlKemLevel, public: &[u8]) -> Result<(Vec<u8>, Zeroizing<Vec<u8>>)> {
    match level {
        MlKemLevel::MlKem512 => {
            let pk = kyber512::PublicKey::from_bytes(public)
                .map_err(|e| Error::Encoding(format!("invalid ML-KEM-512 public key: {}", e)))?;
            let (ss, ct) = kyber512::encapsulate(&pk);
            Ok((ct.as_bytes().to_vec(), Zeroizing::new(ss.as_bytes().to_vec())))
        }
        MlKemLevel::MlKem768 => {
            let pk = kyber768::PublicKey::from_bytes(public)
                .map_err(|e| Error::Encoding(format!("invalid ML-KEM-768 public key: {}", e)))?;
            let (ss, ct) = kyber768::encapsulate(&pk);
            Ok((ct.as_bytes().to_vec(), Zeroizing::new(ss.as_bytes().to_vec())))
        }
        MlKemLevel::MlKem1024 => {
            let pk = kyber1024::PublicKey::from_bytes(public)
                .map_err(|e| Error::Encoding(format!("invalid ML-KEM-1024 public key: {}", e)))?;
            let (ss, ct) = kyber1024::encapsulate(&pk);
            Ok((ct.as_bytes().to_vec(), Zeroizing::new(ss.as_bytes().to_vec())))
        }
    }
}

/// Decapsulate a shared secret with the private key
pub fn decapsulate(
    level: MlKemLevel,
    secret: &[u8],
    ciphertext: &[u8],
) -> Result<Zeroizing<Vec<u8>>> {
    match level {
        MlKemLevel::MlKem512 => {
            let sk = kyber512::SecretKey::from_bytes(secret)
                .map_err(|e| Error::Encoding(format!("invalid ML-KEM-512 secret key: {}", e)))?;
            let ct = kyber512::Ciphertext::from_bytes(ciphertext)
                .map_err(|e| Error::Encoding(format!("invalid ML-KEM-512 ciphertext: {}", e)))?;
            let ss = kyber512::decapsulate(&ct, &sk);
            Ok(Zeroizing::new(ss.as_bytes().to_vec()))
        }
        MlKemLevel::MlKem768 => {
            let sk = kyber768::SecretKey::from_bytes(secret)
                .map_err(|e| Error::Encoding(format!("invalid ML-KEM-768 secret key: {}", e)))?;
            let ct = kyber768::Ciphertext::from_bytes(ciphertext)
                .map_err(|e| Error::Encoding(format!("invalid ML-KEM-768 ciphertext: {}", e)))?;
            let ss = kyber768::decapsulate(&ct, &sk);
            Ok(Zeroizing::new(ss.as_bytes().to_vec()))
        }
        MlKemLevel::MlKem1024 => {
            let sk = kyber1024::SecretKey::from_bytes(secret)
                .map_err(|e| Error::Encoding(format!("invalid ML-KEM-1024 secret key: {}", e)))?;
            let ct = kyber1024::Ciphertext::from_bytes(ciphertext)
                .map_err(|e| Error::Encoding(format!("invalid ML-KEM-1024 ciphertext: {}", e)))?;
            let ss = kyber1024::decapsulate(&ct, &sk);
            Ok(Zeroizing::new(ss.as_bytes().to_vec()))
        }
    }
}

/// Validate the length of an encoded public key
pub fn check_public_len(level: MlKemLevel, bytes: &[u8]) -> Result<()> {
    if bytes.len() != public_key_len(level) {
        return Err(Error::Encoding(format!(
            "{} public key must be {} bytes, got {}",
            level.as_str(),
            public_key_len(level),
            bytes.len()
        )));
    }
    Ok(())
}

/// Validate the length of an encoded secret key
pub fn check_secret_len(level: MlKemLevel, bytes: &[u8]) -> Result<()> {
    if bytes.len() != secret_key_len(level) {
        return Err(Error::Encoding(format!(
            "{} secret key must be {} bytes, got {}",
            level.as_str(),
            secret_key_len(level),
            bytes.len()
        )));
    }
    Ok(())
}
