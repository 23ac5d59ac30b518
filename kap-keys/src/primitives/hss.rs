//! Hash-based one-time signatures over a Merkle tree
//!
//! Each leaf is a Lamport one-time key derived deterministically from the
//! private seed; the public key is the domain-separated Merkle root over
//! all leaf key digests. A signature reveals, per digest bit, one secret
//! preimage and the hash of its unrevealed sibling, plus the Merkle
//! authentication path for the leaf. Everything is recomputed from the seed
//! on demand, so signing keys stay 49 bytes regardless of tree height.

use crate::error::{Error, Result};
use crate::spec::HssParams;
use crate::stateful::{HssPrivateKey, HssPublicKey};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Digest width in bits; one Lamport secret pair per bit
const DIGEST_BITS: usize = 256;

/// Domain separator for leaf digests
const DOMAIN_LEAF: u8 = 0x01;

/// Domain separator for internal tree nodes
const DOMAIN_NODE: u8 = 0x02;

/// Signature length for a given tree height
pub fn signature_len(tree_height: u8) -> usize {
    8 + DIGEST_BITS * 64 + tree_height as usize * 32
}

fn leaf_secret(seed: &[u8; 32], leaf: u64, position: u16, bit: u8) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(b"KAP-HSS-SK");
    hasher.update(seed);
    hasher.update(leaf.to_be_bytes());
    hasher.update(position.to_be_bytes());
    hasher.update([bit]);
    hasher.finalize().into()
}

fn leaf_digest(seed: &[u8; 32], leaf: u64) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update([DOMAIN_LEAF]);
    for position in 0..DIGEST_BITS as u16 {
        for bit in 0..2u8 {
            let public: [u8; 32] = Sha256::digest(leaf_secret(seed, leaf, position, bit)).into();
            hasher.update(public);
        }
    }
    hasher.finalize().into()
}

fn node_hash(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update([DOMAIN_NODE]);
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}

/// Compute every tree level, leaves first
fn tree_levels(seed: &[u8; 32], tree_height: u8) -> Vec<Vec<[u8; 32]>> {
    let leaf_count = 1u64 << tree_height;
    let mut levels = Vec::with_capacity(tree_height as usize + 1);
    let leaves: Vec<[u8; 32]> = (0..leaf_count).map(|i| leaf_digest(seed, i)).collect();
    levels.push(leaves);
    while levels.last().expect("at least one level").len() > 1 {
        let below = levels.last().expect("at least one level");
        let above: Vec<[u8; 32]> = below
            .chunks(2)
            .map(|pair| node_hash(&pair[0], &pair[1]))
            .collect();
        levels.push(above);
    }
    levels
}

fn compute_root(seed: &[u8; 32], tree_height: u8) -> [u8; 32] {
    tree_levels(seed, tree_height)
        .last()
        .expect("at least one level")[0]
}

/// Generate a fresh HSS key pair covering all 2^height leaves
pub fn generate(params: HssParams) -> Result<(HssPrivateKey, HssPublicKey)> {
    let mut seed = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut seed)
        .map_err(|e| Error::EntropyUnavailable(format!("seed generation failed: {}", e)))?;
    let root = compute_root(&seed, params.tree_height);
    let private = HssPrivateKey::new(seed, params.tree_height, 0, 1u64 << params.tree_height);
    let public = HssPublicKey::new(root, params.tree_height);
    Ok((private, public))
}

/// Recompute the public key from a private key
///
/// Pure recomputation from the seed; the private key's usage range is not
/// read or advanced.
pub fn public_from_private(private: &HssPrivateKey) -> HssPublicKey {
    let root = compute_root(private.seed(), private.tree_height());
    HssPublicKey::new(root, private.tree_height())
}

/// Sign a message, consuming one leaf index
pub fn sign(private: &mut HssPrivateKey, message: &[u8]) -> Result<Vec<u8>> {
    let index = private.advance()?;
    let seed = *private.seed();
    let tree_height = private.tree_height();
    let digest: [u8; 32] = Sha256::digest(message).into();

    let mut signature = Vec::with_capacity(signature_len(tree_height));
    signature.extend_from_slice(&index.to_be_bytes());
    for position in 0..DIGEST_BITS as u16 {
        let bit = (digest[position as usize / 8] >> (7 - position % 8)) & 1;
        let revealed = leaf_secret(&seed, index, position, bit);
        let sibling_public: [u8; 32] =
            Sha256::digest(leaf_secret(&seed, index, position, 1 - bit)).into();
        signature.extend_from_slice(&revealed);
        signature.extend_from_slice(&sibling_public);
    }

    // Authentication path from the leaf to just below the root.
    let levels = tree_levels(&seed, tree_height);
    let mut node = index as usize;
    for level in levels.iter().take(tree_height as usize) {
        let sibling = node ^ 1;
        signature.extend_from_slice(&level[sibling]);
        node >>= 1;
    }
    Ok(signature)
}

/// Verify a signature against the public root
pub fn verify(public: &HssPublicKey, message: &[u8], signature: &[u8]) -> Result<()> {
    let tree_height = public.tree_height();
    if signature.len() != signature_len(tree_height) {
        return Err(Error::Encoding(format!(
            "HSS signature must be {} bytes, got {}",
            signature_len(tree_height),
            signature.len()
        )));
    }
    let index = u64::from_be_bytes(signature[..8].try_into().expect("sliced 8 bytes"));
    if index >= 1u64 << tree_height {
        return Err(Error::Encoding(format!(
            "HSS leaf index {} out of range for tree height {}",
            index, tree_height
        )));
    }
    let digest: [u8; 32] = Sha256::digest(message).into();

    // Rebuild the leaf digest from the revealed preimages and the supplied
    // sibling hashes, keeping the fixed (position, bit) ordering.
    let mut leaf_hasher = Sha256::new();
    leaf_hasher.update([DOMAIN_LEAF]);
    let mut offset = 8;
    for position in 0..DIGEST_BITS {
        let bit = (digest[position / 8] >> (7 - position % 8)) & 1;
        let revealed = &signature[offset..offset + 32];
        let sibling_public = &signature[offset + 32..offset + 64];
        offset += 64;
        let revealed_public: [u8; 32] = Sha256::digest(revealed).into();
        if bit == 0 {
            leaf_hasher.update(revealed_public);
            leaf_hasher.update(sibling_public);
        } else {
            leaf_hasher.update(sibling_public);
            leaf_hasher.update(revealed_public);
        }
    }
    let mut current: [u8; 32] = leaf_hasher.finalize().into();

    let mut node = index;
    for _ in 0..tree_height {
        let mut sibling = [0u8; 32];
        sibling.copy_from_slice(&signature[offset..offset + 32]);
        offset += 32;
        current = if node & 1 == 1 {
            node_hash(&sibling, &current)
        } else {
            node_hash(&current, &sibling)
        };
        node >>= 1;
    }

    if &current != public.root() {
        return Err(Error::Cryptography(
            "HSS signature verification failed".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_sign_verify_roundtrip() {
        let (mut private, public) = generate(HssParams { tree_height: 2 }).unwrap();
        let signature = sign(&mut private, b"kap stateful message").unwrap();
        assert!(verify(&public, b"kap stateful message", &signature).is_ok());
    }

    #[test]
    fn test_verify_rejects_wrong_message() {
        let (mut private, public) = generate(HssParams { tree_height: 2 }).unwrap();
        let signature = sign(&mut private, b"message one").unwrap();
        assert!(verify(&public, b"message two", &signature).is_err());
    }

    #[test]
    fn test_verify_rejects_tampered_signature() {
        let (mut private, public) = generate(HssParams { tree_height: 2 }).unwrap();
        let mut signature = sign(&mut private, b"message").unwrap();
        let last = signature.len() - 1;
        signature[last] ^= 0xFF;
        assert!(verify(&public, b"message", &signature).is_err());
    }

    #[test]
    fn test_every_leaf_signs_and_then_exhausts() {
        let (mut private, public) = generate(HssParams { tree_height: 2 }).unwrap();
        for i in 0..4u64 {
            assert_eq!(private.next_index(), i);
            let signature = sign(&mut private, b"message").unwrap();
            assert!(verify(&public, b"message", &signature).is_ok());
        }
        assert_matches!(sign(&mut private, b"message"), Err(Error::KeyExhausted));
    }

    #[test]
    fn test_sign_consumes_exactly_one_usage() {
        let (mut private, _) = generate(HssParams { tree_height: 3 }).unwrap();
        let before = private.remaining_usages();
        sign(&mut private, b"message").unwrap();
        assert_eq!(private.remaining_usages(), before - 1);
    }

    #[test]
    fn test_public_from_private_is_stable() {
        let (private, public) = generate(HssParams { tree_height: 2 }).unwrap();
        let recomputed = public_from_private(&private);
        assert_eq!(public, recomputed);
        // Recomputation does not touch the signing range.
        assert_eq!(private.next_index(), 0);
    }

    #[test]
    fn test_shards_sign_disjoint_leaves() {
        let (mut parent, public) = generate(HssParams { tree_height: 2 }).unwrap();
        let mut child = parent.shard(2).unwrap();

        let child_sig = sign(&mut child, b"from child").unwrap();
        let parent_sig = sign(&mut parent, b"from parent").unwrap();
        assert!(verify(&public, b"from child", &child_sig).is_ok());
        assert!(verify(&public, b"from parent", &parent_sig).is_ok());

        let child_index = u64::from_be_bytes(child_sig[..8].try_into().unwrap());
        let parent_index = u64::from_be_bytes(parent_sig[..8].try_into().unwrap());
        assert_ne!(child_index, parent_index);
    }
}
