//! Stateful private keys for the hash-based signature family
//!
//! An HSS private key owns a contiguous range of one-time leaf indices.
//! Signing consumes exactly one index; [`HssPrivateKey::shard`] splits a
//! disjoint leading sub-range into a new key so two holders can never sign
//! with the same leaf. The usage counter only ever moves on signing or
//! sharding; validity checking recomputes the public root from the seed
//! and leaves the counter untouched.

use crate::error::{Error, Result};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Encoded length of an HSS public key: 32-byte root plus tree height
pub const HSS_PUBLIC_LEN: usize = 33;

/// Encoded length of an HSS private key: seed, height, next and end index
pub const HSS_PRIVATE_LEN: usize = 49;

/// Public half of an HSS key: the Merkle root over all one-time leaf keys
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HssPublicKey {
    root: [u8; 32],
    tree_height: u8,
}

impl HssPublicKey {
    pub(crate) fn new(root: [u8; 32], tree_height: u8) -> Self {
        Self { root, tree_height }
    }

    /// The Merkle root
    pub fn root(&self) -> &[u8; 32] {
        &self.root
    }

    /// The tree height; the key covers 2^tree_height leaves
    pub fn tree_height(&self) -> u8 {
        self.tree_height
    }

    /// Encode as root bytes followed by the height byte
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HSS_PUBLIC_LEN);
        out.extend_from_slice(&self.root);
        out.push(self.tree_height);
        out
    }

    /// Decode from the form produced by [`to_bytes`](Self::to_bytes)
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != HSS_PUBLIC_LEN {
            return Err(Error::Encoding(format!(
                "HSS public key must be {} bytes, got {}",
                HSS_PUBLIC_LEN,
                bytes.len()
            )));
        }
        let mut root = [0u8; 32];
        root.copy_from_slice(&bytes[..32]);
        Ok(Self {
            root,
            tree_height: bytes[32],
        })
    }
}

/// Private half of an HSS key with its remaining signing range
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct HssPrivateKey {
    seed: [u8; 32],
    tree_height: u8,
    next_index: u64,
    end_index: u64,
}

impl HssPrivateKey {
    pub(crate) fn new(seed: [u8; 32], tree_height: u8, next_index: u64, end_index: u64) -> Self {
        Self {
            seed,
            tree_height,
            next_index,
            end_index,
        }
    }

    pub(crate) fn seed(&self) -> &[u8; 32] {
        &self.seed
    }

    /// The tree height
    pub fn tree_height(&self) -> u8 {
        self.tree_height
    }

    /// Next leaf index this key will sign with
    pub fn next_index(&self) -> u64 {
        self.next_index
    }

    /// One past the last leaf index this key may sign with
    pub fn end_index(&self) -> u64 {
        self.end_index
    }

    /// Number of signing usages left in this key's range
    pub fn remaining_usages(&self) -> u64 {
        self.end_index - self.next_index
    }

    /// Split off the leading `count` usages into a new key
    ///
    /// The returned key owns `[next_index, next_index + count)`; this key is
    /// advanced past the shard so the ranges cannot overlap.
    pub fn shard(&mut self, count: u64) -> Result<HssPrivateKey> {
        if count == 0 {
            return Err(Error::Cryptography(
                "cannot shard zero signing usages".to_string(),
            ));
        }
        if count > self.remaining_usages() {
            return Err(Error::KeyExhausted);
        }
        let child = HssPrivateKey::new(
            self.seed,
            self.tree_height,
            self.next_index,
            self.next_index + count,
        );
        self.next_index += count;
        Ok(child)
    }

    /// Consume and return the next leaf index
    pub(crate) fn advance(&mut self) -> Result<u64> {
        if self.next_index >= self.end_index {
            return Err(Error::KeyExhausted);
        }
        let index = self.next_index;
        self.next_index += 1;
        Ok(index)
    }

    /// Encode as seed, height, next index, and end index
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HSS_PRIVATE_LEN);
        out.extend_from_slice(&self.seed);
        out.push(self.tree_height);
        out.extend_from_slice(&self.next_index.to_be_bytes());
        out.extend_from_slice(&self.end_index.to_be_bytes());
        out
    }

    /// Decode from the form produced by [`to_bytes`](Self::to_bytes)
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != HSS_PRIVATE_LEN {
            return Err(Error::Encoding(format!(
                "HSS private key must be {} bytes, got {}",
                HSS_PRIVATE_LEN,
                bytes.len()
            )));
        }
        let mut seed = [0u8; 32];
        seed.copy_from_slice(&bytes[..32]);
        let tree_height = bytes[32];
        let next_index = u64::from_be_bytes(bytes[33..41].try_into().expect("sliced 8 bytes"));
        let end_index = u64::from_be_bytes(bytes[41..49].try_into().expect("sliced 8 bytes"));
        let leaf_count = 1u64 << tree_height.min(63);
        if tree_height == 0 || next_index > end_index || end_index > leaf_count {
            return Err(Error::Encoding(
                "HSS private key carries an invalid signing range".to_string(),
            ));
        }
        Ok(Self {
            seed,
            tree_height,
            next_index,
            end_index,
        })
    }
}

impl fmt::Debug for HssPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HssPrivateKey")
            .field("tree_height", &self.tree_height)
            .field("next_index", &self.next_index)
            .field("end_index", &self.end_index)
            .finish_non_exhaustive()
    }
}
