//! # Merkle Tree Proofs
//!
//! RFC 6962 hashing with the RFC 9162 verification algorithms for audit
//! paths and consistency proofs. The log builds the tree; this module only
//! checks what the log hands out.
//!
//! ## Security Invariant
//!
//! Leaf and interior hashes are domain separated (`0x00` and `0x01`
//! prefixes), so a leaf can never be passed off as an interior node.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sha2::{Digest, Sha256};

use crate::error::MerkleError;

/// A SHA-256 digest.
pub type Hash = [u8; 32];

const LEAF_PREFIX: u8 = 0x00;
const NODE_PREFIX: u8 = 0x01;

/// `SHA-256(0x00 || leaf)`.
pub fn hash_leaf(leaf: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update([LEAF_PREFIX]);
    hasher.update(leaf);
    hasher.finalize().into()
}

/// `SHA-256(0x01 || left || right)`.
pub fn hash_children(left: &Hash, right: &Hash) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update([NODE_PREFIX]);
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}

/// Root of the empty tree: `SHA-256("")`.
pub fn empty_root() -> Hash {
    Sha256::digest(b"").into()
}

/// A log's signed view of its tree at one size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTreeHead {
    /// Number of leaves.
    pub tree_size: u64,
    /// Milliseconds since the epoch when the head was signed.
    pub timestamp: u64,
    /// Merkle tree hash of the first `tree_size` leaves.
    pub sha256_root_hash: Hash,
    /// The serialized signature envelope over the tree head.
    pub tree_head_signature: Vec<u8>,
}

impl SignedTreeHead {
    /// Check that `self` extends `older` using a consistency proof between them.
    pub fn verify_extends<P: AsRef<[u8]>>(
        &self,
        older: &SignedTreeHead,
        proof: &[P],
    ) -> Result<(), MerkleError> {
        verify_consistency(
            older.tree_size,
            self.tree_size,
            &older.sha256_root_hash,
            &self.sha256_root_hash,
            proof,
        )
    }
}

fn to_hash(bytes: &[u8]) -> Result<Hash, MerkleError> {
    bytes
        .try_into()
        .map_err(|_| MerkleError::InvalidHashLength(bytes.len()))
}

fn to_hashes<P: AsRef<[u8]>>(proof: &[P]) -> Result<Vec<Hash>, MerkleError> {
    proof.iter().map(|p| to_hash(p.as_ref())).collect()
}

fn verify_match(calculated: &Hash, expected: &Hash) -> Result<(), MerkleError> {
    if calculated != expected {
        return Err(MerkleError::RootMismatch {
            calculated: STANDARD.encode(calculated),
            expected: STANDARD.encode(expected),
        });
    }
    Ok(())
}

/// Split an inclusion proof into its inner part (below the point where the
/// paths to `index` and `size - 1` diverge) and its border part.
fn decompose_inclusion(index: u64, size: u64) -> (usize, usize) {
    let inner = (64 - (index ^ (size - 1)).leading_zeros()) as usize;
    let border = (index >> inner).count_ones() as usize;
    (inner, border)
}

fn chain_inner(mut seed: Hash, proof: &[Hash], index: u64) -> Hash {
    for (i, h) in proof.iter().enumerate() {
        seed = if (index >> i) & 1 == 0 {
            hash_children(&seed, h)
        } else {
            hash_children(h, &seed)
        };
    }
    seed
}

fn chain_inner_right(mut seed: Hash, proof: &[Hash], index: u64) -> Hash {
    for (i, h) in proof.iter().enumerate() {
        if (index >> i) & 1 == 1 {
            seed = hash_children(h, &seed);
        }
    }
    seed
}

fn chain_border_right(mut seed: Hash, proof: &[Hash]) -> Hash {
    for h in proof {
        seed = hash_children(h, &seed);
    }
    seed
}

/// Recompute the root implied by an audit path.
pub fn root_from_inclusion_proof<P: AsRef<[u8]>>(
    leaf_hash: &[u8],
    index: u64,
    tree_size: u64,
    audit_path: &[P],
) -> Result<Hash, MerkleError> {
    if index >= tree_size {
        return Err(MerkleError::IndexOutOfRange { index, tree_size });
    }
    let leaf = to_hash(leaf_hash)?;
    let proof = to_hashes(audit_path)?;
    let (inner, border) = decompose_inclusion(index, tree_size);
    if proof.len() != inner + border {
        return Err(MerkleError::WrongProofSize {
            got: proof.len(),
            want: inner + border,
        });
    }
    let res = chain_inner(leaf, &proof[..inner], index);
    Ok(chain_border_right(res, &proof[inner..]))
}

/// Verify that `leaf_hash` is leaf `index` of the tree of `tree_size` leaves with `root`.
pub fn verify_inclusion<P: AsRef<[u8]>>(
    leaf_hash: &[u8],
    index: u64,
    tree_size: u64,
    audit_path: &[P],
    root: &[u8],
) -> Result<(), MerkleError> {
    let expected = to_hash(root)?;
    let calculated = root_from_inclusion_proof(leaf_hash, index, tree_size, audit_path)?;
    verify_match(&calculated, &expected)
}

/// Verify that the tree of `second` leaves with `second_root` extends the
/// tree of `first` leaves with `first_root`.
pub fn verify_consistency<P: AsRef<[u8]>>(
    first: u64,
    second: u64,
    first_root: &[u8],
    second_root: &[u8],
    proof: &[P],
) -> Result<(), MerkleError> {
    let first_root = to_hash(first_root)?;
    let second_root = to_hash(second_root)?;
    let proof = to_hashes(proof)?;

    if second < first {
        return Err(MerkleError::InvalidTreeSizes { first, second });
    }
    if first == second {
        if !proof.is_empty() || first_root != second_root {
            return Err(MerkleError::EqualSizeMismatch(first));
        }
        return Ok(());
    }
    if first == 0 {
        if !proof.is_empty() {
            return Err(MerkleError::WrongProofSize {
                got: proof.len(),
                want: 0,
            });
        }
        return Ok(());
    }

    let (inner, border) = decompose_inclusion(first - 1, second);
    let shift = first.trailing_zeros() as usize;
    let inner = inner - shift;

    // When `first` is a power of two its root is itself a node of the
    // larger tree and the proof omits it.
    let (seed, start) = if first == 1 << shift {
        (first_root, 0)
    } else {
        match proof.first() {
            Some(h) => (*h, 1),
            None => {
                return Err(MerkleError::WrongProofSize {
                    got: 0,
                    want: 1 + inner + border,
                })
            }
        }
    };
    if proof.len() != start + inner + border {
        return Err(MerkleError::WrongProofSize {
            got: proof.len(),
            want: start + inner + border,
        });
    }
    let proof = &proof[start..];
    let mask = (first - 1) >> shift;

    let hash1 = chain_inner_right(seed, &proof[..inner], mask);
    let hash1 = chain_border_right(hash1, &proof[inner..]);
    verify_match(&hash1, &first_root)?;

    let hash2 = chain_inner(seed, &proof[..inner], mask);
    let hash2 = chain_border_right(hash2, &proof[inner..]);
    verify_match(&hash2, &second_root)
}
