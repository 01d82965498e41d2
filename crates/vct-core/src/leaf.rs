//! # Leaf Hashing
//!
//! Binds a log timestamp to a credential's canonical bytes and hashes the
//! result into the Merkle leaf the log commits to.
//!
//! The leaf is the RFC 6962 `MerkleTreeLeaf` with a credential entry type:
//!
//! ```text
//! version(u8 = 0) || leaf_type(u8 = 0) || timestamp(u64 BE)
//!   || entry_type(u16 BE = 0x0100) || len(u24 BE) || canonical bytes
//!   || extensions_len(u16 BE = 0)
//! ```
//!
//! and the leaf hash is `SHA-256(0x00 || leaf)`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::Value;

use crate::canonical::CanonicalBytes;
use crate::error::LeafHashError;
use crate::loader::DocumentLoader;
use crate::merkle::{hash_leaf, Hash};
use crate::temporal::Timestamp;

/// Largest canonical entry the 24-bit length prefix can describe.
pub const MAX_ENTRY_LEN: usize = (1 << 24) - 1;

/// `MerkleTreeLeaf.version` (v1).
pub const LEAF_VERSION: u8 = 0;
/// `MerkleLeafType.timestamped_entry`.
pub const TIMESTAMPED_ENTRY: u8 = 0;
/// `LogEntryType` for a verifiable credential.
pub const VC_ENTRY_TYPE: u16 = 0x0100;

/// SHA-256 leaf hash of a logged credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LeafHash(Hash);

impl LeafHash {
    /// Wrap a raw 32-byte digest.
    pub const fn from_bytes(bytes: Hash) -> Self {
        Self(bytes)
    }

    /// The raw digest.
    pub fn as_bytes(&self) -> &Hash {
        &self.0
    }

    /// Standard base64, the form used on the wire (`get-proof-by-hash`).
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }
}

impl std::fmt::Display for LeafHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_base64())
    }
}

impl AsRef<[u8]> for LeafHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Encode the `MerkleTreeLeaf` for a canonical credential.
pub fn encode_leaf(timestamp: Timestamp, entry: &CanonicalBytes) -> Result<Vec<u8>, LeafHashError> {
    let body = entry.as_bytes();
    if body.len() > MAX_ENTRY_LEN {
        return Err(LeafHashError::EntryTooLarge(body.len()));
    }

    let mut leaf = Vec::with_capacity(2 + 8 + 2 + 3 + body.len() + 2);
    leaf.push(LEAF_VERSION);
    leaf.push(TIMESTAMPED_ENTRY);
    leaf.extend_from_slice(&timestamp.as_millis().to_be_bytes());
    leaf.extend_from_slice(&VC_ENTRY_TYPE.to_be_bytes());
    let len = (body.len() as u32).to_be_bytes();
    leaf.extend_from_slice(&len[1..]);
    leaf.extend_from_slice(body);
    leaf.extend_from_slice(&0u16.to_be_bytes());
    Ok(leaf)
}

/// Leaf hash of an already-canonicalized credential.
pub fn leaf_hash(timestamp: Timestamp, entry: &CanonicalBytes) -> Result<LeafHash, LeafHashError> {
    Ok(LeafHash(hash_leaf(&encode_leaf(timestamp, entry)?)))
}

/// Leaf hash of a parsed credential document.
pub fn leaf_hash_for_document(
    timestamp: Timestamp,
    credential: &Value,
    loader: &dyn DocumentLoader,
) -> Result<LeafHash, LeafHashError> {
    let entry = CanonicalBytes::from_credential(credential, loader)?;
    leaf_hash(timestamp, &entry)
}

/// Compute the leaf hash the log assigns to `credential` at `timestamp`.
///
/// `credential` is the raw JSON the caller submitted. Proofs and context
/// entries that do not change the expanded graph do not affect the result.
pub fn calculate_leaf_hash(
    timestamp: u64,
    credential: &[u8],
    loader: &dyn DocumentLoader,
) -> Result<LeafHash, LeafHashError> {
    let document: Value = serde_json::from_slice(credential).map_err(LeafHashError::MalformedJson)?;
    leaf_hash_for_document(Timestamp::from_millis(timestamp), &document, loader)
}
