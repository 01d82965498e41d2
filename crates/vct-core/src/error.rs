//! # Error Hierarchy
//!
//! Structured error types for canonicalization, leaf hashing and Merkle proof
//! checking, built with `thiserror`. No `Box<dyn Error>`, no `.unwrap()`
//! outside tests.
//!
//! The split between [`CanonicalizationError::MalformedDocument`] and
//! [`CanonicalizationError::ContextResolution`] lets callers tell a bad
//! credential apart from an unreachable or broken context registry.

use thiserror::Error;

/// Errors raised by a [`DocumentLoader`](crate::DocumentLoader).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoaderError {
    /// The loader has no document for this URL.
    #[error("document not found: {0}")]
    NotFound(String),

    /// The document exists but is not usable JSON-LD.
    #[error("malformed document {url}: {reason}")]
    Malformed {
        /// The requested URL.
        url: String,
        /// Why the document was rejected.
        reason: String,
    },

    /// Any other retrieval failure (network, I/O, policy).
    #[error("failed to load {url}: {reason}")]
    Other {
        /// The requested URL.
        url: String,
        /// Underlying failure.
        reason: String,
    },
}

/// Errors during canonical serialization of a credential.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// The document is structurally invalid JSON-LD.
    #[error("malformed document: {0}")]
    MalformedDocument(String),

    /// A context could not be resolved through the document loader.
    #[error("context resolution failed: {0}")]
    ContextResolution(#[from] LoaderError),

    /// The document uses a JSON-LD feature this canonicalizer does not process.
    #[error("unsupported JSON-LD feature: {0}")]
    Unsupported(String),

    /// JCS serialization of a `@json` literal failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Errors computing a leaf hash.
#[derive(Error, Debug)]
pub enum LeafHashError {
    /// The credential bytes are not well-formed JSON.
    #[error("malformed JSON: {0}")]
    MalformedJson(serde_json::Error),

    /// Canonicalization of the credential failed.
    #[error("canonicalize credential: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// The canonical entry does not fit the 24-bit length prefix.
    #[error("entry too large: {0} bytes (maximum {max})", max = crate::leaf::MAX_ENTRY_LEN)]
    EntryTooLarge(usize),
}

/// Errors verifying Merkle audit paths and consistency proofs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MerkleError {
    /// The leaf index is outside the tree.
    #[error("leaf index {index} out of range for tree size {tree_size}")]
    IndexOutOfRange {
        /// Requested leaf index.
        index: u64,
        /// Tree size the proof claims.
        tree_size: u64,
    },

    /// The tree sizes of a consistency proof are not ordered.
    #[error("invalid tree sizes: first {first} > second {second}")]
    InvalidTreeSizes {
        /// Size of the earlier tree.
        first: u64,
        /// Size of the later tree.
        second: u64,
    },

    /// The proof has the wrong number of nodes for the claimed sizes.
    #[error("wrong proof size: got {got}, want {want}")]
    WrongProofSize {
        /// Number of hashes supplied.
        got: usize,
        /// Number of hashes the algorithm requires.
        want: usize,
    },

    /// A proof element or root is not a 32-byte SHA-256 digest.
    #[error("invalid hash length: {0} bytes (expected 32)")]
    InvalidHashLength(usize),

    /// The recomputed root does not match the expected root.
    #[error("root mismatch: calculated {calculated}, expected {expected}")]
    RootMismatch {
        /// Base64 of the root recomputed from the proof.
        calculated: String,
        /// Base64 of the root the caller expected.
        expected: String,
    },

    /// Equal tree sizes were given with a non-empty proof or different roots.
    #[error("inconsistent trees of equal size {0}")]
    EqualSizeMismatch(u64),
}
