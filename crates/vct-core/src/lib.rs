//! # vct-core -- Foundational Types for Verifiable Credential Transparency
//!
//! Everything a client needs to recompute what a credential transparency log
//! commits to, without talking to the log:
//!
//! - [`DocumentLoader`]: injected capability resolving JSON-LD contexts, with
//!   an in-memory [`StaticDocumentLoader`].
//! - [`CanonicalBytes`]: the canonical N-Quads of a credential with its
//!   proofs removed.
//! - [`calculate_leaf_hash`]: the RFC 6962 leaf hash binding a log timestamp
//!   to those bytes.
//! - [`merkle`]: audit path and consistency proof verification.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `vct-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.
//! - Pure and synchronous: no I/O, no clocks on the hashing path.

#![deny(missing_docs)]

pub mod canonical;
mod context;
pub mod encoding;
pub mod error;
pub mod leaf;
pub mod loader;
pub mod merkle;
mod rdf;
pub mod temporal;

pub use canonical::CanonicalBytes;
pub use error::{CanonicalizationError, LeafHashError, LoaderError, MerkleError};
pub use leaf::{calculate_leaf_hash, leaf_hash, leaf_hash_for_document, LeafHash, MAX_ENTRY_LEN};
pub use loader::{DocumentLoader, RemoteDocument, StaticDocumentLoader};
pub use merkle::{verify_consistency, verify_inclusion, SignedTreeHead};
pub use temporal::Timestamp;
