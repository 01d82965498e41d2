//! # Log Signature Verification
//!
//! ## Security Invariant
//!
//! The verifier recomputes the leaf hash from the credential itself. A caller
//! cannot hand in a precomputed hash, so a valid signature always binds the
//! log key, the timestamp and the credential's canonical content together.

use vct_core::{calculate_leaf_hash, DocumentLoader, SignedTreeHead};

use crate::algorithm::Algorithm;
use crate::envelope::DigitallySigned;
use crate::error::VerifyError;

/// `TreeHeadSignature.version` (v1).
const TREE_HEAD_VERSION: u8 = 0;
/// `SignatureType.tree_hash`.
const TREE_HASH_SIGNATURE_TYPE: u8 = 1;

/// Verify a log's timestamp signature over a credential.
///
/// `signature` is the JSON envelope returned by `add-vc`, `public_key` the
/// log's DER public key, and `timestamp` the millisecond timestamp the log
/// assigned.
pub fn verify_vc_timestamp_signature(
    signature: &[u8],
    public_key: &[u8],
    timestamp: u64,
    credential: &[u8],
    loader: &dyn DocumentLoader,
) -> Result<(), VerifyError> {
    let envelope = DigitallySigned::from_json(signature).map_err(VerifyError::UnmarshalSignature)?;
    let (algorithm, key) = resolve_key(&envelope, public_key)?;
    let leaf_hash = calculate_leaf_hash(timestamp, credential, loader)?;

    (algorithm.verify)(&key, leaf_hash.as_bytes(), &envelope.signature)
        .map_err(VerifyError::InvalidSignature)
}

/// The byte string a log signs for a tree head:
/// `version(u8 = 0) || signature_type(u8 = 1) || timestamp(u64 BE) || tree_size(u64 BE) || root(32)`.
pub fn tree_head_signature_input(sth: &SignedTreeHead) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + 8 + 8 + 32);
    out.push(TREE_HEAD_VERSION);
    out.push(TREE_HASH_SIGNATURE_TYPE);
    out.extend_from_slice(&sth.timestamp.to_be_bytes());
    out.extend_from_slice(&sth.tree_size.to_be_bytes());
    out.extend_from_slice(&sth.sha256_root_hash);
    out
}

/// Verify the signature carried in a signed tree head.
pub fn verify_sth_signature(sth: &SignedTreeHead, public_key: &[u8]) -> Result<(), VerifyError> {
    let envelope =
        DigitallySigned::from_json(&sth.tree_head_signature).map_err(VerifyError::UnmarshalSignature)?;
    let (algorithm, key) = resolve_key(&envelope, public_key)?;

    (algorithm.verify)(&key, &tree_head_signature_input(sth), &envelope.signature)
        .map_err(VerifyError::InvalidSignature)
}

fn resolve_key(
    envelope: &DigitallySigned,
    public_key: &[u8],
) -> Result<(&'static Algorithm, crate::PublicKeyHandle), VerifyError> {
    let algorithm = Algorithm::lookup(&envelope.algorithm).map_err(VerifyError::PublicKey)?;
    let key = (algorithm.decode_key)(public_key).map_err(VerifyError::PublicKey)?;
    Ok((algorithm, key))
}
