//! Error types for key decoding and signature verification.

use thiserror::Error;
use vct_core::LeafHashError;

/// Failures inside the algorithm table.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// No table entry for this `(signature, type)` pair.
    #[error("unsupported algorithm: signature {signature:?}, type {key_type:?}")]
    UnsupportedAlgorithm {
        /// Signature scheme name from the envelope.
        signature: String,
        /// Key type name from the envelope.
        key_type: String,
    },

    /// The public key bytes do not decode for the selected key type.
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    /// The signature bytes are not a valid encoding for the scheme.
    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    /// The decoded key belongs to a different algorithm than the verifier.
    #[error("key handle does not match algorithm {0}")]
    KeyMismatch(&'static str),

    /// Well-formed signature that does not verify.
    #[error("signature verification failed")]
    VerificationFailed,
}

/// Errors from [`verify_vc_timestamp_signature`](crate::verify_vc_timestamp_signature)
/// and [`verify_sth_signature`](crate::verify_sth_signature).
#[derive(Error, Debug)]
pub enum VerifyError {
    /// The envelope is not a JSON object of the expected shape.
    #[error("unmarshal signature: {0}")]
    UnmarshalSignature(#[source] serde_json::Error),

    /// The algorithm is unknown or the key does not decode.
    #[error("pub key to handle: {0}")]
    PublicKey(#[source] CryptoError),

    /// The leaf hash of the credential could not be computed.
    #[error("calculate leaf hash: {0}")]
    LeafHash(#[from] LeafHashError),

    /// The signature does not verify over the signed input.
    #[error("verify signature: {0}")]
    InvalidSignature(#[source] CryptoError),
}

impl VerifyError {
    /// Whether this is a cryptographic mismatch rather than a decoding problem.
    pub fn is_invalid_signature(&self) -> bool {
        matches!(self, VerifyError::InvalidSignature(_))
    }
}
