//! # Algorithm Table
//!
//! Each supported `(signature scheme, key type)` pair maps to a key decoder
//! and a verifier. Lookup is exact on both names.
//!
//! | Scheme | Key type | Curve | Signature encoding |
//! |---|---|---|---|
//! | `ECDSA` | `ECDSAP256DER` | P-256, SHA-256 | ASN.1 DER |
//! | `ECDSA` | `ECDSAP256IEEEP1363` | P-256, SHA-256 | 64-byte `r \|\| s` |
//! | `EDDSA` | `ED25519` | Ed25519 | 64 bytes |
//!
//! Public keys are DER `SubjectPublicKeyInfo`. SEC1 points are also accepted
//! for P-256, and raw 32-byte keys for Ed25519.

use ed25519_dalek::pkcs8::DecodePublicKey as _;
use p256::ecdsa::signature::Verifier as _;

use crate::envelope::SignatureAndHashAlgorithm;
use crate::error::CryptoError;

/// A decoded public key ready for verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicKeyHandle {
    /// NIST P-256 ECDSA key.
    EcdsaP256(p256::ecdsa::VerifyingKey),
    /// Ed25519 key.
    Ed25519(ed25519_dalek::VerifyingKey),
}

/// Decodes public key bytes for one algorithm.
pub type KeyDecoder = fn(&[u8]) -> Result<PublicKeyHandle, CryptoError>;

/// Verifies `signature` over `message`.
pub type SignatureVerifier =
    fn(key: &PublicKeyHandle, message: &[u8], signature: &[u8]) -> Result<(), CryptoError>;

/// One entry of the algorithm table.
#[derive(Debug, Clone, Copy)]
pub struct Algorithm {
    /// Envelope `algorithm.signature`.
    pub signature: &'static str,
    /// Envelope `algorithm.type`.
    pub key_type: &'static str,
    /// Public key decoder.
    pub decode_key: KeyDecoder,
    /// Signature verifier.
    pub verify: SignatureVerifier,
}

/// Every supported algorithm.
pub static ALGORITHMS: &[Algorithm] = &[
    Algorithm {
        signature: "ECDSA",
        key_type: "ECDSAP256DER",
        decode_key: decode_p256,
        verify: verify_p256_der,
    },
    Algorithm {
        signature: "ECDSA",
        key_type: "ECDSAP256IEEEP1363",
        decode_key: decode_p256,
        verify: verify_p256_p1363,
    },
    Algorithm {
        signature: "EDDSA",
        key_type: "ED25519",
        decode_key: decode_ed25519,
        verify: verify_ed25519,
    },
];

impl Algorithm {
    /// Find the table entry for an envelope's algorithm descriptor.
    pub fn lookup(descriptor: &SignatureAndHashAlgorithm) -> Result<&'static Algorithm, CryptoError> {
        ALGORITHMS
            .iter()
            .find(|a| a.signature == descriptor.signature && a.key_type == descriptor.key_type)
            .ok_or_else(|| CryptoError::UnsupportedAlgorithm {
                signature: descriptor.signature.clone(),
                key_type: descriptor.key_type.clone(),
            })
    }
}

// -- P-256 -----------------------------------------------------------------

fn decode_p256(bytes: &[u8]) -> Result<PublicKeyHandle, CryptoError> {
    p256::ecdsa::VerifyingKey::from_public_key_der(bytes)
        .or_else(|_| p256::ecdsa::VerifyingKey::from_sec1_bytes(bytes))
        .map(PublicKeyHandle::EcdsaP256)
        .map_err(|e| CryptoError::InvalidPublicKey(format!("P-256: {e}")))
}

fn p256_key(key: &PublicKeyHandle) -> Result<&p256::ecdsa::VerifyingKey, CryptoError> {
    match key {
        PublicKeyHandle::EcdsaP256(k) => Ok(k),
        PublicKeyHandle::Ed25519(_) => Err(CryptoError::KeyMismatch("ECDSA P-256")),
    }
}

fn verify_p256_der(key: &PublicKeyHandle, message: &[u8], signature: &[u8]) -> Result<(), CryptoError> {
    let key = p256_key(key)?;
    let signature = p256::ecdsa::Signature::from_der(signature)
        .map_err(|e| CryptoError::MalformedSignature(format!("DER: {e}")))?;
    key.verify(message, &signature)
        .map_err(|_| CryptoError::VerificationFailed)
}

fn verify_p256_p1363(
    key: &PublicKeyHandle,
    message: &[u8],
    signature: &[u8],
) -> Result<(), CryptoError> {
    let key = p256_key(key)?;
    let signature = p256::ecdsa::Signature::from_slice(signature)
        .map_err(|e| CryptoError::MalformedSignature(format!("IEEE P1363: {e}")))?;
    key.verify(message, &signature)
        .map_err(|_| CryptoError::VerificationFailed)
}

// -- Ed25519 ---------------------------------------------------------------

fn decode_ed25519(bytes: &[u8]) -> Result<PublicKeyHandle, CryptoError> {
    let key = match <&[u8; 32]>::try_from(bytes) {
        Ok(raw) => ed25519_dalek::VerifyingKey::from_bytes(raw)
            .map_err(|e| CryptoError::InvalidPublicKey(format!("Ed25519: {e}")))?,
        Err(_) => ed25519_dalek::VerifyingKey::from_public_key_der(bytes)
            .map_err(|e| CryptoError::InvalidPublicKey(format!("Ed25519: {e}")))?,
    };
    Ok(PublicKeyHandle::Ed25519(key))
}

fn verify_ed25519(key: &PublicKeyHandle, message: &[u8], signature: &[u8]) -> Result<(), CryptoError> {
    let PublicKeyHandle::Ed25519(key) = key else {
        return Err(CryptoError::KeyMismatch("Ed25519"));
    };
    let signature = ed25519_dalek::Signature::from_slice(signature)
        .map_err(|e| CryptoError::MalformedSignature(format!("Ed25519: {e}")))?;
    key.verify_strict(message, &signature)
        .map_err(|_| CryptoError::VerificationFailed)
}
