//! # Signature Envelope
//!
//! The log serializes every signature as JSON:
//!
//! ```json
//! {"algorithm": {"signature": "ECDSA", "type": "ECDSAP256DER"}, "signature": "<base64>"}
//! ```
//!
//! Missing members default to empty so that `{}` parses and is rejected later
//! at key decoding, while anything that is not a JSON object fails here.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use vct_core::encoding::base64_bytes;

/// Algorithm descriptor: signature scheme plus key type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureAndHashAlgorithm {
    /// Signature scheme, e.g. `ECDSA` or `EDDSA`.
    #[serde(default)]
    pub signature: String,
    /// Key type, e.g. `ECDSAP256DER`, `ECDSAP256IEEEP1363`, `ED25519`.
    #[serde(rename = "type", default)]
    pub key_type: String,
}

/// A signature together with the algorithm that produced it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigitallySigned {
    /// How to interpret `signature`.
    #[serde(default)]
    pub algorithm: SignatureAndHashAlgorithm,
    /// Raw signature bytes (base64 on the wire).
    #[serde(default, with = "base64_bytes")]
    pub signature: Vec<u8>,
}

impl DigitallySigned {
    /// Parse an envelope from its JSON bytes. The top level must be an object.
    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        let members: Map<String, Value> = serde_json::from_slice(bytes)?;
        serde_json::from_value(Value::Object(members))
    }

    /// Serialize the envelope to JSON bytes.
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_log_envelope() {
        let envelope = DigitallySigned::from_json(
            br#"{"algorithm":{"signature":"ECDSA","type":"ECDSAP256DER"},"signature":"AQID"}"#,
        )
        .unwrap();
        assert_eq!(envelope.algorithm.signature, "ECDSA");
        assert_eq!(envelope.algorithm.key_type, "ECDSAP256DER");
        assert_eq!(envelope.signature, vec![1, 2, 3]);
    }

    #[test]
    fn empty_object_defaults() {
        let envelope = DigitallySigned::from_json(b"{}").unwrap();
        assert_eq!(envelope, DigitallySigned::default());
    }

    #[test]
    fn null_signature_is_rejected() {
        assert!(DigitallySigned::from_json(
            br#"{"algorithm":{"signature":"ECDSA","type":"ECDSAP256DER"},"signature":null}"#
        )
        .is_err());
    }

    #[test]
    fn array_is_rejected() {
        assert!(DigitallySigned::from_json(b"[]").is_err());
    }

    #[test]
    fn json_round_trip() {
        let envelope = DigitallySigned {
            algorithm: SignatureAndHashAlgorithm {
                signature: "EDDSA".into(),
                key_type: "ED25519".into(),
            },
            signature: vec![9; 64],
        };
        let bytes = envelope.to_json().unwrap();
        assert_eq!(DigitallySigned::from_json(&bytes).unwrap(), envelope);
    }
}
